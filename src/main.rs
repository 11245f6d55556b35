use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use txgrid::art::{ArtEngine, ArtMetadata};
use txgrid::cell_index::CellCoord;
use txgrid::config::{load_config, load_script, GridConfig, PoolSpec, SessionScript};
use txgrid::error_codes::{envelope_for, CodedError, EMPTY_POOL};
use txgrid::renderer::FrameReport;
use txgrid::session::{GridEvent, GridSession, ManualClock};
use txgrid::sketch::save_png;
use txgrid::source::{
    lookup_and_focus, JsonFileSource, SyntheticSource, TransactionSource, SYNTHETIC_POOL_SIZE,
};
use txgrid::viewport::ScreenSize;

#[derive(Debug, Parser)]
#[command(name = "txgrid")]
#[command(version = env!("TXGRID_VERSION"))]
#[command(about = "Deterministic transaction-hash art on an infinite grid")]
struct Cli {
    /// Print machine-readable JSON on stdout, including failures.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Generate one hash's artwork as a PNG.
    Render {
        hash: String,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        #[arg(long, default_value_t = 400)]
        size: u32,
    },
    /// Print artwork metadata without writing images.
    Inspect {
        #[arg(required = true)]
        hashes: Vec<String>,
        #[arg(long, default_value_t = 400)]
        size: u32,
    },
    /// Render one settled frame of the grid.
    Grid(GridArgs),
    /// Replay a scripted session, writing every frame.
    Session {
        script: PathBuf,
        #[arg(long = "out-dir")]
        out_dir: PathBuf,
    },
}

#[derive(Debug, Args)]
struct GridArgs {
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
    #[arg(long, default_value_t = 1280.0)]
    width: f64,
    #[arg(long, default_value_t = 720.0)]
    height: f64,
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON array of transaction records. Defaults to a synthetic pool.
    #[arg(long)]
    transactions: Option<PathBuf>,
    #[arg(long, default_value_t = SYNTHETIC_POOL_SIZE)]
    synthetic: usize,
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Select `row,col` before rendering.
    #[arg(long, value_parser = parse_cell, conflicts_with = "lookup")]
    select: Option<CellCoord>,
    /// Look up a hash in `--transactions` and focus it.
    #[arg(long, requires = "transactions")]
    lookup: Option<String>,
}

fn parse_cell(raw: &str) -> Result<CellCoord, String> {
    let (row, col) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected row,col but got '{raw}'"))?;
    let row = row.trim().parse().map_err(|_| format!("bad row in '{raw}'"))?;
    let col = col.trim().parse().map_err(|_| format!("bad column in '{raw}'"))?;
    Ok(CellCoord::new(row, col))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    let result = match cli.command {
        Commands::Render { hash, output, size } => run_render(&hash, &output, size, json),
        Commands::Inspect { hashes, size } => run_inspect(&hashes, size, json),
        Commands::Grid(args) => run_grid(&args, json),
        Commands::Session { script, out_dir } => run_session(&script, &out_dir, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if json {
                match serde_json::to_string_pretty(&envelope_for(&error)) {
                    Ok(body) => println!("{body}"),
                    Err(_) => eprintln!("error: {error:#}"),
                }
            } else {
                eprintln!("error: {error:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct ArtSummary<'a> {
    #[serde(flatten)]
    art: &'a ArtMetadata,
    digest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<&'a Path>,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_render(hash: &str, output: &Path, size: u32, json: bool) -> Result<()> {
    let art = ArtEngine::new().generate(hash, size)?;
    save_png(art.image.pixmap(), output)?;
    let summary = ArtSummary {
        art: &art,
        digest: art.image.digest(),
        output: Some(output),
    };
    if json {
        return print_json(&summary);
    }
    println!(
        "OK: {} -> {} ({}x{}, {}, {} shapes, {} background)",
        hash,
        output.display(),
        size,
        size,
        art.tier,
        art.shape_count,
        art.background_style.keyword()
    );
    Ok(())
}

fn run_inspect(hashes: &[String], size: u32, json: bool) -> Result<()> {
    let engine = ArtEngine::new();
    let arts = hashes
        .iter()
        .map(|hash| engine.generate(hash, size))
        .collect::<Result<Vec<_>>>()?;

    if json {
        let summaries: Vec<_> = arts
            .iter()
            .map(|art| ArtSummary {
                art,
                digest: art.image.digest(),
                output: None,
            })
            .collect();
        return print_json(&summaries);
    }
    for art in &arts {
        let shapes = art
            .shape_types
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(kind, count)| format!("{kind:?}={count}").to_lowercase())
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}: {} / {} / {} shapes [{}]",
            art.hash,
            art.tier,
            art.background_style.keyword(),
            art.shape_count,
            shapes
        );
    }
    Ok(())
}

fn pool_hashes(transactions: Option<&Path>, synthetic: usize, seed: u64) -> Result<Vec<String>> {
    let records = match transactions {
        Some(path) => JsonFileSource::open(path)?.recent()?,
        None => SyntheticSource::new(synthetic, seed).recent()?,
    };
    if records.is_empty() {
        return Err(anyhow!(CodedError::usage(EMPTY_POOL, "no transactions to show")
            .with_details(json!({ "transactions": transactions }))));
    }
    Ok(records.into_iter().map(|record| record.signature).collect())
}

fn settle(session: &mut GridSession, clock: &ManualClock) {
    session.frame();
    let longest = session
        .config()
        .focus_duration_ms
        .max(session.config().return_duration_ms);
    clock.advance(longest);
    session.frame();
    clock.advance(session.config().exit_duration_ms);
    session.frame();
}

fn run_grid(args: &GridArgs, json: bool) -> Result<()> {
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GridConfig::default(),
    };
    let hashes = pool_hashes(args.transactions.as_deref(), args.synthetic, args.seed)?;

    let clock = ManualClock::new(0.0);
    let screen = ScreenSize::new(args.width.max(1.0), args.height.max(1.0));
    let mut session = GridSession::new(config, screen, Box::new(clock.clone()));
    session.extend_pool(hashes, |progress| {
        if progress.is_done() {
            info!(total = progress.total, "pool rendered");
        }
    })?;
    session.frame();

    let mut focused = None;
    if let (Some(query), Some(path)) = (&args.lookup, &args.transactions) {
        let source = JsonFileSource::open(path)?;
        let (record, cell) = lookup_and_focus(&source, query, &mut session)?;
        focused = Some(json!({ "signature": record.signature, "row": cell.row, "col": cell.col }));
    } else if let Some(cell) = args.select {
        if session.select_cell(cell).is_none() {
            return Err(anyhow!(CodedError::usage(EMPTY_POOL, "hash pool is empty")));
        }
    }

    settle(&mut session, &clock);
    let (pixmap, report) = session.render()?;
    save_png(&pixmap, &args.output)?;

    if json {
        return print_json(&json!({
            "output": args.output,
            "width": pixmap.width(),
            "height": pixmap.height(),
            "pool": session.pool().len(),
            "zoom": session.viewport().zoom,
            "selected": session.selection().map(|s| json!({ "row": s.cell.row, "col": s.cell.col, "hash": s.hash })),
            "lookup": focused,
            "frame": report,
        }));
    }
    println!(
        "OK: {} ({}x{}, {} cells drawn, {} missing)",
        args.output.display(),
        pixmap.width(),
        pixmap.height(),
        report.drawn,
        report.missing
    );
    Ok(())
}

#[derive(Serialize)]
struct SessionSummary {
    frames: usize,
    events: Vec<TimedEvent>,
    last_frame: FrameReport,
}

#[derive(Serialize)]
struct TimedEvent {
    at_ms: f64,
    #[serde(flatten)]
    event: GridEvent,
}

fn script_hashes(script: &SessionScript) -> Result<Vec<String>> {
    match &script.pool {
        PoolSpec::Synthetic { count, seed } => pool_hashes(None, *count, *seed),
        PoolSpec::Transactions(path) => pool_hashes(Some(path), 0, 0),
        PoolSpec::Hashes(hashes) if hashes.is_empty() => {
            Err(anyhow!(CodedError::usage(EMPTY_POOL, "script pool lists no hashes")))
        }
        PoolSpec::Hashes(hashes) => Ok(hashes.clone()),
    }
}

fn run_session(script_path: &Path, out_dir: &Path, json: bool) -> Result<()> {
    let script = load_script(script_path)?;
    let hashes = script_hashes(&script)?;
    fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create output directory {}", out_dir.display()))?;

    let clock = ManualClock::new(0.0);
    let mut session = GridSession::new(script.config.clone(), script.viewport, Box::new(clock.clone()));
    session.extend_pool(hashes, |_| {})?;

    let step_ms = 1000.0 / f64::from(script.fps);
    let timeline = script.timeline();
    let mut pending = timeline.into_iter().peekable();
    let mut events = Vec::new();
    let mut last_frame = FrameReport::default();
    let mut frames = 0usize;

    loop {
        let now = frames as f64 * step_ms;
        if now > script.duration_ms {
            break;
        }
        clock.set(now);
        while let Some(input) = pending.next_if(|input| input.at_ms <= now) {
            session.push_input(input.event);
        }

        let (pixmap, report) = session.render()?;
        let path = out_dir.join(format!("frame_{frames:05}.png"));
        save_png(&pixmap, &path)?;
        last_frame = report;
        events.extend(
            session
                .take_events()
                .into_iter()
                .map(|event| TimedEvent { at_ms: now, event }),
        );
        frames += 1;
    }

    info!(frames, events = events.len(), out_dir = %out_dir.display(), "session replayed");
    let summary = SessionSummary {
        frames,
        events,
        last_frame,
    };
    if json {
        return print_json(&summary);
    }
    println!(
        "OK: {} frames -> {} ({} events)",
        summary.frames,
        out_dir.display(),
        summary.events.len()
    );
    Ok(())
}
