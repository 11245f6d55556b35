use txgrid::art::ArtEngine;
use txgrid::cache::ImageCache;
use txgrid::cell_index::{index_of, CellCoord, HashPool};
use txgrid::config::GridConfig;
use txgrid::session::{GridEvent, GridSession, InputEvent, ManualClock};
use txgrid::viewport::{Point, ScreenSize};

fn small_config() -> GridConfig {
    GridConfig {
        art_size: 16,
        ..GridConfig::default()
    }
}

#[test]
fn cell_index_is_stable_for_a_fixed_pool() {
    let pool = HashPool::new(["h0", "h1", "h2"]);
    let origin = index_of(0, 0, pool.len());
    assert_eq!(origin, index_of(0, 0, pool.len()));
    assert_eq!(pool.hash_at(CellCoord::new(0, 0)), pool.hash_at(CellCoord::new(0, 0)));
    assert!(index_of(1, 0, 3).is_some_and(|index| index < 3));
}

#[test]
fn pre_render_counts_every_input_element() {
    let mut cache = ImageCache::new();
    let hashes: Vec<String> = ["a", "b", "a"].iter().map(|h| (*h).to_owned()).collect();
    let mut completed = Vec::new();
    cache
        .pre_render(&ArtEngine::new(), &hashes, 100, |progress| completed.push(progress.completed))
        .expect("pre-render");
    assert_eq!(completed, vec![1, 2, 3]);
    assert_eq!(cache.len(), 2);
}

#[test]
fn select_then_deselect_restores_the_default_view_target() {
    let clock = ManualClock::new(0.0);
    let screen = ScreenSize::new(1024.0, 768.0);
    let mut session = GridSession::new(small_config(), screen, Box::new(clock.clone()));
    session.extend_pool(["a", "b", "c"], |_| {}).expect("pool");

    // A glide's clock starts on the first frame that sees it.
    session.frame();
    clock.set(1600.0);
    session.frame();

    session.select_cell(CellCoord::new(7, 3)).expect("cell has a hash");
    session.frame();
    clock.advance(2000.0);
    session.frame();
    assert_eq!(session.viewport().zoom, 0.5);

    session.deselect();
    assert_eq!(session.viewport().target_offset, Point::new(512.0, 384.0));
    assert_eq!(session.viewport().target_zoom, 0.25);

    session.frame();
    clock.advance(1600.0);
    session.frame();
    assert_eq!(session.viewport().offset, Point::new(512.0, 384.0));
    assert_eq!(session.viewport().zoom, 0.25);
}

#[test]
fn scripted_hover_sweep_keeps_animation_records_bounded() {
    let clock = ManualClock::new(0.0);
    let config = GridConfig {
        cull_radius: 4,
        ..small_config()
    };
    let mut session = GridSession::new(config, ScreenSize::new(800.0, 600.0), Box::new(clock.clone()));
    session.extend_pool(["a", "b"], |_| {}).expect("pool");
    session.frame();
    clock.set(2000.0);
    session.frame();

    // At zoom 0.25 one cell is 50 screen pixels wide.
    for step in 0..200 {
        session.push_input(InputEvent::PointerMove {
            x: 400.0 + f64::from(step) * 50.0,
            y: 300.0 + f64::from(step % 3) * 50.0,
        });
        session.frame();
    }
    let diamond = 2 * 4 * 4 + 2 * 4 + 1;
    assert!(session.animations().len() <= diamond);

    let hovers = session
        .take_events()
        .into_iter()
        .filter(|event| matches!(event, GridEvent::Hover { .. }))
        .count();
    assert_eq!(hovers, 200);
}

#[test]
fn panel_height_shifts_the_focus_target() {
    let clock = ManualClock::new(0.0);
    let mut session = GridSession::new(small_config(), ScreenSize::new(800.0, 600.0), Box::new(clock.clone()));
    session.extend_pool(["a"], |_| {}).expect("pool");
    session.select_cell(CellCoord::new(0, 0)).expect("selected");
    let without_panel = session.viewport().target_offset.y;

    session.push_input(InputEvent::SetDetailPanelHeight { height: 200.0 });
    session.frame();
    assert_eq!(session.viewport().target_offset.y, without_panel - 100.0);
}
