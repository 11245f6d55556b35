//! YAML configuration for the grid and for scripted sessions.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationStyle;
use crate::error_codes::{CodedError, INVALID_CONFIG};
use crate::renderer::RenderStyle;
use crate::session::InputEvent;
use crate::viewport::{GridLayout, ScreenSize, ZoomLimits};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    pub cell_size: f64,
    pub padding: f64,
    /// Side of each generated image in pixels.
    pub art_size: u32,
    pub particle_steps: u32,

    pub min_zoom: f64,
    pub max_zoom: f64,
    pub default_zoom: f64,
    pub selected_zoom: f64,
    pub initial_zoom: f64,

    pub hover_scale: f64,
    pub base_opacity: f64,
    pub hover_opacity: f64,
    pub selected_opacity: f64,

    pub entry_duration_ms: f64,
    pub exit_duration_ms: f64,
    pub focus_duration_ms: f64,
    pub return_duration_ms: f64,

    pub cull_radius: u64,
    pub overscan: i32,
    pub frame_interval_ms: f64,

    pub wheel_sensitivity: f64,
    pub drag_threshold_px: f64,
    pub focus_margin_px: f64,
    pub detail_panel_height: f64,
    /// Rings searched when placing a looked-up hash.
    pub focus_search_radius: i32,

    pub wobble_amplitude: f64,
    pub wobble_period_ms: f64,
    pub selection_outline_px: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size: 200.0,
            padding: 0.0,
            art_size: 400,
            particle_steps: 1,
            min_zoom: 0.1,
            max_zoom: 5.0,
            default_zoom: 0.25,
            selected_zoom: 0.5,
            initial_zoom: 1.0,
            hover_scale: 1.3,
            base_opacity: 0.5,
            hover_opacity: 1.0,
            selected_opacity: 1.0,
            entry_duration_ms: 100.0,
            exit_duration_ms: 600.0,
            focus_duration_ms: 2000.0,
            return_duration_ms: 1600.0,
            cull_radius: 100,
            overscan: 2,
            frame_interval_ms: 1000.0 / 60.0,
            wheel_sensitivity: 0.002,
            drag_threshold_px: 5.0,
            focus_margin_px: 40.0,
            detail_panel_height: 0.0,
            focus_search_radius: 256,
            wobble_amplitude: 0.01,
            wobble_period_ms: 1000.0,
            selection_outline_px: 5.0,
        }
    }
}

impl GridConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) {
            bail!("cell_size must be > 0 (got {})", self.cell_size);
        }
        if !(self.padding >= 0.0) {
            bail!("padding must be >= 0 (got {})", self.padding);
        }
        if self.art_size == 0 {
            bail!("art_size must be > 0");
        }
        if !(self.min_zoom > 0.0) || !(self.min_zoom < self.max_zoom) {
            bail!(
                "zoom limits must satisfy 0 < min_zoom < max_zoom (got {}..{})",
                self.min_zoom,
                self.max_zoom
            );
        }
        for (name, zoom) in [
            ("default_zoom", self.default_zoom),
            ("selected_zoom", self.selected_zoom),
            ("initial_zoom", self.initial_zoom),
        ] {
            if !(self.min_zoom..=self.max_zoom).contains(&zoom) {
                bail!("{name} {zoom} is outside [{}, {}]", self.min_zoom, self.max_zoom);
            }
        }
        for (name, opacity) in [
            ("base_opacity", self.base_opacity),
            ("hover_opacity", self.hover_opacity),
            ("selected_opacity", self.selected_opacity),
        ] {
            if !(0.0..=1.0).contains(&opacity) {
                bail!("{name} must be within [0, 1] (got {opacity})");
            }
        }
        for (name, duration) in [
            ("entry_duration_ms", self.entry_duration_ms),
            ("exit_duration_ms", self.exit_duration_ms),
            ("focus_duration_ms", self.focus_duration_ms),
            ("return_duration_ms", self.return_duration_ms),
            ("frame_interval_ms", self.frame_interval_ms),
        ] {
            if !(duration > 0.0) {
                bail!("{name} must be > 0 (got {duration})");
            }
        }
        if !(self.hover_scale > 0.0) {
            bail!("hover_scale must be > 0 (got {})", self.hover_scale);
        }
        if self.overscan < 0 || self.focus_search_radius < 0 {
            bail!("overscan and focus_search_radius must be >= 0");
        }
        if !(self.drag_threshold_px >= 0.0) || !(self.detail_panel_height >= 0.0) {
            bail!("drag_threshold_px and detail_panel_height must be >= 0");
        }
        Ok(())
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout {
            cell_size: self.cell_size,
            padding: self.padding,
            overscan: self.overscan,
        }
    }

    pub fn zoom_limits(&self) -> ZoomLimits {
        ZoomLimits {
            min: self.min_zoom,
            max: self.max_zoom,
        }
    }

    pub fn animation_style(&self) -> AnimationStyle {
        AnimationStyle {
            hover_scale: self.hover_scale,
            base_opacity: self.base_opacity,
            hover_opacity: self.hover_opacity,
            selected_opacity: self.selected_opacity,
            enter_ms: self.entry_duration_ms,
            exit_ms: self.exit_duration_ms,
            cull_radius: self.cull_radius,
        }
    }

    pub fn render_style(&self) -> RenderStyle {
        RenderStyle {
            outline_width: self.selection_outline_px,
            wobble_amplitude: self.wobble_amplitude,
            wobble_period_ms: self.wobble_period_ms,
            ..RenderStyle::default()
        }
    }
}

/// Where a scripted session gets its hashes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolSpec {
    Synthetic {
        count: usize,
        #[serde(default)]
        seed: u64,
    },
    /// JSON array of transaction records, relative to the script.
    Transactions(PathBuf),
    Hashes(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptedInput {
    pub at_ms: f64,
    pub event: InputEvent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionScript {
    pub viewport: ScreenSize,
    #[serde(default)]
    pub config: GridConfig,
    pub pool: PoolSpec,
    #[serde(default = "default_fps")]
    pub fps: u32,
    pub duration_ms: f64,
    #[serde(default)]
    pub events: Vec<ScriptedInput>,
}

fn default_fps() -> u32 {
    30
}

impl SessionScript {
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if !(self.viewport.width >= 1.0) || !(self.viewport.height >= 1.0) {
            bail!(
                "viewport must be at least 1x1 (got {}x{})",
                self.viewport.width,
                self.viewport.height
            );
        }
        if self.fps == 0 {
            bail!("fps must be > 0");
        }
        if !(self.duration_ms >= 0.0) {
            bail!("duration_ms must be >= 0 (got {})", self.duration_ms);
        }
        if let Some(event) = self.events.iter().find(|event| !(event.at_ms >= 0.0)) {
            bail!("event times must be >= 0 (got {})", event.at_ms);
        }
        Ok(())
    }

    /// Scripted inputs ordered by time; ties keep file order.
    pub fn timeline(&self) -> Vec<ScriptedInput> {
        let mut events = self.events.clone();
        events.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
        events
    }
}

pub fn load_config(path: &Path) -> Result<GridConfig> {
    let config: GridConfig = read_yaml(path, "grid config")?;
    config
        .validate()
        .map_err(|err| anyhow!(CodedError::usage(INVALID_CONFIG, format!("{err:#}"))))
        .with_context(|| format!("invalid grid config {}", path.display()))?;
    Ok(config)
}

pub fn load_script(path: &Path) -> Result<SessionScript> {
    let mut script: SessionScript = read_yaml(path, "session script")?;
    script
        .validate()
        .map_err(|err| anyhow!(CodedError::usage(INVALID_CONFIG, format!("{err:#}"))))
        .with_context(|| format!("invalid session script {}", path.display()))?;

    if let PoolSpec::Transactions(file) = &mut script.pool {
        if file.is_relative() {
            let base = path.parent().map_or_else(|| PathBuf::from("."), Path::to_path_buf);
            *file = base.join(&*file);
        }
    }
    Ok(script)
}

fn read_yaml<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(CodedError::usage(
            INVALID_CONFIG,
            format!("failed to parse {what} {} at {location}: {error}", path.display())
        ))
    })
}
