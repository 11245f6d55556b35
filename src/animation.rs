//! Time-based camera glides and per-cell hover animations.
//!
//! Everything here is driven by an explicit `now_ms`; nothing reads a clock.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cell_index::CellCoord;
use crate::viewport::{Point, Viewport};

/// Cubic ease-in-out on `[0, 1]`.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

fn progress(now_ms: f64, started_at: f64, duration_ms: f64) -> f64 {
    if duration_ms <= 0.0 {
        return 1.0;
    }
    ((now_ms - started_at) / duration_ms).clamp(0.0, 1.0)
}

/// Advances the viewport's glide, if any. The glide's clock starts on the
/// first frame that sees it. Returns true while the camera is still moving.
pub fn advance_camera(viewport: &mut Viewport, now_ms: f64) -> bool {
    let Some(glide) = viewport.glide.as_mut() else {
        return false;
    };
    let started_at = *glide.started_at.get_or_insert(now_ms);
    let t = progress(now_ms, started_at, glide.duration_ms);
    let eased = ease_in_out_cubic(t);
    let (from_offset, from_zoom) = (glide.from_offset, glide.from_zoom);

    viewport.offset = Point::new(
        lerp(from_offset.x, viewport.target_offset.x, eased),
        lerp(from_offset.y, viewport.target_offset.y, eased),
    );
    viewport.zoom = lerp(from_zoom, viewport.target_zoom, eased);

    if t >= 1.0 {
        viewport.offset = viewport.target_offset;
        viewport.zoom = viewport.target_zoom;
        viewport.glide = None;
        return false;
    }
    true
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationStyle {
    pub hover_scale: f64,
    pub base_opacity: f64,
    pub hover_opacity: f64,
    pub selected_opacity: f64,
    pub enter_ms: f64,
    pub exit_ms: f64,
    /// Exiting records farther than this (Manhattan) from the pointer are
    /// dropped.
    pub cull_radius: u64,
}

impl Default for AnimationStyle {
    fn default() -> Self {
        Self {
            hover_scale: 1.3,
            base_opacity: 0.5,
            hover_opacity: 1.0,
            selected_opacity: 1.0,
            enter_ms: 100.0,
            exit_ms: 600.0,
            cull_radius: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Entering,
    Steady,
    Exiting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellAnimation {
    pub scale: f64,
    pub opacity: f64,
    pub phase: Phase,
    pub selected: bool,
    started_at: f64,
    from_scale: f64,
    from_opacity: f64,
    target_scale: f64,
}

impl CellAnimation {
    fn entering(now_ms: f64, from_scale: f64, from_opacity: f64, target_scale: f64) -> Self {
        Self {
            scale: from_scale,
            opacity: from_opacity,
            phase: Phase::Entering,
            selected: false,
            started_at: now_ms,
            from_scale,
            from_opacity,
            target_scale,
        }
    }

    pub fn is_exiting(&self) -> bool {
        self.phase == Phase::Exiting
    }

    fn begin_exit(&mut self, now_ms: f64) {
        self.retarget(Phase::Exiting, now_ms);
    }

    fn retarget(&mut self, phase: Phase, now_ms: f64) {
        self.from_scale = self.scale;
        self.from_opacity = self.opacity;
        self.started_at = now_ms;
        self.phase = phase;
    }
}

/// One animation record per cell, keyed by coordinate.
#[derive(Debug, Clone, Default)]
pub struct CellAnimations {
    style: AnimationStyle,
    records: BTreeMap<CellCoord, CellAnimation>,
    hovered: Option<CellCoord>,
}

impl CellAnimations {
    pub fn new(style: AnimationStyle) -> Self {
        Self {
            style,
            records: BTreeMap::new(),
            hovered: None,
        }
    }

    pub fn style(&self) -> &AnimationStyle {
        &self.style
    }

    pub fn get(&self, cell: CellCoord) -> Option<&CellAnimation> {
        self.records.get(&cell)
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellCoord, &CellAnimation)> {
        self.records.iter().map(|(cell, record)| (*cell, record))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn hovered(&self) -> Option<CellCoord> {
        self.hovered
    }

    /// Pointer is over `cell`. Returns true when the hovered cell changed.
    pub fn hover(&mut self, cell: CellCoord, now_ms: f64) -> bool {
        if self.hovered == Some(cell) {
            return false;
        }
        self.hovered = Some(cell);

        let style = self.style;
        for (coord, record) in self.records.iter_mut() {
            if *coord == cell {
                continue;
            }
            if record.selected {
                record.opacity = style.selected_opacity;
            } else if !record.is_exiting() {
                record.begin_exit(now_ms);
            }
        }
        self.records
            .retain(|coord, record| !(record.is_exiting() && coord.manhattan(cell) > style.cull_radius));

        match self.records.get_mut(&cell) {
            Some(record) if record.is_exiting() && !record.selected => {
                record.target_scale = style.hover_scale;
                record.retarget(Phase::Entering, now_ms);
            }
            Some(_) => {}
            None => {
                self.records.insert(
                    cell,
                    CellAnimation::entering(now_ms, 1.0, style.base_opacity, style.hover_scale),
                );
            }
        }
        true
    }

    /// Pointer left the grid or became a drag: every unpinned record exits.
    pub fn leave(&mut self, now_ms: f64) {
        self.hovered = None;
        let style = self.style;
        for record in self.records.values_mut() {
            if record.selected {
                record.opacity = style.selected_opacity;
            } else if !record.is_exiting() {
                record.begin_exit(now_ms);
            }
        }
    }

    /// Pins `cell` at full opacity until `deselect`.
    pub fn select(&mut self, cell: CellCoord, now_ms: f64) {
        let style = self.style;
        let record = self
            .records
            .entry(cell)
            .or_insert_with(|| CellAnimation::entering(now_ms, 1.0, style.selected_opacity, 1.0));
        if record.is_exiting() {
            record.target_scale = if self.hovered == Some(cell) {
                style.hover_scale
            } else {
                1.0
            };
            record.retarget(Phase::Entering, now_ms);
        }
        record.selected = true;
        record.opacity = style.selected_opacity;
    }

    /// Unpins `cell`. It stays hovered if the pointer is on it, otherwise it
    /// fades out from its current state.
    pub fn deselect(&mut self, cell: CellCoord, now_ms: f64) {
        let hovered = self.hovered == Some(cell);
        if let Some(record) = self.records.get_mut(&cell) {
            record.selected = false;
            if !hovered {
                record.begin_exit(now_ms);
            }
        }
    }

    /// Advances every record and drops finished exits.
    pub fn update(&mut self, now_ms: f64) {
        let style = self.style;
        for record in self.records.values_mut() {
            match record.phase {
                Phase::Entering => {
                    let t = progress(now_ms, record.started_at, style.enter_ms);
                    record.scale = lerp(record.from_scale, record.target_scale, t);
                    record.opacity = if record.selected {
                        style.selected_opacity
                    } else {
                        lerp(record.from_opacity, style.hover_opacity, t)
                    };
                    if t >= 1.0 {
                        record.phase = Phase::Steady;
                    }
                }
                Phase::Steady => {
                    if record.selected {
                        record.opacity = style.selected_opacity;
                    }
                }
                Phase::Exiting => {
                    let t = progress(now_ms, record.started_at, style.exit_ms);
                    record.scale = lerp(record.from_scale, 1.0, t);
                    record.opacity = lerp(record.from_opacity, style.base_opacity, t);
                }
            }
        }
        self.records.retain(|_, record| {
            !(record.is_exiting()
                && !record.selected
                && progress(now_ms, record.started_at, style.exit_ms) >= 1.0)
        });
    }
}

/// Gates work to at most one run per `interval_ms`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameThrottle {
    interval_ms: f64,
    last_run: Option<f64>,
}

impl FrameThrottle {
    pub fn new(interval_ms: f64) -> Self {
        Self {
            interval_ms,
            last_run: None,
        }
    }

    pub fn ready(&mut self, now_ms: f64) -> bool {
        match self.last_run {
            Some(last) if now_ms - last < self.interval_ms => false,
            _ => {
                self.last_run = Some(now_ms);
                true
            }
        }
    }
}
