//! Explicit render loop for the interactive grid.
//!
//! A host pushes `InputEvent`s, then calls `frame` once per display tick.
//! Each frame reads the injected clock once, drains the input queue in
//! order, advances the camera and the (throttled) cell animations, and
//! queues `GridEvent`s for the host to take.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tiny_skia::Pixmap;
use tracing::{debug, info};

use crate::animation::{advance_camera, CellAnimations, FrameThrottle};
use crate::art::ArtEngine;
use crate::cache::{ImageCache, RenderProgress};
use crate::cell_index::{CellCoord, HashPool};
use crate::config::GridConfig;
use crate::error_codes::{CodedError, EMPTY_POOL, HASH_NOT_FOUND};
use crate::renderer::{FrameInputs, FrameReport, GridRenderer};
use crate::viewport::{default_target, focus_target, GridLayout, Point, ScreenSize, Viewport};

pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Hand-driven clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<f64>>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: f64) {
        self.now.set(now_ms);
    }

    pub fn advance(&self, delta_ms: f64) {
        self.now.set(self.now.get() + delta_ms);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now.get()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputEvent {
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp { x: f64, y: f64 },
    PointerLeave,
    Wheel { x: f64, y: f64, delta_y: f64 },
    TouchStart { touches: Vec<Point> },
    TouchMove { touches: Vec<Point> },
    TouchEnd,
    Resize { width: f64, height: f64 },
    SetDetailPanelHeight { height: f64 },
    Deselect,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GridEvent {
    Hover { row: i32, col: i32, hash: String },
    Click { row: i32, col: i32, hash: String },
    Selected { row: i32, col: i32, hash: String },
    Deselected { row: i32, col: i32, hash: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub cell: CellCoord,
    pub hash: String,
}

#[derive(Debug, Clone, Copy, Default)]
struct PointerState {
    down_at: Option<Point>,
    last: Option<Point>,
    dragging: bool,
}

pub struct GridSession {
    config: GridConfig,
    layout: GridLayout,
    screen: ScreenSize,
    panel_height: f64,
    viewport: Viewport,
    pool: HashPool,
    cache: ImageCache,
    engine: ArtEngine,
    animations: CellAnimations,
    throttle: FrameThrottle,
    renderer: GridRenderer,
    clock: Box<dyn Clock>,
    inputs: VecDeque<InputEvent>,
    events: Vec<GridEvent>,
    selected: Option<Selection>,
    pointer: PointerState,
    now_ms: f64,
}

impl GridSession {
    /// Starts centred at `initial_zoom` and immediately glides to the
    /// default view.
    pub fn new(config: GridConfig, screen: ScreenSize, clock: Box<dyn Clock>) -> Self {
        let layout = config.layout();
        let mut viewport = Viewport::new(screen.center(), config.initial_zoom, config.zoom_limits());
        let (home, home_zoom) = default_target(screen, config.default_zoom);
        viewport.animate_to(home, home_zoom, config.return_duration_ms);

        let now_ms = clock.now_ms();
        Self {
            layout,
            screen,
            panel_height: config.detail_panel_height,
            viewport,
            pool: HashPool::default(),
            cache: ImageCache::new(),
            engine: ArtEngine::with_particle_steps(config.particle_steps),
            animations: CellAnimations::new(config.animation_style()),
            throttle: FrameThrottle::new(config.frame_interval_ms),
            renderer: GridRenderer::new(config.render_style()),
            clock,
            inputs: VecDeque::new(),
            events: Vec::new(),
            selected: None,
            pointer: PointerState::default(),
            now_ms,
            config,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn screen(&self) -> ScreenSize {
        self.screen
    }

    pub fn pool(&self) -> &HashPool {
        &self.pool
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub fn animations(&self) -> &CellAnimations {
        &self.animations
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selected.as_ref()
    }

    /// Adds new hashes to the pool and pre-renders them before they can be
    /// drawn. Returns how many were new.
    pub fn extend_pool<I, S, F>(&mut self, hashes: I, on_progress: F) -> Result<usize>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnMut(RenderProgress),
    {
        let before = self.pool.len();
        let added = self.pool.extend(hashes);
        let fresh = self.pool.as_slice()[before..].to_vec();
        self.cache
            .pre_render(&self.engine, &fresh, self.config.art_size, on_progress)?;
        if added > 0 {
            info!(added, pool = self.pool.len(), "hash pool grew");
        }
        Ok(added)
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.inputs.push_back(event);
    }

    pub fn take_events(&mut self) -> Vec<GridEvent> {
        std::mem::take(&mut self.events)
    }

    /// One tick of the loop. Returns the frame time.
    pub fn frame(&mut self) -> f64 {
        self.now_ms = self.clock.now_ms();
        while let Some(event) = self.inputs.pop_front() {
            self.apply(event);
        }
        advance_camera(&mut self.viewport, self.now_ms);
        if self.throttle.ready(self.now_ms) {
            self.animations.update(self.now_ms);
        }
        self.now_ms
    }

    /// Draws the current state into `pixmap` without advancing time.
    pub fn draw(&self, pixmap: &mut Pixmap) -> FrameReport {
        let inputs = FrameInputs {
            viewport: &self.viewport,
            layout: &self.layout,
            pool: &self.pool,
            cache: &self.cache,
            animations: &self.animations,
            selected: self.selected.as_ref().map(|selection| selection.cell),
            now_ms: self.now_ms,
        };
        self.renderer.render_frame(pixmap, &inputs)
    }

    /// `frame` followed by `draw` into a fresh screen-sized pixmap.
    pub fn render(&mut self) -> Result<(Pixmap, FrameReport)> {
        self.frame();
        let width = self.screen.width.round().max(1.0) as u32;
        let height = self.screen.height.round().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("failed to create {width}x{height} frame"))?;
        let report = self.draw(&mut pixmap);
        Ok((pixmap, report))
    }

    /// Select `cell`, pinning its animation and gliding the camera onto it.
    pub fn select_cell(&mut self, cell: CellCoord) -> Option<&Selection> {
        let hash = self.pool.hash_at(cell)?.to_owned();
        if let Some(previous) = self.selected.take() {
            if previous.cell != cell {
                self.animations.deselect(previous.cell, self.now_ms);
            }
        }
        self.animations.select(cell, self.now_ms);
        self.focus_camera(cell);
        debug!(row = cell.row, col = cell.col, hash = hash.as_str(), "cell selected");
        self.events.push(GridEvent::Selected {
            row: cell.row,
            col: cell.col,
            hash: hash.clone(),
        });
        self.selected = Some(Selection { cell, hash });
        self.selected.as_ref()
    }

    /// Clears the selection and glides back to the default view.
    pub fn deselect(&mut self) {
        let Some(previous) = self.selected.take() else {
            return;
        };
        self.animations.deselect(previous.cell, self.now_ms);
        let (home, zoom) = default_target(self.screen, self.config.default_zoom);
        self.viewport.animate_to(home, zoom, self.config.return_duration_ms);
        self.events.push(GridEvent::Deselected {
            row: previous.cell.row,
            col: previous.cell.col,
            hash: previous.hash,
        });
    }

    /// Ensures `hash` is pooled and rendered, then selects the nearest cell
    /// showing it.
    pub fn focus_hash(&mut self, hash: &str) -> Result<CellCoord> {
        self.extend_pool([hash], |_| {})?;
        let index = self
            .pool
            .position(hash)
            .ok_or_else(|| anyhow!(CodedError::usage(EMPTY_POOL, "hash pool is empty")))?;

        let origin = match &self.selected {
            Some(selection) => selection.cell,
            None => self.viewport.cell_at(&self.layout, self.screen.center()),
        };
        let cell = self
            .pool
            .find_cell_for(index, origin, self.config.focus_search_radius)
            .ok_or_else(|| {
                anyhow!(CodedError::usage(
                    HASH_NOT_FOUND,
                    format!(
                        "no cell within {} rings shows '{hash}'",
                        self.config.focus_search_radius
                    )
                ))
            })?;
        self.select_cell(cell);
        Ok(cell)
    }

    fn focus_camera(&mut self, cell: CellCoord) {
        let (offset, zoom) = focus_target(
            &self.layout,
            cell,
            self.screen,
            self.panel_height,
            self.config.selected_zoom,
            self.config.focus_margin_px,
        );
        self.viewport.animate_to(offset, zoom, self.config.focus_duration_ms);
    }

    fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerDown { x, y } => self.press(Point::new(x, y)),
            InputEvent::PointerMove { x, y } => {
                let point = Point::new(x, y);
                if !self.drag_to(point) {
                    self.hover_at(point);
                }
            }
            InputEvent::PointerUp { x, y } => {
                let was_click = self.pointer.down_at.is_some() && !self.pointer.dragging;
                self.pointer = PointerState::default();
                if was_click {
                    self.click_at(Point::new(x, y));
                }
            }
            InputEvent::PointerLeave => {
                self.pointer = PointerState::default();
                self.animations.leave(self.now_ms);
            }
            InputEvent::Wheel { x, y, delta_y } => {
                if self.selected.is_none() {
                    let factor = 1.0 + (-delta_y * self.config.wheel_sensitivity);
                    self.viewport.zoom_at(Point::new(x, y), factor);
                }
            }
            InputEvent::TouchStart { touches } => match touches.as_slice() {
                [touch] => self.press(*touch),
                _ => self.pointer = PointerState::default(),
            },
            InputEvent::TouchMove { touches } => {
                if let [touch] = touches.as_slice() {
                    self.drag_to(*touch);
                }
            }
            InputEvent::TouchEnd => {
                let tap = match self.pointer {
                    PointerState {
                        down_at: Some(_),
                        dragging: false,
                        last,
                    } => last,
                    _ => None,
                };
                self.pointer = PointerState::default();
                if let Some(point) = tap {
                    self.click_at(point);
                }
            }
            InputEvent::Resize { width, height } => {
                self.screen = ScreenSize::new(width.max(1.0), height.max(1.0));
                self.retarget();
            }
            InputEvent::SetDetailPanelHeight { height } => {
                self.panel_height = height.max(0.0);
                if self.selected.is_some() {
                    self.retarget();
                }
            }
            InputEvent::Deselect => self.deselect(),
        }
    }

    fn press(&mut self, point: Point) {
        self.pointer = PointerState {
            down_at: Some(point),
            last: Some(point),
            dragging: false,
        };
    }

    /// Pans if a press is active. Returns true when the move was consumed.
    fn drag_to(&mut self, point: Point) -> bool {
        let (Some(down_at), Some(last)) = (self.pointer.down_at, self.pointer.last) else {
            return false;
        };
        if !self.pointer.dragging {
            if down_at.distance(point) <= self.config.drag_threshold_px {
                return false;
            }
            self.pointer.dragging = true;
            self.animations.leave(self.now_ms);
        }
        self.viewport.pan_by(point.x - last.x, point.y - last.y);
        self.pointer.last = Some(point);
        true
    }

    fn hover_at(&mut self, point: Point) {
        let cell = self.viewport.cell_at(&self.layout, point);
        if !self.animations.hover(cell, self.now_ms) {
            return;
        }
        if let Some(hash) = self.pool.hash_at(cell) {
            self.events.push(GridEvent::Hover {
                row: cell.row,
                col: cell.col,
                hash: hash.to_owned(),
            });
        }
    }

    fn click_at(&mut self, point: Point) {
        let cell = self.viewport.cell_at(&self.layout, point);
        let Some(hash) = self.pool.hash_at(cell).map(str::to_owned) else {
            return;
        };
        self.events.push(GridEvent::Click {
            row: cell.row,
            col: cell.col,
            hash,
        });
        let toggles_off = self
            .selected
            .as_ref()
            .is_some_and(|selection| selection.cell == cell);
        if toggles_off {
            self.deselect();
        } else {
            self.select_cell(cell);
        }
    }

    /// Re-aims the camera after the screen or panel changed.
    fn retarget(&mut self) {
        match self.selected.as_ref().map(|selection| selection.cell) {
            Some(cell) => self.focus_camera(cell),
            None if self.viewport.is_animating() => {
                let (home, zoom) = default_target(self.screen, self.config.default_zoom);
                self.viewport
                    .animate_to(home, zoom, self.config.return_duration_ms);
            }
            None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{GridEvent, GridSession, InputEvent, ManualClock};
    use crate::cell_index::CellCoord;
    use crate::config::GridConfig;
    use crate::viewport::{Point, ScreenSize};

    fn small_config() -> GridConfig {
        GridConfig {
            art_size: 16,
            ..GridConfig::default()
        }
    }

    fn session_with_pool(clock: &ManualClock) -> GridSession {
        let mut session = GridSession::new(small_config(), ScreenSize::new(800.0, 600.0), Box::new(clock.clone()));
        session
            .extend_pool(["h0", "h1", "h2", "h3"], |_| {})
            .expect("pool");
        session
    }

    /// Runs the opening glide to completion.
    fn settled_session(clock: &ManualClock) -> GridSession {
        let mut session = session_with_pool(clock);
        session.frame();
        clock.set(2000.0);
        session.frame();
        session
    }

    #[test]
    fn starts_centred_and_glides_to_default_view() {
        let clock = ManualClock::new(0.0);
        let mut session = session_with_pool(&clock);
        assert_eq!(session.viewport().zoom, 1.0);
        assert_eq!(session.viewport().offset, Point::new(400.0, 300.0));

        session.frame();
        clock.set(1600.0);
        session.frame();
        assert_eq!(session.viewport().zoom, 0.25);
        assert!(!session.viewport().is_animating());
    }

    #[test]
    fn click_selects_and_second_click_deselects() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);

        // (400, 300) is the world origin at the default view.
        session.push_input(InputEvent::PointerDown { x: 410.0, y: 310.0 });
        session.push_input(InputEvent::PointerUp { x: 410.0, y: 310.0 });
        session.frame();
        let events = session.take_events();
        assert!(matches!(events[0], GridEvent::Click { row: 0, col: 0, .. }));
        assert!(matches!(events[1], GridEvent::Selected { row: 0, col: 0, .. }));
        assert_eq!(session.selection().map(|s| s.cell), Some(CellCoord::new(0, 0)));
        assert_eq!(session.viewport().target_zoom, 0.5);

        // The camera is still at the default view, so the same point still
        // hits the selected cell.
        session.push_input(InputEvent::PointerDown { x: 410.0, y: 310.0 });
        session.push_input(InputEvent::PointerUp { x: 410.0, y: 310.0 });
        session.frame();
        let events = session.take_events();
        assert!(matches!(events.last(), Some(GridEvent::Deselected { .. })));
        assert!(session.selection().is_none());
    }

    #[test]
    fn drag_beyond_threshold_pans_and_suppresses_click() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);
        let before = session.viewport().offset;

        session.push_input(InputEvent::PointerDown { x: 100.0, y: 100.0 });
        session.push_input(InputEvent::PointerMove { x: 103.0, y: 100.0 });
        session.push_input(InputEvent::PointerMove { x: 150.0, y: 120.0 });
        session.push_input(InputEvent::PointerUp { x: 150.0, y: 120.0 });
        session.frame();

        let after = session.viewport().offset;
        assert_eq!(after.x - before.x, 50.0);
        assert_eq!(after.y - before.y, 20.0);
        assert!(session
            .take_events()
            .iter()
            .all(|event| !matches!(event, GridEvent::Click { .. })));
        assert!(session.selection().is_none());
    }

    #[test]
    fn tap_selects_cell() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);

        session.push_input(InputEvent::TouchStart {
            touches: vec![Point::new(410.0, 310.0)],
        });
        session.push_input(InputEvent::TouchMove {
            touches: vec![Point::new(412.0, 311.0)],
        });
        session.push_input(InputEvent::TouchEnd);
        session.frame();

        let events = session.take_events();
        assert!(matches!(events[0], GridEvent::Click { row: 0, col: 0, .. }));
        assert_eq!(session.selection().map(|s| s.cell), Some(CellCoord::new(0, 0)));
    }

    #[test]
    fn touch_drag_pans_without_tapping() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);
        let before = session.viewport().offset;

        session.push_input(InputEvent::TouchStart {
            touches: vec![Point::new(100.0, 100.0)],
        });
        session.push_input(InputEvent::TouchMove {
            touches: vec![Point::new(150.0, 120.0)],
        });
        session.push_input(InputEvent::TouchEnd);
        session.frame();

        let after = session.viewport().offset;
        assert_eq!(after.x - before.x, 50.0);
        assert_eq!(after.y - before.y, 20.0);
        assert!(session
            .take_events()
            .iter()
            .all(|event| !matches!(event, GridEvent::Click { .. })));
        assert!(session.selection().is_none());
    }

    #[test]
    fn second_finger_cancels_tap() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);

        session.push_input(InputEvent::TouchStart {
            touches: vec![Point::new(410.0, 310.0)],
        });
        session.push_input(InputEvent::TouchStart {
            touches: vec![Point::new(410.0, 310.0), Point::new(500.0, 400.0)],
        });
        session.push_input(InputEvent::TouchEnd);
        session.frame();

        assert!(session.take_events().is_empty());
        assert!(session.selection().is_none());
    }

    #[test]
    fn wheel_zooms_only_without_selection() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);

        session.push_input(InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: -100.0 });
        session.frame();
        assert!((session.viewport().zoom - 0.25 * 1.2).abs() < 1e-9);

        session.select_cell(CellCoord::new(0, 0));
        let zoom = session.viewport().zoom;
        session.push_input(InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: -100.0 });
        session.frame();
        assert_eq!(session.viewport().zoom, zoom);
    }

    #[test]
    fn hover_events_fire_on_cell_change_only() {
        let clock = ManualClock::new(0.0);
        let mut session = settled_session(&clock);

        session.push_input(InputEvent::PointerMove { x: 401.0, y: 301.0 });
        session.push_input(InputEvent::PointerMove { x: 402.0, y: 302.0 });
        session.push_input(InputEvent::PointerMove { x: 460.0, y: 301.0 });
        session.frame();
        let hovers: Vec<_> = session
            .take_events()
            .into_iter()
            .filter(|event| matches!(event, GridEvent::Hover { .. }))
            .collect();
        assert_eq!(hovers.len(), 2);
    }

    #[test]
    fn deselect_returns_to_exact_default_target() {
        let clock = ManualClock::new(0.0);
        let mut session = session_with_pool(&clock);
        session.frame();
        session.select_cell(CellCoord::new(4, -2));
        clock.set(500.0);
        session.frame();
        session.push_input(InputEvent::Deselect);
        session.frame();
        assert_eq!(session.viewport().target_offset, Point::new(400.0, 300.0));
        assert_eq!(session.viewport().target_zoom, 0.25);
    }

    #[test]
    fn focus_hash_adds_and_selects() {
        let clock = ManualClock::new(0.0);
        let mut session = session_with_pool(&clock);
        let cell = session.focus_hash("fresh").expect("focus");
        assert_eq!(session.pool().len(), 5);
        assert!(session.cache().has("fresh"));
        assert_eq!(session.pool().hash_at(cell), Some("fresh"));
        assert_eq!(session.selection().map(|s| s.hash.as_str()), Some("fresh"));
    }

    #[test]
    fn render_produces_screen_sized_frame() {
        let clock = ManualClock::new(0.0);
        let mut session = GridSession::new(small_config(), ScreenSize::new(64.0, 48.0), Box::new(clock.clone()));
        session.extend_pool(["a"], |_| {}).expect("pool");
        let (pixmap, report) = session.render().expect("frame");
        assert_eq!((pixmap.width(), pixmap.height()), (64, 48));
        assert_eq!(report.missing, 0);
        assert!(report.drawn > 0);
    }
}
