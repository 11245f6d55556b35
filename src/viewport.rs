//! Pan/zoom transform between screen pixels and grid world space.
//!
//! `screen = world * zoom + offset`. World units are unscaled cell pixels,
//! so cell `(row, col)` starts at `(col * pitch, row * pitch)`.

use serde::{Deserialize, Serialize};

use crate::cell_index::CellCoord;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridLayout {
    pub cell_size: f64,
    pub padding: f64,
    /// Extra cells kept in range on every side.
    pub overscan: i32,
}

impl GridLayout {
    pub fn pitch(&self) -> f64 {
        self.cell_size + self.padding
    }

    pub fn cell_origin(&self, cell: CellCoord) -> Point {
        Point::new(
            f64::from(cell.col) * self.pitch(),
            f64::from(cell.row) * self.pitch(),
        )
    }

    pub fn cell_center(&self, cell: CellCoord) -> Point {
        let origin = self.cell_origin(cell);
        Point::new(
            origin.x + self.cell_size / 2.0,
            origin.y + self.cell_size / 2.0,
        )
    }

    pub fn cell_at_world(&self, world: Point) -> CellCoord {
        let pitch = self.pitch();
        CellCoord::new(
            (world.y / pitch).floor() as i32,
            (world.x / pitch).floor() as i32,
        )
    }
}

/// Half-open rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub start_row: i32,
    pub end_row: i32,
    pub start_col: i32,
    pub end_col: i32,
}

impl CellRange {
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.row >= self.start_row
            && cell.row < self.end_row
            && cell.col >= self.start_col
            && cell.col < self.end_col
    }

    pub fn len(&self) -> usize {
        let rows = (i64::from(self.end_row) - i64::from(self.start_row)).max(0);
        let cols = (i64::from(self.end_col) - i64::from(self.start_col)).max(0);
        (rows * cols) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major iteration.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (self.start_row..self.end_row)
            .flat_map(move |row| (self.start_col..self.end_col).map(move |col| CellCoord::new(row, col)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl ZoomLimits {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

/// A pending or running camera glide toward the viewport's target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glide {
    pub from_offset: Point,
    pub from_zoom: f64,
    pub duration_ms: f64,
    /// Set by the animation clock on the first frame it sees the glide.
    pub started_at: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub offset: Point,
    pub zoom: f64,
    pub target_offset: Point,
    pub target_zoom: f64,
    pub limits: ZoomLimits,
    pub glide: Option<Glide>,
}

impl Viewport {
    pub fn new(offset: Point, zoom: f64, limits: ZoomLimits) -> Self {
        let zoom = limits.clamp(zoom);
        Self {
            offset,
            zoom,
            target_offset: offset,
            target_zoom: zoom,
            limits,
            glide: None,
        }
    }

    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.offset.x) / self.zoom,
            (screen.y - self.offset.y) / self.zoom,
        )
    }

    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(
            world.x * self.zoom + self.offset.x,
            world.y * self.zoom + self.offset.y,
        )
    }

    pub fn cell_at(&self, layout: &GridLayout, screen: Point) -> CellCoord {
        layout.cell_at_world(self.screen_to_world(screen))
    }

    pub fn visible_cell_range(&self, layout: &GridLayout, screen: ScreenSize) -> CellRange {
        let span = layout.pitch() * self.zoom;
        let margin = layout.overscan.max(0);
        let start_col = (-self.offset.x / span).floor() as i32 - margin;
        let start_row = (-self.offset.y / span).floor() as i32 - margin;
        let cols = (screen.width / span).ceil() as i32 + margin * 2;
        let rows = (screen.height / span).ceil() as i32 + margin * 2;
        CellRange {
            start_row,
            end_row: start_row.saturating_add(rows),
            start_col,
            end_col: start_col.saturating_add(cols),
        }
    }

    /// Scales zoom by `factor` (clamped) keeping the world point under
    /// `screen` fixed. Snaps the target to the result.
    pub fn zoom_at(&mut self, screen: Point, factor: f64) {
        let next_zoom = self.limits.clamp(self.zoom * factor);
        let applied = next_zoom / self.zoom;
        self.offset = Point::new(
            screen.x - applied * (screen.x - self.offset.x),
            screen.y - applied * (screen.y - self.offset.y),
        );
        self.zoom = next_zoom;
        self.snap_to(self.offset, self.zoom);
    }

    /// Translates the view, carrying the target and any glide along.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.offset.x += dx;
        self.offset.y += dy;
        self.target_offset.x += dx;
        self.target_offset.y += dy;
        if let Some(glide) = &mut self.glide {
            glide.from_offset.x += dx;
            glide.from_offset.y += dy;
        }
    }

    /// Records a glide from the current state; applied by the camera clock.
    pub fn animate_to(&mut self, target_offset: Point, target_zoom: f64, duration_ms: f64) {
        self.target_offset = target_offset;
        self.target_zoom = self.limits.clamp(target_zoom);
        self.glide = Some(Glide {
            from_offset: self.offset,
            from_zoom: self.zoom,
            duration_ms: duration_ms.max(0.0),
            started_at: None,
        });
    }

    pub fn snap_to(&mut self, offset: Point, zoom: f64) {
        self.offset = offset;
        self.zoom = self.limits.clamp(zoom);
        self.target_offset = self.offset;
        self.target_zoom = self.zoom;
        self.glide = None;
    }

    pub fn is_animating(&self) -> bool {
        self.glide.is_some()
    }
}

/// Camera target centring `cell` at `zoom` above a bottom panel of
/// `panel_height` pixels, raised by a further `margin`.
pub fn focus_target(
    layout: &GridLayout,
    cell: CellCoord,
    screen: ScreenSize,
    panel_height: f64,
    zoom: f64,
    margin: f64,
) -> (Point, f64) {
    let origin = layout.cell_origin(cell);
    let visible_height = screen.height - panel_height;
    let half_cell = layout.cell_size * zoom / 2.0;
    let offset = Point::new(
        screen.width / 2.0 - origin.x * zoom - half_cell,
        visible_height / 2.0 - origin.y * zoom - half_cell - margin,
    );
    (offset, zoom)
}

/// World origin at the screen centre.
pub fn default_target(screen: ScreenSize, zoom: f64) -> (Point, f64) {
    (screen.center(), zoom)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{default_target, focus_target, GridLayout, Point, ScreenSize, Viewport, ZoomLimits};
    use crate::cell_index::CellCoord;

    const LIMITS: ZoomLimits = ZoomLimits { min: 0.1, max: 5.0 };
    const LAYOUT: GridLayout = GridLayout {
        cell_size: 200.0,
        padding: 0.0,
        overscan: 2,
    };

    #[test]
    fn visible_range_includes_overscan() {
        let viewport = Viewport::new(Point::new(0.0, 0.0), 1.0, LIMITS);
        let range = viewport.visible_cell_range(&LAYOUT, ScreenSize::new(800.0, 600.0));
        assert_eq!((range.start_col, range.end_col), (-2, 6));
        assert_eq!((range.start_row, range.end_row), (-2, 5));
        assert_eq!(range.len(), 8 * 7);
    }

    #[test]
    fn visible_range_tracks_offset_and_zoom() {
        let viewport = Viewport::new(Point::new(400.0, 300.0), 0.25, LIMITS);
        let range = viewport.visible_cell_range(&LAYOUT, ScreenSize::new(800.0, 600.0));
        assert_eq!(range.start_col, -8 - 2);
        assert_eq!(range.end_col, range.start_col + 16 + 4);
        assert!(range.contains(CellCoord::new(0, 0)));
    }

    #[test]
    fn cell_hit_test_inverts_transform() {
        let viewport = Viewport::new(Point::new(400.0, 300.0), 0.5, LIMITS);
        assert_eq!(viewport.cell_at(&LAYOUT, Point::new(401.0, 301.0)), CellCoord::new(0, 0));
        assert_eq!(viewport.cell_at(&LAYOUT, Point::new(399.0, 299.0)), CellCoord::new(-1, -1));
        assert_eq!(viewport.cell_at(&LAYOUT, Point::new(400.0 + 150.0, 300.0)), CellCoord::new(0, 1));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut viewport = Viewport::new(Point::default(), 1.0, LIMITS);
        viewport.zoom_at(Point::new(10.0, 10.0), 100.0);
        assert_eq!(viewport.zoom, 5.0);
        viewport.zoom_at(Point::new(10.0, 10.0), 0.0001);
        assert_eq!(viewport.zoom, 0.1);
        assert_eq!(viewport.target_zoom, 0.1);
    }

    #[test]
    fn pan_moves_target_and_glide() {
        let mut viewport = Viewport::new(Point::default(), 1.0, LIMITS);
        viewport.animate_to(Point::new(100.0, 100.0), 2.0, 1000.0);
        viewport.pan_by(5.0, -5.0);
        assert_eq!(viewport.offset, Point::new(5.0, -5.0));
        assert_eq!(viewport.target_offset, Point::new(105.0, 95.0));
        let glide = viewport.glide.expect("glide");
        assert_eq!(glide.from_offset, Point::new(5.0, -5.0));
    }

    #[test]
    fn focus_accounts_for_panel_and_margin() {
        let screen = ScreenSize::new(1000.0, 800.0);
        let (offset, zoom) = focus_target(&LAYOUT, CellCoord::new(2, 3), screen, 200.0, 0.5, 40.0);
        assert_eq!(zoom, 0.5);
        assert_eq!(offset.x, 500.0 - 600.0 * 0.5 - 50.0);
        assert_eq!(offset.y, 300.0 - 400.0 * 0.5 - 50.0 - 40.0);

        let (center, default_zoom) = default_target(screen, 0.25);
        assert_eq!(center, Point::new(500.0, 400.0));
        assert_eq!(default_zoom, 0.25);
    }

    proptest! {
        #[test]
        fn screen_world_round_trip(
            ox in -1e5f64..1e5, oy in -1e5f64..1e5, zoom in 0.1f64..5.0,
            px in -1e4f64..1e4, py in -1e4f64..1e4,
        ) {
            let viewport = Viewport::new(Point::new(ox, oy), zoom, LIMITS);
            let back = viewport.world_to_screen(viewport.screen_to_world(Point::new(px, py)));
            prop_assert!((back.x - px).abs() < 1e-6);
            prop_assert!((back.y - py).abs() < 1e-6);
        }

        #[test]
        fn zoom_keeps_anchor_fixed(
            ox in -1e4f64..1e4, oy in -1e4f64..1e4, zoom in 0.1f64..5.0,
            px in 0f64..2000.0, py in 0f64..2000.0, factor in 0.01f64..20.0,
        ) {
            let mut viewport = Viewport::new(Point::new(ox, oy), zoom, LIMITS);
            let anchor = Point::new(px, py);
            let before = viewport.screen_to_world(anchor);
            viewport.zoom_at(anchor, factor);
            let after = viewport.screen_to_world(anchor);
            prop_assert!((before.x - after.x).abs() < 1e-6 * (1.0 + before.x.abs()));
            prop_assert!((before.y - after.y).abs() < 1e-6 * (1.0 + before.y.abs()));
        }
    }
}
