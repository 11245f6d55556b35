//! CPU compositor for the infinite grid.
//!
//! One call draws one frame: clear, then every visible cell's cached image
//! under the viewport transform, with hover/selection effects applied on top.

use std::f64::consts::PI;

use anyhow::{anyhow, bail, Result};
use serde::Serialize;
use tiny_skia::{
    Color, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, Transform,
};
use tracing::{trace, warn};

use crate::animation::CellAnimations;
use crate::cache::ImageCache;
use crate::cell_index::{CellCoord, HashPool};
use crate::sketch::Rgb;
use crate::viewport::{GridLayout, ScreenSize, Viewport};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStyle {
    pub background: Rgb,
    pub outline: Rgb,
    /// Selection outline width in world units.
    pub outline_width: f64,
    /// Peak hover rotation in radians.
    pub wobble_amplitude: f64,
    pub wobble_period_ms: f64,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            background: [0, 0, 0],
            outline: [255, 255, 255],
            outline_width: 5.0,
            wobble_amplitude: 0.01,
            wobble_period_ms: 1000.0,
        }
    }
}

/// Everything a frame reads. Nothing here is mutated by drawing.
pub struct FrameInputs<'a> {
    pub viewport: &'a Viewport,
    pub layout: &'a GridLayout,
    pub pool: &'a HashPool,
    pub cache: &'a ImageCache,
    pub animations: &'a CellAnimations,
    pub selected: Option<CellCoord>,
    pub now_ms: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FrameReport {
    pub visible: usize,
    pub drawn: usize,
    pub missing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GridRenderer {
    pub style: RenderStyle,
}

impl GridRenderer {
    pub fn new(style: RenderStyle) -> Self {
        Self { style }
    }

    pub fn render_frame(&self, pixmap: &mut Pixmap, frame: &FrameInputs<'_>) -> FrameReport {
        let [r, g, b] = self.style.background;
        pixmap.fill(Color::from_rgba8(r, g, b, 255));

        let mut report = FrameReport::default();
        if frame.pool.is_empty() {
            return report;
        }

        let screen = ScreenSize::new(f64::from(pixmap.width()), f64::from(pixmap.height()));
        let range = frame.viewport.visible_cell_range(frame.layout, screen);

        let mut cells: Vec<CellCoord> = range.cells().collect();
        report.visible = cells.len();
        paint_order(&mut cells, frame.animations, frame.selected);

        for cell in cells {
            let Some(hash) = frame.pool.hash_at(cell) else {
                continue;
            };
            let Some(art) = frame.cache.get(hash) else {
                warn!(hash, row = cell.row, col = cell.col, "art not cached; skipping cell");
                report.missing += 1;
                continue;
            };

            match self.draw_cell(pixmap, frame, cell, art.image.pixmap()) {
                Ok(()) => report.drawn += 1,
                Err(err) => {
                    warn!(hash, row = cell.row, col = cell.col, "failed to draw cell: {err:#}");
                    report.failed += 1;
                }
            }
        }

        trace!(
            visible = report.visible,
            drawn = report.drawn,
            missing = report.missing,
            failed = report.failed,
            "frame composed"
        );
        report
    }

    /// Allocates a pixmap of `screen` size and renders into it.
    pub fn render_to_pixmap(&self, screen: ScreenSize, frame: &FrameInputs<'_>) -> Result<(Pixmap, FrameReport)> {
        let width = screen.width.round().max(1.0) as u32;
        let height = screen.height.round().max(1.0) as u32;
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| anyhow!("failed to create {width}x{height} frame"))?;
        let report = self.render_frame(&mut pixmap, frame);
        Ok((pixmap, report))
    }

    fn draw_cell(
        &self,
        pixmap: &mut Pixmap,
        frame: &FrameInputs<'_>,
        cell: CellCoord,
        image: &Pixmap,
    ) -> Result<()> {
        let record = frame.animations.get(cell);
        let (scale, opacity) = match record {
            Some(record) => (record.scale, record.opacity),
            None => (1.0, frame.animations.style().base_opacity),
        };
        let hovered = frame.animations.hovered() == Some(cell);
        let rotation = match record {
            Some(record) if hovered && !record.is_exiting() => self.wobble(frame.now_ms),
            _ => 0.0,
        };

        let base = Transform::from_row(
            frame.viewport.zoom as f32,
            0.0,
            0.0,
            frame.viewport.zoom as f32,
            frame.viewport.offset.x as f32,
            frame.viewport.offset.y as f32,
        );
        let transform = self.cell_transform(base, frame.layout, cell, scale, rotation);
        if !transform.is_finite() {
            bail!("non-finite cell transform");
        }

        let fit = (frame.layout.cell_size / f64::from(image.width().max(1))) as f32;
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0) as f32,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(0, 0, image.as_ref(), &paint, transform.pre_scale(fit, fit), None);

        if frame.selected == Some(cell) {
            self.outline(pixmap, frame.layout, transform, opacity)?;
        }
        Ok(())
    }

    fn wobble(&self, now_ms: f64) -> f64 {
        if self.style.wobble_period_ms <= 0.0 {
            return 0.0;
        }
        self.style.wobble_amplitude * (now_ms / self.style.wobble_period_ms).sin()
    }

    /// Maps `[0, cell_size]²` onto the cell, scaled and rotated about its centre.
    fn cell_transform(
        &self,
        base: Transform,
        layout: &GridLayout,
        cell: CellCoord,
        scale: f64,
        rotation: f64,
    ) -> Transform {
        let center = layout.cell_center(cell);
        let half = (layout.cell_size / 2.0) as f32;
        let mut transform = base.pre_translate(center.x as f32, center.y as f32);
        if rotation != 0.0 {
            transform = transform.pre_concat(Transform::from_rotate((rotation * 180.0 / PI) as f32));
        }
        transform
            .pre_scale(scale as f32, scale as f32)
            .pre_translate(-half, -half)
    }

    fn outline(
        &self,
        pixmap: &mut Pixmap,
        layout: &GridLayout,
        transform: Transform,
        opacity: f64,
    ) -> Result<()> {
        let side = layout.cell_size as f32;
        let rect = Rect::from_xywh(0.0, 0.0, side, side)
            .ok_or_else(|| anyhow!("invalid outline rect for cell size {side}"))?;
        let path = PathBuilder::from_rect(rect);
        let [r, g, b] = self.style.outline;
        let alpha = (opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
        let mut paint = Paint::default();
        paint.set_color_rgba8(r, g, b, alpha);
        paint.anti_alias = true;
        let stroke = Stroke {
            width: self.style.outline_width as f32,
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, transform, None);
        Ok(())
    }
}

/// Plain cells first, then animated ones, selection last. Stable, so
/// row-major order holds within each group.
pub(crate) fn paint_order(cells: &mut [CellCoord], animations: &CellAnimations, selected: Option<CellCoord>) {
    cells.sort_by_key(|cell| (animations.get(*cell).is_some(), selected == Some(*cell)));
}
