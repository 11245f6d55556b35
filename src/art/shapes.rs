use std::collections::BTreeMap;
use std::f64::consts::TAU;

use serde::Serialize;

use super::{GenerationContext, Palette, Tier};
use crate::sketch::{Rgba, Sketch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Circles,
    Rectangles,
    Triangles,
    Lines,
    Stars,
    Polygons,
    Curves,
    Spirals,
}

impl ShapeKind {
    pub const ALL: [Self; 8] = [
        Self::Circles,
        Self::Rectangles,
        Self::Triangles,
        Self::Lines,
        Self::Stars,
        Self::Polygons,
        Self::Curves,
        Self::Spirals,
    ];
}

pub(super) struct ShapeTally {
    pub total: u32,
    pub counts: BTreeMap<ShapeKind, u32>,
}

pub(super) fn paint(
    sketch: &mut Sketch,
    ctx: &mut GenerationContext,
    palette: &Palette,
    tier: Tier,
) -> ShapeTally {
    let mut counts: BTreeMap<ShapeKind, u32> = ShapeKind::ALL.iter().map(|kind| (*kind, 0)).collect();
    let (min, max) = tier.shape_range();
    let total = ctx.stream.range(min, max).floor() as u32;
    let size = ctx.size;

    for _ in 0..total {
        let kind = ctx.stream.pick_array(&ShapeKind::ALL);
        let x = ctx.stream.below(size);
        let y = ctx.stream.below(size);
        let extent = ctx.stream.range(10.0, 100.0);
        let rgb = ctx.pick_color(palette);
        let fill = Rgba::new(rgb, ctx.stream.range(20.0, 100.0));

        *counts.entry(kind).or_default() += 1;

        match kind {
            ShapeKind::Circles => sketch.fill_ellipse(x, y, extent, extent, fill),
            ShapeKind::Rectangles => {
                let height = extent * ctx.stream.range(0.5, 1.5);
                sketch.fill_rect(x, y, extent, height, fill);
            }
            ShapeKind::Triangles => sketch.fill_polygon(
                &[(x, y), (x + extent, y), (x + extent / 2.0, y - extent)],
                fill,
            ),
            ShapeKind::Lines => {
                let weight = ctx.stream.range(1.0, 5.0);
                let dx = extent * ctx.stream.range(-1.0, 1.0);
                let dy = extent * ctx.stream.range(-1.0, 1.0);
                sketch.stroke_line((x, y), (x + dx, y + dy), Rgba::new(rgb, 50.0), weight);
            }
            ShapeKind::Stars => {
                let tips = ctx.stream.range(5.0, 8.0).floor() as usize;
                let vertices = tips * 2;
                let points: Vec<(f64, f64)> = (0..vertices)
                    .map(|i| {
                        let radius = if i % 2 == 0 { extent } else { extent * 0.4 };
                        let angle = i as f64 * TAU / vertices as f64;
                        (x + radius * angle.cos(), y + radius * angle.sin())
                    })
                    .collect();
                sketch.fill_polygon(&points, fill);
            }
            ShapeKind::Polygons => {
                let sides = ctx.stream.range(6.0, 10.0).floor() as usize;
                let points: Vec<(f64, f64)> = (0..sides)
                    .map(|i| {
                        let angle = i as f64 * TAU / sides as f64;
                        (x + extent * angle.cos(), y + extent * angle.sin())
                    })
                    .collect();
                sketch.fill_polygon(&points, fill);
            }
            ShapeKind::Curves => {
                let weight = ctx.stream.range(1.0, 4.0);
                let count = ctx.stream.range(3.0, 6.0).floor() as usize;
                let points: Vec<(f64, f64)> = (0..count)
                    .map(|_| {
                        let px = x + ctx.stream.range(-extent, extent);
                        let py = y + ctx.stream.range(-extent, extent);
                        (px, py)
                    })
                    .collect();
                sketch.stroke_curve(&points, Rgba::new(rgb, 150.0), weight);
            }
            ShapeKind::Spirals => {
                let weight = ctx.stream.range(1.0, 3.0);
                let turns = ctx.stream.range(2.0, 4.0);
                let spacing = extent / (turns * 10.0);
                let color = Rgba::new(rgb, 150.0);
                let mut angle = 0.0_f64;
                while angle < TAU * turns {
                    let radius = spacing * angle;
                    sketch.point(x + radius * angle.cos(), y + radius * angle.sin(), color, weight);
                    angle += 0.1;
                }
            }
        }
    }

    ShapeTally { total, counts }
}
