use std::f64::consts::TAU;

use serde::Serialize;

use super::{GenerationContext, Palette};
use crate::sketch::{Rgba, Sketch};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackgroundStyle {
    Gradient,
    Noise,
    SubtleShapes,
    Concentric,
    GridPattern,
    WaveLines,
    DotMatrix,
    CrossHatch,
    Spiral,
    Mosaic,
    FlowField,
    CircuitBoard,
}

impl BackgroundStyle {
    pub const ALL: [Self; 12] = [
        Self::Gradient,
        Self::Noise,
        Self::SubtleShapes,
        Self::Concentric,
        Self::GridPattern,
        Self::WaveLines,
        Self::DotMatrix,
        Self::CrossHatch,
        Self::Spiral,
        Self::Mosaic,
        Self::FlowField,
        Self::CircuitBoard,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Gradient => "gradient",
            Self::Noise => "noise",
            Self::SubtleShapes => "subtle-shapes",
            Self::Concentric => "concentric",
            Self::GridPattern => "grid-pattern",
            Self::WaveLines => "wave-lines",
            Self::DotMatrix => "dot-matrix",
            Self::CrossHatch => "cross-hatch",
            Self::Spiral => "spiral",
            Self::Mosaic => "mosaic",
            Self::FlowField => "flow-field",
            Self::CircuitBoard => "circuit-board",
        }
    }
}

/// Picks a style, lays the solid base colour, then runs the style routine.
pub(super) fn paint(sketch: &mut Sketch, ctx: &mut GenerationContext, palette: &Palette) -> BackgroundStyle {
    let style = ctx.stream.pick_array(&BackgroundStyle::ALL);
    sketch.background(palette[0]);
    paint_style(sketch, ctx, palette, style);
    style
}

pub(super) fn paint_style(
    sketch: &mut Sketch,
    ctx: &mut GenerationContext,
    palette: &Palette,
    style: BackgroundStyle,
) {
    let size = ctx.size;
    match style {
        BackgroundStyle::Gradient => gradient(sketch, palette, size),
        BackgroundStyle::Noise => value_noise(sketch, ctx, palette),
        BackgroundStyle::SubtleShapes => {
            for _ in 0..500 {
                let x = ctx.stream.below(size);
                let y = ctx.stream.below(size);
                let diameter = ctx.stream.range(1.0, 10.0);
                let index = (ctx.stream.below(palette.len() as f64).floor() as usize).min(4);
                sketch.fill_ellipse(x, y, diameter, diameter, Rgba::new(palette[index], 100.0));
            }
        }
        BackgroundStyle::Concentric => {
            let max_radius = size * 1.5;
            let step = max_radius / 50.0;
            let mut diameter = max_radius;
            while diameter > 0.0 {
                let color = ctx.pick_color(palette);
                sketch.fill_ellipse(size / 2.0, size / 2.0, diameter, diameter, Rgba::new(color, 40.0));
                diameter -= step;
            }
        }
        BackgroundStyle::GridPattern => {
            let cell = ctx.stream.range(10.0, 30.0);
            for x in steps(0.0, size, cell) {
                for y in steps(0.0, size, cell) {
                    let color = ctx.pick_color(palette);
                    if ctx.stream.range(0.0, 1.0) > 0.5 {
                        sketch.fill_rect(x, y, cell * 0.9, cell * 0.9, Rgba::new(color, 200.0));
                    }
                }
            }
        }
        BackgroundStyle::WaveLines => {
            let amplitude = size / 10.0;
            let frequency = ctx.stream.range(0.001, 0.005);
            for y in steps(0.0, size, 5.0) {
                let color = ctx.pick_color(palette);
                let points: Vec<(f64, f64)> = steps(0.0, size, 2.0)
                    .map(|x| (x, y + (x * frequency + y * 0.01).sin() * amplitude))
                    .collect();
                sketch.stroke_polyline(&points, Rgba::new(color, 150.0), 2.0);
            }
        }
        BackgroundStyle::DotMatrix => {
            let spacing = ctx.stream.range(10.0, 20.0);
            for x in steps(spacing, size, spacing) {
                for y in steps(spacing, size, spacing) {
                    let color = ctx.pick_color(palette);
                    let diameter = ctx.stream.range(2.0, 6.0);
                    sketch.fill_ellipse(x, y, diameter, diameter, Rgba::new(color, 200.0));
                }
            }
        }
        BackgroundStyle::CrossHatch => {
            let spacing = ctx.stream.range(10.0, 20.0);
            let color = Rgba::new(ctx.pick_color(palette), 100.0);
            for i in steps(-size, size * 2.0, spacing) {
                sketch.stroke_line((i, 0.0), (i + size, size), color, 1.0);
            }
            for i in steps(-size, size * 2.0, spacing) {
                sketch.stroke_line((i, size), (i + size, 0.0), color, 1.0);
            }
        }
        BackgroundStyle::Spiral => {
            let _rotations = ctx.stream.range(3.0, 8.0);
            let spacing = ctx.stream.range(5.0, 15.0);
            let mut angle = 0.0_f64;
            let mut radius = 0.0_f64;
            while radius < size * 1.5 {
                let color = ctx.pick_color(palette);
                let weight = ctx.stream.range(1.0, 4.0);
                let x = size / 2.0 + radius * angle.cos();
                let y = size / 2.0 + radius * angle.sin();
                sketch.point(x, y, Rgba::new(color, 150.0), weight);
                angle += 0.1;
                radius += spacing / TAU;
            }
        }
        BackgroundStyle::Mosaic => mosaic(sketch, ctx, palette),
        BackgroundStyle::FlowField => {
            let cell = 20.0;
            for x in steps(0.0, size, cell) {
                for y in steps(0.0, size, cell) {
                    let angle = ctx.noise.sample2(x * 0.005, y * 0.005) * TAU * 4.0;
                    let length = cell * 0.8;
                    let color = ctx.pick_color(palette);
                    let weight = ctx.stream.range(1.0, 3.0);
                    sketch.stroke_line(
                        (x, y),
                        (x + angle.cos() * length, y + angle.sin() * length),
                        Rgba::new(color, 100.0),
                        weight,
                    );
                }
            }
        }
        BackgroundStyle::CircuitBoard => {
            let node = 8.0;
            let spacing = 40.0;
            for x in steps(spacing, size, spacing) {
                for y in steps(spacing, size, spacing) {
                    if ctx.stream.range(0.0, 1.0) >= 0.7 {
                        continue;
                    }
                    let color = ctx.pick_color(palette);
                    sketch.fill_ellipse(x, y, node, node, Rgba::new(color, 200.0));
                    let trace = Rgba::new(color, 150.0);
                    // Both connection rolls always consume the stream.
                    if ctx.stream.range(0.0, 1.0) < 0.5 && x < size - spacing {
                        sketch.stroke_line((x, y), (x + spacing, y), trace, 2.0);
                    }
                    if ctx.stream.range(0.0, 1.0) < 0.5 && y < size - spacing {
                        sketch.stroke_line((x, y), (x, y + spacing), trace, 2.0);
                    }
                }
            }
        }
    }
}

fn gradient(sketch: &mut Sketch, palette: &Palette, size: f64) {
    let top = palette[0];
    let bottom = palette[palette.len() - 1];
    for y in steps(0.0, size, 1.0) {
        let t = y / size;
        let rgb = [
            lerp_channel(top[0], bottom[0], t),
            lerp_channel(top[1], bottom[1], t),
            lerp_channel(top[2], bottom[2], t),
        ];
        sketch.fill_rect(0.0, y, size, 1.0, Rgba::opaque(rgb));
    }
}

fn value_noise(sketch: &mut Sketch, ctx: &GenerationContext, palette: &Palette) {
    let side = ctx.size as u32;
    for x in 0..side {
        for y in 0..side {
            let value = ctx.noise.sample2(f64::from(x) * 0.01, f64::from(y) * 0.01);
            let index = ((value * palette.len() as f64).floor() as usize).min(palette.len() - 1);
            sketch.set_pixel(x, y, palette[index]);
        }
    }
}

fn mosaic(sketch: &mut Sketch, ctx: &mut GenerationContext, palette: &Palette) {
    let size = ctx.size;
    let tile = ctx.stream.range(10.0, 30.0);
    for x in steps(0.0, size, tile) {
        for y in steps(0.0, size, tile) {
            let color = Rgba::new(ctx.pick_color(palette), 200.0);
            if ctx.stream.range(0.0, 1.0) < 0.5 {
                if ctx.stream.range(0.0, 1.0) < 0.5 {
                    sketch.fill_polygon(&[(x, y), (x + tile, y), (x, y + tile)], color);
                    sketch.fill_polygon(&[(x + tile, y + tile), (x + tile, y), (x, y + tile)], color);
                } else {
                    sketch.fill_polygon(&[(x, y), (x + tile, y), (x + tile, y + tile)], color);
                    sketch.fill_polygon(&[(x, y), (x, y + tile), (x + tile, y + tile)], color);
                }
            } else if ctx.stream.range(0.0, 1.0) < 0.3 {
                let second = Rgba::new(ctx.pick_color(palette), 200.0);
                let half = tile / 2.0;
                sketch.fill_rect(x, y, half, half, color);
                sketch.fill_rect(x + half, y + half, half, half, second);
            } else {
                sketch.fill_rect(x, y, tile, tile, color);
            }
        }
    }
}

fn lerp_channel(a: u8, b: u8, t: f64) -> u8 {
    (f64::from(a) + (f64::from(b) - f64::from(a)) * t).round().clamp(0.0, 255.0) as u8
}

/// `start, start + step, ...` while below `end`.
fn steps(start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> {
    let step = if step > 0.0 { step } else { 1.0 };
    std::iter::successors(Some(start), move |value| Some(value + step)).take_while(move |value| *value < end)
}

#[cfg(test)]
mod tests {
    use super::{paint_style, steps, BackgroundStyle};
    use crate::art::{GenerationContext, PALETTES};
    use crate::sketch::Sketch;

    #[test]
    fn steps_covers_half_open_range() {
        let values: Vec<f64> = steps(0.0, 10.0, 2.5).collect();
        assert_eq!(values, vec![0.0, 2.5, 5.0, 7.5]);
    }

    #[test]
    fn every_style_is_deterministic() {
        for style in BackgroundStyle::ALL {
            let render = || {
                let mut ctx = GenerationContext::new("background", 48);
                let mut sketch = Sketch::new(48).expect("sketch");
                sketch.background(PALETTES[1][0]);
                paint_style(&mut sketch, &mut ctx, &PALETTES[1], style);
                sketch.into_pixmap().data().to_vec()
            };
            assert_eq!(render(), render(), "{} is not deterministic", style.keyword());
        }
    }

    #[test]
    fn keywords_are_unique() {
        let mut keywords: Vec<&str> = BackgroundStyle::ALL.iter().map(|s| s.keyword()).collect();
        keywords.sort_unstable();
        keywords.dedup();
        assert_eq!(keywords.len(), 12);
    }
}
