//! Immediate-mode drawing surface for art generation.
//!
//! Every call carries its own colour and stroke settings; there is no hidden
//! "current style" between calls.

use anyhow::{anyhow, Context, Result};
use image::RgbaImage;
use tiny_skia::{
    Color, FillRule, LineCap, LineJoin, Paint, Path, PathBuilder, Pixmap, PremultipliedColorU8,
    Rect, Stroke, Transform,
};

pub type Rgb = [u8; 3];

/// An RGB colour with an alpha in the 0..=255 range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub rgb: Rgb,
    pub alpha: f64,
}

impl Rgba {
    pub fn new(rgb: Rgb, alpha: f64) -> Self {
        Self { rgb, alpha }
    }

    pub fn opaque(rgb: Rgb) -> Self {
        Self::new(rgb, 255.0)
    }

    fn to_color(self) -> Color {
        let alpha = self.alpha.clamp(0.0, 255.0).round() as u8;
        Color::from_rgba8(self.rgb[0], self.rgb[1], self.rgb[2], alpha)
    }
}

pub struct Sketch {
    pixmap: Pixmap,
}

impl Sketch {
    pub fn new(size: u32) -> Result<Self> {
        let side = size.max(1);
        let pixmap =
            Pixmap::new(side, side).ok_or_else(|| anyhow!("failed to create {side}x{side} pixmap"))?;
        Ok(Self { pixmap })
    }

    pub fn background(&mut self, rgb: Rgb) {
        self.pixmap.fill(Rgba::opaque(rgb).to_color());
    }

    /// Writes an opaque pixel directly, bypassing blending.
    pub fn set_pixel(&mut self, x: u32, y: u32, rgb: Rgb) {
        let width = self.pixmap.width();
        if x >= width || y >= self.pixmap.height() {
            return;
        }
        let index = (y * width + x) as usize;
        if let Some(pixel) = PremultipliedColorU8::from_rgba(rgb[0], rgb[1], rgb[2], 255) {
            self.pixmap.pixels_mut()[index] = pixel;
        }
    }

    /// Ellipse centred on `(cx, cy)` with the given diameters.
    pub fn fill_ellipse(&mut self, cx: f64, cy: f64, width: f64, height: f64, color: Rgba) {
        let rect = Rect::from_xywh(
            (cx - width.abs() / 2.0) as f32,
            (cy - height.abs() / 2.0) as f32,
            width.abs() as f32,
            height.abs() as f32,
        );
        if let Some(path) = rect.and_then(PathBuilder::from_oval) {
            self.fill(&path, color);
        }
    }

    /// Rectangle from its top-left corner. Negative extents flip the corner.
    pub fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        let (left, right) = ordered(x, x + width);
        let (top, bottom) = ordered(y, y + height);
        if let Some(rect) = Rect::from_ltrb(left as f32, top as f32, right as f32, bottom as f32) {
            let path = PathBuilder::from_rect(rect);
            self.fill(&path, color);
        }
    }

    pub fn fill_polygon(&mut self, points: &[(f64, f64)], color: Rgba) {
        if let Some(path) = polygon_path(points, true) {
            self.fill(&path, color);
        }
    }

    pub fn stroke_line(&mut self, from: (f64, f64), to: (f64, f64), color: Rgba, weight: f64) {
        if let Some(path) = polygon_path(&[from, to], false) {
            self.stroke(&path, color, weight);
        }
    }

    pub fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Rgba, weight: f64) {
        if let Some(path) = polygon_path(points, false) {
            self.stroke(&path, color, weight);
        }
    }

    /// Catmull-Rom spline through `points[1..len-1]`; the first and last
    /// points only steer the ends. Fewer than four points draws nothing.
    pub fn stroke_curve(&mut self, points: &[(f64, f64)], color: Rgba, weight: f64) {
        if points.len() < 4 {
            return;
        }
        let mut builder = PathBuilder::new();
        builder.move_to(points[1].0 as f32, points[1].1 as f32);
        for window in points.windows(4) {
            let (p0, p1, p2, p3) = (window[0], window[1], window[2], window[3]);
            let c1 = (p1.0 + (p2.0 - p0.0) / 6.0, p1.1 + (p2.1 - p0.1) / 6.0);
            let c2 = (p2.0 - (p3.0 - p1.0) / 6.0, p2.1 - (p3.1 - p1.1) / 6.0);
            builder.cubic_to(
                c1.0 as f32,
                c1.1 as f32,
                c2.0 as f32,
                c2.1 as f32,
                p2.0 as f32,
                p2.1 as f32,
            );
        }
        if let Some(path) = builder.finish() {
            self.stroke(&path, color, weight);
        }
    }

    /// A round dot whose diameter is the stroke weight.
    pub fn point(&mut self, x: f64, y: f64, color: Rgba, weight: f64) {
        let radius = (weight.max(1.0) / 2.0) as f32;
        if let Some(path) = PathBuilder::from_circle(x as f32, y as f32, radius) {
            self.fill(&path, color);
        }
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    fn fill(&mut self, path: &Path, color: Rgba) {
        let mut paint = Paint::default();
        paint.set_color(color.to_color());
        paint.anti_alias = true;
        self.pixmap
            .fill_path(path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn stroke(&mut self, path: &Path, color: Rgba, weight: f64) {
        let mut paint = Paint::default();
        paint.set_color(color.to_color());
        paint.anti_alias = true;
        let stroke = Stroke {
            width: weight.max(0.1) as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(path, &paint, &stroke, Transform::identity(), None);
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

fn polygon_path(points: &[(f64, f64)], close: bool) -> Option<Path> {
    let (first, rest) = points.split_first()?;
    let mut builder = PathBuilder::new();
    builder.move_to(first.0 as f32, first.1 as f32);
    for point in rest {
        builder.line_to(point.0 as f32, point.1 as f32);
    }
    if close {
        builder.close();
    }
    builder.finish()
}

/// Straight (non-premultiplied) RGBA copy of a pixmap.
pub fn pixmap_to_rgba_image(pixmap: &Pixmap) -> Result<RgbaImage> {
    let mut rgba = Vec::with_capacity(pixmap.pixels().len() * 4);
    for pixel in pixmap.pixels() {
        let color = pixel.demultiply();
        rgba.extend_from_slice(&[color.red(), color.green(), color.blue(), color.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), rgba)
        .ok_or_else(|| anyhow!("pixmap buffer does not match its dimensions"))
}

pub fn save_png(pixmap: &Pixmap, path: &std::path::Path) -> Result<()> {
    pixmap_to_rgba_image(pixmap)?
        .save(path)
        .with_context(|| format!("failed to write PNG {}", path.display()))
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{pixmap_to_rgba_image, Rgba, Sketch};

    #[test]
    fn background_fills_every_pixel() {
        let mut sketch = Sketch::new(8).expect("sketch");
        sketch.background([10, 20, 30]);
        let image = pixmap_to_rgba_image(&sketch.into_pixmap()).expect("image");
        assert!(image.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn set_pixel_ignores_out_of_bounds() {
        let mut sketch = Sketch::new(4).expect("sketch");
        sketch.set_pixel(9, 9, [255, 0, 0]);
        sketch.set_pixel(1, 2, [255, 0, 0]);
        let image = pixmap_to_rgba_image(&sketch.into_pixmap()).expect("image");
        assert_eq!(image.get_pixel(1, 2).0, [255, 0, 0, 255]);
    }

    #[test]
    fn curve_needs_four_points() {
        let mut sketch = Sketch::new(16).expect("sketch");
        sketch.stroke_curve(&[(0.0, 0.0), (8.0, 8.0), (16.0, 0.0)], Rgba::opaque([255; 3]), 2.0);
        assert!(sketch.into_pixmap().pixels().iter().all(|p| p.alpha() == 0));
    }

    #[test]
    fn translucent_fill_blends() {
        let mut sketch = Sketch::new(10).expect("sketch");
        sketch.background([0, 0, 0]);
        sketch.fill_rect(0.0, 0.0, 10.0, 10.0, Rgba::new([255, 255, 255], 127.5));
        let image = pixmap_to_rgba_image(&sketch.into_pixmap()).expect("image");
        let value = image.get_pixel(5, 5).0[0];
        assert!((120..=135).contains(&value), "got {value}");
    }
}
