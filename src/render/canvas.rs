//! RGBA raster canvas with the drawing primitives the static renderer
//! needs: alpha-blended pixels, Bresenham lines, even-odd scanline polygon
//! fill, rectangles, and bitmap text.

use super::color::Rgb;
use super::font;
use anyhow::{Context, Result};
use image::{ImageFormat, Rgba, RgbaImage};
use std::path::Path;

/// A fixed-size drawing surface backed by an RGBA image buffer.
pub struct Canvas {
    pixels: RgbaImage,
}

impl Canvas {
    /// Create a canvas filled with a background color.
    pub fn new(width: u32, height: u32, background: Rgb) -> Self {
        let [r, g, b] = background;
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([r, g, b, 255])),
        }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Blend a color over the pixel at (x, y). Out-of-bounds writes are
    /// dropped so callers can draw clipped shapes without guarding.
    pub fn blend(&mut self, x: i64, y: i64, color: Rgb, alpha: f64) {
        if x < 0 || y < 0 || x >= self.width() as i64 || y >= self.height() as i64 {
            return;
        }
        let alpha = alpha.clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return;
        }

        let pixel = self.pixels.get_pixel_mut(x as u32, y as u32);
        for channel in 0..3 {
            let old = pixel.0[channel] as f64;
            let new = color[channel] as f64;
            pixel.0[channel] = (old + (new - old) * alpha).round() as u8;
        }
        pixel.0[3] = 255;
    }

    /// Opaque pixel write.
    pub fn set(&mut self, x: i64, y: i64, color: Rgb) {
        self.blend(x, y, color, 1.0);
    }

    /// Read a pixel as RGB; out of bounds returns black. Test hook.
    pub fn get(&self, x: u32, y: u32) -> Rgb {
        if x >= self.width() || y >= self.height() {
            return [0, 0, 0];
        }
        let p = self.pixels.get_pixel(x, y);
        [p.0[0], p.0[1], p.0[2]]
    }

    /// Bresenham line with square pen of `thickness` pixels.
    pub fn draw_line(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb, thickness: u32) {
        let (mut x, mut y) = (x0, y0);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;

        loop {
            self.stamp(x, y, color, thickness);
            if x == x1 && y == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x += sx;
            }
            if e2 <= dx {
                err += dx;
                y += sy;
            }
        }
    }

    fn stamp(&mut self, x: i64, y: i64, color: Rgb, thickness: u32) {
        if thickness <= 1 {
            self.set(x, y, color);
            return;
        }
        let r = thickness as i64 / 2;
        for oy in -r..=r {
            for ox in -r..=r {
                self.set(x + ox, y + oy, color);
            }
        }
    }

    /// Fill a polygon (rings in pixel space) by even-odd scanline.
    ///
    /// All rings participate in the crossing count, so interior rings cut
    /// holes exactly like the geometry predicates treat them.
    pub fn fill_polygon(&mut self, rings: &[Vec<(f64, f64)>], color: Rgb, alpha: f64) {
        let mut min_y = f64::INFINITY;
        let mut max_y = f64::NEG_INFINITY;
        for ring in rings {
            for &(_, y) in ring {
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
        if !min_y.is_finite() || !max_y.is_finite() {
            return;
        }

        let y_start = (min_y.floor().max(0.0)) as i64;
        let y_end = (max_y.ceil().min(self.height() as f64 - 1.0)) as i64;
        let mut crossings: Vec<f64> = Vec::new();

        for py in y_start..=y_end {
            // Sample at the pixel center to keep shared edges stable.
            let scan_y = py as f64 + 0.5;
            crossings.clear();

            for ring in rings {
                if ring.len() < 2 {
                    continue;
                }
                for w in ring.windows(2) {
                    let (x0, y0) = w[0];
                    let (x1, y1) = w[1];
                    if (y0 > scan_y) != (y1 > scan_y) {
                        let t = (scan_y - y0) / (y1 - y0);
                        crossings.push(x0 + t * (x1 - x0));
                    }
                }
            }

            crossings.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            for pair in crossings.chunks(2) {
                if pair.len() < 2 {
                    break;
                }
                let x_start = pair[0].round() as i64;
                let x_end = pair[1].round() as i64;
                for px in x_start..x_end {
                    self.blend(px, py, color, alpha);
                }
            }
        }
    }

    /// Stroke a polygon's rings.
    pub fn stroke_polygon(&mut self, rings: &[Vec<(f64, f64)>], color: Rgb, thickness: u32) {
        for ring in rings {
            for w in ring.windows(2) {
                let (x0, y0) = w[0];
                let (x1, y1) = w[1];
                self.draw_line(
                    x0.round() as i64,
                    y0.round() as i64,
                    x1.round() as i64,
                    y1.round() as i64,
                    color,
                    thickness,
                );
            }
        }
    }

    /// Axis-aligned filled rectangle.
    pub fn fill_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgb, alpha: f64) {
        for py in y..y + h as i64 {
            for px in x..x + w as i64 {
                self.blend(px, py, color, alpha);
            }
        }
    }

    /// Axis-aligned rectangle border.
    pub fn stroke_rect(&mut self, x: i64, y: i64, w: u32, h: u32, color: Rgb) {
        let (w, h) = (w as i64, h as i64);
        self.draw_line(x, y, x + w - 1, y, color, 1);
        self.draw_line(x, y + h - 1, x + w - 1, y + h - 1, color, 1);
        self.draw_line(x, y, x, y + h - 1, color, 1);
        self.draw_line(x + w - 1, y, x + w - 1, y + h - 1, color, 1);
    }

    /// Draw text with the embedded 5×7 font, top-left anchored.
    pub fn draw_text(&mut self, x: i64, y: i64, text: &str, color: Rgb, scale: u32) {
        let scale = scale.max(1);
        let mut cursor = x;
        for c in text.chars() {
            let rows = font::glyph(c);
            for (row_index, row) in rows.iter().enumerate() {
                for col in 0..font::GLYPH_WIDTH {
                    if row & (1 << (font::GLYPH_WIDTH - 1 - col)) != 0 {
                        let px = cursor + (col * scale) as i64;
                        let py = y + (row_index as u32 * scale) as i64;
                        self.fill_rect(px, py, scale, scale, color, 1.0);
                    }
                }
            }
            cursor += font::advance(scale) as i64;
        }
    }

    /// Centered text helper.
    pub fn draw_text_centered(&mut self, cx: i64, y: i64, text: &str, color: Rgb, scale: u32) {
        let half = font::text_width(text, scale) as i64 / 2;
        self.draw_text(cx - half, y, text, color, scale);
    }

    /// Encode the canvas as a PNG file.
    pub fn save_png(&self, path: &Path) -> Result<()> {
        self.pixels
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("Failed to write PNG: {}", path.display()))
    }
}
