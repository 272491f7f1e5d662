//! Static choropleth rendering.
//!
//! A [`StaticMap`] accumulates typed layers and map furniture, then
//! rasterizes everything in one pass: fills first, outlines on top,
//! gridlines, colorbar, legend, title. Layer tables may arrive in either
//! CRS; they are reprojected onto the Mercator plane when added so the
//! final pass only does pixel math.

use crate::geometry::crs::{reproject, wgs84_to_mercator, mercator_to_wgs84};
use crate::geometry::{geometry_bbox, BoundingBox};
use crate::models::{Crs, DataError, FeatureTable, Geometry};
use crate::render::canvas::Canvas;
use crate::render::color::{Colormap, Normalize, Rgb};
use crate::render::font;
use anyhow::{anyhow, Result};
use geo_types::Polygon;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::debug;

const FRAME_COLOR: Rgb = [60, 60, 60];
const TEXT_COLOR: Rgb = [30, 30, 30];
const GRID_DEFAULT_COLOR: Rgb = [160, 160, 160];
const MISSING_FILL: Rgb = [200, 200, 200];
const BACKGROUND: Rgb = [255, 255, 255];
const COLORBAR_GUTTER: u32 = 86;
const COLORBAR_WIDTH: u32 = 18;

/// Gridline positions and label placement.
///
/// Labels default to the left and bottom sides, matching the usual framed
/// map layout where the top and right stay clean.
#[derive(Debug, Clone)]
pub struct GridSpec {
    /// Tick spacing in degrees, used for both axes.
    pub spacing_deg: f64,
    pub color: Rgb,
    pub labels_left: bool,
    pub labels_bottom: bool,
    pub labels_top: bool,
    pub labels_right: bool,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            spacing_deg: 0.5,
            color: GRID_DEFAULT_COLOR,
            labels_left: true,
            labels_bottom: true,
            labels_top: false,
            labels_right: false,
        }
    }
}

/// A manual legend entry.
#[derive(Debug, Clone)]
pub struct LegendEntry {
    pub label: String,
    pub swatch: Swatch,
}

/// How a legend entry's sample patch is drawn.
#[derive(Debug, Clone, Copy)]
pub enum Swatch {
    Fill(Rgb),
    Outline(Rgb),
}

enum StaticLayer {
    Fill {
        table: FeatureTable,
        value_col: String,
        colormap: Colormap,
        norm: Normalize,
        opacity: f64,
    },
    Outline {
        table: FeatureTable,
        color: Rgb,
        thickness: u32,
    },
}

/// A static map under construction: layers and furniture accumulate, and
/// [`StaticMap::render`] draws the whole stack once, in call order.
pub struct StaticMap {
    width: u32,
    height: u32,
    margin: u32,
    title: Option<String>,
    layers: Vec<StaticLayer>,
    grid: Option<GridSpec>,
    colorbar_caption: Option<String>,
    legend: Vec<LegendEntry>,
    show_progress: bool,
}

impl StaticMap {
    /// A map canvas of the given pixel size.
    pub fn new(width: u32, height: u32, margin: u32) -> Self {
        Self {
            width,
            height,
            margin,
            title: None,
            layers: Vec::new(),
            grid: None,
            colorbar_caption: None,
            legend: Vec::new(),
            show_progress: true,
        }
    }

    /// Disable the progress bar (tests, quiet mode).
    pub fn quiet(mut self) -> Self {
        self.show_progress = false;
        self
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Add a choropleth fill layer colored by `value_col` through the
    /// colormap with an explicit, clamping value range.
    pub fn add_fill_layer(
        &mut self,
        table: &FeatureTable,
        value_col: &str,
        colormap: Colormap,
        norm: Normalize,
        opacity: f64,
    ) -> Result<(), DataError> {
        table.require_column("fill layer", value_col)?;
        if table.geometry_count() == 0 {
            return Err(DataError::NoGeometry {
                table: "fill layer".to_string(),
            });
        }
        self.layers.push(StaticLayer::Fill {
            table: reproject(table, Crs::WebMercator)?,
            value_col: value_col.to_string(),
            colormap,
            norm,
            opacity: opacity.clamp(0.0, 1.0),
        });
        Ok(())
    }

    /// Add an unfilled outline layer, optionally with a legend entry.
    pub fn add_outline_layer(
        &mut self,
        table: &FeatureTable,
        color: Rgb,
        thickness: u32,
        legend_label: Option<&str>,
    ) -> Result<(), DataError> {
        if table.geometry_count() == 0 {
            return Err(DataError::NoGeometry {
                table: "outline layer".to_string(),
            });
        }
        self.layers.push(StaticLayer::Outline {
            table: reproject(table, Crs::WebMercator)?,
            color,
            thickness: thickness.max(1),
        });
        if let Some(label) = legend_label {
            self.legend.push(LegendEntry {
                label: label.to_string(),
                swatch: Swatch::Outline(color),
            });
        }
        Ok(())
    }

    pub fn set_gridlines(&mut self, grid: GridSpec) {
        self.grid = Some(grid);
    }

    /// Attach a colorbar describing the first fill layer's range.
    pub fn set_colorbar(&mut self, caption: &str) {
        self.colorbar_caption = Some(caption.to_string());
    }

    pub fn add_legend_entry(&mut self, entry: LegendEntry) {
        self.legend.push(entry);
    }

    /// Rasterize all layers and furniture and write a PNG.
    pub fn render(&self, path: &Path) -> Result<()> {
        let canvas = self.render_to_canvas()?;
        canvas.save_png(path)
    }

    /// Rasterize into an in-memory canvas (exposed for tests).
    pub fn render_to_canvas(&self) -> Result<Canvas> {
        if self.layers.is_empty() {
            return Err(anyhow!("static map has no layers to draw"));
        }

        let bbox = self.data_bbox();
        if bbox.is_empty() {
            return Err(anyhow!("static map layers contain no geometry"));
        }
        let frame = self.plot_frame();
        let projector = Projector::fit(&bbox, &frame);

        let mut canvas = Canvas::new(self.width, self.height, BACKGROUND);

        let total: u64 = self
            .layers
            .iter()
            .map(|layer| match layer {
                StaticLayer::Fill { table, .. } => table.len() as u64,
                StaticLayer::Outline { table, .. } => table.len() as u64,
            })
            .sum();
        let progress = if self.show_progress {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("{msg} [{bar:40.cyan/blue}] {pos}/{len}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("=>-"),
            );
            bar.set_message("Rasterizing");
            Some(bar)
        } else {
            None
        };

        for layer in &self.layers {
            match layer {
                StaticLayer::Fill {
                    table,
                    value_col,
                    colormap,
                    norm,
                    opacity,
                } => {
                    for feature in &table.features {
                        if let Some(ref geometry) = feature.geometry {
                            let color = match feature.number(value_col) {
                                Some(v) => colormap.sample(norm.position(v)),
                                None => MISSING_FILL,
                            };
                            fill_geometry(&mut canvas, geometry, &projector, color, *opacity);
                        }
                        if let Some(ref bar) = progress {
                            bar.inc(1);
                        }
                    }
                }
                StaticLayer::Outline {
                    table,
                    color,
                    thickness,
                } => {
                    for feature in &table.features {
                        if let Some(ref geometry) = feature.geometry {
                            stroke_geometry(&mut canvas, geometry, &projector, *color, *thickness);
                        }
                        if let Some(ref bar) = progress {
                            bar.inc(1);
                        }
                    }
                }
            }
        }
        if let Some(bar) = progress {
            bar.finish_and_clear();
        }

        if let Some(ref grid) = self.grid {
            self.draw_gridlines(&mut canvas, grid, &bbox, &frame, &projector);
        }

        canvas.stroke_rect(
            frame.x as i64,
            frame.y as i64,
            frame.w,
            frame.h,
            FRAME_COLOR,
        );

        if self.colorbar_caption.is_some() {
            self.draw_colorbar(&mut canvas, &frame);
        }
        if !self.legend.is_empty() {
            self.draw_legend(&mut canvas, &frame);
        }
        if let Some(ref title) = self.title {
            canvas.draw_text_centered(
                (self.width / 2) as i64,
                (self.margin / 2).saturating_sub(7) as i64,
                title,
                TEXT_COLOR,
                2,
            );
        }

        debug!("rendered {}x{} static map", self.width, self.height);
        Ok(canvas)
    }

    fn data_bbox(&self) -> BoundingBox {
        let mut bbox = BoundingBox::empty();
        for layer in &self.layers {
            let table = match layer {
                StaticLayer::Fill { table, .. } => table,
                StaticLayer::Outline { table, .. } => table,
            };
            for feature in &table.features {
                if let Some(ref geometry) = feature.geometry {
                    bbox.merge(&geometry_bbox(geometry));
                }
            }
        }
        bbox
    }

    fn plot_frame(&self) -> Frame {
        let gutter = if self.colorbar_caption.is_some() {
            COLORBAR_GUTTER
        } else {
            0
        };
        let top_extra = if self.title.is_some() { 10 } else { 0 };
        Frame {
            x: self.margin,
            y: self.margin + top_extra,
            w: self.width.saturating_sub(2 * self.margin + gutter).max(1),
            h: self
                .height
                .saturating_sub(2 * self.margin + top_extra)
                .max(1),
        }
    }

    fn draw_gridlines(
        &self,
        canvas: &mut Canvas,
        grid: &GridSpec,
        bbox: &BoundingBox,
        frame: &Frame,
        projector: &Projector,
    ) {
        let (lon_min, lat_min) = mercator_to_wgs84(bbox.min_x, bbox.min_y);
        let (lon_max, lat_max) = mercator_to_wgs84(bbox.max_x, bbox.max_y);
        let decimals: usize = if grid.spacing_deg >= 1.0 {
            0
        } else if grid.spacing_deg >= 0.1 {
            1
        } else {
            2
        };

        for lon in ticks(lon_min, lon_max, grid.spacing_deg) {
            let (mx, _) = wgs84_to_mercator(lon, 0.0);
            let (px, _) = projector.project(mx, bbox.min_y);
            let px = px.round() as i64;
            canvas.draw_line(
                px,
                frame.y as i64,
                px,
                (frame.y + frame.h) as i64,
                grid.color,
                1,
            );

            let label = format!("{:.decimals$}°", lon);
            if grid.labels_bottom {
                canvas.draw_text_centered(
                    px,
                    (frame.y + frame.h) as i64 + 6,
                    &label,
                    TEXT_COLOR,
                    1,
                );
            }
            if grid.labels_top {
                canvas.draw_text_centered(
                    px,
                    frame.y as i64 - (font::GLYPH_HEIGHT as i64) - 4,
                    &label,
                    TEXT_COLOR,
                    1,
                );
            }
        }

        for lat in ticks(lat_min, lat_max, grid.spacing_deg) {
            let (_, my) = wgs84_to_mercator(0.0, lat);
            let (_, py) = projector.project(bbox.min_x, my);
            let py = py.round() as i64;
            canvas.draw_line(
                frame.x as i64,
                py,
                (frame.x + frame.w) as i64,
                py,
                grid.color,
                1,
            );

            let label = format!("{:.decimals$}°", lat);
            let text_y = py - (font::GLYPH_HEIGHT as i64) / 2;
            if grid.labels_left {
                let width = font::text_width(&label, 1) as i64;
                canvas.draw_text(frame.x as i64 - width - 6, text_y, &label, TEXT_COLOR, 1);
            }
            if grid.labels_right {
                canvas.draw_text(
                    (frame.x + frame.w) as i64 + 6,
                    text_y,
                    &label,
                    TEXT_COLOR,
                    1,
                );
            }
        }
    }

    fn first_fill(&self) -> Option<(&Colormap, &Normalize)> {
        self.layers.iter().find_map(|layer| match layer {
            StaticLayer::Fill { colormap, norm, .. } => Some((colormap, norm)),
            _ => None,
        })
    }

    fn draw_colorbar(&self, canvas: &mut Canvas, frame: &Frame) {
        let Some((colormap, norm)) = self.first_fill() else {
            return;
        };
        let caption = self.colorbar_caption.as_deref().unwrap_or_default();

        let bar_x = (frame.x + frame.w + 28) as i64;
        let bar_y = frame.y as i64;
        let bar_h = frame.h;

        for row in 0..bar_h {
            let t = 1.0 - row as f64 / (bar_h.max(2) - 1) as f64;
            let color = colormap.sample(t);
            for col in 0..COLORBAR_WIDTH {
                canvas.set(bar_x + col as i64, bar_y + row as i64, color);
            }
        }
        canvas.stroke_rect(bar_x - 1, bar_y - 1, COLORBAR_WIDTH + 2, bar_h + 2, FRAME_COLOR);

        let label_x = bar_x + COLORBAR_WIDTH as i64 + 5;
        canvas.draw_text(
            label_x,
            bar_y,
            &format_value(norm.vmax),
            TEXT_COLOR,
            1,
        );
        canvas.draw_text(
            label_x,
            bar_y + bar_h as i64 - font::GLYPH_HEIGHT as i64,
            &format_value(norm.vmin),
            TEXT_COLOR,
            1,
        );
        canvas.draw_text_centered(
            bar_x + (COLORBAR_WIDTH / 2) as i64,
            bar_y - (font::GLYPH_HEIGHT as i64) - 6,
            caption,
            TEXT_COLOR,
            1,
        );
    }

    fn draw_legend(&self, canvas: &mut Canvas, frame: &Frame) {
        const SWATCH: u32 = 14;
        const PAD: i64 = 8;
        let row_h = (SWATCH as i64).max(font::GLYPH_HEIGHT as i64) + 6;

        let text_w = self
            .legend
            .iter()
            .map(|e| font::text_width(&e.label, 1))
            .max()
            .unwrap_or(0) as i64;
        let box_w = PAD + SWATCH as i64 + 6 + text_w + PAD;
        let box_h = PAD + row_h * self.legend.len() as i64 + PAD / 2;

        let box_x = (frame.x + frame.w) as i64 - box_w - 10;
        let box_y = frame.y as i64 + 10;

        canvas.fill_rect(box_x, box_y, box_w as u32, box_h as u32, BACKGROUND, 0.9);
        canvas.stroke_rect(box_x, box_y, box_w as u32, box_h as u32, FRAME_COLOR);

        for (index, entry) in self.legend.iter().enumerate() {
            let row_y = box_y + PAD + row_h * index as i64;
            let swatch_x = box_x + PAD;
            match entry.swatch {
                Swatch::Fill(color) => {
                    canvas.fill_rect(swatch_x, row_y, SWATCH, SWATCH, color, 1.0);
                    canvas.stroke_rect(swatch_x, row_y, SWATCH, SWATCH, FRAME_COLOR);
                }
                Swatch::Outline(color) => {
                    canvas.stroke_rect(swatch_x, row_y, SWATCH, SWATCH, color);
                }
            }
            canvas.draw_text(
                swatch_x + SWATCH as i64 + 6,
                row_y + (SWATCH as i64 - font::GLYPH_HEIGHT as i64) / 2,
                &entry.label,
                TEXT_COLOR,
                1,
            );
        }
    }
}

/// Integer-positioned plot rectangle inside the canvas.
struct Frame {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
}

/// Maps Mercator coordinates into the plot frame, preserving aspect ratio
/// and flipping the y axis.
struct Projector {
    scale: f64,
    min_x: f64,
    max_y: f64,
    offset_x: f64,
    offset_y: f64,
}

impl Projector {
    fn fit(bbox: &BoundingBox, frame: &Frame) -> Self {
        let span_x = bbox.width().max(f64::EPSILON);
        let span_y = bbox.height().max(f64::EPSILON);
        let scale = (frame.w as f64 / span_x).min(frame.h as f64 / span_y);

        // Center the data inside the frame.
        let offset_x = frame.x as f64 + (frame.w as f64 - span_x * scale) / 2.0;
        let offset_y = frame.y as f64 + (frame.h as f64 - span_y * scale) / 2.0;

        Self {
            scale,
            min_x: bbox.min_x,
            max_y: bbox.max_y,
            offset_x,
            offset_y,
        }
    }

    fn project(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + (x - self.min_x) * self.scale,
            self.offset_y + (self.max_y - y) * self.scale,
        )
    }
}

fn polygon_rings_px(poly: &Polygon<f64>, projector: &Projector) -> Vec<Vec<(f64, f64)>> {
    let mut rings = Vec::with_capacity(1 + poly.interiors().len());
    let project_ring = |ring: &geo_types::LineString<f64>| {
        ring.0
            .iter()
            .map(|c| projector.project(c.x, c.y))
            .collect::<Vec<_>>()
    };
    rings.push(project_ring(poly.exterior()));
    for hole in poly.interiors() {
        rings.push(project_ring(hole));
    }
    rings
}

fn fill_geometry(
    canvas: &mut Canvas,
    geometry: &Geometry,
    projector: &Projector,
    color: Rgb,
    opacity: f64,
) {
    match geometry {
        Geometry::Polygon(poly) => {
            canvas.fill_polygon(&polygon_rings_px(poly, projector), color, opacity);
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                canvas.fill_polygon(&polygon_rings_px(poly, projector), color, opacity);
            }
        }
        Geometry::Point(p) => {
            // Point features in a fill layer draw as small dots.
            let (px, py) = projector.project(p.x(), p.y());
            canvas.fill_rect(px.round() as i64 - 2, py.round() as i64 - 2, 5, 5, color, opacity);
        }
    }
}

fn stroke_geometry(
    canvas: &mut Canvas,
    geometry: &Geometry,
    projector: &Projector,
    color: Rgb,
    thickness: u32,
) {
    match geometry {
        Geometry::Polygon(poly) => {
            canvas.stroke_polygon(&polygon_rings_px(poly, projector), color, thickness);
        }
        Geometry::MultiPolygon(mp) => {
            for poly in &mp.0 {
                canvas.stroke_polygon(&polygon_rings_px(poly, projector), color, thickness);
            }
        }
        Geometry::Point(p) => {
            let (px, py) = projector.project(p.x(), p.y());
            canvas.stroke_rect(px.round() as i64 - 2, py.round() as i64 - 2, 5, 5, color);
        }
    }
}

/// Evenly spaced tick positions covering [min, max] at multiples of `step`.
fn ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    if step <= 0.0 || !min.is_finite() || !max.is_finite() || min > max {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut tick = (min / step).ceil() * step;
    // Guard against a pathological step producing millions of lines.
    while tick <= max + step * 1e-9 && out.len() < 1000 {
        // Snap -0.0 to 0.0 for label formatting.
        out.push(if tick == 0.0 { 0.0 } else { tick });
        tick += step;
    }
    out
}

/// Compact number formatting for colorbar labels.
fn format_value(v: f64) -> String {
    if v.abs() >= 100.0 {
        format!("{:.0}", v)
    } else if v.abs() >= 1.0 {
        format!("{:.1}", v)
    } else {
        format!("{:.2}", v)
    }
}
