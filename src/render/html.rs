//! Interactive web map rendering.
//!
//! A [`WebMap`] accumulates typed layers and serializes once into a single
//! self-contained HTML document: Leaflet from a CDN, all feature data
//! inlined as GeoJSON, fill colors precomputed here so the page carries no
//! colormap logic.

use crate::geometry::anchor_point;
use crate::geometry::crs::reproject;
use crate::io::geometry_to_geojson;
use crate::models::{Crs, DataError, FeatureTable, Geometry};
use crate::render::color::{to_hex, Colormap, Normalize, Rgb};
use anyhow::{anyhow, Context, Result};
use std::path::Path;
use tracing::debug;

/// Base map options, normally taken from `[web_map]` config.
#[derive(Debug, Clone)]
pub struct WebMapOptions {
    /// Tile URL template for the base layer.
    pub tile_url: String,
    /// Attribution line required by the tile provider.
    pub attribution: String,
    /// Initial zoom before the data bounds take over.
    pub zoom: u8,
}

impl Default for WebMapOptions {
    fn default() -> Self {
        Self {
            tile_url: "https://tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "© OpenStreetMap contributors".to_string(),
            zoom: 10,
        }
    }
}

enum WebLayer {
    Choropleth {
        table: FeatureTable,
        value_col: String,
        colormap: Colormap,
        caption: String,
        fill_opacity: f64,
        line_color: Rgb,
    },
    Markers {
        table: FeatureTable,
        name: String,
        color: Rgb,
        popup_col: Option<String>,
        show_in_legend: bool,
    },
}

/// An interactive map under construction. Layers draw in insertion order
/// on the shared Leaflet canvas; [`WebMap::write`] renders everything once.
pub struct WebMap {
    title: String,
    options: WebMapOptions,
    layers: Vec<WebLayer>,
}

impl WebMap {
    pub fn new(title: &str, options: WebMapOptions) -> Self {
        Self {
            title: title.to_string(),
            options,
            layers: Vec::new(),
        }
    }

    /// Add a polygon layer colored by a continuous attribute, with a legend
    /// block carrying the caption and the color scale.
    pub fn add_choropleth(
        &mut self,
        table: &FeatureTable,
        value_col: &str,
        colormap: Colormap,
        caption: &str,
        fill_opacity: f64,
        line_color: Rgb,
    ) -> Result<(), DataError> {
        table.require_column("choropleth layer", value_col)?;
        if table.geometry_count() == 0 {
            return Err(DataError::NoGeometry {
                table: "choropleth layer".to_string(),
            });
        }
        self.layers.push(WebLayer::Choropleth {
            table: reproject(table, Crs::Wgs84)?,
            value_col: value_col.to_string(),
            colormap,
            caption: caption.to_string(),
            fill_opacity: fill_opacity.clamp(0.0, 1.0),
            line_color,
        });
        Ok(())
    }

    /// Add a point marker layer with an optional popup attribute. Layers
    /// with `show_in_legend = false` stay off the legend (useful for
    /// context markers that would clutter it).
    pub fn add_markers(
        &mut self,
        table: &FeatureTable,
        name: &str,
        color: Rgb,
        popup_col: Option<&str>,
        show_in_legend: bool,
    ) -> Result<(), DataError> {
        if let Some(popup) = popup_col {
            table.require_column("marker layer", popup)?;
        }
        if table.geometry_count() == 0 {
            return Err(DataError::NoGeometry {
                table: "marker layer".to_string(),
            });
        }
        self.layers.push(WebLayer::Markers {
            table: reproject(table, Crs::Wgs84)?,
            name: name.to_string(),
            color,
            popup_col: popup_col.map(str::to_string),
            show_in_legend,
        });
        Ok(())
    }

    /// Render the document and write it to `path`.
    pub fn write(&self, path: &Path) -> Result<()> {
        let html = self.to_html()?;
        std::fs::write(path, html)
            .with_context(|| format!("Failed to write map document: {}", path.display()))?;
        debug!("wrote interactive map: {}", path.display());
        Ok(())
    }

    /// Render the complete HTML document.
    pub fn to_html(&self) -> Result<String> {
        if self.layers.is_empty() {
            return Err(anyhow!("web map has no layers to draw"));
        }

        let mut layer_js = String::new();
        for layer in &self.layers {
            layer_js.push_str(&self.layer_snippet(layer)?);
        }

        let mut output = String::new();
        output.push_str(&head_section(&self.title));
        output.push_str("<body>\n<div id=\"map\"></div>\n<script>\n");
        output.push_str(&map_init_snippet(&self.options));
        output.push_str(&layer_js);
        output.push_str(&legend_snippet());
        output.push_str(&fit_bounds_snippet());
        output.push_str("</script>\n</body>\n</html>\n");
        Ok(output)
    }

    fn layer_snippet(&self, layer: &WebLayer) -> Result<String> {
        match layer {
            WebLayer::Choropleth {
                table,
                value_col,
                colormap,
                caption,
                fill_opacity,
                line_color,
            } => {
                let norm = Normalize::from_values(
                    table.features.iter().filter_map(|f| f.number(value_col)),
                )
                .ok_or_else(|| {
                    anyhow!("choropleth layer has no numeric `{value_col}` values to color by")
                })?;

                let collection = choropleth_features(table, value_col, colormap, &norm);
                let gradient: Vec<String> = (0..=8)
                    .map(|i| to_hex(colormap.sample(i as f64 / 8.0)))
                    .collect();

                Ok(format!(
                    "addChoropleth({data}, {{caption: {caption}, gradient: {gradient}, \
                     vmin: {vmin}, vmax: {vmax}, fillOpacity: {opacity}, lineColor: {line}}});\n",
                    data = geojson::GeoJson::from(collection),
                    caption = js_string(caption),
                    gradient = serde_json::to_string(&gradient)?,
                    vmin = norm.vmin,
                    vmax = norm.vmax,
                    opacity = fill_opacity,
                    line = js_string(&to_hex(*line_color)),
                ))
            }
            WebLayer::Markers {
                table,
                name,
                color,
                popup_col,
                show_in_legend,
            } => {
                let collection = marker_features(table, popup_col.as_deref());
                Ok(format!(
                    "addMarkers({data}, {{name: {name}, color: {color}, legend: {legend}}});\n",
                    data = geojson::GeoJson::from(collection),
                    name = js_string(name),
                    color = js_string(&to_hex(*color)),
                    legend = show_in_legend,
                ))
            }
        }
    }
}

/// Build the choropleth FeatureCollection with per-feature `__fill` colors.
fn choropleth_features(
    table: &FeatureTable,
    value_col: &str,
    colormap: &Colormap,
    norm: &Normalize,
) -> geojson::FeatureCollection {
    let features = table
        .features
        .iter()
        .filter(|f| f.geometry.is_some())
        .map(|feature| {
            let mut gj = feature_skeleton(feature);
            let fill = match feature.number(value_col) {
                Some(v) => to_hex(colormap.sample(norm.position(v))),
                None => "#c8c8c8".to_string(),
            };
            gj.set_property("__fill", fill);
            gj
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Build the marker FeatureCollection with per-feature `__popup` text.
///
/// Polygon features in a marker layer anchor their marker at the centroid,
/// so a boundary table can double as a label layer.
fn marker_features(table: &FeatureTable, popup_col: Option<&str>) -> geojson::FeatureCollection {
    let features = table
        .features
        .iter()
        .filter(|f| f.geometry.is_some())
        .map(|feature| {
            let mut gj = feature_skeleton(feature);
            if let Some(ref geometry) = feature.geometry {
                if !matches!(geometry, Geometry::Point(_)) {
                    let anchor = anchor_point(geometry);
                    gj.geometry = Some(geometry_to_geojson(&Geometry::Point(
                        geo_types::Point::new(anchor.x, anchor.y),
                    )));
                }
            }
            if let Some(popup) = popup_col {
                let text = feature.get(popup).to_string();
                if !text.is_empty() {
                    gj.set_property("__popup", text);
                }
            }
            gj
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature_skeleton(feature: &crate::models::Feature) -> geojson::Feature {
    let mut gj = geojson::Feature {
        bbox: None,
        geometry: feature.geometry.as_ref().map(geometry_to_geojson),
        id: None,
        properties: None,
        foreign_members: None,
    };
    for (name, value) in &feature.attributes {
        if let Ok(json) = serde_json::to_value(value) {
            gj.set_property(name.clone(), json);
        }
    }
    gj
}

/// JSON-escape a string for embedding in the generated script/markup.
fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

fn head_section(title: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8" />
<meta name="viewport" content="width=device-width, initial-scale=1.0" />
<title>{title}</title>
<link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.css"
  crossorigin="anonymous" referrerpolicy="no-referrer" />
<script src="https://cdnjs.cloudflare.com/ajax/libs/leaflet/1.9.4/leaflet.js"
  crossorigin="anonymous" referrerpolicy="no-referrer"></script>
<style>
  html, body {{ height: 100%; margin: 0; }}
  #map {{ height: 100%; width: 100%; }}
  .map-legend {{
    background: rgba(255, 255, 255, 0.92);
    border: 1px solid #999;
    border-radius: 4px;
    padding: 8px 10px;
    font: 12px/1.4 sans-serif;
    color: #222;
    max-width: 220px;
  }}
  .map-legend .caption {{ font-weight: bold; margin-bottom: 4px; }}
  .map-legend .scale {{ height: 10px; border: 1px solid #777; margin-bottom: 2px; }}
  .map-legend .range {{ display: flex; justify-content: space-between; }}
  .map-legend .entry {{ display: flex; align-items: center; gap: 6px; margin-top: 4px; }}
  .map-legend .dot {{ width: 10px; height: 10px; border-radius: 50%; border: 1px solid #555; }}
</style>
</head>
"#,
        title = escape_html(title)
    )
}

fn map_init_snippet(options: &WebMapOptions) -> String {
    format!(
        "const map = L.map('map').setView([0, 0], {zoom});\n\
         L.tileLayer({url}, {{attribution: {attribution}}}).addTo(map);\n\
         const overlays = [];\n\
         const legendBlocks = [];\n\
         function addChoropleth(data, opts) {{\n\
           const layer = L.geoJSON(data, {{\n\
             style: f => ({{\n\
               fillColor: f.properties.__fill,\n\
               fillOpacity: opts.fillOpacity,\n\
               color: opts.lineColor,\n\
               weight: 1,\n\
             }}),\n\
           }}).addTo(map);\n\
           overlays.push(layer);\n\
           const scale = 'linear-gradient(to right, ' + opts.gradient.join(', ') + ')';\n\
           legendBlocks.push('<div class=\"caption\">' + opts.caption + '</div>'\n\
             + '<div class=\"scale\" style=\"background: ' + scale + '\"></div>'\n\
             + '<div class=\"range\"><span>' + opts.vmin + '</span><span>' + opts.vmax + '</span></div>');\n\
         }}\n\
         function addMarkers(data, opts) {{\n\
           const layer = L.geoJSON(data, {{\n\
             pointToLayer: (f, latlng) => L.circleMarker(latlng, {{\n\
               radius: 6,\n\
               color: '#ffffff',\n\
               weight: 1,\n\
               fillColor: opts.color,\n\
               fillOpacity: 0.95,\n\
             }}),\n\
             onEachFeature: (f, l) => {{\n\
               if (f.properties.__popup) l.bindPopup(f.properties.__popup);\n\
             }},\n\
           }}).addTo(map);\n\
           overlays.push(layer);\n\
           if (opts.legend) {{\n\
             legendBlocks.push('<div class=\"entry\"><span class=\"dot\" style=\"background: '\n\
               + opts.color + '\"></span>' + opts.name + '</div>');\n\
           }}\n\
         }}\n",
        zoom = options.zoom,
        url = js_string(&options.tile_url),
        attribution = js_string(&options.attribution),
    )
}

fn legend_snippet() -> String {
    "const legend = L.control({position: 'bottomright'});\n\
     legend.onAdd = () => {\n\
       const div = L.DomUtil.create('div', 'map-legend');\n\
       div.innerHTML = legendBlocks.join('');\n\
       return div;\n\
     };\n\
     if (legendBlocks.length > 0) legend.addTo(map);\n"
        .to_string()
}

fn fit_bounds_snippet() -> String {
    "const bounds = overlays.reduce(\n\
       (acc, l) => acc === null ? l.getBounds() : acc.extend(l.getBounds()), null);\n\
     if (bounds && bounds.isValid()) map.fitBounds(bounds.pad(0.05));\n"
        .to_string()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
