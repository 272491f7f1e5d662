//! End-to-end runs of both pipelines over the fixture datasets.

use choromap::geometry::crs::reproject;
use choromap::io::{load_csv, load_geojson};
use choromap::models::{Crs, Value};
use choromap::ops::{attach_points, inner_join, spatial_join, sum_by};
use choromap::render::{Colormap, GridSpec, Normalize, StaticMap, WebMap, WebMapOptions};
use std::path::{Path, PathBuf};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
}

#[test]
fn interactive_pipeline_produces_html_document() {
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("wards.html");

    // Load, merge, build points.
    let boundaries = load_geojson(&fixture("wards.geojson")).unwrap();
    let scores = load_csv(&fixture("ward_scores.csv")).unwrap();
    let joined = inner_join(&boundaries, &scores, "ward_code").unwrap();
    assert_eq!(joined.len(), 4, "every ward has exactly one score row");

    let sites = load_csv(&fixture("sites.csv")).unwrap();
    let sites = attach_points(&sites, "lon", "lat").unwrap();
    assert_eq!(sites.geometry_count(), 3);

    // Compose and export.
    let mut map = WebMap::new("Ward scores", WebMapOptions::default());
    map.add_choropleth(
        &joined,
        "score",
        Colormap::Viridis,
        "Score by ward",
        0.75,
        [43, 43, 43],
    )
    .unwrap();
    map.add_markers(&sites, "sites", [215, 48, 39], Some("name"), true)
        .unwrap();
    map.write(&output).unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains("leaflet"));
    assert!(html.contains("W1"));
    assert!(html.contains("Town Hall"));
    assert!(html.contains("Score by ward"));
}

#[test]
fn static_pipeline_aggregates_and_renders_png() {
    let out_dir = tempfile::tempdir().unwrap();
    let output = out_dir.path().join("counties.png");

    let wards = load_geojson(&fixture("wards.geojson")).unwrap();
    let counties = load_geojson(&fixture("counties.geojson")).unwrap();

    // Shared planar CRS, then the intersects join.
    let wards_planar = reproject(&wards, Crs::WebMercator).unwrap();
    let counties_planar = reproject(&counties, Crs::WebMercator).unwrap();
    let join = spatial_join(&wards_planar, &counties_planar).unwrap();

    assert_eq!(join.table.len(), 4, "each ward lies in exactly one county");
    assert_eq!(join.multi_zone_regions, 0);
    assert_eq!(join.unmatched_regions, 0);

    // Aggregate and check the extremes.
    let report = sum_by(&join.table, "county", "population").unwrap();
    assert_eq!(report.groups.len(), 2);
    assert_eq!(report.max_group().label, "Westshire");
    assert_eq!(report.max_group().total, 2700.0);
    assert_eq!(report.min_group().label, "Eastshire");
    assert_eq!(report.min_group().total, 1300.0);
    assert_eq!(report.grand_total(), 4000.0);

    // Attach totals back onto the zone polygons and render.
    let mut counties_render = counties.clone();
    counties_render.register_column("population_total");
    for feature in &mut counties_render.features {
        let total = feature
            .text("county")
            .and_then(|label| report.groups.iter().find(|g| g.label == label))
            .map(|g| Value::Number(g.total))
            .unwrap_or(Value::Null);
        feature
            .attributes
            .insert("population_total".to_string(), total);
    }

    let mut map = StaticMap::new(640, 480, 50).quiet();
    map.set_title("Population by county");
    map.add_fill_layer(
        &counties_render,
        "population_total",
        Colormap::YlOrRd,
        Normalize::new(1300.0, 2700.0),
        0.85,
    )
    .unwrap();
    map.add_outline_layer(&counties_render, [43, 43, 43], 1, Some("Counties"))
        .unwrap();
    map.set_gridlines(GridSpec {
        spacing_deg: 0.05,
        ..GridSpec::default()
    });
    map.set_colorbar("population");
    map.render(&output).unwrap();

    let bytes = std::fs::read(&output).unwrap();
    assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    assert!(bytes.len() > 1000, "canvas should not be trivially empty");
}

#[test]
fn reproject_then_join_matches_wgs84_containment() {
    // The join outcome is CRS-independent for these layers: joining in the
    // planar system attributes each site to the same county as a plain
    // WGS84 point-in-polygon check would.
    let counties = load_geojson(&fixture("counties.geojson")).unwrap();
    let sites = load_csv(&fixture("sites.csv")).unwrap();
    let sites = attach_points(&sites, "lon", "lat").unwrap();

    let wgs = spatial_join(&sites, &counties).unwrap();

    let sites_planar = reproject(&sites, Crs::WebMercator).unwrap();
    let counties_planar = reproject(&counties, Crs::WebMercator).unwrap();
    let planar = spatial_join(&sites_planar, &counties_planar).unwrap();

    assert_eq!(wgs.table.len(), planar.table.len());
    for (a, b) in wgs.table.features.iter().zip(planar.table.features.iter()) {
        assert_eq!(a.text("name"), b.text("name"));
        assert_eq!(a.text("county"), b.text("county"));
    }
}
