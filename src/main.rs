//! Choromap - choropleth and marker map builder
//!
//! A CLI tool that turns GeoJSON and CSV datasets into finished maps:
//! interactive HTML documents or static PNG choropleths.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing file, bad column, render failure, etc.)

use anyhow::{Context, Result};
use chrono::Utc;
use choromap::cli::{Args, Command, InspectArgs, InteractiveArgs, StaticArgs};
use choromap::config::Config;
use choromap::geometry::crs::reproject;
use choromap::io::{discover, load_csv, load_geojson, summarize};
use choromap::models::{Crs, Value};
use choromap::ops::{attach_points, inner_join, spatial_join, sum_by};
use choromap::render::{
    parse_hex_color, Colormap, GridSpec, Normalize, StaticMap, WebMap, WebMapOptions,
};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        match handle_init_config() {
            Ok(()) => std::process::exit(0),
            Err(e) => {
                eprintln!("\n❌ Error: {}", e);
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    init_logging(&args);

    info!("Choromap v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        tracing::error!("Map build failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Handle --init-config: generate a default .choromap.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".choromap.toml");

    if path.exists() {
        eprintln!("⚠️  .choromap.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .choromap.toml")?;

    println!("✅ Created .choromap.toml with default settings.");
    println!("   Edit it to customize colormap, styling, map size, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Dispatch the selected pipeline.
fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;

    match args.command.clone() {
        Some(Command::Interactive(cmd)) => run_interactive(cmd, &config),
        Some(Command::Static(cmd)) => run_static(cmd, &config, args.quiet),
        Some(Command::Inspect(cmd)) => run_inspect(cmd),
        None => unreachable!("validated before dispatch"),
    }
}

/// Load configuration from file or use defaults, then apply CLI overrides.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from .choromap.toml");
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Pipeline A: load, merge, build points, compose the interactive map.
fn run_interactive(args: InteractiveArgs, config: &Config) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load the boundary layer
    println!("📥 Loading boundary layer: {}", args.boundaries.display());
    let mut boundaries = load_geojson(&args.boundaries)?;
    info!(
        "{} boundary features, {} with geometry",
        boundaries.len(),
        boundaries.geometry_count()
    );

    // Step 2: Merge CSV attributes on the shared key
    if let Some(ref attributes_path) = args.attributes {
        let key = args
            .join_key
            .as_deref()
            .context("--join-key is required with --attributes")?;

        println!(
            "🔗 Merging attributes from {} on `{}`",
            attributes_path.display(),
            key
        );
        let attributes = load_csv(attributes_path)?;
        let before = boundaries.len();
        boundaries = inner_join(&boundaries, &attributes, key)?;
        println!(
            "   {} of {} boundary rows matched",
            boundaries.len(),
            before
        );
    }

    // Step 3: Compose the map, layer by layer
    let colormap = resolve_colormap(config)?;
    let line_color = parse_hex_color(&config.style.outline_color)
        .map_err(anyhow::Error::msg)
        .context("Bad [style] outline_color in config")?;
    let caption = args.caption.clone().unwrap_or_else(|| args.color_by.clone());

    let mut map = WebMap::new(
        &args.title,
        WebMapOptions {
            tile_url: config.web_map.tile_url.clone(),
            attribution: config.web_map.attribution.clone(),
            zoom: config.web_map.zoom,
        },
    );

    println!("🎨 Composing choropleth layer colored by `{}`", args.color_by);
    map.add_choropleth(
        &boundaries,
        &args.color_by,
        colormap,
        &caption,
        config.style.fill_opacity,
        line_color,
    )?;

    if let Some(ref sites_path) = args.sites {
        println!("📍 Adding marker layer: {}", sites_path.display());
        let sites = load_csv(sites_path)?;
        let sites = attach_points(&sites, &args.lon_col, &args.lat_col)?;

        let marker_color = parse_hex_color(&config.style.marker_color)
            .map_err(anyhow::Error::msg)
            .context("Bad [style] marker_color in config")?;
        let layer_name = sites_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Sites")
            .to_string();

        map.add_markers(
            &sites,
            &layer_name,
            marker_color,
            args.popup_col.as_deref(),
            !args.no_marker_legend,
        )?;
        info!("{} markers added", sites.len());
    }

    // Step 4: Serialize the document
    println!("📝 Writing map document...");
    map.write(&args.output)?;

    println!("\n✅ Interactive map saved to: {}", args.output.display());
    println!(
        "   Finished in {:.1}s at {}",
        start_time.elapsed().as_secs_f64(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

/// Pipeline B: load, reproject, spatially join, aggregate, render the PNG.
fn run_static(args: StaticArgs, config: &Config, quiet: bool) -> Result<()> {
    let start_time = Instant::now();

    // Step 1: Load both polygon layers
    println!("📥 Loading region layer: {}", args.regions.display());
    let regions = load_geojson(&args.regions)?;
    println!("📥 Loading zone layer: {}", args.zones.display());
    let zones = load_geojson(&args.zones)?;
    info!(
        "{} regions, {} zones loaded",
        regions.len(),
        zones.len()
    );

    // Step 2: Reproject both layers onto the shared plane
    println!("🗺️  Reprojecting layers to {}", Crs::WebMercator);
    let regions_planar = reproject(&regions, Crs::WebMercator)?;
    let zones_planar = reproject(&zones, Crs::WebMercator)?;

    // Step 3: Spatial join (intersects predicate)
    println!("🔗 Joining regions to the zones they intersect...");
    let join = spatial_join(&regions_planar, &zones_planar)?;
    if join.multi_zone_regions > 0 {
        warn!(
            "{} regions intersect more than one zone; their `{}` is counted in every such zone",
            join.multi_zone_regions, args.value_col
        );
    }
    if join.unmatched_regions > 0 {
        warn!(
            "{} regions intersect no zone and were dropped",
            join.unmatched_regions
        );
    }

    // Step 4: Aggregate and report extremes. The label column picks up the
    // collision suffix when the regions table also has one.
    let group_col = if regions.has_column(&args.zone_label) {
        format!("{}_zone", args.zone_label)
    } else {
        args.zone_label.clone()
    };
    let report = sum_by(&join.table, &group_col, &args.value_col)?;

    println!("\n📊 `{}` by zone ({} zones):", args.value_col, report.groups.len());
    println!(
        "   Min: {} ({})",
        report.min_group().label,
        report.min_group().total
    );
    println!(
        "   Max: {} ({})",
        report.max_group().label,
        report.max_group().total
    );
    println!("   Total: {}", report.grand_total());

    if let Some(ref stats_path) = args.stats_out {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize zone totals")?;
        std::fs::write(stats_path, json)
            .with_context(|| format!("Failed to write stats to {}", stats_path.display()))?;
        info!("Zone totals written to {}", stats_path.display());
    }

    // Step 5: Attach the totals back onto the zone polygons for rendering
    let total_col = format!("{}_total", args.value_col);
    let totals: HashMap<String, f64> = report
        .groups
        .iter()
        .map(|g| (g.label.clone(), g.total))
        .collect();

    let mut zones_render = zones.clone();
    zones_render.register_column(&total_col);
    for feature in &mut zones_render.features {
        let total = match feature.get(&args.zone_label) {
            Value::Null => None,
            label => totals.get(&label.to_string()).copied(),
        };
        let value = total.map(Value::Number).unwrap_or(Value::Null);
        feature.attributes.insert(total_col.clone(), value);
    }

    // Step 6: Compose and rasterize the static map
    let colormap = resolve_colormap(config)?;
    let outline_color = parse_hex_color(&config.style.outline_color)
        .map_err(anyhow::Error::msg)
        .context("Bad [style] outline_color in config")?;
    let norm = Normalize::new(
        args.vmin.unwrap_or(report.min_group().total),
        args.vmax.unwrap_or(report.max_group().total),
    );

    let sm = &config.static_map;
    let mut map = StaticMap::new(sm.width, sm.height, sm.margin);
    if quiet {
        map = map.quiet();
    }
    if let Some(ref title) = args.title {
        map.set_title(title);
    }
    map.add_fill_layer(
        &zones_render,
        &total_col,
        colormap,
        norm,
        config.style.fill_opacity,
    )?;
    map.add_outline_layer(
        &zones_render,
        outline_color,
        config.style.outline_width,
        Some(&args.legend_label),
    )?;
    if sm.grid_spacing_deg > 0.0 {
        map.set_gridlines(GridSpec {
            spacing_deg: sm.grid_spacing_deg,
            labels_left: sm.grid_labels_left,
            labels_bottom: sm.grid_labels_bottom,
            labels_top: sm.grid_labels_top,
            labels_right: sm.grid_labels_right,
            ..GridSpec::default()
        });
    }
    map.set_colorbar(&args.value_col);

    println!("\n🖼️  Rendering {}x{} PNG...", sm.width, sm.height);
    map.render(&args.output)?;

    println!("\n✅ Static map saved to: {}", args.output.display());
    println!(
        "   Finished in {:.1}s at {}",
        start_time.elapsed().as_secs_f64(),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}

/// Print a catalog of dataset files without rendering anything.
fn run_inspect(args: InspectArgs) -> Result<()> {
    println!("🔍 Inspecting datasets under: {}\n", args.path.display());

    let entries = discover(&args.path)?;
    if entries.is_empty() {
        println!("   No dataset files found.");
        return Ok(());
    }

    for entry in &entries {
        let summary = summarize(entry)?;
        println!(
            "  📄 {} ({}, {} bytes)",
            summary.path.display(),
            summary.kind.label(),
            entry.size
        );
        println!(
            "      {} features, {} with geometry ({} vertices), {}",
            summary.features, summary.geometries, summary.vertices, summary.crs
        );
        if !summary.columns.is_empty() {
            println!("      columns: {}", summary.columns.join(", "));
        }
        if let Some(bbox) = summary.bbox {
            println!(
                "      bounds: [{:.4}, {:.4}] - [{:.4}, {:.4}]",
                bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y
            );
        }
    }

    println!("\n   Total: {} datasets", entries.len());
    Ok(())
}

/// Parse the configured colormap name.
fn resolve_colormap(config: &Config) -> Result<Colormap> {
    config
        .style
        .colormap
        .parse::<Colormap>()
        .map_err(anyhow::Error::msg)
        .context("Bad [style] colormap in config")
}
