//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Choromap - choropleth and marker map builder for vector datasets
///
/// Build finished maps from GeoJSON and CSV files: interactive HTML
/// documents with choropleth polygons and markers, or static PNG
/// choropleths with gridlines, colorbar and legend.
///
/// Examples:
///   choromap interactive --boundaries wards.geojson --attributes scores.csv \
///       --join-key ward_code --color-by score --output wards.html
///   choromap static --regions wards.geojson --zones counties.geojson \
///       --value-col population --zone-label county --output counties.png
///   choromap inspect ./data
///   choromap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .choromap.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Generate a default .choromap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Top-level pipelines.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Compose an interactive HTML map (choropleth + markers)
    Interactive(InteractiveArgs),
    /// Render a static choropleth PNG with zone aggregation
    Static(StaticArgs),
    /// Summarize dataset files without rendering anything
    Inspect(InspectArgs),
}

/// Arguments for the interactive map pipeline.
#[derive(clap::Args, Debug, Clone)]
pub struct InteractiveArgs {
    /// Polygon boundary layer (GeoJSON)
    #[arg(long, value_name = "FILE")]
    pub boundaries: PathBuf,

    /// CSV attribute table merged onto the boundaries
    #[arg(long, value_name = "FILE")]
    pub attributes: Option<PathBuf>,

    /// Key column shared by boundaries and attributes
    ///
    /// Required when --attributes is given.
    #[arg(long, value_name = "COL")]
    pub join_key: Option<String>,

    /// Attribute that colors the polygons
    #[arg(long, value_name = "COL")]
    pub color_by: String,

    /// Legend caption for the color scale (defaults to the column name)
    #[arg(long, value_name = "TEXT")]
    pub caption: Option<String>,

    /// CSV of point sites to overlay as markers
    #[arg(long, value_name = "FILE")]
    pub sites: Option<PathBuf>,

    /// Longitude column of the sites table
    #[arg(long, value_name = "COL", default_value = "lon")]
    pub lon_col: String,

    /// Latitude column of the sites table
    #[arg(long, value_name = "COL", default_value = "lat")]
    pub lat_col: String,

    /// Attribute shown in marker popups
    #[arg(long, value_name = "COL")]
    pub popup_col: Option<String>,

    /// Keep the marker layer out of the legend
    #[arg(long)]
    pub no_marker_legend: bool,

    /// Colormap name (overrides config)
    #[arg(long, value_name = "NAME")]
    pub colormap: Option<String>,

    /// Map title
    #[arg(long, value_name = "TEXT", default_value = "choromap")]
    pub title: String,

    /// Output file path for the map document
    #[arg(short, long, default_value = "map.html", value_name = "FILE")]
    pub output: PathBuf,
}

/// Arguments for the static choropleth pipeline.
#[derive(clap::Args, Debug, Clone)]
pub struct StaticArgs {
    /// Fine region layer (GeoJSON)
    #[arg(long, value_name = "FILE")]
    pub regions: PathBuf,

    /// Coarse zone layer (GeoJSON)
    #[arg(long, value_name = "FILE")]
    pub zones: PathBuf,

    /// Numeric region attribute summed per zone
    #[arg(long, value_name = "COL", default_value = "population")]
    pub value_col: String,

    /// Zone attribute used as the group label
    #[arg(long, value_name = "COL", default_value = "name")]
    pub zone_label: String,

    /// Lower bound of the color scale (defaults to the smallest zone total)
    #[arg(long, value_name = "N")]
    pub vmin: Option<f64>,

    /// Upper bound of the color scale (defaults to the largest zone total)
    #[arg(long, value_name = "N")]
    pub vmax: Option<f64>,

    /// Legend label for the zone outline layer
    #[arg(long, value_name = "TEXT", default_value = "Zones")]
    pub legend_label: String,

    /// Also write the zone totals as a JSON report
    #[arg(long, value_name = "FILE")]
    pub stats_out: Option<PathBuf>,

    /// Colormap name (overrides config)
    #[arg(long, value_name = "NAME")]
    pub colormap: Option<String>,

    /// Map title
    #[arg(long, value_name = "TEXT")]
    pub title: Option<String>,

    /// Output PNG path
    #[arg(short, long, default_value = "map.png", value_name = "FILE")]
    pub output: PathBuf,
}

/// Arguments for `inspect`.
#[derive(clap::Args, Debug, Clone)]
pub struct InspectArgs {
    /// Dataset file or directory to summarize
    #[arg(value_name = "PATH")]
    pub path: PathBuf,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The colormap override from whichever subcommand carries one.
    pub fn colormap_override(&self) -> Option<&str> {
        match &self.command {
            Some(Command::Interactive(a)) => a.colormap.as_deref(),
            Some(Command::Static(a)) => a.colormap.as_deref(),
            _ => None,
        }
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        let Some(ref command) = self.command else {
            return Err("A subcommand is required (interactive, static, inspect)".to_string());
        };

        match command {
            Command::Interactive(args) => {
                require_file(&args.boundaries, "boundary layer")?;
                if let Some(ref attributes) = args.attributes {
                    require_file(attributes, "attribute table")?;
                    if args.join_key.is_none() {
                        return Err("--join-key is required with --attributes".to_string());
                    }
                }
                if let Some(ref sites) = args.sites {
                    require_file(sites, "sites table")?;
                }
                if args.popup_col.is_some() && args.sites.is_none() {
                    return Err("--popup-col needs --sites".to_string());
                }
                validate_colormap(&args.colormap)?;
            }
            Command::Static(args) => {
                require_file(&args.regions, "region layer")?;
                require_file(&args.zones, "zone layer")?;
                if let (Some(vmin), Some(vmax)) = (args.vmin, args.vmax) {
                    if vmin >= vmax {
                        return Err(format!(
                            "--vmin ({vmin}) must be less than --vmax ({vmax})"
                        ));
                    }
                }
                validate_colormap(&args.colormap)?;
            }
            Command::Inspect(args) => {
                if !args.path.exists() {
                    return Err(format!(
                        "Dataset path does not exist: {}",
                        args.path.display()
                    ));
                }
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

fn require_file(path: &std::path::Path, what: &str) -> Result<(), String> {
    if !path.exists() {
        return Err(format!("{} not found: {}", what, path.display()));
    }
    if !path.is_file() {
        return Err(format!("{} is not a file: {}", what, path.display()));
    }
    Ok(())
}

fn validate_colormap(colormap: &Option<String>) -> Result<(), String> {
    if let Some(ref name) = colormap {
        name.parse::<crate::render::Colormap>()?;
    }
    Ok(())
}
