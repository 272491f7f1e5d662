//! choromap - choropleth and marker map builder for vector datasets.
//!
//! Two linear pipelines over a shared feature-table data model:
//! an interactive Leaflet HTML map (choropleth polygons plus markers) and a
//! static PNG choropleth with zone aggregation, gridlines, colorbar and
//! legend. See the `interactive`, `static` and `inspect` subcommands.

pub mod cli;
pub mod config;
pub mod geometry;
pub mod io;
pub mod models;
pub mod ops;
pub mod render;

// Re-export the types the pipelines are built from.
pub use models::{AggregateReport, Crs, DataError, Feature, FeatureTable, Geometry, Value};
