//! Dataset loading.
//!
//! Vector layers arrive as GeoJSON feature collections, attribute and point
//! tables as CSV. Every loader fails fast with the offending file (and row,
//! where known) in the error chain.

pub mod catalog;
pub mod csv;
pub mod geojson;

pub use self::catalog::{discover, summarize, DatasetEntry, DatasetKind, DatasetSummary};
pub use self::csv::load_csv;
pub use self::geojson::{geometry_to_geojson, load_geojson};
