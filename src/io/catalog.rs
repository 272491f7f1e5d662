//! Dataset discovery and summaries for `choromap inspect`.

use crate::geometry::{geometry_bbox, BoundingBox};
use crate::models::Crs;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Kind of dataset file, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    /// `.geojson` / `.json` vector layer.
    GeoJson,
    /// `.csv` attribute or point table.
    Csv,
}

impl DatasetKind {
    /// Map a file extension to a dataset kind.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "geojson" | "json" => Some(DatasetKind::GeoJson),
            "csv" => Some(DatasetKind::Csv),
            _ => None,
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            DatasetKind::GeoJson => "GeoJSON",
            DatasetKind::Csv => "CSV",
        }
    }
}

/// A dataset file found by [`discover`].
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    /// Path to the file.
    pub path: PathBuf,
    /// File kind.
    pub kind: DatasetKind,
    /// File size in bytes.
    pub size: u64,
}

/// Loaded summary of one dataset, as printed by `inspect`.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub path: PathBuf,
    pub kind: DatasetKind,
    /// Number of records.
    pub features: usize,
    /// Number of records carrying a geometry.
    pub geometries: usize,
    /// Total vertex count across all geometries.
    pub vertices: usize,
    /// Attribute column names in table order.
    pub columns: Vec<String>,
    /// Bounds over all geometries, if any.
    pub bbox: Option<BoundingBox>,
    pub crs: Crs,
}

/// Find dataset files at `path`.
///
/// A file path yields exactly one entry (unknown extensions are fatal); a
/// directory is walked recursively and known dataset files are returned in
/// path order.
pub fn discover(path: &Path) -> Result<Vec<DatasetEntry>> {
    if path.is_file() {
        let entry = entry_for(path)
            .with_context(|| format!("Unsupported dataset file: {}", path.display()))?;
        return Ok(vec![entry]);
    }

    if !path.is_dir() {
        bail!("Dataset path does not exist: {}", path.display());
    }

    let mut entries = Vec::new();
    for item in WalkDir::new(path).follow_links(false) {
        let item = item.with_context(|| format!("Failed to walk: {}", path.display()))?;
        if !item.file_type().is_file() {
            continue;
        }
        match entry_for(item.path()) {
            Ok(entry) => entries.push(entry),
            Err(_) => debug!("Skipping non-dataset file: {}", item.path().display()),
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

fn entry_for(path: &Path) -> Result<DatasetEntry> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    let kind = match DatasetKind::from_extension(ext) {
        Some(kind) => kind,
        None => bail!("no loader for extension `{ext}`"),
    };
    let size = std::fs::metadata(path)
        .with_context(|| format!("Failed to stat: {}", path.display()))?
        .len();

    Ok(DatasetEntry {
        path: path.to_path_buf(),
        kind,
        size,
    })
}

/// Load a dataset entry and summarize it.
pub fn summarize(entry: &DatasetEntry) -> Result<DatasetSummary> {
    let table = match entry.kind {
        DatasetKind::GeoJson => super::load_geojson(&entry.path)?,
        DatasetKind::Csv => super::load_csv(&entry.path)?,
    };

    let mut bbox = BoundingBox::empty();
    let mut vertices = 0usize;
    for feature in &table.features {
        if let Some(ref geometry) = feature.geometry {
            bbox.merge(&geometry_bbox(geometry));
            vertices += geometry.vertex_count();
        }
    }

    Ok(DatasetSummary {
        path: entry.path.clone(),
        kind: entry.kind,
        features: table.len(),
        geometries: table.geometry_count(),
        vertices,
        columns: table.columns.clone(),
        bbox: if bbox.is_empty() { None } else { Some(bbox) },
        crs: table.crs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_kind_from_extension() {
        assert_eq!(
            DatasetKind::from_extension("GeoJSON"),
            Some(DatasetKind::GeoJson)
        );
        assert_eq!(DatasetKind::from_extension("csv"), Some(DatasetKind::Csv));
        assert_eq!(DatasetKind::from_extension("shp"), None);
    }

    #[test]
    fn test_discover_directory_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), "a\n1\n").unwrap();
        fs::write(
            dir.path().join("a.geojson"),
            r#"{"type": "FeatureCollection", "features": []}"#,
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let entries = discover(dir.path()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind, DatasetKind::GeoJson);
        assert_eq!(entries[1].kind, DatasetKind::Csv);
    }

    #[test]
    fn test_discover_unknown_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layer.shp");
        fs::write(&path, "not supported").unwrap();
        assert!(discover(&path).is_err());
    }

    #[test]
    fn test_summarize_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wards.csv");
        fs::write(&path, "code,population\nW1,100\nW2,250\n").unwrap();

        let entries = discover(&path).unwrap();
        let summary = summarize(&entries[0]).unwrap();

        assert_eq!(summary.features, 2);
        assert_eq!(summary.geometries, 0);
        assert!(summary.bbox.is_none());
        assert_eq!(summary.columns, vec!["code", "population"]);
    }
}
