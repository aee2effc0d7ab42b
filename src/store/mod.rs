//! Local persistence for mappings and artworks.
//!
//! Both collections live as JSON arrays in the data directory. A file that
//! exists but does not parse is treated as an empty collection so a corrupt
//! store never takes the session down.

pub mod artworks;
pub mod mappings;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

use crate::mapping::VisualMapping;
pub use artworks::{Artwork, ArtworkStore};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("store serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("raster encoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// Backing store for visual mappings, keyed by signature.
pub trait MappingStore {
    fn load_all(&self) -> Result<Vec<VisualMapping>, StoreError>;
    fn upsert(&mut self, mapping: &VisualMapping) -> Result<(), StoreError>;
    fn clear(&mut self) -> Result<(), StoreError>;
}

/// Read a JSON array from `path`. Missing and malformed files both read as
/// empty; only genuine I/O failures are errors.
pub(crate) fn read_collection<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    match serde_json::from_str(&content) {
        Ok(records) => Ok(records),
        Err(e) => {
            log::warn!("Ignoring malformed store {}: {}", path.display(), e);
            Ok(Vec::new())
        }
    }
}

/// Write `records` as a JSON array, replacing the file atomically.
pub(crate) fn write_collection<T: Serialize>(path: &Path, records: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, serde_json::to_vec_pretty(records)?)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<u32> = read_collection(&dir.path().join("nope.json")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn malformed_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json [").unwrap();
        let records: Vec<u32> = read_collection(&path).unwrap();
        assert!(records.is_empty());

        std::fs::write(&path, r#"{"an": "object"}"#).unwrap();
        let records: Vec<u32> = read_collection(&path).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("numbers.json");
        write_collection(&path, &[1u32, 2, 3]).unwrap();
        let records: Vec<u32> = read_collection(&path).unwrap();
        assert_eq!(records, vec![1, 2, 3]);
        assert!(!path.with_extension("json.tmp").exists());
    }
}
