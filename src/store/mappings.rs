use std::path::{Path, PathBuf};

use super::{read_collection, write_collection, MappingStore, StoreError};
use crate::mapping::VisualMapping;

/// Mappings persisted as a JSON array in `mappings.json`.
pub struct JsonMappingStore {
    path: PathBuf,
    records: Vec<VisualMapping>,
}

impl JsonMappingStore {
    pub fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let path = data_dir.join("mappings.json");
        let records = read_collection(&path)?;
        log::info!("Loaded {} stored mapping(s) from {}", records.len(), path.display());
        Ok(Self { path, records })
    }
}

impl MappingStore for JsonMappingStore {
    fn load_all(&self) -> Result<Vec<VisualMapping>, StoreError> {
        Ok(self.records.clone())
    }

    fn upsert(&mut self, mapping: &VisualMapping) -> Result<(), StoreError> {
        match self.records.iter_mut().find(|m| m.signature == mapping.signature) {
            Some(existing) => *existing = mapping.clone(),
            None => self.records.push(mapping.clone()),
        }
        write_collection(&self.path, &self.records)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        write_collection(&self.path, &self.records)
    }
}

/// Mappings kept for the process lifetime only (`--ephemeral`).
#[derive(Default)]
pub struct MemoryMappingStore {
    records: Vec<VisualMapping>,
    #[cfg(test)]
    writes: usize,
}

#[cfg(test)]
impl MemoryMappingStore {
    /// Number of upserts performed so far.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl MappingStore for MemoryMappingStore {
    fn load_all(&self) -> Result<Vec<VisualMapping>, StoreError> {
        Ok(self.records.clone())
    }

    fn upsert(&mut self, mapping: &VisualMapping) -> Result<(), StoreError> {
        #[cfg(test)]
        {
            self.writes += 1;
        }
        match self.records.iter_mut().find(|m| m.signature == mapping.signature) {
            Some(existing) => *existing = mapping.clone(),
            None => self.records.push(mapping.clone()),
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.records.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::Buckets;
    use crate::mapping::generate::generate_mapping;
    use chrono::Utc;

    fn mapping(signature: &str) -> VisualMapping {
        generate_mapping(signature, Buckets::parse(signature).unwrap(), Utc::now())
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = mapping("100-40-60-80");
        {
            let mut store = JsonMappingStore::open(dir.path()).unwrap();
            store.upsert(&first).unwrap();
            store.upsert(&mapping("0-0-0-0")).unwrap();
        }

        let store = JsonMappingStore::open(dir.path()).unwrap();
        let all = store.load_all().unwrap();
        assert_eq!(all.len(), 2);
        let reloaded = all.iter().find(|m| m.signature == "100-40-60-80").unwrap();
        assert_eq!(reloaded, &first);
    }

    #[test]
    fn upsert_replaces_by_signature() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonMappingStore::open(dir.path()).unwrap();
        store.upsert(&mapping("50-20-20-20")).unwrap();
        store.upsert(&mapping("50-20-20-20")).unwrap();
        assert_eq!(store.load_all().unwrap().len(), 1);
    }

    #[test]
    fn clear_empties_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonMappingStore::open(dir.path()).unwrap();
        store.upsert(&mapping("50-20-20-20")).unwrap();
        store.clear().unwrap();

        let reopened = JsonMappingStore::open(dir.path()).unwrap();
        assert!(reopened.load_all().unwrap().is_empty());
    }

    #[test]
    fn malformed_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mappings.json"), "[{\"id\": 3}]").unwrap();
        let store = JsonMappingStore::open(dir.path()).unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryMappingStore::default();
        store.upsert(&mapping("0-0-0-0")).unwrap();
        assert_eq!(store.writes(), 1);
        assert_eq!(store.load_all().unwrap().len(), 1);
        store.clear().unwrap();
        assert!(store.load_all().unwrap().is_empty());
    }
}
