use chrono::Utc;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use super::generate::generate_mapping;
use super::VisualMapping;
use crate::audio::features::{AudioFeatures, Buckets};
use crate::store::{MappingStore, StoreError};

/// Signature → mapping lookup backed by a persistent store.
///
/// Lookup and creation happen in one `&mut self` call, so a signature seen for
/// the first time is generated and written exactly once.
pub struct MappingCache<S: MappingStore> {
    store: S,
    mappings: HashMap<String, Arc<VisualMapping>>,
}

impl<S: MappingStore> MappingCache<S> {
    /// Seed the cache from everything the store already holds.
    pub fn load(store: S) -> Self {
        let stored = store.load_all().unwrap_or_else(|e| {
            log::warn!("Could not load stored mappings, starting empty: {}", e);
            Vec::new()
        });
        let mappings = stored
            .into_iter()
            .map(|m| (m.signature.clone(), Arc::new(m)))
            .collect();
        Self { store, mappings }
    }

    pub fn get_or_create(&mut self, features: &AudioFeatures) -> Arc<VisualMapping> {
        match self.mappings.entry(features.signature.clone()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let buckets = Buckets::parse(&features.signature).unwrap_or_else(|| features.buckets());
                let mapping = generate_mapping(&features.signature, buckets, Utc::now());
                log::debug!(
                    "New mapping for {}: {:?}, size {:.1}",
                    mapping.signature,
                    mapping.style,
                    mapping.size_base
                );
                if let Err(e) = self.store.upsert(&mapping) {
                    log::warn!("Failed to persist mapping {}: {}", mapping.signature, e);
                }
                Arc::clone(entry.insert(Arc::new(mapping)))
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, signature: &str) -> Option<Arc<VisualMapping>> {
        self.mappings.get(signature).cloned()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Drop every mapping from memory and from the backing store.
    pub fn clear(&mut self) -> Result<(), StoreError> {
        self.mappings.clear();
        self.store.clear()
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::mappings::{JsonMappingStore, MemoryMappingStore};

    fn features(signature: &str, frequency: f32) -> AudioFeatures {
        let b = Buckets::parse(signature).unwrap();
        AudioFeatures {
            amplitude: 0.4,
            frequency,
            low: b.low as f32,
            mid: b.mid as f32,
            high: b.high as f32,
            signature: signature.to_string(),
        }
    }

    #[test]
    fn second_lookup_does_not_write_again() {
        let mut cache = MappingCache::load(MemoryMappingStore::default());
        let a = cache.get_or_create(&features("100-40-60-80", 120.0));
        let b = cache.get_or_create(&features("100-40-60-80", 120.0));
        assert_eq!(cache.store().writes(), 1);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn same_bucket_gives_identical_mapping() {
        // raw frequency differs inside the 50 Hz bucket
        let mut first = MappingCache::load(MemoryMappingStore::default());
        let mut second = MappingCache::load(MemoryMappingStore::default());
        let a = first.get_or_create(&features("1000-40-60-80", 1001.0));
        let b = second.get_or_create(&features("1000-40-60-80", 1049.0));

        assert_eq!(a.style, b.style);
        assert_eq!(a.primary, b.primary);
        assert_eq!(a.secondary, b.secondary);
        assert_eq!(a.size_base.to_bits(), b.size_base.to_bits());
        assert_eq!(a.opacity_base.to_bits(), b.opacity_base.to_bits());
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn stored_mapping_is_returned_after_restart() {
        let dir = tempfile::tempdir().unwrap();
        let created = {
            let mut cache = MappingCache::load(JsonMappingStore::open(dir.path()).unwrap());
            cache.get_or_create(&features("100-40-60-80", 100.0))
        };

        let mut cache = MappingCache::load(JsonMappingStore::open(dir.path()).unwrap());
        assert_eq!(cache.len(), 1);
        let again = cache.get_or_create(&features("100-40-60-80", 100.0));
        assert_eq!(*again, *created);
        assert_eq!(again.created_at, created.created_at);
        assert_eq!(
            serde_json::to_string(&*again).unwrap(),
            serde_json::to_string(&*created).unwrap()
        );
    }

    #[test]
    fn clear_empties_cache_and_store() {
        let mut cache = MappingCache::load(MemoryMappingStore::default());
        cache.get_or_create(&features("0-0-0-0", 0.0));
        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(cache.get("0-0-0-0").is_none());
        assert!(cache.store().load_all().unwrap().is_empty());
    }
}
