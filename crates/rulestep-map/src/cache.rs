//! Source-map cache keyed by content and matching options, persisted as JSON
use crate::error::MapError;
use crate::source_map::SourceMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceMapCache {
    entries: BTreeMap<String, SourceMap>,
}

impl SourceMapCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, cache_key: &str) -> Option<&SourceMap> {
        self.entries.get(cache_key)
    }

    /// Insert under the map's own cache key, replacing any previous entry
    pub fn insert(&mut self, map: SourceMap) -> Option<SourceMap> {
        self.entries.insert(map.cache_key.clone(), map)
    }

    pub fn remove(&mut self, cache_key: &str) -> Option<SourceMap> {
        self.entries.remove(cache_key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), MapError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        tracing::debug!(path = %path.as_ref().display(), entries = self.len(), "source map cache saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let cache: Self = serde_json::from_str(&json)?;
        tracing::debug!(path = %path.as_ref().display(), entries = cache.len(), "source map cache loaded");
        Ok(cache)
    }

    /// Like `load`, but a missing file is an empty cache
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, MapError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::{generate_for_debugging, MapOptions};

    #[test]
    fn test_insert_keys_by_cache_key() {
        let map = generate_for_debugging("x = 1", "x = 1", &MapOptions::default());
        let hash = map.cache_key.clone();
        let mut cache = SourceMapCache::new();
        assert!(cache.insert(map.clone()).is_none());
        assert!(cache.insert(map).is_some());
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&hash).is_some());
        assert!(cache.remove(&hash).is_some());
        assert!(cache.is_empty());

        // same content under other options is a separate entry
        let strict = MapOptions {
            min_confidence: 0.9,
            ..MapOptions::default()
        };
        cache.insert(generate_for_debugging("x = 1", "x = 1", &MapOptions::default()));
        cache.insert(generate_for_debugging("x = 1", "x = 1", &strict));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SourceMapCache::load_or_default(dir.path().join("none.json")).unwrap();
        assert!(cache.is_empty());
        assert!(matches!(
            SourceMapCache::load(dir.path().join("none.json")),
            Err(MapError::Io(_))
        ));
    }
}
