//! Source Map Generator
//!
//! Pipeline: parse generated code → parse rule blocks → match → hash both
//! inputs → assemble a [`SourceMap`].

use crate::blocks::{parse_rule_blocks, RuleBlock};
use crate::cache::SourceMapCache;
use crate::matcher::best_match;
use crate::source_map::{SourceMap, StatementMapping};
use crate::target::{parse_target_code, TargetStatement};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Longest rule text quoted in a mapping description
const DESCRIPTION_TEXT_LIMIT: usize = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Inclusive floor below which a line stays unmapped
    pub min_confidence: f32,
    /// Exclusive bound for instrumentation lines
    pub instrumentation_threshold: f32,
    /// Line distance at which the position score reaches zero
    pub position_window: u32,
    pub cache_enabled: bool,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            min_confidence: 0.3,
            instrumentation_threshold: 0.5,
            position_window: 20,
            cache_enabled: true,
        }
    }
}

/// Hash of a (generated, origin) pair
pub fn content_hash(generated_code: &str, origin_code: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(generated_code.as_bytes());
    hasher.update(b"\0");
    hasher.update(origin_code.as_bytes());
    format!("blake3:{}", hasher.finalize())
}

/// Cache key: the content hash plus every option that changes the map.
/// `cache_enabled` is left out.
pub fn cache_key(content_hash: &str, options: &MapOptions) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(content_hash.as_bytes());
    hasher.update(&options.min_confidence.to_bits().to_le_bytes());
    hasher.update(&options.instrumentation_threshold.to_bits().to_le_bytes());
    hasher.update(&options.position_window.to_le_bytes());
    format!("blake3:{}", hasher.finalize())
}

/// Build a source map from scratch, no caching
pub fn generate_for_debugging(generated_code: &str, origin_code: &str, options: &MapOptions) -> SourceMap {
    let targets = parse_target_code(generated_code);
    let blocks = parse_rule_blocks(origin_code);

    let mut mappings = Vec::new();
    let mut instrumentable_lines = Vec::new();

    for statement in targets.iter().filter(|s| s.is_instrumentable) {
        instrumentable_lines.push(statement.line);
        match best_match(statement, &blocks, options) {
            Some(found) => mappings.push(StatementMapping {
                generated_line: statement.line,
                origin_line: found.block.line,
                confidence: found.confidence(),
                description: describe(found.block),
                variables: mapping_variables(statement, &found.shared_variables),
                score: found.score,
            }),
            None => tracing::debug!(line = statement.line, text = %statement.text, "no rule block above confidence floor"),
        }
    }

    let hash = content_hash(generated_code, origin_code);
    SourceMap {
        mappings,
        generated_statement_count: targets.len(),
        instrumentable_lines,
        origin_block_count: blocks.len(),
        generated_at: Utc::now(),
        cache_key: cache_key(&hash, options),
        content_hash: hash,
        instrumentation_threshold: options.instrumentation_threshold,
    }
}

fn describe(block: &RuleBlock) -> String {
    let text: String = if block.text.chars().count() > DESCRIPTION_TEXT_LIMIT {
        let head: String = block.text.chars().take(DESCRIPTION_TEXT_LIMIT).collect();
        format!("{head}...")
    } else {
        block.text.clone()
    };
    format!("{} `{}` (rule line {})", block.kind.as_str(), text, block.line)
}

/// Shared names, or the generated line's own names when nothing is shared
fn mapping_variables(statement: &TargetStatement, shared: &BTreeSet<String>) -> BTreeSet<String> {
    if shared.is_empty() {
        statement.variables().cloned().collect()
    } else {
        shared.clone()
    }
}

/// Generator with a cache keyed by content and options
#[derive(Debug, Default)]
pub struct SourceMapGenerator {
    options: MapOptions,
    cache: SourceMapCache,
}

impl SourceMapGenerator {
    pub fn new(options: MapOptions) -> Self {
        Self {
            options,
            cache: SourceMapCache::default(),
        }
    }

    pub fn with_cache(options: MapOptions, cache: SourceMapCache) -> Self {
        Self { options, cache }
    }

    pub fn options(&self) -> &MapOptions {
        &self.options
    }

    pub fn cache(&self) -> &SourceMapCache {
        &self.cache
    }

    pub fn into_cache(self) -> SourceMapCache {
        self.cache
    }

    /// Cached map for identical inputs and options, otherwise a fresh one
    pub fn generate(&mut self, generated_code: &str, origin_code: &str) -> SourceMap {
        let key = cache_key(&content_hash(generated_code, origin_code), &self.options);

        if self.options.cache_enabled {
            if let Some(map) = self.cache.get(&key) {
                tracing::debug!(hash = %key, "source map cache hit");
                return map.clone();
            }
        }

        let map = generate_for_debugging(generated_code, origin_code, &self.options);
        tracing::info!(
            hash = %map.content_hash,
            mapped = map.mappings.len(),
            instrumentable = map.instrumentable_lines.len(),
            blocks = map.origin_block_count,
            "source map generated"
        );

        if self.options.cache_enabled {
            self.cache.insert(map.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_stable_and_input_sensitive() {
        let a = content_hash("x = 1", "x = 1");
        assert_eq!(a, content_hash("x = 1", "x = 1"));
        assert!(a.starts_with("blake3:"));
        assert_ne!(a, content_hash("x = 1\n", "x = 1"));
        // the separator keeps the two inputs apart
        assert_ne!(content_hash("ab", "c"), content_hash("a", "bc"));
    }

    #[test]
    fn test_options_default_from_partial_yaml() {
        let options: MapOptions = serde_yaml::from_str("position_window: 5\n").unwrap();
        assert_eq!(options.position_window, 5);
        assert_eq!(options.min_confidence, 0.3);
        assert!(options.cache_enabled);
    }

    #[test]
    fn test_generator_caches_by_content() {
        let mut generator = SourceMapGenerator::new(MapOptions::default());
        let first = generator.generate("x = 1", "x = 1");
        let second = generator.generate("x = 1", "x = 1");
        assert_eq!(first.generated_at, second.generated_at);
        assert_eq!(generator.cache().len(), 1);

        let mut uncached = SourceMapGenerator::new(MapOptions {
            cache_enabled: false,
            ..MapOptions::default()
        });
        uncached.generate("x = 1", "x = 1");
        assert!(uncached.cache().is_empty());
    }

    #[test]
    fn test_cached_map_not_reused_under_other_options() {
        let generated = "total = price * qty\nlabel = 'x'";
        let origin = "total = price * qty\nname = 'y'";

        let mut loose = SourceMapGenerator::new(MapOptions::default());
        let cached = loose.generate(generated, origin);
        assert_eq!(cached.mappings.len(), 2);

        let strict = MapOptions {
            min_confidence: 0.95,
            instrumentation_threshold: 0.9,
            ..MapOptions::default()
        };
        let mut reloaded = SourceMapGenerator::with_cache(strict.clone(), loose.into_cache());
        let fresh = reloaded.generate(generated, origin);
        assert_eq!(fresh.content_hash, cached.content_hash);
        assert_ne!(fresh.cache_key, cached.cache_key);
        assert_eq!(fresh.mappings.len(), 1);
        assert_eq!(fresh.instrumentation_threshold, 0.9);
        assert_eq!(reloaded.cache().len(), 2);

        // same content and options hits the entry just built
        let again = reloaded.generate(generated, origin);
        assert_eq!(again.generated_at, fresh.generated_at);
    }

    #[test]
    fn test_description_names_rule_line() {
        let map = generate_for_debugging("total = price * qty", "total = price * qty", &MapOptions::default());
        assert_eq!(
            map.description(1),
            Some("assignment `total = price * qty` (rule line 1)")
        );
        let vars = map.variables_at(1).unwrap();
        assert_eq!(vars.len(), 3);
    }
}
