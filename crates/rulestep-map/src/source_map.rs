//! Source Map: confidence-scored line alignment and its queries
use crate::matcher::ScoreBreakdown;
use crate::quality::{MappingQualityProfile, QualityReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One generated line attributed to one rule line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementMapping {
    pub generated_line: u32,
    pub origin_line: u32,
    /// In [0, 1], the clamped sum of `score`
    pub confidence: f32,
    pub description: String,
    pub variables: BTreeSet<String>,
    pub score: ScoreBreakdown,
}

/// Immutable once generated; regenerate when either input changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceMap {
    /// Sorted by generated line
    pub mappings: Vec<StatementMapping>,
    pub generated_statement_count: usize,
    /// Every instrumentable generated line, mapped or not
    pub instrumentable_lines: Vec<u32>,
    pub origin_block_count: usize,
    pub generated_at: DateTime<Utc>,
    pub content_hash: String,
    /// `content_hash` combined with the matching options; the cache key
    pub cache_key: String,
    /// Exclusive confidence bound for `instrumentation_lines`
    pub instrumentation_threshold: f32,
}

impl SourceMap {
    pub fn mapping_for(&self, generated_line: u32) -> Option<&StatementMapping> {
        self.mappings
            .binary_search_by_key(&generated_line, |m| m.generated_line)
            .ok()
            .map(|index| &self.mappings[index])
    }

    /// Rule line for a generated line
    pub fn origin_line(&self, generated_line: u32) -> Option<u32> {
        self.mapping_for(generated_line).map(|m| m.origin_line)
    }

    pub fn description(&self, generated_line: u32) -> Option<&str> {
        self.mapping_for(generated_line).map(|m| m.description.as_str())
    }

    /// Variables implicated at a generated line
    pub fn variables_at(&self, generated_line: u32) -> Option<&BTreeSet<String>> {
        self.mapping_for(generated_line).map(|m| &m.variables)
    }

    /// Generated lines mapped confidently enough to instrument
    pub fn instrumentation_lines(&self) -> Vec<u32> {
        self.mappings
            .iter()
            .filter(|m| m.confidence > self.instrumentation_threshold)
            .map(|m| m.generated_line)
            .collect()
    }

    /// Generated lines mapped to a rule line, ascending
    pub fn generated_lines_for(&self, origin_line: u32) -> Vec<u32> {
        self.mappings
            .iter()
            .filter(|m| m.origin_line == origin_line)
            .map(|m| m.generated_line)
            .collect()
    }

    /// Instrumentable lines left without a mapping
    pub fn gaps(&self) -> Vec<u32> {
        self.instrumentable_lines
            .iter()
            .copied()
            .filter(|line| self.mapping_for(*line).is_none())
            .collect()
    }

    pub fn quality_report(&self, profile: &MappingQualityProfile) -> QualityReport {
        let confidences: Vec<f32> = self.mappings.iter().map(|m| m.confidence).collect();
        QualityReport::evaluate(
            self.instrumentable_lines.len(),
            &confidences,
            self.gaps(),
            profile,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
