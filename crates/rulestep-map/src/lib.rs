//! Rulestep Map: line alignment between generated code and rule source
//!
//! The rule interpreter runs rule source directly, but a runtime that
//! executes the compiled code reports generated-code lines. This crate
//! parses both texts independently, scores every instrumentable generated
//! line against every rule block and keeps the best match above a floor.
//!
//! # Example
//!
//! ```ignore
//! use rulestep_map::{generate_for_debugging, MapOptions, MappingQualityProfile};
//!
//! let map = generate_for_debugging(generated, rules, &MapOptions::default());
//! let report = map.quality_report(&MappingQualityProfile::strict());
//! if report.is_trusted() {
//!     let rule_line = map.origin_line(12);
//! }
//! ```

pub mod blocks;
pub mod cache;
pub mod error;
pub mod generator;
pub mod matcher;
pub mod quality;
pub mod source_map;
pub mod target;

pub use blocks::{parse_rule_blocks, RuleBlock};
pub use cache::SourceMapCache;
pub use error::MapError;
pub use generator::{cache_key, content_hash, generate_for_debugging, MapOptions, SourceMapGenerator};
pub use matcher::{best_match, BlockMatch, ScoreBreakdown};
pub use quality::{CheckStatus, MappingQualityProfile, MappingVerdict, QualityCheck, QualityReport};
pub use source_map::{SourceMap, StatementMapping};
pub use target::{parse_target_code, parse_target_line, TargetStatement};
