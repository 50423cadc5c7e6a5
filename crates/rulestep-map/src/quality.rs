//! Mapping quality gate
//!
//! Decides whether a generated source map is trustworthy enough to drive a
//! debugging session in the generated-code frame, and produces a verdict
//! (TRUSTED, DEGRADED, UNTRUSTED).

use crate::error::MapError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Thresholds a source map is checked against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingQualityProfile {
    /// Profile name (e.g., "strict", "lenient")
    pub name: String,

    /// Minimum mapped / instrumentable ratio (0.0 to 1.0)
    pub min_coverage: f32,

    /// Minimum mean confidence over mapped instrumentable lines
    pub min_average_confidence: f32,
}

impl MappingQualityProfile {
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            min_coverage: 0.8,
            min_average_confidence: 0.7,
        }
    }

    pub fn lenient() -> Self {
        Self {
            name: "lenient".to_string(),
            min_coverage: 0.5,
            min_average_confidence: 0.5,
        }
    }

    /// Built-in profile by name; unknown names get `strict`
    pub fn for_name(name: &str) -> Self {
        match name {
            "lenient" => Self::lenient(),
            _ => Self::strict(),
        }
    }

    /// Load profile from YAML
    pub fn from_yaml(yaml: &str) -> Result<Self, MapError> {
        let profile: Self =
            serde_yaml::from_str(yaml).map_err(|e| MapError::Profile(e.to_string()))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    fn validate(&self) -> Result<(), MapError> {
        for (field, value) in [
            ("min_coverage", self.min_coverage),
            ("min_average_confidence", self.min_average_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(MapError::Profile(format!(
                    "{field} must be within [0, 1], got {value}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MappingQualityProfile {
    fn default() -> Self {
        Self::strict()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingVerdict {
    /// Every check passed
    Trusted,
    /// Some checks failed; translated lines may be off
    Degraded,
    /// Nothing usable to debug against
    Untrusted,
}

impl MappingVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            MappingVerdict::Trusted => "TRUSTED",
            MappingVerdict::Degraded => "DEGRADED",
            MappingVerdict::Untrusted => "UNTRUSTED",
        }
    }
}

impl std::fmt::Display for MappingVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Ok,
    Fail,
}

/// Single check result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    pub total_instrumentable: usize,
    pub mapped: usize,
    /// mapped / total_instrumentable, 0.0 when nothing is instrumentable
    pub coverage: f32,
    pub average_confidence: f32,
    /// Instrumentable generated lines with no mapping
    pub gaps: Vec<u32>,
    pub verdict: MappingVerdict,
    pub checks: Vec<QualityCheck>,
    /// Profile used for evaluation
    pub profile: String,
}

impl QualityReport {
    /// Assemble a report from raw counts and grade it against `profile`
    pub fn evaluate(
        total_instrumentable: usize,
        mapped_confidences: &[f32],
        gaps: Vec<u32>,
        profile: &MappingQualityProfile,
    ) -> Self {
        let mapped = mapped_confidences.len();
        let coverage = if total_instrumentable == 0 {
            0.0
        } else {
            mapped as f32 / total_instrumentable as f32
        };
        let average_confidence = if mapped == 0 {
            0.0
        } else {
            mapped_confidences.iter().sum::<f32>() / mapped as f32
        };

        let mut checks = Vec::new();

        if total_instrumentable == 0 {
            checks.push(QualityCheck {
                name: "instrumentable_lines".to_string(),
                status: CheckStatus::Fail,
                message: "Generated code has no instrumentable lines".to_string(),
            });
        }

        checks.push(if coverage >= profile.min_coverage {
            QualityCheck {
                name: "coverage".to_string(),
                status: CheckStatus::Ok,
                message: format!("{mapped}/{total_instrumentable} lines mapped"),
            }
        } else {
            QualityCheck {
                name: "coverage".to_string(),
                status: CheckStatus::Fail,
                message: format!(
                    "Coverage {:.2} below {:.2} ({} unmapped)",
                    coverage,
                    profile.min_coverage,
                    gaps.len()
                ),
            }
        });

        checks.push(if average_confidence >= profile.min_average_confidence {
            QualityCheck {
                name: "average_confidence".to_string(),
                status: CheckStatus::Ok,
                message: format!("Average confidence {average_confidence:.2}"),
            }
        } else {
            QualityCheck {
                name: "average_confidence".to_string(),
                status: CheckStatus::Fail,
                message: format!(
                    "Average confidence {:.2} below {:.2}",
                    average_confidence, profile.min_average_confidence
                ),
            }
        });

        let failures = checks.iter().filter(|c| c.status == CheckStatus::Fail).count();
        let verdict = if total_instrumentable == 0 || mapped == 0 {
            MappingVerdict::Untrusted
        } else if failures == 0 {
            MappingVerdict::Trusted
        } else {
            MappingVerdict::Degraded
        };

        Self {
            total_instrumentable,
            mapped,
            coverage,
            average_confidence,
            gaps,
            verdict,
            checks,
            profile: profile.name.clone(),
        }
    }

    pub fn is_trusted(&self) -> bool {
        self.verdict == MappingVerdict::Trusted
    }

    /// One-line summary for a terminal or log line
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} lines mapped (coverage {:.0}%, avg confidence {:.2}, {} gaps)",
            self.verdict,
            self.mapped,
            self.total_instrumentable,
            self.coverage * 100.0,
            self.average_confidence,
            self.gaps.len()
        )
    }
}
