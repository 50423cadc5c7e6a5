//! Session configuration
use crate::error::DebugError;
use rulestep_map::{MapOptions, MappingQualityProfile};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Terminal transcript cap, oldest messages dropped first
    pub terminal_limit: usize,

    /// Execution trace cap
    pub trace_limit: usize,

    /// Only business-relevant variables reach the editor
    pub hide_irrelevant_variables: bool,

    /// Quality profile name used for `map` and `attach_generated_code`
    pub quality_profile: String,

    pub map: MapOptions,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            terminal_limit: 500,
            trace_limit: 1_000,
            hide_irrelevant_variables: true,
            quality_profile: "strict".to_string(),
            map: MapOptions::default(),
        }
    }
}

impl DebugConfig {
    /// Load config from YAML; missing keys take their defaults
    pub fn from_yaml(yaml: &str) -> Result<Self, DebugError> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| DebugError::Config(e.to_string()))?;
        if config.terminal_limit == 0 || config.trace_limit == 0 {
            return Err(DebugError::Config(
                "terminal_limit and trace_limit must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DebugError> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml(&yaml)
    }

    pub fn profile(&self) -> MappingQualityProfile {
        MappingQualityProfile::for_name(&self.quality_profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DebugConfig::default();
        assert_eq!(config.terminal_limit, 500);
        assert_eq!(config.trace_limit, 1_000);
        assert!(config.hide_irrelevant_variables);
        assert_eq!(config.map.min_confidence, 0.3);
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = "terminal_limit: 20\nquality_profile: lenient\nmap:\n  position_window: 10\n";
        let config = DebugConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.terminal_limit, 20);
        assert_eq!(config.trace_limit, 1_000);
        assert_eq!(config.map.position_window, 10);
        assert_eq!(config.map.instrumentation_threshold, 0.5);
        assert_eq!(config.profile(), MappingQualityProfile::lenient());
    }

    #[test]
    fn test_rejects_zero_caps() {
        assert!(matches!(
            DebugConfig::from_yaml("trace_limit: 0\n"),
            Err(DebugError::Config(_))
        ));
    }
}
