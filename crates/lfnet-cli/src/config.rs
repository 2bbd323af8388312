//! CLI configuration file.
//!
//! ```toml
//! [topology]
//! low_impedance_threshold_ac = 1e-8
//! connectivity = "incremental"
//!
//! [security]
//! check_consistency = true
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use lfnet_algo::SecurityAnalysisConfig;
use lfnet_core::TopologyConfig;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub topology: TopologyConfig,
    pub security: SecurityAnalysisConfig,
}

impl CliConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: CliConfig = toml::from_str(text)?;
        config.topology.validate()?;
        Ok(config)
    }

    /// Load from `path`, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lfnet_core::ConnectivityAlgorithm;

    #[test]
    fn test_partial_sections_use_defaults() {
        let config = CliConfig::from_toml_str(
            r#"
            [topology]
            connectivity = "naive"
            "#,
        )
        .unwrap();
        assert_eq!(config.topology.connectivity, ConnectivityAlgorithm::Naive);
        assert_eq!(config.security, SecurityAnalysisConfig::default());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = CliConfig::from_toml_str("[topology]\nlow_impedance_threshold_ac = -1.0").unwrap_err();
        assert!(err.to_string().contains("low_impedance_threshold_ac"));
    }

    #[test]
    fn test_round_trip_through_toml() {
        let config = CliConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(CliConfig::from_toml_str(&text).unwrap(), config);
    }
}
