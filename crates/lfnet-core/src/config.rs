//! Topology engine configuration.
//!
//! [`TopologyConfig`] is read from TOML and supports partial files where
//! unspecified values use defaults:
//!
//! ```toml
//! low_impedance_threshold_ac = 1e-8
//! connectivity = "naive"
//!
//! [slack_bus_selection]
//! name = { ids = ["B1"] }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::element::LossModel;
use crate::error::{TopoError, TopoResult};
use crate::slack::{FirstBusSelector, MostMeshedSelector, NameSelector, SlackBusSelector};

pub const DEFAULT_LOW_IMPEDANCE_THRESHOLD: f64 = 1e-8;

/// Which [`crate::connectivity::GraphConnectivity`] implementation to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectivityAlgorithm {
    /// Full recompute on every query
    Naive,
    /// Component labels maintained incrementally with an undo log
    #[default]
    Incremental,
}

/// Slack bus selection, mapped to a [`SlackBusSelector`] by [`SlackBusSelection::selector`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlackBusSelection {
    First,
    #[default]
    MostMeshed,
    Name {
        ids: Vec<String>,
    },
}

impl SlackBusSelection {
    pub fn selector(&self) -> Box<dyn SlackBusSelector> {
        match self {
            SlackBusSelection::First => Box::new(FirstBusSelector),
            SlackBusSelection::MostMeshed => Box::new(MostMeshedSelector),
            SlackBusSelection::Name { ids } => Box::new(NameSelector::new(ids.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Impedance magnitude below which a branch is zero-impedance in AC (per unit)
    pub low_impedance_threshold_ac: f64,

    /// Reactance below which a branch is zero-impedance in DC (per unit)
    pub low_impedance_threshold_dc: f64,

    pub connectivity: ConnectivityAlgorithm,

    pub slack_bus_selection: SlackBusSelection,

    /// Models for which zero-impedance networks are maintained.
    pub zero_impedance_models: Vec<LossModel>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            low_impedance_threshold_ac: DEFAULT_LOW_IMPEDANCE_THRESHOLD,
            low_impedance_threshold_dc: DEFAULT_LOW_IMPEDANCE_THRESHOLD,
            connectivity: ConnectivityAlgorithm::default(),
            slack_bus_selection: SlackBusSelection::default(),
            zero_impedance_models: LossModel::ALL.to_vec(),
        }
    }
}

impl TopologyConfig {
    pub fn from_toml_str(text: &str) -> TopoResult<Self> {
        let config: TopologyConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> TopoResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> TopoResult<String> {
        toml::to_string_pretty(self).map_err(|e| TopoError::Config(e.to_string()))
    }

    pub fn validate(&self) -> TopoResult<()> {
        for (name, value) in [
            ("low_impedance_threshold_ac", self.low_impedance_threshold_ac),
            ("low_impedance_threshold_dc", self.low_impedance_threshold_dc),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(TopoError::Config(format!(
                    "{name} must be finite and non-negative, got {value}"
                )));
            }
        }
        if let SlackBusSelection::Name { ids } = &self.slack_bus_selection {
            if ids.is_empty() {
                return Err(TopoError::Config(
                    "slack_bus_selection.name requires at least one id".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn threshold(&self, model: LossModel) -> f64 {
        match model {
            LossModel::Ac => self.low_impedance_threshold_ac,
            LossModel::Dc => self.low_impedance_threshold_dc,
        }
    }

    pub fn tracks_zero_impedance(&self, model: LossModel) -> bool {
        self.zero_impedance_models.contains(&model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = TopologyConfig::from_toml_str("connectivity = \"naive\"").unwrap();
        assert_eq!(config.connectivity, ConnectivityAlgorithm::Naive);
        assert_eq!(config.low_impedance_threshold_dc, DEFAULT_LOW_IMPEDANCE_THRESHOLD);
        assert_eq!(config.slack_bus_selection, SlackBusSelection::MostMeshed);
        assert_eq!(config.zero_impedance_models.len(), 2);
    }

    #[test]
    fn test_named_slack_selection() {
        let text = r#"
            zero_impedance_models = ["dc"]

            [slack_bus_selection.name]
            ids = ["B7"]
        "#;
        let config = TopologyConfig::from_toml_str(text).unwrap();
        assert_eq!(
            config.slack_bus_selection,
            SlackBusSelection::Name {
                ids: vec!["B7".into()]
            }
        );
        assert!(config.tracks_zero_impedance(LossModel::Dc));
        assert!(!config.tracks_zero_impedance(LossModel::Ac));
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let err = TopologyConfig::from_toml_str("low_impedance_threshold_ac = -1.0").unwrap_err();
        assert!(matches!(err, TopoError::Config(_)));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("topology.toml");
        let config = TopologyConfig {
            low_impedance_threshold_ac: 1e-6,
            ..TopologyConfig::default()
        };
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();
        assert_eq!(TopologyConfig::load(&path).unwrap(), config);
    }
}
