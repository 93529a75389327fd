//! Named threshold table shared by every classifier in the pipeline.
//!
//! Every section is `#[serde(default)]`, so a TOML file only needs to name
//! the values it overrides:
//!
//! ```toml
//! [status]
//! popular_min_popularity = 55.0
//!
//! [alerts]
//! isolation = 75.0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AnalysisError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub status: StatusThresholds,
    pub bullying: BullyingThresholds,
    pub risk: RiskThresholds,
    pub clusters: ClusterThresholds,
    pub alerts: AlertThresholds,
}

impl Thresholds {
    pub fn from_toml_str(content: &str, origin: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|source| AnalysisError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AnalysisError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }
}

/// Social status cut-offs, in percent. Evaluated popular, controversial,
/// rejected, isolated; the first match wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusThresholds {
    pub popular_min_popularity: f64,
    pub popular_max_rejection: f64,
    pub controversial_min_popularity: f64,
    pub controversial_min_rejection: f64,
    pub rejected_min_rejection: f64,
    pub isolated_min_isolation: f64,
}

impl Default for StatusThresholds {
    fn default() -> Self {
        Self {
            popular_min_popularity: 60.0,
            popular_max_rejection: 20.0,
            controversial_min_popularity: 40.0,
            controversial_min_rejection: 40.0,
            rejected_min_rejection: 50.0,
            isolated_min_isolation: 70.0,
        }
    }
}

/// Bullying role cut-offs, in relation counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BullyingThresholds {
    pub aggressor_min_aggression: usize,
    pub aggressor_max_victim_signals: usize,
    pub aggressive_victim_min_victim_signals: usize,
    pub victim_min_victim_signals: usize,
    pub bystander_min_choices: usize,
    /// Weight of outgoing aggression subtracted from popularity.
    pub influence_aggression_penalty: f64,
}

impl Default for BullyingThresholds {
    fn default() -> Self {
        Self {
            aggressor_min_aggression: 2,
            aggressor_max_victim_signals: 1,
            aggressive_victim_min_victim_signals: 1,
            victim_min_victim_signals: 2,
            bystander_min_choices: 3,
            influence_aggression_penalty: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub critical_victim_min_rejection: f64,
    pub medium_min_isolation: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            critical_victim_min_rejection: 60.0,
            medium_min_isolation: 60.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterThresholds {
    /// A non-reciprocal choice still counts as a strong tie at this intensity.
    pub strong_tie_min_intensity: u32,
    pub problematic_min_aggression_ratio: f64,
    pub positive_max_aggression_ratio: f64,
}

impl Default for ClusterThresholds {
    fn default() -> Self {
        Self {
            strong_tie_min_intensity: 2,
            problematic_min_aggression_ratio: 30.0,
            positive_max_aggression_ratio: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    pub isolation: f64,
    pub isolation_critical: f64,
    pub rejection: f64,
    pub rejection_critical: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            isolation: 80.0,
            isolation_critical: 95.0,
            rejection: 40.0,
            rejection_critical: 60.0,
        }
    }
}
