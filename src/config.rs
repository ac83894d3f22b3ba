//! Analysis configuration.
//!
//! Load thresholds, geometry settings and optimizer limits from TOML so a
//! region can be re-run with different norms without code changes.
//!
//! # Examples
//!
//! ```
//! use access_planner::config::AnalysisConfig;
//!
//! let config = AnalysisConfig::from_toml_str(r#"
//!     [optimizer]
//!     budget_count = 3
//!     time_limit_secs = 30
//!
//!     [[rules]]
//!     facility_type = "clinic"
//!     min_coverage_ratio = 0.9
//!
//!     [[rules.thresholds]]
//!     mode = "walk"
//!     max_cost = 25.0
//! "#).unwrap();
//!
//! assert_eq!(config.optimizer.budget_count, 3);
//! assert_eq!(config.ruleset().unwrap().len(), 1);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::candidates::CandidateOptions;
use crate::graph::TravelMode;
use crate::isochrone::IsochroneOptions;
use crate::optimizer::OptimizeOptions;
use crate::rules::{ComplianceRule, ComplianceRuleset};
use crate::validation::ValidationOptions;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid ruleset: {0}")]
    Rules(#[from] crate::error::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Number of new facilities to place.
    pub budget_count: usize,
    pub min_gain: f64,
    pub max_iterations: Option<usize>,
    pub time_limit_secs: Option<u64>,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            budget_count: 5,
            min_gain: 0.0,
            max_iterations: None,
            time_limit_secs: None,
        }
    }
}

impl OptimizerConfig {
    pub fn options(&self) -> OptimizeOptions {
        OptimizeOptions {
            min_gain: self.min_gain,
            max_iterations: self.max_iterations,
            time_limit: self.time_limit_secs.map(Duration::from_secs),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub isochrone: IsochroneOptions,
    pub optimizer: OptimizerConfig,
    pub candidates: CandidateOptions,
    pub validation: ValidationOptions,
    /// Empty means the regional defaults.
    pub rules: Vec<ComplianceRule>,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rules.is_empty() {
            ComplianceRuleset::new(self.rules.iter().cloned())?;
        }
        for mode in TravelMode::ALL {
            let width = *self.isochrone.half_width.get(mode);
            if !width.is_finite() || width < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "{mode} half_width must be finite and non-negative, got {width}"
                )));
            }
        }
        let tolerance = self.isochrone.simplify_tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "simplify_tolerance must be finite and non-negative, got {tolerance}"
            )));
        }
        if self.validation.match_radius.is_nan() || self.validation.match_radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "match_radius must be non-negative, got {}",
                self.validation.match_radius
            )));
        }
        if self.candidates.cluster_radius < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "cluster_radius must be non-negative, got {}",
                self.candidates.cluster_radius
            )));
        }
        Ok(())
    }

    pub fn ruleset(&self) -> Result<ComplianceRuleset, ConfigError> {
        if self.rules.is_empty() {
            return Ok(ComplianceRuleset::regional_defaults());
        }
        Ok(ComplianceRuleset::new(self.rules.iter().cloned())?)
    }

    pub fn with_budget_count(mut self, budget_count: usize) -> Self {
        self.optimizer.budget_count = budget_count;
        self
    }

    pub fn with_rule(mut self, rule: ComplianceRule) -> Self {
        self.rules.push(rule);
        self
    }
}
