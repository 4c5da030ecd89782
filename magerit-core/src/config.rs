//! Configuration for the risk engine.
//!
//! Uses `figment` for layered configuration: defaults -> user config ->
//! workspace config -> explicit file -> environment -> overrides.
//! Configuration is loaded from `~/.config/magerit/config.toml` and/or
//! `.magerit/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classifier::RiskThresholds;
use crate::error::ConfigError;
use crate::matrix::{DEFAULT_MATRIX_LEVELS, ToleranceZones};
use crate::portfolio::DEFAULT_TOP_RISKS;
use crate::portfolio::simulation::{DEFAULT_ITERATION_CAP, DEFAULT_ITERATIONS};

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Size of the N×N risk matrix.
    pub matrix_levels: usize,
    /// Trials per Monte Carlo simulation.
    pub monte_carlo_iterations: usize,
    /// Upper bound accepted for `monte_carlo_iterations`.
    pub max_iterations: usize,
    /// Seed used when a caller does not pass one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_seed: Option<u64>,
    /// Entries in the portfolio top-risks ranking.
    pub top_risks: usize,
    /// Lower bounds of each risk level.
    pub risk_thresholds: RiskThresholds,
    /// Assignment of risk levels to tolerance zones.
    pub tolerance_zones: ToleranceZones,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            matrix_levels: DEFAULT_MATRIX_LEVELS,
            monte_carlo_iterations: DEFAULT_ITERATIONS,
            max_iterations: DEFAULT_ITERATION_CAP,
            default_seed: None,
            top_risks: DEFAULT_TOP_RISKS,
            risk_thresholds: RiskThresholds::DEFAULT,
            tolerance_zones: ToleranceZones::default(),
        }
    }
}

impl EngineConfig {
    /// Run every configuration check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix_levels == 0 {
            return Err(ConfigError::NonPositiveLevels);
        }
        self.risk_thresholds.validate()?;
        self.tolerance_zones.validate()?;
        if self.monte_carlo_iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.monte_carlo_iterations > self.max_iterations {
            return Err(ConfigError::IterationCap {
                requested: self.monte_carlo_iterations,
                cap: self.max_iterations,
            });
        }
        Ok(())
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `MAGERIT_`)
/// 3. Explicit config file
/// 4. Workspace-local config (`.magerit/config.toml`)
/// 5. User config (`~/.config/magerit/config.toml`)
/// 6. Built-in defaults
///
/// The result is not validated; call [`EngineConfig::validate`] or hand it
/// to [`crate::RiskEngine::new`].
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&EngineConfig>,
) -> Result<EngineConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "magerit", "magerit") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".magerit").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    if let Some(file) = config_file {
        figment = figment.merge(Toml::file(file));
    }

    // Environment variables (MAGERIT_MATRIX_LEVELS, MAGERIT_RISK_THRESHOLDS__HIGH, etc.)
    figment = figment.merge(Env::prefixed("MAGERIT_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Render a configuration as TOML.
pub fn to_toml(config: &EngineConfig) -> Result<String, toml::ser::Error> {
    toml::to_string_pretty(config)
}
