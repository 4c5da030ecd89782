//! Risk classification: adjusted risk → ordinal risk level.

use serde::{Deserialize, Serialize};

use crate::audit::clamp_unit;
use crate::error::ConfigError;

/// Ordinal risk level, ordered from `VeryLow` to `Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    VeryLow,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// All levels in ascending order.
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::VeryLow,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    /// Position in the ordering, 0 for `VeryLow` through 4 for `Critical`.
    pub fn rank(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::VeryLow => "very_low",
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive lower bounds of each level above `VeryLow`.
///
/// Organizations may tune these to their risk appetite; the defaults match
/// existing dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
    pub critical: f64,
}

impl RiskThresholds {
    pub const DEFAULT: RiskThresholds = RiskThresholds {
        low: 0.2,
        medium: 0.4,
        high: 0.6,
        critical: 0.8,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        let bounds = [self.low, self.medium, self.high, self.critical];
        if bounds.iter().any(|b| !b.is_finite() || *b <= 0.0 || *b > 1.0) {
            return Err(ConfigError::Thresholds(format!(
                "{bounds:?} must lie within (0, 1]"
            )));
        }
        if bounds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ConfigError::Thresholds(format!(
                "{bounds:?} must be strictly increasing"
            )));
        }
        Ok(())
    }

    /// Classify a risk value. Values outside [0, 1] are clamped first.
    pub fn classify(&self, risk: f64) -> RiskLevel {
        let risk = clamp_unit(risk);
        if risk >= self.critical {
            RiskLevel::Critical
        } else if risk >= self.high {
            RiskLevel::High
        } else if risk >= self.medium {
            RiskLevel::Medium
        } else if risk >= self.low {
            RiskLevel::Low
        } else {
            RiskLevel::VeryLow
        }
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Classify with the default thresholds.
pub fn classify(risk: f64) -> RiskLevel {
    RiskThresholds::DEFAULT.classify(risk)
}
