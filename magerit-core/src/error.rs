//! Error types for the risk engine.

use thiserror::Error;

/// Top-level engine error.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error("simulation cancelled after {completed} of {requested} iterations")]
    SimulationCancelled { completed: usize, requested: usize },
    #[error("simulation worker failed: {0}")]
    Worker(String),
}

impl EngineError {
    /// True when the error is a caller cancellation rather than a fault.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EngineError::SimulationCancelled { .. })
    }
}

/// Configuration errors. Raised before any assessment or simulation runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("matrix levels must be positive")]
    NonPositiveLevels,
    #[error("risk level '{0}' is not assigned to any tolerance zone")]
    ToleranceGap(String),
    #[error("risk level '{0}' is assigned to more than one tolerance zone")]
    ToleranceOverlap(String),
    #[error("risk thresholds must be finite, strictly increasing and within (0, 1]: {0}")]
    Thresholds(String),
    #[error("iteration count must be positive")]
    ZeroIterations,
    #[error("iteration count {requested} exceeds the cap of {cap}")]
    IterationCap { requested: usize, cap: usize },
    #[error("confidence level must be in (0, 1), got {0}")]
    ConfidenceLevel(f64),
    #[error("time horizon must be a positive number of days, got {0}")]
    TimeHorizon(f64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
