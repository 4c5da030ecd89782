//! Magerit Core: quantitative risk scoring and aggregation engine.
//!
//! Turns asset valuation × threat probability × vulnerability level into an
//! adjusted risk score, classifies it, places it on a probability/impact
//! matrix with tolerance zones, and aggregates many scores into portfolio
//! statistics (Value-at-Risk, Expected Shortfall, Monte Carlo loss
//! distributions).
//!
//! The engine is computation-only. Catalogs, persistence and presentation
//! belong to the caller.

pub mod audit;
pub mod calculator;
pub mod classifier;
pub mod config;
pub mod engine;
pub mod error;
pub mod impact;
pub mod matrix;
pub mod portfolio;
pub mod valuation;

// Re-exports for convenience
pub use audit::{OutOfRangeInput, audit_inputs};
pub use calculator::{
    EconomicImpact, ResidualRisk, RiskAssessment, RiskCalculator, RiskKey, RiskScenario, RiskTrend,
};
pub use classifier::{RiskLevel, RiskThresholds, classify};
pub use config::{EngineConfig, load_config};
pub use engine::RiskEngine;
pub use error::{ConfigError, EngineError};
pub use impact::{UNVALUED_ASSET_IMPACT, aggregate_impact, dimension_breakdown};
pub use matrix::{MatrixCell, RiskMatrix, ToleranceZone, ToleranceZones};
pub use portfolio::job::{SimulationHandle, SimulationJob, SimulationProgress};
pub use portfolio::simulation::{LossDistribution, LossExposure, MonteCarloSimulator, SimulationSettings};
pub use portfolio::{PortfolioAggregator, PortfolioSnapshot, RankedRisk, VarResult};
pub use valuation::{Asset, ContextFactors, Dimension, DimensionWeights, Threat, Valuation, Vulnerability};
