//! Portfolio aggregation over a set of risk assessments.
//!
//! The aggregator borrows the assessments and never mutates them. Every
//! query recomputes from the current set.

pub mod job;
pub mod simulation;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::calculator::{RiskAssessment, RiskKey};
use crate::classifier::RiskLevel;
use crate::error::{ConfigError, Result};
use job::{SimulationHandle, SimulationJob};
use simulation::{
    DAYS_PER_YEAR, LossDistribution, LossExposure, MonteCarloSimulator, SimulationSettings,
    percentile, tail_mean,
};

/// Annual horizon, the unit catalog probabilities are expressed in.
pub const ANNUAL_HORIZON_DAYS: f64 = DAYS_PER_YEAR;

/// Default number of entries in [`PortfolioSnapshot::top_risks`].
pub const DEFAULT_TOP_RISKS: usize = 10;

/// A risk in the top-risks ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedRisk {
    pub key: RiskKey,
    pub adjusted_risk: f64,
    pub risk_level: RiskLevel,
    pub expected_loss: f64,
}

/// Point-in-time statistics over a set of assessments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub total_risks: usize,
    /// Count per level. All five levels are present.
    pub counts_by_level: BTreeMap<RiskLevel, usize>,
    pub mean_adjusted_risk: f64,
    pub aggregate_expected_loss: f64,
    pub total_potential_loss: f64,
    pub total_annualized_loss: f64,
    /// Highest adjusted risks first.
    pub top_risks: Vec<RankedRisk>,
}

/// Value-at-Risk and Expected Shortfall for one confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarResult {
    pub var: f64,
    pub expected_shortfall: f64,
    pub confidence_level: f64,
    pub horizon_days: f64,
    /// Trials behind the figures; 0 for an empty portfolio.
    pub iterations: usize,
    pub mean_loss: f64,
}

impl VarResult {
    fn empty(confidence_level: f64, horizon_days: f64) -> Self {
        Self {
            var: 0.0,
            expected_shortfall: 0.0,
            confidence_level,
            horizon_days,
            iterations: 0,
            mean_loss: 0.0,
        }
    }

    /// Summarize ascending trial losses.
    pub fn from_sorted(sorted: &[f64], confidence_level: f64, horizon_days: f64) -> Self {
        if sorted.is_empty() {
            return Self::empty(confidence_level, horizon_days);
        }
        Self {
            var: percentile(sorted, confidence_level),
            expected_shortfall: tail_mean(sorted, confidence_level),
            confidence_level,
            horizon_days,
            iterations: sorted.len(),
            mean_loss: sorted.iter().sum::<f64>() / sorted.len() as f64,
        }
    }
}

/// Aggregates a borrowed collection of assessments.
#[derive(Debug, Clone)]
pub struct PortfolioAggregator<'a> {
    risks: &'a [RiskAssessment],
    settings: SimulationSettings,
    top_n: usize,
}

impl<'a> PortfolioAggregator<'a> {
    pub fn new(risks: &'a [RiskAssessment]) -> Self {
        Self {
            risks,
            settings: SimulationSettings::default(),
            top_n: DEFAULT_TOP_RISKS,
        }
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.settings.iterations = iterations;
        self
    }

    pub fn with_iteration_cap(mut self, cap: usize) -> Self {
        self.settings.max_iterations = cap;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.settings.seed = seed;
        self
    }

    pub fn with_top_risks(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn risks(&self) -> &'a [RiskAssessment] {
        self.risks
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Counts per level, mean adjusted risk, and loss totals.
    pub fn distribution_statistics(&self) -> PortfolioSnapshot {
        let mut counts_by_level: BTreeMap<RiskLevel, usize> =
            RiskLevel::ALL.into_iter().map(|l| (l, 0)).collect();
        let mut risk_sum = 0.0;
        let mut expected = 0.0;
        let mut potential = 0.0;
        let mut annualized = 0.0;

        for risk in self.risks {
            *counts_by_level.entry(risk.risk_level()).or_default() += 1;
            risk_sum += risk.adjusted_risk();
            let econ = risk.economic_impact();
            expected += econ.expected_loss;
            potential += econ.potential_loss;
            annualized += econ.annualized_loss;
        }

        let total_risks = self.risks.len();
        let mean_adjusted_risk = if total_risks == 0 {
            0.0
        } else {
            risk_sum / total_risks as f64
        };

        let mut top_risks: Vec<RankedRisk> = self
            .risks
            .iter()
            .map(|r| RankedRisk {
                key: r.key().clone(),
                adjusted_risk: r.adjusted_risk(),
                risk_level: r.risk_level(),
                expected_loss: r.economic_impact().expected_loss,
            })
            .collect();
        top_risks.sort_by(|a, b| {
            b.adjusted_risk
                .partial_cmp(&a.adjusted_risk)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        top_risks.truncate(self.top_n);

        PortfolioSnapshot {
            total_risks,
            counts_by_level,
            mean_adjusted_risk,
            aggregate_expected_loss: expected,
            total_potential_loss: potential,
            total_annualized_loss: annualized,
            top_risks,
        }
    }

    /// Monte Carlo VaR and ES at `confidence_level` over `horizon_days`.
    ///
    /// Runs on the calling thread; see [`Self::spawn_value_at_risk`] for a
    /// background, cancellable run.
    pub fn value_at_risk(&self, confidence_level: f64, horizon_days: f64) -> Result<VarResult> {
        let simulator = self.simulator(confidence_level, horizon_days)?;
        if self.risks.is_empty() {
            return Ok(VarResult::empty(confidence_level, horizon_days));
        }
        let losses = simulator.run(&self.exposures())?;
        Ok(VarResult::from_sorted(&losses, confidence_level, horizon_days))
    }

    /// Start VaR on the blocking pool. Configuration errors, and a missing
    /// tokio runtime, surface here before any work is scheduled. An empty
    /// portfolio resolves to the same zero result as [`Self::value_at_risk`].
    pub fn spawn_value_at_risk(
        &self,
        confidence_level: f64,
        horizon_days: f64,
    ) -> Result<SimulationHandle<VarResult>> {
        let simulator = self.simulator(confidence_level, horizon_days)?;
        if self.risks.is_empty() {
            return SimulationJob::ready(VarResult::empty(confidence_level, horizon_days));
        }
        debug!(
            risks = self.risks.len(),
            confidence_level, horizon_days, "Spawning VaR simulation"
        );
        SimulationJob::spawn(simulator, self.exposures(), move |losses| {
            VarResult::from_sorted(&losses, confidence_level, horizon_days)
        })
    }

    /// Simulated loss distribution of the whole portfolio.
    pub fn loss_distribution(&self, horizon_days: f64) -> Result<LossDistribution> {
        let simulator = self.simulator_for(horizon_days)?;
        if self.risks.is_empty() {
            return Ok(LossDistribution::from_sorted(&[], horizon_days));
        }
        let losses = simulator.run(&self.exposures())?;
        Ok(LossDistribution::from_sorted(&losses, horizon_days))
    }

    /// Simulated loss distribution of one assessment, using this
    /// aggregator's simulation settings.
    pub fn simulate_single(
        &self,
        assessment: &RiskAssessment,
        horizon_days: f64,
    ) -> Result<LossDistribution> {
        let simulator = self.simulator_for(horizon_days)?;
        let losses = simulator.run(&[LossExposure::from(assessment)])?;
        Ok(LossDistribution::from_sorted(&losses, horizon_days))
    }

    fn exposures(&self) -> Vec<LossExposure> {
        self.risks.iter().map(LossExposure::from).collect()
    }

    fn simulator(&self, confidence_level: f64, horizon_days: f64) -> Result<MonteCarloSimulator> {
        if !(confidence_level > 0.0 && confidence_level < 1.0) {
            return Err(ConfigError::ConfidenceLevel(confidence_level).into());
        }
        self.simulator_for(horizon_days)
    }

    fn simulator_for(&self, horizon_days: f64) -> Result<MonteCarloSimulator> {
        MonteCarloSimulator::new(SimulationSettings {
            horizon_days,
            ..self.settings
        })
    }
}
