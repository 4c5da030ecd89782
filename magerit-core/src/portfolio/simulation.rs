//! Monte Carlo loss simulation.
//!
//! Each trial realizes every risk independently as a Bernoulli event over
//! the time horizon and sums the potential losses of the risks that occur.
//! Every run owns its random stream and accumulator.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

use crate::audit::clamp_unit;
use crate::calculator::RiskAssessment;
use crate::error::{ConfigError, EngineError, Result};

/// Default number of trials per simulation.
pub const DEFAULT_ITERATIONS: usize = 10_000;

/// Default upper bound on trials per simulation.
pub const DEFAULT_ITERATION_CAP: usize = 100_000;

/// Days the probabilities in the catalogs refer to.
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Trials between cancellation checks and progress reports.
pub const CHECK_INTERVAL: usize = 1024;

const PERCENTILE_EPSILON: f64 = 1e-9;

/// Percentiles reported by [`LossDistribution`].
pub const REPORTED_PERCENTILES: [f64; 5] = [0.50, 0.75, 0.90, 0.95, 0.99];

/// What a single risk contributes to a trial.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LossExposure {
    /// Annual probability of occurrence.
    pub probability: f64,
    /// Loss when the risk occurs.
    pub loss: f64,
}

impl LossExposure {
    pub fn new(probability: f64, loss: f64) -> Self {
        Self { probability, loss }
    }

    /// Probability of at least one occurrence within `horizon_days`.
    pub fn over_horizon(&self, horizon_days: f64) -> f64 {
        let p = clamp_unit(self.probability);
        clamp_unit(1.0 - (1.0 - p).powf(horizon_days / DAYS_PER_YEAR))
    }
}

impl From<&RiskAssessment> for LossExposure {
    fn from(assessment: &RiskAssessment) -> Self {
        Self {
            probability: assessment.threat_probability(),
            loss: assessment.economic_impact().potential_loss,
        }
    }
}

/// Parameters of one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulationSettings {
    pub iterations: usize,
    pub max_iterations: usize,
    /// Fixed seed for reproducible runs; entropy-seeded when absent.
    pub seed: Option<u64>,
    pub horizon_days: f64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            max_iterations: DEFAULT_ITERATION_CAP,
            seed: None,
            horizon_days: DAYS_PER_YEAR,
        }
    }
}

impl SimulationSettings {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.iterations == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.iterations > self.max_iterations {
            return Err(ConfigError::IterationCap {
                requested: self.iterations,
                cap: self.max_iterations,
            });
        }
        if !self.horizon_days.is_finite() || self.horizon_days <= 0.0 {
            return Err(ConfigError::TimeHorizon(self.horizon_days));
        }
        Ok(())
    }
}

/// A validated simulator.
#[derive(Debug, Clone)]
pub struct MonteCarloSimulator {
    settings: SimulationSettings,
}

impl MonteCarloSimulator {
    pub fn new(settings: SimulationSettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self { settings })
    }

    pub fn settings(&self) -> &SimulationSettings {
        &self.settings
    }

    /// Run to completion and return trial losses sorted ascending.
    pub fn run(&self, exposures: &[LossExposure]) -> Result<Vec<f64>> {
        let never = AtomicBool::new(false);
        self.run_with(exposures, &never, |_| {})
    }

    /// Run with cooperative cancellation and progress callbacks.
    ///
    /// `on_progress` receives the number of completed trials every
    /// [`CHECK_INTERVAL`] trials and once at the end. A cancelled run
    /// returns [`EngineError::SimulationCancelled`], never partial samples.
    pub fn run_with(
        &self,
        exposures: &[LossExposure],
        cancel: &AtomicBool,
        mut on_progress: impl FnMut(usize),
    ) -> Result<Vec<f64>> {
        let requested = self.settings.iterations;
        let horizon = self.settings.horizon_days;
        let occurrence: Vec<(f64, f64)> = exposures
            .iter()
            .map(|e| (e.over_horizon(horizon), e.loss.max(0.0)))
            .collect();

        let mut rng = match self.settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut losses = Vec::with_capacity(requested);
        for completed in 0..requested {
            if completed % CHECK_INTERVAL == 0 {
                if cancel.load(Ordering::Relaxed) {
                    return Err(EngineError::SimulationCancelled {
                        completed,
                        requested,
                    });
                }
                if completed > 0 {
                    on_progress(completed);
                }
            }

            let mut total = 0.0;
            for &(probability, loss) in &occurrence {
                if rng.gen_bool(probability) {
                    total += loss;
                }
            }
            losses.push(total);
        }
        on_progress(requested);

        losses.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        debug!(
            iterations = requested,
            risks = exposures.len(),
            "Monte Carlo run complete"
        );
        Ok(losses)
    }
}

fn percentile_index(len: usize, confidence: f64) -> usize {
    let rank = (confidence * len as f64 - PERCENTILE_EPSILON).ceil();
    (rank.max(1.0) as usize - 1).min(len - 1)
}

/// Value at the `confidence` percentile of ascending samples. 0 when empty.
pub fn percentile(sorted: &[f64], confidence: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted[percentile_index(sorted.len(), confidence)]
}

/// Mean of the samples at or beyond the `confidence` percentile. 0 when empty.
pub fn tail_mean(sorted: &[f64], confidence: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let tail = &sorted[percentile_index(sorted.len(), confidence)..];
    tail.iter().sum::<f64>() / tail.len() as f64
}

/// Summary of a simulated loss distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossDistribution {
    pub iterations: usize,
    pub horizon_days: f64,
    pub mean: f64,
    pub std_dev: f64,
    pub max: f64,
    /// Share of trials with any loss.
    pub probability_of_loss: f64,
    /// `(percentile, loss)` pairs for [`REPORTED_PERCENTILES`].
    pub percentiles: Vec<(f64, f64)>,
}

impl LossDistribution {
    /// Summarize ascending trial losses.
    pub fn from_sorted(sorted: &[f64], horizon_days: f64) -> Self {
        let n = sorted.len();
        if n == 0 {
            return Self {
                iterations: 0,
                horizon_days,
                mean: 0.0,
                std_dev: 0.0,
                max: 0.0,
                probability_of_loss: 0.0,
                percentiles: REPORTED_PERCENTILES.iter().map(|&p| (p, 0.0)).collect(),
            };
        }

        let mean = sorted.iter().sum::<f64>() / n as f64;
        let variance = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
        let with_loss = sorted.iter().filter(|x| **x > 0.0).count();

        Self {
            iterations: n,
            horizon_days,
            mean,
            std_dev: variance.sqrt(),
            max: sorted[n - 1],
            probability_of_loss: with_loss as f64 / n as f64,
            percentiles: REPORTED_PERCENTILES
                .iter()
                .map(|&p| (p, percentile(sorted, p)))
                .collect(),
        }
    }

    /// Loss at a reported percentile.
    pub fn at(&self, percentile: f64) -> Option<f64> {
        self.percentiles
            .iter()
            .find(|(p, _)| (p - percentile).abs() < 1e-12)
            .map(|(_, loss)| *loss)
    }
}
