//! A configured engine bundling the calculator, matrix and portfolio settings.

use tracing::info;

use crate::calculator::{RiskAssessment, RiskCalculator, RiskScenario};
use crate::classifier::RiskLevel;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::matrix::RiskMatrix;
use crate::portfolio::PortfolioAggregator;
use crate::valuation::{Asset, ContextFactors, Threat, Vulnerability};

/// Risk engine built from a validated [`EngineConfig`].
///
/// Construction fails on any invalid setting, so no assessment is ever
/// computed against a bad configuration.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    config: EngineConfig,
    calculator: RiskCalculator,
    matrix: RiskMatrix,
}

impl RiskEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let matrix = RiskMatrix::build(
            config.matrix_levels,
            &config.tolerance_zones,
            &config.risk_thresholds,
        )?;
        info!(
            matrix_levels = config.matrix_levels,
            iterations = config.monte_carlo_iterations,
            "Risk engine configured"
        );
        Ok(Self {
            calculator: RiskCalculator::new(config.risk_thresholds),
            matrix,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn calculator(&self) -> &RiskCalculator {
        &self.calculator
    }

    pub fn matrix(&self) -> &RiskMatrix {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut RiskMatrix {
        &mut self.matrix
    }

    pub fn classify(&self, risk: f64) -> RiskLevel {
        self.config.risk_thresholds.classify(risk)
    }

    pub fn assess(
        &self,
        asset: &Asset,
        threat: &Threat,
        vulnerability: &Vulnerability,
        factors: ContextFactors,
    ) -> RiskAssessment {
        self.calculator.assess(asset, threat, vulnerability, factors)
    }

    pub fn assess_batch(&self, scenarios: &[RiskScenario<'_>]) -> Vec<RiskAssessment> {
        self.calculator.assess_batch(scenarios)
    }

    /// Assess a batch and place every result in the matrix.
    pub fn assess_and_place(&mut self, scenarios: &[RiskScenario<'_>]) -> Vec<RiskAssessment> {
        let assessments = self.calculator.assess_batch(scenarios);
        for assessment in &assessments {
            self.matrix.place(assessment);
        }
        assessments
    }

    /// A portfolio aggregator using the configured simulation settings.
    pub fn portfolio<'a>(&self, risks: &'a [RiskAssessment]) -> PortfolioAggregator<'a> {
        PortfolioAggregator::new(risks)
            .with_iterations(self.config.monte_carlo_iterations)
            .with_iteration_cap(self.config.max_iterations)
            .with_seed(self.config.default_seed)
            .with_top_risks(self.config.top_risks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::ToleranceZones;
    use crate::valuation::{DimensionWeights, Valuation};

    #[test]
    fn test_invalid_config_fails_construction() {
        let config = EngineConfig {
            tolerance_zones: ToleranceZones {
                unacceptable: vec![],
                ..ToleranceZones::default()
            },
            ..Default::default()
        };
        let err = RiskEngine::new(config).unwrap_err();
        assert!(err.to_string().contains("not assigned"));
    }

    #[test]
    fn test_assess_and_place() {
        let mut engine = RiskEngine::new(EngineConfig::default()).unwrap();
        let asset = Asset::new("A1", Valuation::new(8.0, 6.0, 4.0, 2.0, 2.0));
        let threat = Threat::new("T1", 0.6);
        let vuln = Vulnerability::new("V1", 0.7, DimensionWeights::new(1.0, 0.5, 0.0, 0.0, 0.0));
        let scenarios = [RiskScenario {
            asset: &asset,
            threat: &threat,
            vulnerability: &vuln,
            factors: ContextFactors::new(1.1, 1.0),
        }];

        let results = engine.assess_and_place(&scenarios);
        assert_eq!(results[0].risk_level(), RiskLevel::Low);
        let cell = engine.matrix().cell_of(results[0].key()).unwrap();
        assert_eq!(cell.probability_level, 3);
        assert_eq!(engine.matrix().member_count(), 1);
    }

    #[test]
    fn test_portfolio_uses_configured_seed() {
        let engine = RiskEngine::new(EngineConfig {
            default_seed: Some(1),
            monte_carlo_iterations: 2000,
            ..Default::default()
        })
        .unwrap();
        let portfolio = engine.portfolio(&[]);
        assert_eq!(portfolio.settings().seed, Some(1));
        assert_eq!(portfolio.settings().iterations, 2000);
    }
}
