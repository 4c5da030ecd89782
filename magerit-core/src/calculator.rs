//! Risk calculation: threat × vulnerability × impact, corrected by context.
//!
//! Produces immutable [`RiskAssessment`] records. A re-assessment creates a
//! new record; nothing here mutates a previous one.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::clamp_unit;
use crate::classifier::{RiskLevel, RiskThresholds};
use crate::impact::aggregate_impact;
use crate::valuation::{Asset, ContextFactors, Threat, Vulnerability};

/// Identity of a risk scenario across re-assessments.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RiskKey {
    pub asset_ref: String,
    pub threat_ref: String,
    pub vulnerability_ref: String,
}

impl RiskKey {
    pub fn new(
        asset_ref: impl Into<String>,
        threat_ref: impl Into<String>,
        vulnerability_ref: impl Into<String>,
    ) -> Self {
        Self {
            asset_ref: asset_ref.into(),
            threat_ref: threat_ref.into(),
            vulnerability_ref: vulnerability_ref.into(),
        }
    }
}

impl std::fmt::Display for RiskKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.asset_ref, self.threat_ref, self.vulnerability_ref
        )
    }
}

/// Monetary consequences of a risk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicImpact {
    /// Worst case: the full economic value of the asset.
    pub potential_loss: f64,
    /// `potential_loss × adjusted_risk`.
    pub expected_loss: f64,
    /// `expected_loss × annual occurrence rate`.
    pub annualized_loss: f64,
}

/// Output of one risk calculation.
///
/// Only the calculator builds assessments, so the scores and the level always
/// agree. They serialize for reporting but cannot be deserialized:
///
/// ```compile_fail
/// let _: magerit_core::RiskAssessment = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskAssessment {
    #[serde(flatten)]
    key: RiskKey,
    threat_probability: f64,
    vulnerability_level: f64,
    aggregated_impact: f64,
    temporal_factor: f64,
    environmental_factor: f64,
    base_risk: f64,
    adjusted_risk: f64,
    risk_level: RiskLevel,
    economic_impact: EconomicImpact,
}

impl RiskAssessment {
    pub fn key(&self) -> &RiskKey {
        &self.key
    }

    pub fn asset_ref(&self) -> &str {
        &self.key.asset_ref
    }

    pub fn threat_ref(&self) -> &str {
        &self.key.threat_ref
    }

    pub fn vulnerability_ref(&self) -> &str {
        &self.key.vulnerability_ref
    }

    pub fn threat_probability(&self) -> f64 {
        self.threat_probability
    }

    pub fn vulnerability_level(&self) -> f64 {
        self.vulnerability_level
    }

    pub fn aggregated_impact(&self) -> f64 {
        self.aggregated_impact
    }

    pub fn temporal_factor(&self) -> f64 {
        self.temporal_factor
    }

    pub fn environmental_factor(&self) -> f64 {
        self.environmental_factor
    }

    pub fn base_risk(&self) -> f64 {
        self.base_risk
    }

    pub fn adjusted_risk(&self) -> f64 {
        self.adjusted_risk
    }

    pub fn risk_level(&self) -> RiskLevel {
        self.risk_level
    }

    pub fn economic_impact(&self) -> &EconomicImpact {
        &self.economic_impact
    }

    /// Impact coordinate used for matrix placement:
    /// `vulnerability_level × aggregated_impact × factors`, clamped to [0, 1].
    pub fn effective_impact(&self) -> f64 {
        clamp_unit(
            self.vulnerability_level
                * self.aggregated_impact
                * self.temporal_factor
                * self.environmental_factor,
        )
    }

    /// Risk left after a safeguard with the given effectiveness in [0, 1].
    pub fn residual(&self, effectiveness: f64, thresholds: &RiskThresholds) -> ResidualRisk {
        let effectiveness = clamp_unit(effectiveness);
        let residual_risk = self.adjusted_risk * (1.0 - effectiveness);
        ResidualRisk {
            key: self.key.clone(),
            effectiveness,
            residual_risk,
            risk_level: thresholds.classify(residual_risk),
            reduction: self.adjusted_risk - residual_risk,
        }
    }
}

/// Risk remaining after treatment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResidualRisk {
    pub key: RiskKey,
    pub effectiveness: f64,
    pub residual_risk: f64,
    pub risk_level: RiskLevel,
    pub reduction: f64,
}

/// Direction of change between two assessments of the same scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTrend {
    Improving,
    Stable,
    Worsening,
}

impl std::fmt::Display for RiskTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskTrend::Improving => write!(f, "improving"),
            RiskTrend::Stable => write!(f, "stable"),
            RiskTrend::Worsening => write!(f, "worsening"),
        }
    }
}

impl RiskTrend {
    /// Changes within this band of adjusted risk count as stable.
    pub const STABLE_BAND: f64 = 0.05;

    pub fn between(previous: &RiskAssessment, current: &RiskAssessment) -> Self {
        let delta = current.adjusted_risk - previous.adjusted_risk;
        if delta < -Self::STABLE_BAND {
            RiskTrend::Improving
        } else if delta > Self::STABLE_BAND {
            RiskTrend::Worsening
        } else {
            RiskTrend::Stable
        }
    }
}

/// One (asset, threat, vulnerability) triple to assess.
#[derive(Debug, Clone, Copy)]
pub struct RiskScenario<'a> {
    pub asset: &'a Asset,
    pub threat: &'a Threat,
    pub vulnerability: &'a Vulnerability,
    pub factors: ContextFactors,
}

/// Risk calculator.
#[derive(Debug, Clone, Default)]
pub struct RiskCalculator {
    thresholds: RiskThresholds,
}

impl RiskCalculator {
    pub fn new(thresholds: RiskThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RiskThresholds {
        &self.thresholds
    }

    /// Aggregate the impact of the vulnerability on the asset, then score it.
    pub fn assess(
        &self,
        asset: &Asset,
        threat: &Threat,
        vulnerability: &Vulnerability,
        factors: ContextFactors,
    ) -> RiskAssessment {
        let impact = aggregate_impact(&asset.valuation, vulnerability);
        self.calculate_risk(asset, threat, vulnerability, impact, factors)
    }

    /// Score a scenario given an already aggregated impact.
    pub fn calculate_risk(
        &self,
        asset: &Asset,
        threat: &Threat,
        vulnerability: &Vulnerability,
        aggregated_impact: f64,
        factors: ContextFactors,
    ) -> RiskAssessment {
        let threat_probability = threat.effective_probability();
        let vulnerability_level = vulnerability.level();
        let impact = clamp_unit(aggregated_impact);
        if impact != aggregated_impact {
            debug!(
                asset = %asset.id,
                value = aggregated_impact,
                "Clamped aggregated impact into [0, 1]"
            );
        }
        let factors = factors.sanitized();

        let base_risk = threat_probability * vulnerability_level * impact;
        let adjusted_risk = clamp_unit(base_risk * factors.temporal * factors.environmental);
        let risk_level = self.thresholds.classify(adjusted_risk);

        let economic_value = asset.economic_value();
        let expected_loss = economic_value * adjusted_risk;
        let economic_impact = EconomicImpact {
            potential_loss: economic_value,
            expected_loss,
            annualized_loss: expected_loss * threat.annual_occurrence_rate(),
        };

        RiskAssessment {
            key: RiskKey::new(&asset.id, &threat.id, &vulnerability.id),
            threat_probability,
            vulnerability_level,
            aggregated_impact: impact,
            temporal_factor: factors.temporal,
            environmental_factor: factors.environmental,
            base_risk,
            adjusted_risk,
            risk_level,
            economic_impact,
        }
    }

    /// Assess many scenarios in parallel. Results keep the input order.
    pub fn assess_batch(&self, scenarios: &[RiskScenario<'_>]) -> Vec<RiskAssessment> {
        let assessments: Vec<RiskAssessment> = scenarios
            .par_iter()
            .map(|s| self.assess(s.asset, s.threat, s.vulnerability, s.factors))
            .collect();
        debug!(count = assessments.len(), "Assessed risk batch");
        assessments
    }
}
