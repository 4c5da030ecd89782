//! Dimensional valuation model and the catalog records the engine consumes.
//!
//! Assets are valued across five independent security dimensions. Threats
//! and vulnerabilities are owned by external catalogs and handed to the
//! engine as plain data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::audit::{clamp_range, clamp_unit};

/// Upper bound of a dimension valuation.
pub const MAX_DIMENSION_VALUE: f64 = 10.0;

/// A MAGERIT security dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    #[serde(alias = "C")]
    Confidentiality,
    #[serde(alias = "I")]
    Integrity,
    #[serde(alias = "A")]
    Availability,
    #[serde(alias = "Au")]
    Authenticity,
    #[serde(alias = "T")]
    Traceability,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Dimension; 5] = [
        Dimension::Confidentiality,
        Dimension::Integrity,
        Dimension::Availability,
        Dimension::Authenticity,
        Dimension::Traceability,
    ];

    /// Short code used on dashboards (`C`, `I`, `A`, `Au`, `T`).
    pub fn code(self) -> &'static str {
        match self {
            Dimension::Confidentiality => "C",
            Dimension::Integrity => "I",
            Dimension::Availability => "A",
            Dimension::Authenticity => "Au",
            Dimension::Traceability => "T",
        }
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dimension::Confidentiality => write!(f, "confidentiality"),
            Dimension::Integrity => write!(f, "integrity"),
            Dimension::Availability => write!(f, "availability"),
            Dimension::Authenticity => write!(f, "authenticity"),
            Dimension::Traceability => write!(f, "traceability"),
        }
    }
}

/// Asset valuation across the five dimensions, each in [0, 10].
///
/// Missing dimensions deserialize as 0. Out-of-range values are kept as
/// given (so they can be audited) and clamped whenever they are read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Valuation {
    #[serde(alias = "C")]
    confidentiality: f64,
    #[serde(alias = "I")]
    integrity: f64,
    #[serde(alias = "A")]
    availability: f64,
    #[serde(alias = "Au")]
    authenticity: f64,
    #[serde(alias = "T")]
    traceability: f64,
}

impl Valuation {
    pub fn new(
        confidentiality: f64,
        integrity: f64,
        availability: f64,
        authenticity: f64,
        traceability: f64,
    ) -> Self {
        Self {
            confidentiality,
            integrity,
            availability,
            authenticity,
            traceability,
        }
    }

    /// Return a new valuation with one dimension replaced.
    pub fn with(mut self, dimension: Dimension, value: f64) -> Self {
        *self.slot(dimension) = value;
        self
    }

    /// Clamped value of a dimension.
    pub fn get(&self, dimension: Dimension) -> f64 {
        clamp_range(self.raw(dimension), 0.0, MAX_DIMENSION_VALUE)
    }

    /// Value as given, before clamping.
    pub fn raw(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Confidentiality => self.confidentiality,
            Dimension::Integrity => self.integrity,
            Dimension::Availability => self.availability,
            Dimension::Authenticity => self.authenticity,
            Dimension::Traceability => self.traceability,
        }
    }

    /// Value normalized to [0, 1].
    pub fn normalized(&self, dimension: Dimension) -> f64 {
        self.get(dimension) / MAX_DIMENSION_VALUE
    }

    /// Highest dimension value.
    pub fn criticality(&self) -> f64 {
        Dimension::ALL
            .iter()
            .map(|d| self.get(*d))
            .fold(0.0, f64::max)
    }

    /// True when no dimension carries any value.
    pub fn is_unvalued(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d) == 0.0)
    }

    fn slot(&mut self, dimension: Dimension) -> &mut f64 {
        match dimension {
            Dimension::Confidentiality => &mut self.confidentiality,
            Dimension::Integrity => &mut self.integrity,
            Dimension::Availability => &mut self.availability,
            Dimension::Authenticity => &mut self.authenticity,
            Dimension::Traceability => &mut self.traceability,
        }
    }
}

/// Per-dimension impact weights of a vulnerability, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionWeights {
    #[serde(alias = "C")]
    confidentiality: f64,
    #[serde(alias = "I")]
    integrity: f64,
    #[serde(alias = "A")]
    availability: f64,
    #[serde(alias = "Au")]
    authenticity: f64,
    #[serde(alias = "T")]
    traceability: f64,
}

impl DimensionWeights {
    pub fn new(
        confidentiality: f64,
        integrity: f64,
        availability: f64,
        authenticity: f64,
        traceability: f64,
    ) -> Self {
        Self {
            confidentiality,
            integrity,
            availability,
            authenticity,
            traceability,
        }
    }

    pub fn with(mut self, dimension: Dimension, weight: f64) -> Self {
        match dimension {
            Dimension::Confidentiality => self.confidentiality = weight,
            Dimension::Integrity => self.integrity = weight,
            Dimension::Availability => self.availability = weight,
            Dimension::Authenticity => self.authenticity = weight,
            Dimension::Traceability => self.traceability = weight,
        }
        self
    }

    /// Clamped weight of a dimension.
    pub fn get(&self, dimension: Dimension) -> f64 {
        clamp_unit(self.raw(dimension))
    }

    pub fn raw(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::Confidentiality => self.confidentiality,
            Dimension::Integrity => self.integrity,
            Dimension::Availability => self.availability,
            Dimension::Authenticity => self.authenticity,
            Dimension::Traceability => self.traceability,
        }
    }

    /// Dimensions with a non-zero weight.
    pub fn affected(&self) -> impl Iterator<Item = Dimension> + '_ {
        Dimension::ALL.into_iter().filter(|d| self.get(*d) > 0.0)
    }
}

/// An asset as seen by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub valuation: Valuation,
    /// Monetary value used for loss figures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub economic_value: Option<f64>,
}

impl Asset {
    pub fn new(id: impl Into<String>, valuation: Valuation) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            valuation,
            economic_value: None,
        }
    }

    pub fn with_economic_value(mut self, value: f64) -> Self {
        self.economic_value = Some(value);
        self
    }

    /// Economic value, with missing, negative or non-finite values read as 0.
    pub fn economic_value(&self) -> f64 {
        match self.economic_value {
            Some(v) if v.is_finite() && v > 0.0 => v,
            _ => 0.0,
        }
    }
}

/// A threat catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threat {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    pub base_probability: f64,
    /// Context-corrected probability. Overrides `base_probability` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjusted_probability: Option<f64>,
    /// Expected occurrences per year, when it differs from the probability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual_rate: Option<f64>,
    #[serde(default)]
    pub affected_dimensions: BTreeSet<Dimension>,
}

impl Threat {
    pub fn new(id: impl Into<String>, base_probability: f64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            category: String::new(),
            base_probability,
            adjusted_probability: None,
            annual_rate: None,
            affected_dimensions: BTreeSet::new(),
        }
    }

    pub fn with_adjusted_probability(mut self, probability: f64) -> Self {
        self.adjusted_probability = Some(probability);
        self
    }

    pub fn with_annual_rate(mut self, rate: f64) -> Self {
        self.annual_rate = Some(rate);
        self
    }

    /// Probability actually used for scoring, clamped to [0, 1].
    pub fn effective_probability(&self) -> f64 {
        clamp_unit(self.adjusted_probability.unwrap_or(self.base_probability))
    }

    /// Annual occurrence rate; defaults to the effective probability.
    pub fn annual_occurrence_rate(&self) -> f64 {
        match self.annual_rate {
            Some(rate) if rate.is_finite() && rate >= 0.0 => rate,
            _ => self.effective_probability(),
        }
    }
}

/// A vulnerability catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vulnerability {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub vulnerability_level: f64,
    #[serde(default)]
    pub affected_dimensions: DimensionWeights,
}

impl Vulnerability {
    pub fn new(id: impl Into<String>, level: f64, weights: DimensionWeights) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            vulnerability_level: level,
            affected_dimensions: weights,
        }
    }

    pub fn level(&self) -> f64 {
        clamp_unit(self.vulnerability_level)
    }
}

/// Contextual correction factors applied to the base risk.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextFactors {
    pub temporal: f64,
    pub environmental: f64,
}

impl Default for ContextFactors {
    fn default() -> Self {
        Self {
            temporal: 1.0,
            environmental: 1.0,
        }
    }
}

impl ContextFactors {
    pub fn new(temporal: f64, environmental: f64) -> Self {
        Self {
            temporal,
            environmental,
        }
    }

    /// Factors made safe for multiplication: NaN reads as 1, negatives as 0.
    pub fn sanitized(self) -> Self {
        fn fix(f: f64) -> f64 {
            if f.is_nan() {
                1.0
            } else if f.is_infinite() {
                if f > 0.0 { f64::MAX } else { 0.0 }
            } else {
                f.max(0.0)
            }
        }
        Self {
            temporal: fix(self.temporal),
            environmental: fix(self.environmental),
        }
    }

    pub fn combined(self) -> f64 {
        let s = self.sanitized();
        s.temporal * s.environmental
    }
}
