//! Impact aggregation: asset valuation × vulnerability weights → one [0, 1] figure.

use serde::{Deserialize, Serialize};

use crate::audit::clamp_unit;
use crate::valuation::{Dimension, Valuation, Vulnerability};

/// Impact assigned to an asset with no valuation in any dimension.
pub const UNVALUED_ASSET_IMPACT: f64 = 0.5;

/// Valuation-weighted mean of the vulnerability's dimension weights.
///
/// Returns [`UNVALUED_ASSET_IMPACT`] when the asset is unvalued everywhere.
pub fn aggregate_impact(valuation: &Valuation, vulnerability: &Vulnerability) -> f64 {
    let mut weighted = 0.0;
    let mut weights = 0.0;

    for dimension in Dimension::ALL {
        let normalized = valuation.normalized(dimension);
        weighted += normalized * vulnerability.affected_dimensions.get(dimension);
        weights += normalized;
    }

    if weights == 0.0 {
        return UNVALUED_ASSET_IMPACT;
    }

    clamp_unit(weighted / weights)
}

/// One dimension's share of an aggregated impact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DimensionContribution {
    pub dimension: Dimension,
    /// Normalized valuation, the dimension's weight in the mean.
    pub valuation: f64,
    pub impact_weight: f64,
    /// `valuation × impact_weight`.
    pub contribution: f64,
}

/// Per-dimension terms of [`aggregate_impact`], in canonical order.
pub fn dimension_breakdown(
    valuation: &Valuation,
    vulnerability: &Vulnerability,
) -> Vec<DimensionContribution> {
    Dimension::ALL
        .into_iter()
        .map(|dimension| {
            let normalized = valuation.normalized(dimension);
            let weight = vulnerability.affected_dimensions.get(dimension);
            DimensionContribution {
                dimension,
                valuation: normalized,
                impact_weight: weight,
                contribution: normalized * weight,
            }
        })
        .collect()
}
