//! Range clamping and data-quality auditing of catalog inputs.
//!
//! Catalogs are user-editable, so scoring never rejects an out-of-range
//! value. It clamps and proceeds; [`audit_inputs`] reports what was clamped.

use serde::{Deserialize, Serialize};

use crate::valuation::{Asset, Dimension, MAX_DIMENSION_VALUE, Threat, Vulnerability};

/// Clamp to [0, 1]. NaN reads as 0.
pub fn clamp_unit(value: f64) -> f64 {
    clamp_range(value, 0.0, 1.0)
}

/// Clamp to `[min, max]`. NaN reads as `min`.
pub fn clamp_range(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        min
    } else {
        value.clamp(min, max)
    }
}

/// An input value outside its documented range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutOfRangeInput {
    /// Catalog record the value came from.
    pub record: String,
    /// Field path, e.g. `valuation.confidentiality`.
    pub field: String,
    pub value: f64,
    pub min: f64,
    pub max: f64,
}

impl std::fmt::Display for OutOfRangeInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} = {} outside [{}, {}]",
            self.record, self.field, self.value, self.min, self.max
        )
    }
}

fn check(
    issues: &mut Vec<OutOfRangeInput>,
    record: &str,
    field: String,
    value: f64,
    min: f64,
    max: f64,
) {
    if value.is_nan() || value < min || value > max {
        issues.push(OutOfRangeInput {
            record: record.to_string(),
            field,
            value,
            min,
            max,
        });
    }
}

/// Report every value of an (asset, threat, vulnerability) triple that the
/// calculator would clamp.
pub fn audit_inputs(
    asset: &Asset,
    threat: &Threat,
    vulnerability: &Vulnerability,
) -> Vec<OutOfRangeInput> {
    let mut issues = Vec::new();

    for dimension in Dimension::ALL {
        check(
            &mut issues,
            &asset.id,
            format!("valuation.{dimension}"),
            asset.valuation.raw(dimension),
            0.0,
            MAX_DIMENSION_VALUE,
        );
    }

    check(
        &mut issues,
        &threat.id,
        "base_probability".into(),
        threat.base_probability,
        0.0,
        1.0,
    );
    if let Some(adjusted) = threat.adjusted_probability {
        check(
            &mut issues,
            &threat.id,
            "adjusted_probability".into(),
            adjusted,
            0.0,
            1.0,
        );
    }

    check(
        &mut issues,
        &vulnerability.id,
        "vulnerability_level".into(),
        vulnerability.vulnerability_level,
        0.0,
        1.0,
    );
    for dimension in Dimension::ALL {
        check(
            &mut issues,
            &vulnerability.id,
            format!("affected_dimensions.{dimension}"),
            vulnerability.affected_dimensions.raw(dimension),
            0.0,
            1.0,
        );
    }

    issues
}
