//! Property-based tests for the scoring engine using proptest.

use proptest::prelude::*;

use magerit_core::matrix::DEFAULT_MATRIX_LEVELS;
use magerit_core::{
    Asset, ContextFactors, DimensionWeights, RiskCalculator, RiskMatrix, RiskThresholds,
    ToleranceZones, Threat, Valuation, Vulnerability, aggregate_impact, classify,
};

fn dimension_value() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(10.0), 0.0..=10.0f64]
}

fn unit_value() -> impl Strategy<Value = f64> {
    prop_oneof![Just(0.0), Just(1.0), 0.0..=1.0f64]
}

prop_compose! {
    fn valuation()(
        c in dimension_value(),
        i in dimension_value(),
        a in dimension_value(),
        au in dimension_value(),
        t in dimension_value(),
    ) -> Valuation {
        Valuation::new(c, i, a, au, t)
    }
}

prop_compose! {
    fn vulnerability()(
        level in unit_value(),
        c in unit_value(),
        i in unit_value(),
        a in unit_value(),
        au in unit_value(),
        t in unit_value(),
    ) -> Vulnerability {
        Vulnerability::new("V", level, DimensionWeights::new(c, i, a, au, t))
    }
}

prop_compose! {
    fn threat()(
        base in unit_value(),
        adjusted in proptest::option::of(unit_value()),
    ) -> Threat {
        let threat = Threat::new("T", base);
        match adjusted {
            Some(p) => threat.with_adjusted_probability(p),
            None => threat,
        }
    }
}

// --- Range and determinism properties ---

proptest! {
    #[test]
    fn aggregated_impact_in_unit_range(v in valuation(), vuln in vulnerability()) {
        let impact = aggregate_impact(&v, &vuln);
        prop_assert!(impact.is_finite());
        prop_assert!((0.0..=1.0).contains(&impact));
    }

    #[test]
    fn zero_valuation_impact_is_half(vuln in vulnerability()) {
        prop_assert_eq!(aggregate_impact(&Valuation::default(), &vuln), 0.5);
    }

    #[test]
    fn adjusted_risk_in_unit_range(
        v in valuation(),
        vuln in vulnerability(),
        t in threat(),
        temporal in 0.0..3.0f64,
        environmental in 0.0..3.0f64,
    ) {
        let asset = Asset::new("A", v).with_economic_value(50_000.0);
        let a = RiskCalculator::default().assess(
            &asset,
            &t,
            &vuln,
            ContextFactors::new(temporal, environmental),
        );
        prop_assert!((0.0..=1.0).contains(&a.adjusted_risk()));
        prop_assert!((0.0..=1.0).contains(&a.aggregated_impact()));
        let expected_base = a.threat_probability() * a.vulnerability_level() * a.aggregated_impact();
        prop_assert_eq!(a.base_risk(), expected_base);
        prop_assert_eq!(a.adjusted_risk(), (a.base_risk() * temporal * environmental).min(1.0));
        prop_assert!(a.economic_impact().expected_loss <= a.economic_impact().potential_loss);
    }

    #[test]
    fn calculation_is_bit_identical(
        v in valuation(),
        vuln in vulnerability(),
        t in threat(),
        temporal in 0.5..1.5f64,
    ) {
        let asset = Asset::new("A", v).with_economic_value(1_000.0);
        let calc = RiskCalculator::default();
        let factors = ContextFactors::new(temporal, 1.0);
        let first = calc.assess(&asset, &t, &vuln, factors);
        let second = calc.assess(&asset, &t, &vuln, factors);
        prop_assert_eq!(first.adjusted_risk().to_bits(), second.adjusted_risk().to_bits());
        prop_assert_eq!(first.base_risk().to_bits(), second.base_risk().to_bits());
        prop_assert_eq!(
            aggregate_impact(&v, &vuln).to_bits(),
            aggregate_impact(&v, &vuln).to_bits()
        );
    }
}

// --- Classification properties ---

proptest! {
    #[test]
    fn classification_is_monotonic(a in 0.0..=1.0f64, b in 0.0..=1.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(classify(lo).rank() <= classify(hi).rank());
    }

    #[test]
    fn classification_clamps_out_of_range(x in -10.0..10.0f64) {
        prop_assert_eq!(classify(x), classify(x.clamp(0.0, 1.0)));
    }
}

// --- Matrix properties ---

proptest! {
    #[test]
    fn every_cell_uses_shared_classifier(levels in 1usize..=16) {
        let matrix = RiskMatrix::build(levels, &ToleranceZones::default(), &RiskThresholds::DEFAULT)
            .unwrap();
        prop_assert_eq!(matrix.cells().len(), levels * levels);
        let max = (levels * levels) as f64;
        for cell in matrix.cells() {
            prop_assert_eq!(cell.risk_score, cell.probability_level * cell.impact_level);
            prop_assert_eq!(cell.risk_level, classify(cell.risk_score as f64 / max));
        }
    }

    #[test]
    fn grid_aligned_assessments_agree_with_their_cell(
        k in 1usize..=DEFAULT_MATRIX_LEVELS,
        m in 1usize..=DEFAULT_MATRIX_LEVELS,
    ) {
        let levels = DEFAULT_MATRIX_LEVELS as f64;
        let probability = k as f64 / levels;
        let weight = m as f64 / levels;

        let asset = Asset::new("A", Valuation::new(10.0, 0.0, 0.0, 0.0, 0.0));
        let threat = Threat::new("T", probability);
        let vuln = Vulnerability::new("V", 1.0, DimensionWeights::new(weight, 0.0, 0.0, 0.0, 0.0));
        let a = RiskCalculator::default().assess(&asset, &threat, &vuln, ContextFactors::default());

        let matrix = RiskMatrix::build(DEFAULT_MATRIX_LEVELS, &ToleranceZones::default(), &RiskThresholds::DEFAULT)
            .unwrap();
        let cell = matrix.locate_assessment(&a);
        prop_assert_eq!((cell.probability_level, cell.impact_level), (k, m));
        prop_assert_eq!(cell.risk_level, a.risk_level());
    }

    #[test]
    fn matrix_cell_never_understates_assessment(
        v in valuation(),
        vuln in vulnerability(),
        t in threat(),
    ) {
        let asset = Asset::new("A", v);
        let a = RiskCalculator::default().assess(&asset, &t, &vuln, ContextFactors::default());
        let matrix = RiskMatrix::build(DEFAULT_MATRIX_LEVELS, &ToleranceZones::default(), &RiskThresholds::DEFAULT)
            .unwrap();
        let cell = matrix.locate_assessment(&a);
        prop_assert!(
            cell.risk_level.rank() >= a.risk_level().rank(),
            "cell {:?} below assessment {:?} (adjusted {})",
            cell.risk_level,
            a.risk_level(),
            a.adjusted_risk()
        );
    }

    #[test]
    fn replacement_keeps_single_membership(
        probabilities in prop::collection::vec(0.0..=1.0f64, 1..20),
    ) {
        let mut matrix = RiskMatrix::build(5, &ToleranceZones::default(), &RiskThresholds::DEFAULT)
            .unwrap();
        let key = magerit_core::RiskKey::new("A", "T", "V");
        for p in &probabilities {
            matrix.place_at(key.clone(), *p, 0.5);
        }
        prop_assert_eq!(matrix.member_count(), 1);
        let total: usize = matrix.heat_map().iter().flatten().sum();
        prop_assert_eq!(total, 1);
    }
}
