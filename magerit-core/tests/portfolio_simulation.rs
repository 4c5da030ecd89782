//! End-to-end tests: scoring, matrix placement and portfolio simulation
//! through the public API.

use magerit_core::{
    Asset, ContextFactors, DimensionWeights, EngineConfig, EngineError, PortfolioAggregator,
    RiskAssessment, RiskCalculator, RiskEngine, RiskLevel, RiskScenario, Threat, ToleranceZone,
    ToleranceZones, Valuation, Vulnerability,
};

fn flat_assessment(id: &str, probability: f64, loss: f64) -> RiskAssessment {
    let asset =
        Asset::new(id, Valuation::new(10.0, 0.0, 0.0, 0.0, 0.0)).with_economic_value(loss);
    let threat = Threat::new(format!("T-{id}"), probability);
    let vuln = Vulnerability::new("V-flat", 1.0, DimensionWeights::new(1.0, 0.0, 0.0, 0.0, 0.0));
    RiskCalculator::default().assess(&asset, &threat, &vuln, ContextFactors::default())
}

fn reference_portfolio() -> Vec<RiskAssessment> {
    vec![
        flat_assessment("A1", 0.1, 10_000.0),
        flat_assessment("A2", 0.5, 50_000.0),
        flat_assessment("A3", 0.9, 100_000.0),
    ]
}

/// Exact VaR and ES over every occurrence combination of independent risks.
fn enumerate_tail(risks: &[(f64, f64)], confidence: f64) -> (f64, f64) {
    let mut outcomes: Vec<(f64, f64)> = (0..1usize << risks.len())
        .map(|mask| {
            risks
                .iter()
                .enumerate()
                .fold((0.0, 1.0), |(loss, prob), (i, &(p, l))| {
                    if mask & (1 << i) != 0 {
                        (loss + l, prob * p)
                    } else {
                        (loss, prob * (1.0 - p))
                    }
                })
        })
        .collect();
    outcomes.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

    let mut cumulative = 0.0;
    let mut var = 0.0;
    let mut tail = 0.0;
    for &(loss, prob) in &outcomes {
        let before = cumulative;
        cumulative += prob;
        if cumulative >= confidence - 1e-12 && before < confidence - 1e-12 {
            var = loss;
            tail += loss * (cumulative - confidence);
        } else if before >= confidence - 1e-12 {
            tail += loss * prob;
        }
    }
    (var, tail / (1.0 - confidence))
}

#[test]
fn test_reference_scenario() {
    let asset = Asset::new("A1", Valuation::new(8.0, 6.0, 4.0, 2.0, 2.0));
    let vuln = Vulnerability::new("V1", 0.7, DimensionWeights::new(1.0, 0.5, 0.0, 0.0, 0.0));
    let threat = Threat::new("T1", 0.6);

    let a = RiskCalculator::default().assess(&asset, &threat, &vuln, ContextFactors::new(1.1, 1.0));
    assert!((a.aggregated_impact() - 0.5).abs() < 1e-12);
    assert!((a.base_risk() - 0.21).abs() < 1e-12);
    assert!((a.adjusted_risk() - 0.231).abs() < 1e-12);
    assert_eq!(a.risk_level(), RiskLevel::Low);
}

#[test]
fn test_engine_end_to_end() {
    let mut engine = RiskEngine::new(EngineConfig::default()).unwrap();
    let server = Asset::new("SRV", Valuation::new(9.0, 9.0, 8.0, 4.0, 3.0)).with_economic_value(200_000.0);
    let laptop = Asset::new("LPT", Valuation::new(3.0, 2.0, 2.0, 0.0, 0.0)).with_economic_value(1_500.0);
    let ransomware = Threat::new("RANSOM", 0.4).with_adjusted_probability(0.9);
    let theft = Threat::new("THEFT", 0.2);
    let unpatched = Vulnerability::new("UNPATCHED", 0.9, DimensionWeights::new(1.0, 1.0, 1.0, 0.0, 0.0));
    let no_lock = Vulnerability::new("NOLOCK", 0.3, DimensionWeights::new(0.0, 0.0, 1.0, 0.0, 0.0));

    let scenarios = [
        RiskScenario {
            asset: &server,
            threat: &ransomware,
            vulnerability: &unpatched,
            factors: ContextFactors::default(),
        },
        RiskScenario {
            asset: &laptop,
            threat: &theft,
            vulnerability: &no_lock,
            factors: ContextFactors::default(),
        },
    ];
    let risks = engine.assess_and_place(&scenarios);

    assert_eq!(risks[0].asset_ref(), "SRV");
    assert_eq!(risks[0].threat_probability(), 0.9);
    assert!(risks[0].risk_level() >= RiskLevel::High);
    assert_eq!(risks[1].risk_level(), RiskLevel::VeryLow);

    let counts = engine.matrix().zone_counts();
    assert_eq!(counts[&ToleranceZone::Unacceptable], 1);
    assert_eq!(counts[&ToleranceZone::Acceptable], 1);

    let snapshot = engine.portfolio(&risks).distribution_statistics();
    assert_eq!(snapshot.total_risks, 2);
    assert_eq!(snapshot.top_risks[0].key.asset_ref, "SRV");
}

#[test]
fn test_empty_portfolio_var_is_zero() {
    let result = PortfolioAggregator::new(&[]).value_at_risk(0.99, 30.0).unwrap();
    assert_eq!(result.var, 0.0);
    assert_eq!(result.expected_shortfall, 0.0);
    assert_eq!(result.iterations, 0);
}

#[test]
fn test_exact_enumeration_helper() {
    let (var, es) = enumerate_tail(&[(0.1, 10_000.0), (0.5, 50_000.0), (0.9, 100_000.0)], 0.95);
    assert_eq!(var, 150_000.0);
    assert!((es - 159_000.0).abs() < 1e-6, "es {es}");
}

#[test]
fn test_monte_carlo_converges_to_exact_tail() {
    let risks = reference_portfolio();
    let (exact_var, exact_es) =
        enumerate_tail(&[(0.1, 10_000.0), (0.5, 50_000.0), (0.9, 100_000.0)], 0.95);

    let result = PortfolioAggregator::new(&risks)
        .with_iterations(100_000)
        .with_seed(Some(42))
        .value_at_risk(0.95, 365.0)
        .unwrap();

    assert_eq!(result.iterations, 100_000);
    assert!(
        (result.var - exact_var).abs() <= 0.05 * exact_var,
        "VaR {} vs exact {exact_var}",
        result.var
    );
    assert!(
        (result.expected_shortfall - exact_es).abs() <= 0.05 * exact_es,
        "ES {} vs exact {exact_es}",
        result.expected_shortfall
    );
    assert!(result.expected_shortfall >= result.var);
}

#[test]
fn test_unseeded_runs_within_confidence_band() {
    let risks = reference_portfolio();
    // Exact mean: 0.1*10k + 0.5*50k + 0.9*100k. Std error at 20k trials is ~280.
    let exact_mean = 116_000.0;
    // P(loss <= 110k) = 0.55 and P(loss <= 150k) = 0.955, so the 95th
    // percentile sits on 150k unless the sampled CDF drifts by more than 0.005.
    let (exact_var, _) =
        enumerate_tail(&[(0.1, 10_000.0), (0.5, 50_000.0), (0.9, 100_000.0)], 0.95);
    for _ in 0..2 {
        let result = PortfolioAggregator::new(&risks)
            .with_iterations(20_000)
            .value_at_risk(0.95, 365.0)
            .unwrap();
        assert!(
            (result.mean_loss - exact_mean).abs() < 2_000.0,
            "mean {}",
            result.mean_loss
        );
        assert!(
            (result.var - exact_var).abs() <= 0.05 * exact_var,
            "VaR {} vs exact {exact_var}",
            result.var
        );
        assert!(result.expected_shortfall >= result.var);
    }
}

#[tokio::test]
async fn test_cancelled_simulation_reports_cancellation() {
    let risks: Vec<RiskAssessment> = (0..2_000)
        .map(|i| flat_assessment(&format!("A{i}"), 0.5, 1_000.0))
        .collect();
    let handle = PortfolioAggregator::new(&risks)
        .with_iterations(100_000)
        .with_seed(Some(1))
        .spawn_value_at_risk(0.95, 365.0)
        .unwrap();

    handle.cancel();
    assert!(handle.is_cancelled());
    match handle.join().await {
        Err(EngineError::SimulationCancelled { completed, requested }) => {
            assert_eq!(requested, 100_000);
            assert!(completed < requested);
        }
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_jobs_are_independent() {
    let risks = reference_portfolio();
    let aggregator = PortfolioAggregator::new(&risks).with_seed(Some(8));
    let first = aggregator.spawn_value_at_risk(0.95, 365.0).unwrap();
    let second = aggregator.spawn_value_at_risk(0.95, 365.0).unwrap();
    let (a, b) = tokio::join!(first.join(), second.join());
    assert_eq!(a.unwrap(), b.unwrap());
}

#[test]
fn test_large_matrix_is_a_valid_configuration() {
    let engine = RiskEngine::new(EngineConfig {
        matrix_levels: 12,
        ..Default::default()
    })
    .unwrap();
    assert_eq!(engine.matrix().levels(), 12);
    assert_eq!(engine.matrix().cells().len(), 144);
}

#[test]
fn test_invalid_configuration_fails_fast() {
    let bad_levels = EngineConfig {
        matrix_levels: 0,
        ..Default::default()
    };
    assert!(matches!(
        RiskEngine::new(bad_levels),
        Err(EngineError::InvalidConfiguration(_))
    ));

    let overlapping = EngineConfig {
        tolerance_zones: ToleranceZones {
            acceptable: vec![RiskLevel::VeryLow, RiskLevel::Low],
            tolerable: vec![RiskLevel::Low, RiskLevel::Medium],
            unacceptable: vec![RiskLevel::High, RiskLevel::Critical],
        },
        ..Default::default()
    };
    assert!(matches!(
        RiskEngine::new(overlapping),
        Err(EngineError::InvalidConfiguration(_))
    ));

    let risks = reference_portfolio();
    assert!(matches!(
        PortfolioAggregator::new(&risks).value_at_risk(1.0, 365.0),
        Err(EngineError::InvalidConfiguration(_))
    ));
}
