//! CLI subcommand handlers.

use crate::catalog::Catalog;
use crate::Commands;
use crate::ConfigAction;
use magerit_core::{
    EngineError, RiskAssessment, RiskEngine, RiskLevel, RiskMatrix, SimulationHandle,
    VarResult, audit_inputs, load_config,
};
use std::fmt::Write as _;
use std::path::Path;
use tracing::{info, warn};

/// Handle a CLI subcommand.
pub async fn handle_command(
    command: Commands,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match command {
        Commands::Config { action } => handle_config(action, workspace, config_file),
        Commands::Assess { catalog, json } => {
            let (_, risks) = assess_catalog(&catalog, workspace, config_file)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&risks)?);
            } else {
                print!("{}", render_assessments(&risks));
            }
            Ok(())
        }
        Commands::Matrix { catalog } => {
            let (engine, _) = assess_catalog(&catalog, workspace, config_file)?;
            print!("{}", render_matrix(engine.matrix()));
            Ok(())
        }
        Commands::Portfolio { catalog, json } => {
            let (engine, risks) = assess_catalog(&catalog, workspace, config_file)?;
            let snapshot = engine.portfolio(&risks).distribution_statistics();
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                println!("Risks:               {}", snapshot.total_risks);
                for (level, count) in &snapshot.counts_by_level {
                    println!("  {:<18} {}", level.as_str(), count);
                }
                println!("Mean adjusted risk:  {:.4}", snapshot.mean_adjusted_risk);
                println!("Expected loss:       {:.2}", snapshot.aggregate_expected_loss);
                println!("Potential loss:      {:.2}", snapshot.total_potential_loss);
                println!("Annualized loss:     {:.2}", snapshot.total_annualized_loss);
                println!("Top risks:");
                for risk in &snapshot.top_risks {
                    println!(
                        "  {:<40} {:.4}  {}",
                        risk.key.to_string(),
                        risk.adjusted_risk,
                        risk.risk_level
                    );
                }
            }
            Ok(())
        }
        Commands::Var {
            catalog,
            confidence,
            horizon,
            iterations,
            seed,
            json,
        } => {
            let (engine, risks) = assess_catalog(&catalog, workspace, config_file)?;
            let mut aggregator = engine.portfolio(&risks);
            if let Some(n) = iterations {
                aggregator = aggregator.with_iterations(n);
            }
            if seed.is_some() {
                aggregator = aggregator.with_seed(seed);
            }
            let handle = aggregator.spawn_value_at_risk(confidence, horizon)?;
            let result = await_simulation(handle).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!(
                    "VaR {:.1}% over {} days: {:.2}",
                    result.confidence_level * 100.0,
                    result.horizon_days,
                    result.var
                );
                println!("Expected shortfall:  {:.2}", result.expected_shortfall);
                println!("Mean loss:           {:.2}", result.mean_loss);
                println!("Trials:              {}", result.iterations);
            }
            Ok(())
        }
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(Some(workspace), config_file, None)
                .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;
            println!("{}", magerit_core::config::to_toml(&config)?);
            Ok(())
        }
    }
}

fn build_engine(workspace: &Path, config_file: Option<&Path>) -> anyhow::Result<RiskEngine> {
    let config = load_config(Some(workspace), config_file, None)
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
    Ok(RiskEngine::new(config)?)
}

/// Load a catalog, assess every scenario and place the results on the matrix.
fn assess_catalog(
    path: &Path,
    workspace: &Path,
    config_file: Option<&Path>,
) -> anyhow::Result<(RiskEngine, Vec<RiskAssessment>)> {
    let mut engine = build_engine(workspace, config_file)?;
    let catalog = Catalog::load(path)?;
    let scenarios = catalog.resolve()?;

    for scenario in &scenarios {
        for issue in audit_inputs(scenario.asset, scenario.threat, scenario.vulnerability) {
            warn!(%issue, "Input out of range, clamped");
        }
    }

    let risks = engine.assess_and_place(&scenarios);
    info!(
        catalog = %path.display(),
        scenarios = risks.len(),
        "Catalog assessed"
    );
    Ok((engine, risks))
}

/// Log progress until the job finishes; Ctrl-C cancels it.
async fn await_simulation(handle: SimulationHandle<VarResult>) -> anyhow::Result<VarResult> {
    let mut progress = handle.subscribe();
    let mut last_decile = 0;
    loop {
        tokio::select! {
            changed = progress.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = *progress.borrow_and_update();
                let decile = (current.fraction() * 10.0) as u32;
                if decile > last_decile {
                    last_decile = decile;
                    info!(
                        completed = current.completed,
                        requested = current.requested,
                        "Simulation {}% complete",
                        decile * 10
                    );
                }
                if current.is_finished() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupt received, cancelling simulation");
                handle.cancel();
                break;
            }
        }
    }

    match handle.join().await {
        Ok(result) => Ok(result),
        Err(EngineError::SimulationCancelled {
            completed,
            requested,
        }) => Err(anyhow::anyhow!(
            "Simulation cancelled after {completed} of {requested} trials; no result reported"
        )),
        Err(e) => Err(e.into()),
    }
}

fn render_assessments(risks: &[RiskAssessment]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<32} {:>6} {:>6} {:>7} {:>8}  {:<9} {:>14}",
        "RISK", "PROB", "IMPACT", "BASE", "ADJUSTED", "LEVEL", "EXPECTED LOSS"
    );
    for r in risks {
        let _ = writeln!(
            out,
            "{:<32} {:>6.3} {:>6.3} {:>7.4} {:>8.4}  {:<9} {:>14.2}",
            r.key().to_string(),
            r.threat_probability(),
            r.aggregated_impact(),
            r.base_risk(),
            r.adjusted_risk(),
            r.risk_level().as_str(),
            r.economic_impact().expected_loss
        );
    }
    out
}

/// Highest probability on top, impact increasing left to right. Each cell
/// shows its level initial and member count.
fn render_matrix(matrix: &RiskMatrix) -> String {
    let levels = matrix.levels();
    let heat = matrix.heat_map();
    let mut out = String::new();
    for p in (1..=levels).rev() {
        let _ = write!(out, "P{p:<2}|");
        for i in 1..=levels {
            let tag = matrix
                .cell(p, i)
                .map(|c| level_tag(c.risk_level))
                .unwrap_or('?');
            let _ = write!(out, " {tag}{:<3}", heat[p - 1][i - 1]);
        }
        out.push('\n');
    }
    let _ = write!(out, "   +");
    for i in 1..=levels {
        let _ = write!(out, " I{i:<3}");
    }
    out.push('\n');
    for (zone, count) in matrix.zone_counts() {
        let _ = writeln!(out, "{zone:<13} {count:>4}  ({})", zone.action());
    }
    out
}

fn level_tag(level: RiskLevel) -> char {
    match level {
        RiskLevel::VeryLow => 'v',
        RiskLevel::Low => 'L',
        RiskLevel::Medium => 'M',
        RiskLevel::High => 'H',
        RiskLevel::Critical => 'C',
    }
}
