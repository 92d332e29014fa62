use anyhow::{Context, Result};
use dragsort::config::OrderingConfig;
use dragsort::logging::init_tracing;
use dragsort::scenario::{Scenario, run_scenario};
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    // Simple argument parsing: <scenario.yaml> [--config <path>]
    let mut args = std::env::args().skip(1);
    let mut scenario_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            if let Some(path) = args.next() {
                config_path = Some(PathBuf::from(path));
            }
        } else if !arg.starts_with('-') {
            scenario_path = Some(PathBuf::from(arg));
        }
    }

    // Check environment variable if not provided via CLI
    if config_path.is_none() {
        if let Ok(env_path) = std::env::var("DRAGSORT_CONFIG") {
            config_path = Some(PathBuf::from(env_path));
        }
    }

    let config = match &config_path {
        Some(path) => OrderingConfig::load_from_file(path)?,
        None => OrderingConfig::default(),
    };
    init_tracing(&config.log_filter)?;

    let scenario_path =
        scenario_path.context("Usage: dragsort <scenario.yaml> [--config <config.yaml>]")?;
    let scenario = Scenario::load_from_file(&scenario_path)?;
    tracing::info!(
        "Running {} steps against {}({})",
        scenario.steps.len(),
        scenario.relation,
        scenario.owner
    );

    let report = run_scenario(&scenario, &config).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
