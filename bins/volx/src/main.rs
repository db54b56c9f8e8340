//! Volx CLI binary
//!
//! Commands for creating and validating pool configuration files and for
//! replaying scenarios against an in-memory pool.

mod scenario;

use anyhow::{Context, Result};
use cli::{Cli, Commands};
use config::{generate_default_config, load_config, save_config, validate_config, MasterConfig};
use observability::{init_logging, init_metrics, LogFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::scenario::{load_scenario, Simulation};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging("volx", resolve_log_format(&cli))?;
    debug!(?cli, "CLI arguments parsed");

    match cli.command {
        Commands::Init { output } => {
            info!("Executing 'init' command");
            init_command(output).await
        }
        Commands::Validate { config } => {
            info!("Executing 'validate' command");
            validate_command(config).await
        }
        Commands::Simulate {
            config,
            scenario,
            metrics_port,
        } => {
            info!("Executing 'simulate' command");
            simulate_command(config, scenario, metrics_port).await
        }
    }
}

/// CLI override first, then the configuration file, then pretty
fn resolve_log_format(cli: &Cli) -> LogFormat {
    if let Some(arg) = cli.log_format {
        return LogFormat::parse(arg.as_str()).unwrap_or_default();
    }

    let config_path: Option<&PathBuf> = match &cli.command {
        Commands::Validate { config } | Commands::Simulate { config, .. } => Some(config),
        Commands::Init { .. } => None,
    };

    config_path
        .and_then(|path| load_config(path).ok())
        .and_then(|config| LogFormat::parse(&config.logging.format))
        .unwrap_or_default()
}

/// Load a configuration and refuse to continue on validation errors
fn load_valid_config(path: &Path) -> Result<MasterConfig> {
    let config = load_config(path)?;
    let report = validate_config(&config);

    for warning in &report.warnings {
        warn!(field = %warning.field, message = %warning.message, "Configuration warning");
    }

    if !report.is_valid() {
        error!(error_count = report.errors.len(), "Configuration validation failed");
        for err in &report.errors {
            error!("{}", err);
        }
        anyhow::bail!("Cannot run with an invalid configuration");
    }

    Ok(config)
}

async fn simulate_command(config_path: PathBuf, scenario_path: PathBuf, metrics_port: Option<u16>) -> Result<()> {
    let config = load_valid_config(&config_path)?;
    let scenario = load_scenario(&scenario_path)?;

    if let Some(port) = metrics_port {
        init_metrics(port).context("Failed to start metrics exporter")?;
    }

    info!(
        platform = %config.platform.name,
        scenario = ?scenario_path,
        steps = scenario.steps.len(),
        "Running scenario"
    );

    let report = Simulation::new(&config, &scenario)?.run(&scenario.steps).await?;

    let json = serde_json::to_string_pretty(&report).context("Failed to serialize simulation report")?;
    println!("{}", json);

    Ok(())
}

async fn validate_command<P: AsRef<Path>>(config_path: P) -> Result<()> {
    info!(path = ?config_path.as_ref(), "Validating configuration");

    let config = match load_config(&config_path) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "Failed to load configuration");
            anyhow::bail!(e);
        }
    };

    let report = validate_config(&config);

    println!("\n=== Configuration Validation Report ===\n");

    if !report.warnings.is_empty() {
        println!("Warnings ({}):", report.warnings.len());
        for warning in &report.warnings {
            println!("  [warn] [{}] {}", warning.field, warning.message);
        }
        println!();
    }

    if !report.errors.is_empty() {
        println!("Errors ({}):", report.errors.len());
        for err in &report.errors {
            println!("  [error] {}", err);
        }
        println!();
        anyhow::bail!("Configuration validation failed");
    }

    println!("[ok] Configuration is valid!");
    println!();
    println!("Platform: {}", config.platform.name);
    println!("Owner: {}", config.platform.owner);
    println!("Max leverage: {}x", config.platform.max_leverage);
    println!("Max index value: {}", config.oracle.max_index_value);
    println!(
        "Sanity feed check: {}",
        config
            .oracle
            .max_deviation_percent
            .map_or("disabled".to_string(), |p| format!("{} bps", p))
    );

    Ok(())
}

async fn init_command<P: AsRef<Path>>(output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!(?output_path, "Initializing new configuration file");

    let config = generate_default_config();

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create directory: {:?}", parent))?;
    }

    save_config(&config, output_path)?;

    println!("[ok] Configuration file created successfully!");
    println!();
    println!("Location: {:?}", output_path);
    println!();
    println!("Next steps:");
    println!("  1. Set the platform owner and fee schedule");
    println!("  2. Run 'volx validate --config {:?}' to check configuration", output_path);
    println!(
        "  3. Run 'volx simulate --config {:?} --scenario demos/basic.yaml' to replay a scenario",
        output_path
    );

    Ok(())
}
