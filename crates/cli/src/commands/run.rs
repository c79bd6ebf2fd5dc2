//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{RunConfig, Scenario};

/// Execute the `run` command
pub async fn run_scenario(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(iterations) = args.iterations {
        info!(iterations, "Overriding iterations from CLI");
        blueprint.scenario.iterations = iterations;
    }
    if let Some(ticks) = args.ticks {
        info!(ticks, "Overriding ticks per iteration from CLI");
        blueprint.scenario.ticks_per_iteration = ticks;
    }
    config_loader::ConfigLoader::validate(&blueprint).context("Invalid CLI overrides")?;

    info!(
        egos = blueprint.egos.len(),
        sensors = blueprint.sensor_count(),
        iterations = blueprint.scenario.iterations,
        ticks_per_iteration = blueprint.scenario.ticks_per_iteration,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let scenario = Scenario::new(RunConfig {
        blueprint,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
        trace_ticks: args.trace_ticks,
    });

    let shutdown_signal = setup_shutdown_signal();

    info!("Starting scenario...");

    tokio::select! {
        result = scenario.run() => {
            let stats = result.context("Scenario execution failed")?;
            info!(
                ticks = stats.metrics.total_ticks,
                captures = stats.metrics.total_captures,
                violations = stats.metrics.violations,
                duration_secs = stats.duration.as_secs_f64(),
                "Scenario completed successfully"
            );
            stats.print_summary();
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping scenario...");
        }
    }

    info!("Capture scheduler finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::RigBlueprint) {
    let scenario = &blueprint.scenario;
    println!("\n=== Configuration Summary ===\n");
    println!("Scenario:");
    println!("  Iterations: {}", scenario.iterations);
    println!("  Ticks per iteration: {}", scenario.ticks_per_iteration);
    println!("  Time scales: {:?}", scenario.time_scales);

    println!("\nEgos ({}):", blueprint.egos.len());
    for ego in &blueprint.egos {
        println!("  - {} - {} sensors", ego.id, ego.sensors.len());
    }

    let delayed = blueprint.delayed_metric_sensors();
    if !delayed.is_empty() {
        println!("\nDelayed producers:");
        for (sensor_id, latency) in delayed {
            println!("  - {} ({} ticks)", sensor_id, latency);
        }
    }

    println!();
}
