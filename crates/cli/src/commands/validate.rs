//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::RigBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    ego_count: usize,
    sensor_count: usize,
    iterations: u32,
    ticks_per_iteration: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                ego_count: blueprint.egos.len(),
                sensor_count: blueprint.sensor_count(),
                iterations: blueprint.scenario.iterations,
                ticks_per_iteration: blueprint.scenario.ticks_per_iteration,
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Non-fatal configuration issues
fn collect_warnings(blueprint: &RigBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.egos.is_empty() {
        warnings.push("No egos configured - every tick advances by the idle delta".to_string());
    }

    for ego in &blueprint.egos {
        if ego.sensors.is_empty() {
            warnings.push(format!("Ego '{}' has no sensors configured", ego.id));
        }
    }

    if blueprint.sensor_count() > 0 && blueprint.all_sensors().all(|(_, s)| !s.enabled) {
        warnings.push("All sensors start disabled".to_string());
    }

    for (_, sensor) in blueprint.all_sensors() {
        if sensor.period == 0.0 {
            warnings.push(format!(
                "Sensor '{}' has period 0 and captures on every tick",
                sensor.id
            ));
        }
    }

    let ticks = blueprint.scenario.ticks_per_iteration;
    for (sensor_id, latency) in blueprint.delayed_metric_sensors() {
        if u64::from(latency) >= ticks {
            warnings.push(format!(
                "Sensor '{}' metric latency ({} ticks) is not shorter than a sequence - \
                 its results are always dropped",
                sensor_id, latency
            ));
        }
    }

    if blueprint.scenario.time_scales.len() > blueprint.scenario.iterations as usize {
        warnings.push("More time scales than iterations - extra scales are unused".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Egos: {}", summary.ego_count);
            println!("  Sensors: {}", summary.sensor_count);
            println!("  Iterations: {}", summary.iterations);
            println!("  Ticks per iteration: {}", summary.ticks_per_iteration);
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
