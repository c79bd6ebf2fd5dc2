//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RigBlueprint, SensorConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    scenario: ScenarioInfo,
    scheduler: SchedulerInfo,
    egos: Vec<EgoInfo>,
}

#[derive(Serialize)]
struct ScenarioInfo {
    iterations: u32,
    ticks_per_iteration: u64,
    time_scales: Vec<f64>,
}

#[derive(Serialize)]
struct SchedulerInfo {
    idle_delta: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    timing_epsilon: Option<f64>,
    require_ego_description: bool,
}

#[derive(Serialize)]
struct EgoInfo {
    id: String,
    description: String,
    sensor_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    sensors: Vec<SensorInfo>,
}

#[derive(Serialize)]
struct SensorInfo {
    id: String,
    modality: String,
    period: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate_hz: Option<f64>,
    first_capture_time: f64,
    enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    metric_latency_ticks: Option<u32>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args.sensors);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args.sensors);
    }

    Ok(())
}

/// Capture rate, undefined for every-tick sensors
fn rate_hz(sensor: &SensorConfig) -> Option<f64> {
    (sensor.period > 0.0).then(|| 1.0 / sensor.period)
}

fn build_config_info(blueprint: &RigBlueprint, with_sensors: bool) -> ConfigInfo {
    let egos = blueprint
        .egos
        .iter()
        .map(|ego| EgoInfo {
            id: ego.id.clone(),
            description: ego.description.clone(),
            sensor_count: ego.sensors.len(),
            sensors: if with_sensors {
                ego.sensors
                    .iter()
                    .map(|s| SensorInfo {
                        id: s.id.clone(),
                        modality: s.modality.as_str().to_string(),
                        period: s.period,
                        rate_hz: rate_hz(s),
                        first_capture_time: s.first_capture_time,
                        enabled: s.enabled,
                        metric_latency_ticks: s.metric_latency_ticks,
                    })
                    .collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        scenario: ScenarioInfo {
            iterations: blueprint.scenario.iterations,
            ticks_per_iteration: blueprint.scenario.ticks_per_iteration,
            time_scales: blueprint.scenario.time_scales.clone(),
        },
        scheduler: SchedulerInfo {
            idle_delta: blueprint.scheduler.idle_delta,
            timing_epsilon: blueprint.scheduler.timing_epsilon,
            require_ego_description: blueprint.scheduler.require_ego_description,
        },
        egos,
    }
}

fn print_config_info(blueprint: &RigBlueprint, with_sensors: bool) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Capture Scheduler Configuration                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let scenario = &blueprint.scenario;
    println!("🎬 Scenario");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   ├─ Iterations: {}", scenario.iterations);
    println!("   ├─ Ticks per iteration: {}", scenario.ticks_per_iteration);
    println!("   └─ Time scales: {:?}", scenario.time_scales);

    let scheduler = &blueprint.scheduler;
    println!("\n⚙️  Scheduler");
    println!("   ├─ Idle delta: {} s", scheduler.idle_delta);
    match scheduler.timing_epsilon {
        Some(epsilon) => println!("   ├─ Timing epsilon: {}", epsilon),
        None => println!("   ├─ Timing epsilon: (relative to shortest period)"),
    }
    println!(
        "   └─ Require ego description: {}",
        scheduler.require_ego_description
    );

    println!("\n🚗 Egos ({})", blueprint.egos.len());
    for (i, ego) in blueprint.egos.iter().enumerate() {
        let is_last = i == blueprint.egos.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        if ego.description.is_empty() {
            println!("   {} {}", prefix, ego.id);
        } else {
            println!("   {} {} ({})", prefix, ego.id, ego.description);
        }

        if with_sensors && !ego.sensors.is_empty() {
            println!("   {}  📷 Sensors ({}):", child_prefix, ego.sensors.len());
            for (j, sensor) in ego.sensors.iter().enumerate() {
                let sensor_prefix = if j == ego.sensors.len() - 1 {
                    "└─"
                } else {
                    "├─"
                };
                let rate = rate_hz(sensor)
                    .map(|hz| format!("{:.2} Hz", hz))
                    .unwrap_or_else(|| "every tick".to_string());
                let state = if sensor.enabled { "" } else { ", disabled" };
                println!(
                    "   {}     {} {} ({}, {}, first at {}{})",
                    child_prefix,
                    sensor_prefix,
                    sensor.id,
                    sensor.modality.as_str(),
                    rate,
                    sensor.first_capture_time,
                    state
                );
            }
        } else {
            println!("   {}  └─ {} sensors", child_prefix, ego.sensors.len());
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use contracts::{EgoConfig, Modality};

    use super::*;

    fn blueprint() -> RigBlueprint {
        RigBlueprint {
            version: Default::default(),
            scenario: Default::default(),
            scheduler: Default::default(),
            egos: vec![EgoConfig {
                id: "ego".to_string(),
                description: "hero".to_string(),
                sensors: vec![
                    SensorConfig {
                        id: "cam".to_string(),
                        modality: Modality::Camera,
                        description: String::new(),
                        period: 0.5,
                        first_capture_time: 0.0,
                        enabled: true,
                        metric_latency_ticks: Some(2),
                    },
                    SensorConfig {
                        id: "imu".to_string(),
                        modality: Modality::Imu,
                        description: String::new(),
                        period: 0.0,
                        first_capture_time: 0.0,
                        enabled: false,
                        metric_latency_ticks: None,
                    },
                ],
            }],
        }
    }

    #[test]
    fn json_lists_sensors_on_request() {
        let info = build_config_info(&blueprint(), true);
        let json = serde_json::to_value(&info).unwrap();

        let sensors = &json["egos"][0]["sensors"];
        assert_eq!(sensors.as_array().unwrap().len(), 2);
        assert_eq!(sensors[0]["rate_hz"], 2.0);
        assert_eq!(sensors[0]["metric_latency_ticks"], 2);
        assert!(sensors[1].get("rate_hz").is_none());
        assert_eq!(sensors[1]["enabled"], false);
    }

    #[test]
    fn json_omits_sensors_by_default() {
        let info = build_config_info(&blueprint(), false);
        let json = serde_json::to_value(&info).unwrap();

        assert_eq!(json["egos"][0]["sensor_count"], 2);
        assert!(json["egos"][0].get("sensors").is_none());
        assert_eq!(json["scenario"]["ticks_per_iteration"], 100);
    }
}
