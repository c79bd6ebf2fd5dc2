//! RigBlueprint - Config Loader output
//!
//! Describes a complete capture run: the scenario (how many sequences, at
//! which time-scale), scheduler tuning, and the egos with their sensors.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Ident, Modality, SchedulerConfig, SensorDefinition};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete capture run configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RigBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Sequence layout of the run
    #[serde(default)]
    #[validate(nested)]
    pub scenario: ScenarioConfig,

    /// Frame scheduler tuning
    #[serde(default)]
    #[validate(nested)]
    pub scheduler: SchedulerConfig,

    /// Capture rigs
    #[validate(nested)]
    pub egos: Vec<EgoConfig>,
}

/// How the run is split into sequences
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ScenarioConfig {
    /// Number of sequences (one per generated dataset iteration)
    #[serde(default = "default_iterations")]
    #[validate(range(min = 1))]
    pub iterations: u32,

    /// Engine ticks per sequence
    #[serde(default = "default_ticks_per_iteration")]
    #[validate(range(min = 1))]
    pub ticks_per_iteration: u64,

    /// Time-scale per iteration, cycled when shorter than `iterations`
    #[serde(default = "default_time_scales")]
    #[validate(length(min = 1))]
    pub time_scales: Vec<f64>,
}

fn default_iterations() -> u32 {
    1
}

fn default_ticks_per_iteration() -> u64 {
    100
}

fn default_time_scales() -> Vec<f64> {
    vec![1.0]
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            iterations: default_iterations(),
            ticks_per_iteration: default_ticks_per_iteration(),
            time_scales: default_time_scales(),
        }
    }
}

impl ScenarioConfig {
    /// Time-scale used by the given iteration
    pub fn time_scale_for(&self, iteration: u32) -> f64 {
        if self.time_scales.is_empty() {
            return 1.0;
        }
        self.time_scales[iteration as usize % self.time_scales.len()]
    }
}

/// Ego (capture rig) configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EgoConfig {
    /// Unique identifier
    #[validate(length(min = 1))]
    pub id: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Mounted sensors
    #[serde(default)]
    #[validate(nested)]
    pub sensors: Vec<SensorConfig>,
}

/// Sensor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SensorConfig {
    /// Unique identifier (global across egos)
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(default)]
    pub modality: Modality,

    #[serde(default)]
    pub description: String,

    /// Capture period in virtual seconds
    #[validate(range(min = 0.0))]
    pub period: f64,

    /// Offset of the first capture from sequence start
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub first_capture_time: f64,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Ticks between a capture and its delayed metric result
    #[serde(default)]
    pub metric_latency_ticks: Option<u32>,
}

fn default_enabled() -> bool {
    true
}

impl SensorConfig {
    pub fn definition(&self) -> SensorDefinition {
        SensorDefinition::new(self.modality, self.period, self.first_capture_time)
            .with_description(self.description.clone())
    }
}

impl RigBlueprint {
    /// Every sensor paired with the ID of its ego
    pub fn all_sensors(&self) -> impl Iterator<Item = (&EgoConfig, &SensorConfig)> {
        self.egos
            .iter()
            .flat_map(|ego| ego.sensors.iter().map(move |sensor| (ego, sensor)))
    }

    pub fn sensor_count(&self) -> usize {
        self.egos.iter().map(|ego| ego.sensors.len()).sum()
    }

    pub fn find_sensor(&self, id: &str) -> Option<&SensorConfig> {
        self.all_sensors()
            .map(|(_, sensor)| sensor)
            .find(|sensor| sensor.id == id)
    }

    /// Sensors that produce a delayed metric, with their latency
    pub fn delayed_metric_sensors(&self) -> Vec<(Ident, u32)> {
        self.all_sensors()
            .filter_map(|(_, sensor)| {
                sensor
                    .metric_latency_ticks
                    .map(|latency| (Ident::from(sensor.id.as_str()), latency))
            })
            .collect()
    }
}
