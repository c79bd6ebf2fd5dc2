//! Scheduler configuration contracts shared across crates.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default idle step: one 60 Hz frame
pub const DEFAULT_IDLE_DELTA: f64 = 1.0 / 60.0;

/// Frame scheduler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SchedulerConfig {
    /// Virtual-time step used when no sensor is enabled (seconds)
    #[serde(default = "default_idle_delta")]
    #[validate(range(exclusive_min = 0.0))]
    pub idle_delta: f64,

    /// Due-time comparison tolerance; derived from the smallest period when unset
    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub timing_epsilon: Option<f64>,

    /// Reject egos registered with an empty description
    #[serde(default)]
    pub require_ego_description: bool,
}

fn default_idle_delta() -> f64 {
    DEFAULT_IDLE_DELTA
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            idle_delta: DEFAULT_IDLE_DELTA,
            timing_epsilon: None,
            require_ego_description: false,
        }
    }
}

impl SchedulerConfig {
    pub fn with_idle_delta(mut self, idle_delta: f64) -> Self {
        self.idle_delta = idle_delta;
        self
    }

    pub fn with_timing_epsilon(mut self, epsilon: f64) -> Self {
        self.timing_epsilon = Some(epsilon);
        self
    }

    pub fn requiring_ego_description(mut self) -> Self {
        self.require_ego_description = true;
        self
    }
}
