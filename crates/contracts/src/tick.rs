//! TickReport - Frame scheduler output
//!
//! What happened on one engine tick.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::SensorHandle;

/// Result of one scheduler step
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Monotonic frame index (never reset, used as correlator key)
    pub frame_index: u64,

    /// Index of the sequence this tick belongs to
    pub sequence_index: u64,

    /// Frame counter within the sequence (1 on the first tick)
    pub sequence_frame: u64,

    /// Virtual time since sequence start, after this tick's advance
    pub sequence_time: f64,

    /// Unscaled gap traversed by this tick
    pub capture_delta: f64,

    /// Scaled gap observers see as this tick's elapsed time
    pub elapsed_delta: f64,

    /// Sensors that capture on this tick, in registration order
    pub captured: Vec<SensorHandle>,

    /// Unscaled gap to the next required capture, if any sensor is enabled
    pub next_capture_delta: Option<f64>,

    /// Time-scale change detected on this tick
    pub violation: Option<TimeScaleViolation>,
}

impl TickReport {
    pub fn captured(&self, sensor: SensorHandle) -> bool {
        self.captured.contains(&sensor)
    }
}

/// Time-scale changed mid-sequence
///
/// Reported once per offending tick; scheduling continues on the baseline.
#[derive(Debug, Clone, Copy, PartialEq, Error, Serialize, Deserialize)]
#[error(
    "time scale may not change mid-sequence: sequence {sequence_index} started with {baseline}, \
     observed {observed} on frame {frame_index}; start a new sequence to change it"
)]
pub struct TimeScaleViolation {
    pub sequence_index: u64,
    pub frame_index: u64,
    pub baseline: f64,
    pub observed: f64,
}
