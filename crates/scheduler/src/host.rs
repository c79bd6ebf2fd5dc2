//! In-process simulation host.

use contracts::{FrameTiming, SimulationHost};

/// Host whose time-scale is set by hand.
///
/// Records the timing of the last tick; used by the scenario driver and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualHost {
    time_scale: f64,
    timing: FrameTiming,
    ticks: u64,
}

impl Default for ManualHost {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ManualHost {
    pub fn new(time_scale: f64) -> Self {
        Self {
            time_scale,
            timing: FrameTiming::default(),
            ticks: 0,
        }
    }

    pub fn set_time_scale(&mut self, time_scale: f64) {
        self.time_scale = time_scale;
    }

    /// Timing applied by the last tick
    pub fn timing(&self) -> FrameTiming {
        self.timing
    }

    /// Number of ticks applied
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

impl SimulationHost for ManualHost {
    fn time_scale(&self) -> f64 {
        self.time_scale
    }

    fn apply_frame_timing(&mut self, timing: FrameTiming) {
        self.timing = timing;
        self.ticks += 1;
    }
}
