//! SimulationHost trait - the engine seen from the scheduler
//!
//! The scheduler never owns the engine loop. Each tick it reads the
//! engine's time-scale and hands back the timing the engine must apply
//! before the next tick.

/// Timing the engine applies for the upcoming frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameTiming {
    /// Unscaled virtual-time step (the engine's capture delta)
    pub capture_delta: f64,

    /// Scaled step (`capture_delta * time_scale`), the frame's delta time
    pub delta_time: f64,
}

/// Engine-side collaborator of the frame scheduler.
///
/// # Example
///
/// ```ignore
/// let mut host = ManualHost::new(2.0);
/// let report = scheduler.step(&mut host);
/// assert_eq!(host.timing().delta_time, report.elapsed_delta);
/// ```
pub trait SimulationHost {
    /// Current externally controlled time-scale
    fn time_scale(&self) -> f64;

    /// Apply the timing computed for this tick
    fn apply_frame_timing(&mut self, timing: FrameTiming);
}
