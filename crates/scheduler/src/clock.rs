//! Simulation clock.
//!
//! Owns the virtual timeline of the current sequence and the time-scale
//! baseline captured on its first tick. Only the frame scheduler moves it.

use contracts::TimeScaleViolation;

/// Clock lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    /// Nothing registered and no tick yet, or just reset
    Uninitialized,
    /// A sequence is open
    Running,
}

/// One independent timeline
#[derive(Debug, Clone, PartialEq)]
pub struct Sequence {
    pub index: u64,
    /// Captured on the first tick of the sequence
    pub baseline_time_scale: Option<f64>,
    /// Unscaled virtual time since the sequence started
    pub time: f64,
    /// Ticks executed within the sequence
    pub frame_count: u64,
}

impl Sequence {
    fn new(index: u64) -> Self {
        Self {
            index,
            baseline_time_scale: None,
            time: 0.0,
            frame_count: 0,
        }
    }
}

/// Virtual clock shared by every sensor of the scheduler
#[derive(Debug, Clone)]
pub struct SimulationClock {
    state: ClockState,
    sequence: Sequence,
    /// Sequences opened since the last full reset
    sequences_opened: u64,
    /// Accumulated scaled time across sequences
    elapsed_time: f64,
    /// Monotonic tick counter, survives resets
    frame_index: u64,
    /// Unscaled gap traversed by the last tick
    capture_delta: f64,
    /// Scaled gap traversed by the last tick
    frame_elapsed: f64,
}

impl Default for SimulationClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationClock {
    pub fn new() -> Self {
        Self {
            state: ClockState::Uninitialized,
            sequence: Sequence::new(0),
            sequences_opened: 0,
            elapsed_time: 0.0,
            frame_index: 0,
            capture_delta: 0.0,
            frame_elapsed: 0.0,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }

    /// `Uninitialized -> Running`; no-op when already running.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        self.state = ClockState::Running;
        self.open_sequence();
    }

    /// Close the current sequence and open a fresh one.
    ///
    /// Accumulated scaled time and the frame index carry over.
    pub fn reset_sequence(&mut self) {
        if !self.is_running() {
            self.start();
            return;
        }
        self.open_sequence();
        self.capture_delta = 0.0;
        self.frame_elapsed = 0.0;
    }

    /// Back to `Uninitialized` with every accumulator zeroed.
    pub fn reset(&mut self) {
        self.state = ClockState::Uninitialized;
        self.sequence = Sequence::new(0);
        self.sequences_opened = 0;
        self.elapsed_time = 0.0;
        self.capture_delta = 0.0;
        self.frame_elapsed = 0.0;
    }

    fn open_sequence(&mut self) {
        self.sequence = Sequence::new(self.sequences_opened);
        self.sequences_opened += 1;
    }

    /// Check the engine's time-scale against the sequence baseline.
    ///
    /// The first observation of a sequence becomes its baseline.
    pub fn observe_time_scale(&mut self, observed: f64) -> Result<(), TimeScaleViolation> {
        match self.sequence.baseline_time_scale {
            None => {
                self.sequence.baseline_time_scale = Some(observed);
                Ok(())
            }
            Some(baseline) if same_scale(baseline, observed) => Ok(()),
            Some(baseline) => Err(TimeScaleViolation {
                sequence_index: self.sequence.index,
                frame_index: self.frame_index + 1,
                baseline,
                observed,
            }),
        }
    }

    /// Land the sequence time exactly on `target`.
    pub fn advance_to(&mut self, target: f64, time_scale: f64) {
        let delta = (target - self.sequence.time).max(0.0);
        self.sequence.time = target.max(self.sequence.time);
        self.capture_delta = delta;
        self.frame_elapsed = delta * time_scale;
        self.elapsed_time += self.frame_elapsed;
        self.frame_index += 1;
        self.sequence.frame_count += 1;
    }

    pub fn sequence(&self) -> &Sequence {
        &self.sequence
    }

    pub fn sequence_time(&self) -> f64 {
        self.sequence.time
    }

    pub fn baseline_time_scale(&self) -> Option<f64> {
        self.sequence.baseline_time_scale
    }

    pub fn elapsed_time(&self) -> f64 {
        self.elapsed_time
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn capture_delta(&self) -> f64 {
        self.capture_delta
    }

    pub fn frame_elapsed(&self) -> f64 {
        self.frame_elapsed
    }
}

fn same_scale(a: f64, b: f64) -> bool {
    (a - b).abs() <= f64::EPSILON * a.abs().max(b.abs()).max(1.0)
}
