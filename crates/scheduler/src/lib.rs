//! # Scheduler
//!
//! Deterministic sensor-capture scheduling over virtual time.
//!
//! Every engine tick the [`FrameScheduler`] picks the exact time step that
//! lands on the next due sensor, advances the [`SimulationClock`], and marks
//! the due sensors as captured for that frame only. The [`AsyncCorrelator`]
//! ties results that arrive on later ticks back to the frame that asked for
//! them. [`SchedulerState`] owns both.
//!
//! ## Usage
//!
//! ```
//! use contracts::{Modality, SensorDefinition};
//! use scheduler::{FrameKey, ManualHost, SchedulerState};
//!
//! let mut state: SchedulerState<u64> = SchedulerState::default();
//! let ego = state.register_ego("vehicle").unwrap();
//! let cam = state
//!     .register_sensor(ego, SensorDefinition::new(Modality::Camera, 0.5, 1.0))
//!     .unwrap();
//!
//! let mut host = ManualHost::new(1.0);
//! let report = state.advance(&mut host);
//! assert_eq!(report.capture_delta, 1.0);
//! assert!(state.should_capture_this_frame(cam));
//!
//! let token = state.reserve_for_frame(None).unwrap();
//! state.resolve(token, 3).unwrap();
//! assert_eq!(state.take_resolved(&FrameKey::new(report.frame_index)), Some(3));
//! ```

mod clock;
mod correlator;
mod error;
mod host;
mod registry;
mod rig;
mod scheduler;
mod state;

pub use clock::{ClockState, Sequence, SimulationClock};
pub use correlator::{AsyncCorrelator, FrameKey, ReservationToken};
pub use error::{InvalidTokenReason, Result, SchedulerError};
pub use host::ManualHost;
pub use registry::{Ego, Sensor, SensorRegistry};
pub use rig::spawn_from_blueprint;
pub use scheduler::FrameScheduler;
pub use state::SchedulerState;

// Re-export contracts types
pub use contracts::{
    EgoHandle, FrameTiming, Modality, SchedulerConfig, SensorDefinition, SensorHandle,
    SimulationHost, TickReport, TimeScaleViolation,
};
