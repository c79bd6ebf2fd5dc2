//! # Contracts
//!
//! Shared interface contracts for the capture scheduler workspace.
//! Every other crate depends on this one; reverse dependencies are prohibited.
//!
//! ## Time Model
//! - Virtual time is `f64` seconds, advanced only by the frame scheduler
//! - `sequence_time` restarts at zero with every sequence
//! - `frame_index` is monotonic for the lifetime of the scheduler and is the
//!   key used to correlate delayed results with the tick that requested them

mod blueprint;
mod error;
mod host;
mod ident;
mod runtime;
mod scheduler_config;
mod sensor;
mod tick;

pub use blueprint::*;
pub use error::*;
pub use host::{FrameTiming, SimulationHost};
pub use ident::Ident;
pub use runtime::*;
pub use scheduler_config::*;
pub use sensor::*;
pub use tick::*;
