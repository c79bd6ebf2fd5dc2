//! Scenario orchestration module.

mod orchestrator;
mod stats;

pub use orchestrator::{RunConfig, Scenario};
pub use stats::RunStats;
