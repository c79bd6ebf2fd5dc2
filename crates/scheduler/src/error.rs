//! Scheduler error types

use contracts::{EgoHandle, SensorHandle};
use thiserror::Error;

/// Why a reservation token was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTokenReason {
    /// A payload was already attached to the entry
    AlreadyResolved,
    /// The entry was dropped by a sequence reset
    Invalidated,
    /// The entry was already taken, or never existed
    Unknown,
}

/// Registration and correlator errors
#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    /// Malformed registration argument
    #[error("invalid argument '{field}': {message}")]
    InvalidArgument { field: &'static str, message: String },

    /// Ego handle not registered
    #[error("unknown ego {0}")]
    UnknownEgo(EgoHandle),

    /// Sensor handle not registered
    #[error("unknown sensor {0}")]
    UnknownSensor(SensorHandle),

    /// An entry already exists for the key, pending or not yet taken
    #[error("reservation conflict: key {key} already has an entry")]
    Conflict { key: String },

    /// Token cannot be resolved
    #[error("invalid reservation token: {reason:?}")]
    InvalidToken { reason: InvalidTokenReason },
}

impl SchedulerError {
    pub fn invalid_argument(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field,
            message: message.into(),
        }
    }

    pub fn invalid_token(reason: InvalidTokenReason) -> Self {
        Self::InvalidToken { reason }
    }
}

/// Scheduler Result alias
pub type Result<T> = std::result::Result<T, SchedulerError>;
