//! Sensor definitions handed to the registry.

use serde::{Deserialize, Serialize};

/// Capture modality tag.
///
/// The scheduler never branches on it; it is carried so producers and
/// reports can tell sensors apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    #[default]
    Camera,
    Lidar,
    Radar,
    Imu,
    Gnss,
    /// Any capture source without a dedicated tag
    Other,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Camera => "camera",
            Modality::Lidar => "lidar",
            Modality::Radar => "radar",
            Modality::Imu => "imu",
            Modality::Gnss => "gnss",
            Modality::Other => "other",
        }
    }
}

/// Timing definition of one periodic capture source
///
/// Both times are virtual seconds; `first_capture_time` is measured from
/// the start of the sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorDefinition {
    pub modality: Modality,
    pub description: String,
    pub period: f64,
    pub first_capture_time: f64,
}

impl SensorDefinition {
    pub fn new(modality: Modality, period: f64, first_capture_time: f64) -> Self {
        Self {
            modality,
            description: String::new(),
            period,
            first_capture_time,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}
