//! Sensor registry.
//!
//! Plain storage for egos and sensors plus the due-time queries the frame
//! scheduler runs every tick. Handles are slab keys and stay valid for the
//! lifetime of the registry; nothing is ever unregistered.

use contracts::{EgoHandle, Modality, SensorDefinition, SensorHandle};
use slab::Slab;

use crate::error::{Result, SchedulerError};

/// Epsilon as a fraction of the smallest positive period
const RELATIVE_EPSILON: f64 = 1e-6;
/// Lower bound of the derived epsilon
const MIN_EPSILON: f64 = 1e-9;

/// Registered capture rig
#[derive(Debug, Clone)]
pub struct Ego {
    description: String,
    sensors: Vec<SensorHandle>,
}

impl Ego {
    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sensors(&self) -> &[SensorHandle] {
        &self.sensors
    }
}

/// Registered sensor and its scheduling bookkeeping
#[derive(Debug, Clone)]
pub struct Sensor {
    ego: EgoHandle,
    modality: Modality,
    description: String,
    period: f64,
    first_capture_time: f64,
    enabled: bool,
    last_capture: Option<f64>,
    next_due: f64,
    /// Frame index of the most recent capture
    captured_frame: Option<u64>,
}

impl Sensor {
    fn new(ego: EgoHandle, definition: SensorDefinition) -> Self {
        Self {
            ego,
            modality: definition.modality,
            description: definition.description,
            period: definition.period,
            first_capture_time: definition.first_capture_time,
            enabled: true,
            last_capture: None,
            next_due: definition.first_capture_time,
            captured_frame: None,
        }
    }

    pub fn ego(&self) -> EgoHandle {
        self.ego
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    pub fn first_capture_time(&self) -> f64 {
        self.first_capture_time
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn last_capture(&self) -> Option<f64> {
        self.last_capture
    }

    pub fn next_due(&self) -> f64 {
        self.next_due
    }

    pub fn captured_frame(&self) -> Option<u64> {
        self.captured_frame
    }

    fn record_capture(&mut self, time: f64, frame_index: u64) {
        self.last_capture = Some(time);
        self.next_due = time + self.period;
        self.captured_frame = Some(frame_index);
    }

    fn rewind(&mut self) {
        self.last_capture = None;
        self.next_due = self.first_capture_time;
        self.captured_frame = None;
    }
}

/// Ego and sensor storage
#[derive(Debug, Clone, Default)]
pub struct SensorRegistry {
    egos: Slab<Ego>,
    sensors: Slab<Sensor>,
    epsilon_override: Option<f64>,
}

impl SensorRegistry {
    pub fn new(epsilon_override: Option<f64>) -> Self {
        Self {
            egos: Slab::new(),
            sensors: Slab::new(),
            epsilon_override,
        }
    }

    /// Register an ego.
    ///
    /// An empty description is only rejected when `require_description` is set.
    pub fn register_ego(
        &mut self,
        description: impl Into<String>,
        require_description: bool,
    ) -> Result<EgoHandle> {
        let description = description.into();
        if require_description && description.trim().is_empty() {
            return Err(SchedulerError::invalid_argument(
                "description",
                "ego description must not be empty",
            ));
        }
        let key = self.egos.insert(Ego {
            description,
            sensors: Vec::new(),
        });
        Ok(EgoHandle(key))
    }

    /// Register a sensor on an existing ego. It starts enabled and first
    /// becomes due at its first-capture time.
    pub fn register_sensor(
        &mut self,
        ego: EgoHandle,
        definition: SensorDefinition,
    ) -> Result<SensorHandle> {
        check_timing("period", definition.period)?;
        check_timing("first_capture_time", definition.first_capture_time)?;
        if !self.egos.contains(ego.0) {
            return Err(SchedulerError::UnknownEgo(ego));
        }

        let handle = SensorHandle(self.sensors.insert(Sensor::new(ego, definition)));
        self.egos[ego.0].sensors.push(handle);
        Ok(handle)
    }

    /// Toggle scheduling of a sensor; timing state is left untouched.
    pub fn set_enabled(&mut self, sensor: SensorHandle, enabled: bool) -> Result<()> {
        self.sensors
            .get_mut(sensor.0)
            .map(|s| s.enabled = enabled)
            .ok_or(SchedulerError::UnknownSensor(sensor))
    }

    pub fn sensor(&self, handle: SensorHandle) -> Option<&Sensor> {
        self.sensors.get(handle.0)
    }

    pub fn ego(&self, handle: EgoHandle) -> Option<&Ego> {
        self.egos.get(handle.0)
    }

    pub fn sensors_of(&self, ego: EgoHandle) -> Option<&[SensorHandle]> {
        self.egos.get(ego.0).map(Ego::sensors)
    }

    /// All sensors in registration order
    pub fn iter(&self) -> impl Iterator<Item = (SensorHandle, &Sensor)> {
        self.sensors.iter().map(|(key, s)| (SensorHandle(key), s))
    }

    fn enabled(&self) -> impl Iterator<Item = (SensorHandle, &Sensor)> {
        self.iter().filter(|(_, s)| s.enabled)
    }

    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }

    pub fn ego_count(&self) -> usize {
        self.egos.len()
    }

    pub fn enabled_count(&self) -> usize {
        self.enabled().count()
    }

    /// Tolerance for due-time comparisons
    pub fn timing_epsilon(&self) -> f64 {
        if let Some(epsilon) = self.epsilon_override {
            return epsilon;
        }
        self.sensors
            .iter()
            .map(|(_, s)| s.period)
            .filter(|p| *p > 0.0)
            .min_by(f64::total_cmp)
            .map(|p| (p * RELATIVE_EPSILON).max(MIN_EPSILON))
            .unwrap_or(MIN_EPSILON)
    }

    /// Enabled sensors whose next-due time has been reached at `time`
    pub fn query_due_sensors(&self, time: f64) -> Vec<SensorHandle> {
        let epsilon = self.timing_epsilon();
        self.enabled()
            .filter(|(_, s)| s.next_due <= time + epsilon)
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Earliest next-due time over enabled sensors
    pub fn next_due_time(&self) -> Option<f64> {
        self.enabled().map(|(_, s)| s.next_due).min_by(f64::total_cmp)
    }

    /// Time the next tick must land on, seen from `now`.
    ///
    /// Sensors already due at `now` that have not captured at `now` pull the
    /// landing to `now`; everything else contributes its next-due time.
    pub(crate) fn next_landing(&self, now: f64) -> Option<f64> {
        let epsilon = self.timing_epsilon();
        self.enabled()
            .filter_map(|(_, s)| {
                if s.next_due > now + epsilon {
                    return Some(s.next_due);
                }
                let captured_now = s
                    .last_capture
                    .is_some_and(|last| (last - now).abs() <= epsilon);
                (!captured_now).then_some(now)
            })
            .min_by(f64::total_cmp)
    }

    pub(crate) fn mark_captured(&mut self, sensor: SensorHandle, time: f64, frame_index: u64) {
        if let Some(s) = self.sensors.get_mut(sensor.0) {
            s.record_capture(time, frame_index);
        }
    }

    /// Move a next-due time that lies in the past up to `now`
    pub(crate) fn clamp_next_due(&mut self, sensor: SensorHandle, now: f64) {
        if let Some(s) = self.sensors.get_mut(sensor.0) {
            s.next_due = s.next_due.max(now);
        }
    }

    /// Forget all capture bookkeeping; registrations stay
    pub(crate) fn rewind_all(&mut self) {
        for (_, s) in self.sensors.iter_mut() {
            s.rewind();
        }
    }
}

fn check_timing(field: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SchedulerError::invalid_argument(
            field,
            format!("must be a finite non-negative number, got {value}"),
        ))
    }
}
