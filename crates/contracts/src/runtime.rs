//! Registration handles and the rig graph built from a blueprint.

use std::collections::HashMap;
use std::fmt;

use crate::Ident;

/// Handle of a registered ego (capture rig)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EgoHandle(pub usize);

/// Handle of a registered sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SensorHandle(pub usize);

impl fmt::Display for EgoHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ego#{}", self.0)
    }
}

impl fmt::Display for SensorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor#{}", self.0)
    }
}

/// Name ↔ handle mapping for a rig registered from configuration.
#[derive(Debug, Clone, Default)]
pub struct RigGraph {
    /// Ego ID -> handle
    pub egos: HashMap<Ident, EgoHandle>,

    /// Sensor ID -> handle
    pub sensors: HashMap<Ident, SensorHandle>,

    /// Sensor ID -> owning ego ID
    pub sensor_to_ego: HashMap<Ident, Ident>,

    /// Sensor handle -> sensor ID (reverse lookup)
    pub handle_to_sensor: HashMap<SensorHandle, Ident>,
}

impl RigGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_ego(&mut self, id: Ident, handle: EgoHandle) {
        self.egos.insert(id, handle);
    }

    pub fn register_sensor(&mut self, sensor_id: Ident, ego_id: Ident, handle: SensorHandle) {
        self.handle_to_sensor.insert(handle, sensor_id.clone());
        self.sensor_to_ego.insert(sensor_id.clone(), ego_id);
        self.sensors.insert(sensor_id, handle);
    }

    /// Configured name of a sensor handle
    pub fn sensor_name(&self, handle: SensorHandle) -> Option<&Ident> {
        self.handle_to_sensor.get(&handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_lookup() {
        let mut graph = RigGraph::new();
        graph.register_ego("ego".into(), EgoHandle(0));
        graph.register_sensor("cam".into(), "ego".into(), SensorHandle(3));

        assert_eq!(graph.sensors.get("cam"), Some(&SensorHandle(3)));
        assert_eq!(graph.sensor_name(SensorHandle(3)).map(Ident::as_str), Some("cam"));
        assert_eq!(graph.sensor_to_ego.get("cam").map(Ident::as_str), Some("ego"));
        assert!(graph.sensor_name(SensorHandle(4)).is_none());
    }

    #[test]
    fn handle_display() {
        assert_eq!(SensorHandle(2).to_string(), "sensor#2");
        assert_eq!(EgoHandle(0).to_string(), "ego#0");
    }
}
