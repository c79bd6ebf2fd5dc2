//! Rig construction from a blueprint.

use contracts::{EgoConfig, Ident, RigBlueprint, RigGraph};
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::scheduler::FrameScheduler;

/// Register every ego and sensor of `blueprint` on `scheduler`.
///
/// Initial `enabled` flags are applied. The first failing registration
/// aborts; egos and sensors registered before it stay registered.
#[instrument(
    name = "rig_spawn_from_blueprint",
    skip(blueprint, scheduler),
    fields(ego_count = blueprint.egos.len(), sensor_count = blueprint.sensor_count())
)]
pub fn spawn_from_blueprint(
    blueprint: &RigBlueprint,
    scheduler: &mut FrameScheduler,
) -> Result<RigGraph> {
    let mut graph = RigGraph::new();

    for ego in &blueprint.egos {
        if let Err(e) = spawn_ego_with_sensors(ego, scheduler, &mut graph) {
            warn!(error = %e, ego_id = %ego.id, "rig registration failed");
            return Err(e);
        }
    }

    info!(
        egos = graph.egos.len(),
        sensors = graph.sensors.len(),
        "rig registered"
    );
    Ok(graph)
}

fn spawn_ego_with_sensors(
    config: &EgoConfig,
    scheduler: &mut FrameScheduler,
    graph: &mut RigGraph,
) -> Result<()> {
    let ego_id = Ident::from(config.id.as_str());
    let description = if config.description.is_empty() {
        config.id.clone()
    } else {
        config.description.clone()
    };
    let ego = scheduler.register_ego(description)?;
    graph.register_ego(ego_id.clone(), ego);

    for sensor in &config.sensors {
        let handle = scheduler.register_sensor(ego, sensor.definition())?;
        if !sensor.enabled {
            scheduler.set_enabled(handle, false)?;
        }
        graph.register_sensor(Ident::from(sensor.id.as_str()), ego_id.clone(), handle);
    }
    Ok(())
}
