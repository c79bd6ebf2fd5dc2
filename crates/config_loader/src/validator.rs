//! Configuration validation.
//!
//! Field-level rules come from the `validator` derives on the blueprint
//! types. On top of those:
//! - ego ids are unique
//! - sensor ids are unique across all egos
//! - sensor timing is finite and non-negative
//! - time-scales are finite and > 0
//! - scheduler idle delta is finite

use std::collections::HashSet;

use ::validator::Validate;
use contracts::{ContractError, RigBlueprint};

/// Validate a blueprint, returning the first error found.
pub fn validate(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))?;

    validate_ego_ids(blueprint)?;
    validate_sensor_ids(blueprint)?;
    validate_sensor_timing(blueprint)?;
    validate_scenario(blueprint)?;
    validate_scheduler(blueprint)?;
    Ok(())
}

fn validate_ego_ids(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for ego in &blueprint.egos {
        if !seen.insert(ego.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("egos[id={}]", ego.id),
                "duplicate ego id",
            ));
        }
    }
    Ok(())
}

/// Sensor ids key delayed results, so they are unique globally
fn validate_sensor_ids(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (ego, sensor) in blueprint.all_sensors() {
        if !seen.insert(sensor.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("egos[{}].sensors[id={}]", ego.id, sensor.id),
                "duplicate sensor id",
            ));
        }
    }
    Ok(())
}

fn validate_sensor_timing(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    for (ego, sensor) in blueprint.all_sensors() {
        for (name, value) in [
            ("period", sensor.period),
            ("first_capture_time", sensor.first_capture_time),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ContractError::config_validation(
                    format!("egos[{}].sensors[{}].{name}", ego.id, sensor.id),
                    format!("{name} must be finite and >= 0, got {value}"),
                ));
            }
        }
    }
    Ok(())
}

fn validate_scenario(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    for (idx, scale) in blueprint.scenario.time_scales.iter().enumerate() {
        if !scale.is_finite() || *scale <= 0.0 {
            return Err(ContractError::config_validation(
                format!("scenario.time_scales[{idx}]"),
                format!("time scale must be finite and > 0, got {scale}"),
            ));
        }
    }
    Ok(())
}

fn validate_scheduler(blueprint: &RigBlueprint) -> Result<(), ContractError> {
    let scheduler = &blueprint.scheduler;
    if !scheduler.idle_delta.is_finite() {
        return Err(ContractError::config_validation(
            "scheduler.idle_delta",
            format!("idle_delta must be finite, got {}", scheduler.idle_delta),
        ));
    }
    if let Some(epsilon) = scheduler.timing_epsilon {
        if !epsilon.is_finite() {
            return Err(ContractError::config_validation(
                "scheduler.timing_epsilon",
                format!("timing_epsilon must be finite, got {epsilon}"),
            ));
        }
    }
    Ok(())
}
