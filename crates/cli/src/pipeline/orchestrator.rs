//! Scenario orchestrator.
//!
//! Drives a [`SchedulerState`] through the configured sequences. Sensors with
//! a metric latency act as delayed producers: each capture reserves a result
//! slot keyed by frame and sensor, the result is resolved `latency` ticks
//! later, and a consumer takes it on the same tick.

use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{Ident, RigBlueprint, RigGraph, SensorHandle, TickReport};
use observability::{
    record_correlator_depth, record_result_delivered, record_sensor_capture, record_tick_metrics,
};
use scheduler::{spawn_from_blueprint, FrameKey, ManualHost, ReservationToken, SchedulerState};
use tracing::{debug, info, warn};

use super::RunStats;

/// Scenario run configuration
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub blueprint: RigBlueprint,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Log every tick at info level
    pub trace_ticks: bool,
}

/// Delayed result of one capture
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureMetric {
    pub sensor_id: Ident,
    /// Frame that captured
    pub frame_index: u64,
    pub sequence_time: f64,
    /// Sensors that captured on the same frame
    pub value: u64,
}

/// Reservation waiting for its producer to finish
#[derive(Debug)]
struct InFlight {
    token: ReservationToken,
    key: FrameKey,
    resolve_at: u64,
    metric: CaptureMetric,
}

/// Scenario runner
pub struct Scenario {
    config: RunConfig,
}

impl Scenario {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run every sequence to completion
    pub async fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let mut state: SchedulerState<CaptureMetric> =
            SchedulerState::new(blueprint.scheduler.clone());
        let rig = spawn_from_blueprint(blueprint, state.scheduler_mut())
            .context("Failed to register rig")?;

        let delayed = delayed_producers(blueprint, &rig);
        info!(
            egos = rig.egos.len(),
            sensors = rig.sensors.len(),
            delayed_producers = delayed.len(),
            "Rig registered"
        );

        let scenario = &blueprint.scenario;
        let mut stats = RunStats {
            sensors: rig.sensors.len(),
            ..Default::default()
        };
        let mut host = ManualHost::default();
        // Reservations by the frame their producer finishes on
        let mut in_flight: BTreeMap<u64, Vec<InFlight>> = BTreeMap::new();

        for iteration in 0..scenario.iterations {
            if iteration > 0 {
                stats.results_dropped += state.correlator().len() as u64;
                in_flight.clear();
                state.start_new_sequence();
            }

            let time_scale = scenario.time_scale_for(iteration);
            host.set_time_scale(time_scale);
            info!(
                iteration,
                sequence = state.scheduler().sequence_index(),
                time_scale,
                "Sequence started"
            );

            for _ in 0..scenario.ticks_per_iteration {
                let report = state.advance(&mut host);
                self.observe_tick(&report, &rig, &mut stats);

                for &sensor in &report.captured {
                    if let Some((sensor_id, latency)) = delayed.get(&sensor) {
                        let flight = reserve_metric(&mut state, &report, sensor_id, *latency)?;
                        in_flight.entry(flight.resolve_at).or_default().push(flight);
                    }
                }

                let pending = in_flight.split_off(&(report.frame_index + 1));
                let finished = std::mem::replace(&mut in_flight, pending);
                for flight in finished.into_values().flatten() {
                    state
                        .resolve(flight.token, flight.metric)
                        .with_context(|| format!("Failed to resolve {}", flight.key))?;

                    if let Some(metric) = state.take_resolved(&flight.key) {
                        let latency = report.frame_index - metric.frame_index;
                        record_result_delivered(&metric.sensor_id, latency);
                        stats.results_delivered += 1;
                        debug!(
                            sensor_id = %metric.sensor_id,
                            captured_frame = metric.frame_index,
                            value = metric.value,
                            latency,
                            "Delayed metric delivered"
                        );
                    }
                }

                let correlator = state.correlator();
                record_correlator_depth(correlator.pending_count(), correlator.resolved_count());
                stats.peak_pending = stats.peak_pending.max(correlator.pending_count());

                tokio::task::yield_now().await;
            }

            stats.iterations += 1;
            stats.final_sequence_time = state.current_virtual_time();
        }

        stats.results_dropped += state.correlator().len() as u64;
        if stats.results_dropped > 0 {
            warn!(
                dropped = stats.results_dropped,
                "Delayed results outlived their sequence"
            );
        }

        stats.elapsed_virtual_time = state.scheduler().elapsed_time();
        stats.duration = start_time.elapsed();
        info!(
            iterations = stats.iterations,
            ticks = stats.metrics.total_ticks,
            duration_secs = stats.duration.as_secs_f64(),
            "Scenario complete"
        );

        Ok(stats)
    }

    fn observe_tick(&self, report: &TickReport, rig: &RigGraph, stats: &mut RunStats) {
        record_tick_metrics(report);
        stats.metrics.update_with_rig(report, rig);

        for handle in &report.captured {
            if let Some(sensor_id) = rig.sensor_name(*handle) {
                let modality = self
                    .config
                    .blueprint
                    .find_sensor(sensor_id)
                    .map(|s| s.modality.as_str())
                    .unwrap_or("other");
                record_sensor_capture(sensor_id, modality);
            }
        }

        if self.config.trace_ticks {
            let captured: Vec<&str> = report
                .captured
                .iter()
                .filter_map(|h| rig.sensor_name(*h).map(Ident::as_str))
                .collect();
            info!(
                frame = report.frame_index,
                sequence = report.sequence_index,
                t = format!("{:.4}", report.sequence_time),
                delta = format!("{:.4}", report.elapsed_delta),
                captured = ?captured,
                "Tick"
            );
        }
    }
}

fn delayed_producers(blueprint: &RigBlueprint, rig: &RigGraph) -> HashMap<SensorHandle, (Ident, u32)> {
    blueprint
        .delayed_metric_sensors()
        .into_iter()
        .filter_map(|(sensor_id, latency)| {
            rig.sensors
                .get(&sensor_id)
                .map(|handle| (*handle, (sensor_id, latency)))
        })
        .collect()
}

fn reserve_metric(
    state: &mut SchedulerState<CaptureMetric>,
    report: &TickReport,
    sensor_id: &Ident,
    latency: u32,
) -> Result<InFlight> {
    let token = state
        .reserve_for_frame(Some(sensor_id.clone()))
        .with_context(|| format!("Failed to reserve result for {sensor_id}"))?;

    Ok(InFlight {
        token,
        key: FrameKey::new(report.frame_index).with_sub_key(sensor_id.clone()),
        resolve_at: report.frame_index + u64::from(latency),
        metric: CaptureMetric {
            sensor_id: sensor_id.clone(),
            frame_index: report.frame_index,
            sequence_time: report.sequence_time,
            value: report.captured.len() as u64,
        },
    })
}
