//! # Integration Tests
//!
//! Cross-crate scenarios for the capture scheduler:
//! - worked capture traces
//! - time-scale protocol across sequences
//! - correlator lifecycle through `SchedulerState`
//! - configuration to rig to run

#[cfg(test)]
fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[cfg(test)]
mod trace_tests {
    use scheduler::{FrameScheduler, ManualHost, Modality, SensorDefinition, SensorHandle};

    use crate::approx_eq;

    fn rig(sensors: &[(f64, f64)]) -> (FrameScheduler, Vec<SensorHandle>) {
        let mut scheduler = FrameScheduler::default();
        let ego = scheduler.register_ego("hero").unwrap();
        let handles = sensors
            .iter()
            .map(|&(period, first)| {
                scheduler
                    .register_sensor(ego, SensorDefinition::new(Modality::Camera, period, first))
                    .unwrap()
            })
            .collect();
        (scheduler, handles)
    }

    fn deltas(scheduler: &mut FrameScheduler, host: &mut ManualHost, ticks: usize) -> Vec<f64> {
        (0..ticks)
            .map(|_| scheduler.step(host).capture_delta)
            .collect()
    }

    #[test]
    fn lcm_interleaving_with_disabled_sensor() {
        let (mut scheduler, handles) = rig(&[(4.0, 10.0), (6.0, 10.0), (1.0, 0.5)]);
        scheduler.set_enabled(handles[2], false).unwrap();
        let mut host = ManualHost::new(1.0);

        let mut trace = Vec::new();
        for _ in 0..6 {
            let report = scheduler.step(&mut host);
            assert!(!report.captured(handles[2]));
            trace.push((report.capture_delta, report.captured.len()));
        }

        // t = 10, 14, 16, 18, 22, 26
        assert_eq!(
            trace,
            vec![(10.0, 2), (4.0, 1), (2.0, 1), (2.0, 1), (4.0, 2), (4.0, 1)]
        );
    }

    #[test]
    fn fractional_period_trace() {
        let (mut scheduler, handles) = rig(&[(0.4, 1.5)]);
        let mut host = ManualHost::new(1.0);

        let trace = deltas(&mut scheduler, &mut host, 4);
        let expected = [1.5, 0.4, 0.4, 0.4];
        for (got, want) in trace.iter().zip(expected) {
            assert!(approx_eq(*got, want), "{got} != {want}");
        }
        assert!(scheduler.should_capture_this_frame(handles[0]));
        assert!(approx_eq(scheduler.current_virtual_time(), 2.7));
    }

    #[test]
    fn time_scale_stretches_elapsed_only() {
        let (mut scheduler, _) = rig(&[(1.0, 2.0)]);
        let mut host = ManualHost::new(2.0);

        let mut elapsed = Vec::new();
        for _ in 0..4 {
            let report = scheduler.step(&mut host);
            assert_eq!(host.timing().delta_time, report.elapsed_delta);
            elapsed.push(report.elapsed_delta);
        }

        assert_eq!(elapsed, vec![4.0, 2.0, 2.0, 2.0]);
        assert_eq!(scheduler.current_virtual_time(), 5.0);
        assert_eq!(scheduler.elapsed_time(), 10.0);
    }

    #[test]
    fn captures_independent_of_rig_size() {
        let capture_times = |sensors: &[(f64, f64)]| {
            let (mut scheduler, handles) = rig(sensors);
            let mut host = ManualHost::default();
            let mut times = Vec::new();
            while times.len() < 5 {
                scheduler.step(&mut host);
                if scheduler.should_capture_this_frame(handles[0]) {
                    times.push(scheduler.current_virtual_time());
                }
            }
            times
        };

        let alone = capture_times(&[(2.5, 0.5)]);
        let crowded = capture_times(&[(2.5, 0.5), (0.7, 0.0), (3.0, 1.0), (0.0, 4.0)]);

        assert_eq!(alone.len(), crowded.len());
        for (i, (a, c)) in alone.iter().zip(&crowded).enumerate() {
            let want = 0.5 + 2.5 * i as f64;
            assert!(approx_eq(*a, want) && approx_eq(*c, want), "{a} {c} {want}");
        }
    }

    #[test]
    fn disable_takes_effect_next_tick_and_resume_keeps_phase() {
        let (mut scheduler, handles) = rig(&[(1.0, 1.0), (3.0, 3.0)]);
        let (clock, slow) = (handles[0], handles[1]);
        let mut host = ManualHost::default();

        deltas(&mut scheduler, &mut host, 3);
        assert!(scheduler.should_capture_this_frame(slow));

        scheduler.set_enabled(slow, false).unwrap();
        for _ in 0..2 {
            let report = scheduler.step(&mut host);
            assert!(report.captured(clock));
            assert!(!report.captured(slow));
        }
        assert_eq!(scheduler.current_virtual_time(), 5.0);

        scheduler.set_enabled(slow, true).unwrap();
        let report = scheduler.step(&mut host);
        assert_eq!(report.sequence_time, 6.0);
        assert!(report.captured(slow));
    }

    #[test]
    fn sensors_start_enabled() {
        let (scheduler, handles) = rig(&[(1.0, 0.0), (2.0, 0.0)]);
        assert_eq!(scheduler.registry().enabled_count(), 2);
        for handle in handles {
            assert!(scheduler.registry().sensor(handle).unwrap().is_enabled());
        }
    }

    #[test]
    fn reset_restarts_from_first_capture() {
        let (mut scheduler, _) = rig(&[(10.0, 4.0)]);
        let mut host = ManualHost::default();

        assert_eq!(deltas(&mut scheduler, &mut host, 2), vec![4.0, 10.0]);
        assert_eq!(scheduler.next_capture_delta(), Some(10.0));

        scheduler.reset_simulation();
        assert_eq!(scheduler.current_virtual_time(), 0.0);
        assert_eq!(scheduler.elapsed_time(), 0.0);
        assert_eq!(scheduler.next_capture_delta(), Some(4.0));
        assert_eq!(deltas(&mut scheduler, &mut host, 1), vec![4.0]);
    }
}

#[cfg(test)]
mod time_scale_tests {
    use scheduler::{FrameScheduler, ManualHost, Modality, SensorDefinition};

    fn scheduler() -> FrameScheduler {
        let mut scheduler = FrameScheduler::default();
        let ego = scheduler.register_ego("hero").unwrap();
        scheduler
            .register_sensor(ego, SensorDefinition::new(Modality::Lidar, 2.0, 2.0))
            .unwrap();
        scheduler
    }

    #[test]
    fn one_violation_per_offending_tick() {
        let mut scheduler = scheduler();
        let mut host = ManualHost::new(1.0);

        assert!(scheduler.step(&mut host).violation.is_none());
        assert!(scheduler.step(&mut host).violation.is_none());

        host.set_time_scale(3.0);
        for _ in 0..3 {
            let report = scheduler.step(&mut host);
            let violation = report.violation.expect("scale changed mid-sequence");
            assert_eq!(violation.baseline, 1.0);
            assert_eq!(violation.observed, 3.0);
            assert_eq!(violation.frame_index, report.frame_index);
            // Baseline keeps driving the elapsed delta
            assert_eq!(report.elapsed_delta, 2.0);
        }

        host.set_time_scale(1.0);
        assert!(scheduler.step(&mut host).violation.is_none());
    }

    #[test]
    fn new_sequence_accepts_new_scale() {
        let mut scheduler = scheduler();
        let mut host = ManualHost::new(1.0);
        scheduler.step(&mut host);
        scheduler.step(&mut host);

        scheduler.start_new_sequence();
        host.set_time_scale(4.0);

        let report = scheduler.step(&mut host);
        assert!(report.violation.is_none());
        assert_eq!(report.sequence_index, 1);
        assert_eq!(report.sequence_frame, 1);
        assert_eq!(report.sequence_time, 2.0);
        assert_eq!(report.elapsed_delta, 8.0);
        assert_eq!(report.frame_index, 3);
    }
}

#[cfg(test)]
mod correlator_tests {
    use scheduler::{
        FrameKey, InvalidTokenReason, ManualHost, Modality, SchedulerError, SchedulerState,
        SensorDefinition,
    };

    fn state() -> SchedulerState<String> {
        let mut state = SchedulerState::default();
        let ego = state.register_ego("hero").unwrap();
        state
            .register_sensor(ego, SensorDefinition::new(Modality::Camera, 1.0, 1.0))
            .unwrap();
        state
    }

    #[test]
    fn reserve_resolve_take_once() {
        let mut state = state();
        let mut host = ManualHost::default();
        let report = state.advance(&mut host);
        let key = FrameKey::new(report.frame_index);

        let token = state.reserve_for_frame(None).unwrap();
        assert!(matches!(
            state.reserve_for_frame(None),
            Err(SchedulerError::Conflict { .. })
        ));
        assert_eq!(state.take_resolved(&key), None);

        // The producer finishes a tick later
        state.advance(&mut host);
        state.resolve(token, "count=1".to_string()).unwrap();

        assert_eq!(state.take_resolved(&key).as_deref(), Some("count=1"));
        assert_eq!(state.take_resolved(&key), None);
        assert!(state.correlator().is_empty());
    }

    #[test]
    fn double_resolve_rejected() {
        let mut state = state();
        state.advance(&mut ManualHost::default());

        let token = state.reserve_for_frame(Some("cam".into())).unwrap();
        state.resolve(token, "a".to_string()).unwrap();
        assert_eq!(
            state.resolve(token, "b".to_string()),
            Err(SchedulerError::invalid_token(
                InvalidTokenReason::AlreadyResolved
            ))
        );
    }

    #[test]
    fn reset_drops_outstanding_entries() {
        let mut state = state();
        let mut host = ManualHost::default();
        state.advance(&mut host);
        state.advance(&mut host);

        let pending = state.reserve_for_frame(None).unwrap();
        let resolved = state.reserve_for_frame(Some("lidar".into())).unwrap();
        state.resolve(resolved, "done".to_string()).unwrap();
        let frame = state.frame_index();

        state.reset_simulation();

        assert_eq!(state.current_virtual_time(), 0.0);
        assert!(state.correlator().is_empty());
        assert_eq!(state.take_resolved(&FrameKey::new(frame)), None);
        assert_eq!(
            state.take_resolved(&FrameKey::new(frame).with_sub_key("lidar")),
            None
        );
        assert_eq!(
            state.resolve(pending, "late".to_string()),
            Err(SchedulerError::invalid_token(InvalidTokenReason::Invalidated))
        );
    }

    #[test]
    fn new_sequence_keeps_keys_distinct() {
        let mut state = state();
        let mut host = ManualHost::default();
        state.advance(&mut host);
        let old = state.reserve_for_frame(None).unwrap();

        state.start_new_sequence();
        state.advance(&mut host);

        // Frame indices keep counting, so the new frame never collides
        let fresh = state.reserve_for_frame(None).unwrap();
        state.resolve(fresh, "new".to_string()).unwrap();
        assert!(state.resolve(old, "old".to_string()).is_err());
        assert_eq!(
            state.take_resolved(&FrameKey::new(2)).as_deref(),
            Some("new")
        );
    }
}

#[cfg(test)]
mod e2e_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use observability::SchedulerMetricsAggregator;
    use scheduler::{spawn_from_blueprint, ManualHost, SchedulerState};

    const RIG: &str = r#"
[scenario]
iterations = 2
ticks_per_iteration = 6
time_scales = [1.0, 0.5]

[scheduler]
idle_delta = 0.05

[[egos]]
id = "hero"
description = "Data collection vehicle"

[[egos.sensors]]
id = "front_cam"
period = 4.0
first_capture_time = 10.0
metric_latency_ticks = 2

[[egos.sensors]]
id = "roof_lidar"
modality = "lidar"
period = 6.0
first_capture_time = 10.0

[[egos.sensors]]
id = "spare_cam"
period = 1.0
enabled = false
"#;

    /// Config file -> rig -> sequences, observed through the metrics aggregator
    #[test]
    fn config_to_rig_to_run() {
        let blueprint = ConfigLoader::load_from_str(RIG, ConfigFormat::Toml).unwrap();
        let mut state: SchedulerState<u64> = SchedulerState::new(blueprint.scheduler.clone());
        let rig = spawn_from_blueprint(&blueprint, state.scheduler_mut()).unwrap();
        assert_eq!(rig.sensors.len(), 3);

        let mut aggregator = SchedulerMetricsAggregator::new();
        let mut host = ManualHost::default();
        let mut deltas = Vec::new();

        for iteration in 0..blueprint.scenario.iterations {
            if iteration > 0 {
                state.start_new_sequence();
            }
            host.set_time_scale(blueprint.scenario.time_scale_for(iteration));
            for _ in 0..blueprint.scenario.ticks_per_iteration {
                let report = state.advance(&mut host);
                aggregator.update_with_rig(&report, &rig);
                deltas.push(report.elapsed_delta);
            }
        }

        let sequence = [10.0, 4.0, 2.0, 2.0, 4.0, 4.0];
        let halved: Vec<f64> = sequence.iter().map(|d| d * 0.5).collect();
        assert_eq!(&deltas[..6], &sequence);
        assert_eq!(&deltas[6..], &halved[..]);

        let summary = aggregator.summary();
        assert_eq!(summary.total_ticks, 12);
        assert_eq!(summary.sequences, 2);
        assert_eq!(summary.violations, 0);
        // t = 10, 14, 18, 22, 26 (cam) and 10, 16, 22 (lidar) per sequence
        assert_eq!(summary.captures_per_sensor["front_cam"], 10);
        assert_eq!(summary.captures_per_sensor["roof_lidar"], 6);
        assert!(!summary.captures_per_sensor.contains_key("spare_cam"));
    }

    #[test]
    fn invalid_config_never_reaches_the_scheduler() {
        let toml = r#"
[[egos]]
id = "hero"

[[egos.sensors]]
id = "cam"
period = 1.0
first_capture_time = -3.0
"#;
        assert!(ConfigLoader::load_from_str(toml, ConfigFormat::Toml).is_err());
    }
}
