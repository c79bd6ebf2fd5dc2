//! Frame scheduler.
//!
//! Runs once per engine tick. Plans the exact virtual-time step that lands on
//! the next due sensor, moves the clock there, and marks every sensor due at
//! the new time as captured for that frame only.

use contracts::{
    EgoHandle, FrameTiming, SchedulerConfig, SensorDefinition, SensorHandle, SimulationHost,
    TickReport, TimeScaleViolation,
};
use metrics::counter;
use tracing::{debug, error, instrument, trace};

use crate::clock::SimulationClock;
use crate::error::Result;
use crate::registry::SensorRegistry;

/// Deterministic capture scheduler over a set of periodic sensors
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    config: SchedulerConfig,
    registry: SensorRegistry,
    clock: SimulationClock,
}

impl Default for FrameScheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            registry: SensorRegistry::new(config.timing_epsilon),
            clock: SimulationClock::new(),
            config,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn registry(&self) -> &SensorRegistry {
        &self.registry
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    #[instrument(level = "debug", name = "frame_scheduler_register_ego", skip(self, description))]
    pub fn register_ego(&mut self, description: impl Into<String>) -> Result<EgoHandle> {
        let handle = self
            .registry
            .register_ego(description, self.config.require_ego_description)?;
        self.clock.start();
        debug!(ego = %handle, "ego registered");
        Ok(handle)
    }

    /// Register a sensor on `ego`.
    ///
    /// A first-capture time already behind the current sequence time is
    /// clamped forward, so the sensor captures on the next tick.
    #[instrument(
        level = "debug",
        name = "frame_scheduler_register_sensor",
        skip(self, definition),
        fields(
            modality = definition.modality.as_str(),
            period = definition.period,
            first_capture_time = definition.first_capture_time
        )
    )]
    pub fn register_sensor(
        &mut self,
        ego: EgoHandle,
        definition: SensorDefinition,
    ) -> Result<SensorHandle> {
        let handle = self.registry.register_sensor(ego, definition)?;
        self.clock.start();
        self.registry
            .clamp_next_due(handle, self.clock.sequence_time());
        debug!(%ego, sensor = %handle, "sensor registered");
        Ok(handle)
    }

    pub fn set_enabled(&mut self, sensor: SensorHandle, enabled: bool) -> Result<()> {
        self.registry.set_enabled(sensor, enabled)?;
        debug!(%sensor, enabled, "sensor enabled flag changed");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Execute one engine tick.
    ///
    /// A time-scale that differs from the sequence baseline is reported in
    /// the returned [`TickReport`] and scheduling continues on the baseline.
    #[instrument(
        level = "trace",
        name = "frame_scheduler_step",
        skip(self, host),
        fields(sequence = self.clock.sequence().index)
    )]
    pub fn step<H>(&mut self, host: &mut H) -> TickReport
    where
        H: SimulationHost + ?Sized,
    {
        self.clock.start();

        let observed = host.time_scale();
        let violation = self.clock.observe_time_scale(observed).err();
        if let Some(violation) = &violation {
            report_violation(violation);
        }
        let time_scale = self.clock.baseline_time_scale().unwrap_or(observed);

        let now = self.clock.sequence_time();
        let target = self
            .plan_landing(now)
            .unwrap_or(now + self.config.idle_delta);
        self.clock.advance_to(target, time_scale);

        host.apply_frame_timing(FrameTiming {
            capture_delta: self.clock.capture_delta(),
            delta_time: self.clock.frame_elapsed(),
        });

        let time = self.clock.sequence_time();
        let frame_index = self.clock.frame_index();
        let captured = self.registry.query_due_sensors(time);
        for &sensor in &captured {
            self.registry.mark_captured(sensor, time, frame_index);
        }

        let next_capture_delta = self.next_capture_delta();
        trace!(
            frame_index,
            sequence_time = time,
            capture_delta = self.clock.capture_delta(),
            captured = captured.len(),
            "tick"
        );

        TickReport {
            frame_index,
            sequence_index: self.clock.sequence().index,
            sequence_frame: self.clock.sequence().frame_count,
            sequence_time: time,
            capture_delta: self.clock.capture_delta(),
            elapsed_delta: self.clock.frame_elapsed(),
            captured,
            next_capture_delta,
            violation,
        }
    }

    /// Sequence time the next tick lands on, `None` without enabled sensors.
    fn plan_landing(&self, now: f64) -> Option<f64> {
        self.registry.next_landing(now).or_else(|| {
            // Only zero-period sensors that already captured at `now` remain
            (self.registry.enabled_count() > 0).then_some(now + self.config.idle_delta)
        })
    }

    // ------------------------------------------------------------------
    // Per-tick queries
    // ------------------------------------------------------------------

    /// True only on the tick the sensor captured
    pub fn should_capture_this_frame(&self, sensor: SensorHandle) -> bool {
        self.registry
            .sensor(sensor)
            .and_then(|s| s.captured_frame())
            .is_some_and(|frame| frame == self.clock.frame_index())
    }

    /// Virtual time since the current sequence started
    pub fn current_virtual_time(&self) -> f64 {
        self.clock.sequence_time()
    }

    /// Scaled time traversed by the last tick
    pub fn current_frame_elapsed_delta(&self) -> f64 {
        self.clock.frame_elapsed()
    }

    /// Unscaled time traversed by the last tick
    pub fn capture_delta_time(&self) -> f64 {
        self.clock.capture_delta()
    }

    /// Accumulated scaled time since the last full reset
    pub fn elapsed_time(&self) -> f64 {
        self.clock.elapsed_time()
    }

    pub fn frame_index(&self) -> u64 {
        self.clock.frame_index()
    }

    pub fn sequence_index(&self) -> u64 {
        self.clock.sequence().index
    }

    /// Unscaled gap the next tick will traverse, `None` without enabled sensors
    pub fn next_capture_delta(&self) -> Option<f64> {
        let now = self.clock.sequence_time();
        self.plan_landing(now).map(|landing| landing - now)
    }

    // ------------------------------------------------------------------
    // Sequence control
    // ------------------------------------------------------------------

    /// Open a new timeline; the next tick may use a different time-scale.
    #[instrument(level = "debug", name = "frame_scheduler_new_sequence", skip(self))]
    pub fn start_new_sequence(&mut self) {
        self.clock.reset_sequence();
        self.registry.rewind_all();
        counter!("capture_scheduler_sequences_total").increment(1);
        debug!(sequence = self.clock.sequence().index, "sequence started");
    }

    /// Return to the freshly constructed state, keeping registrations.
    #[instrument(level = "debug", name = "frame_scheduler_reset", skip(self))]
    pub fn reset_simulation(&mut self) {
        self.clock.reset();
        self.registry.rewind_all();
        debug!(sensors = self.registry.len(), "simulation reset");
    }
}

fn report_violation(violation: &TimeScaleViolation) {
    counter!("capture_scheduler_time_scale_violations_total").increment(1);
    error!(
        sequence = violation.sequence_index,
        frame_index = violation.frame_index,
        baseline = violation.baseline,
        observed = violation.observed,
        "{violation}"
    );
}

#[cfg(test)]
mod tests {
    use contracts::Modality;

    use super::*;
    use crate::ManualHost;

    const TOLERANCE: f64 = 1e-9;

    fn camera(period: f64, first: f64) -> SensorDefinition {
        SensorDefinition::new(Modality::Camera, period, first)
    }

    fn scheduler_with(sensors: &[(f64, f64)]) -> (FrameScheduler, Vec<SensorHandle>) {
        let mut scheduler = FrameScheduler::default();
        let ego = scheduler.register_ego("ego").unwrap();
        let handles = sensors
            .iter()
            .map(|&(period, first)| scheduler.register_sensor(ego, camera(period, first)).unwrap())
            .collect();
        (scheduler, handles)
    }

    #[test]
    fn lcm_interleaving() {
        let (mut scheduler, sensors) = scheduler_with(&[(4.0, 10.0), (6.0, 10.0)]);
        let mut host = ManualHost::new(1.0);

        let expected = [
            (10.0, true, true),
            (4.0, true, false),
            (2.0, false, true),
            (2.0, true, false),
            (4.0, true, true),
        ];
        for (delta, a, b) in expected {
            let report = scheduler.step(&mut host);
            assert!((report.elapsed_delta - delta).abs() < TOLERANCE);
            assert!((host.timing().delta_time - delta).abs() < TOLERANCE);
            assert_eq!(scheduler.should_capture_this_frame(sensors[0]), a);
            assert_eq!(scheduler.should_capture_this_frame(sensors[1]), b);
        }
    }

    #[test]
    fn capture_flag_lasts_one_tick() {
        let (mut scheduler, sensors) = scheduler_with(&[(1.0, 0.0), (3.0, 0.0)]);
        let mut host = ManualHost::new(1.0);

        let report = scheduler.step(&mut host);
        assert_eq!(report.captured, sensors);
        assert_eq!(report.capture_delta, 0.0);

        scheduler.step(&mut host);
        assert!(scheduler.should_capture_this_frame(sensors[0]));
        assert!(!scheduler.should_capture_this_frame(sensors[1]));
    }

    #[test]
    fn idle_delta_without_enabled_sensors() {
        let config = SchedulerConfig::default().with_idle_delta(0.5);
        let mut scheduler = FrameScheduler::new(config);
        let mut host = ManualHost::new(2.0);

        let report = scheduler.step(&mut host);
        assert_eq!(report.capture_delta, 0.5);
        assert_eq!(report.elapsed_delta, 1.0);
        assert!(report.captured.is_empty());
        assert_eq!(report.next_capture_delta, None);
    }

    #[test]
    fn zero_period_sensor_captures_every_tick() {
        let config = SchedulerConfig::default().with_idle_delta(0.25);
        let mut scheduler = FrameScheduler::new(config);
        let ego = scheduler.register_ego("ego").unwrap();
        let every = scheduler.register_sensor(ego, camera(0.0, 0.0)).unwrap();
        let mut host = ManualHost::new(1.0);

        for _ in 0..4 {
            scheduler.step(&mut host);
            assert!(scheduler.should_capture_this_frame(every));
        }
        assert_eq!(scheduler.current_virtual_time(), 0.75);
    }

    #[test]
    fn late_registration_captures_next_tick() {
        let (mut scheduler, _) = scheduler_with(&[(5.0, 5.0)]);
        let mut host = ManualHost::new(1.0);
        scheduler.step(&mut host);
        scheduler.step(&mut host);
        assert_eq!(scheduler.current_virtual_time(), 10.0);

        let ego = scheduler.register_ego("late").unwrap();
        let late = scheduler.register_sensor(ego, camera(2.0, 1.0)).unwrap();
        assert_eq!(scheduler.registry().sensor(late).unwrap().next_due(), 10.0);

        let report = scheduler.step(&mut host);
        assert_eq!(report.capture_delta, 0.0);
        assert_eq!(report.captured, vec![late]);
        assert_eq!(report.next_capture_delta, Some(2.0));
    }

    #[test]
    fn reenabled_sensor_resumes_from_stale_due_time() {
        let (mut scheduler, sensors) = scheduler_with(&[(1.0, 1.0), (10.0, 10.0)]);
        let (fast, slow) = (sensors[0], sensors[1]);
        let mut host = ManualHost::new(1.0);

        scheduler.step(&mut host);
        assert!(scheduler.should_capture_this_frame(fast));
        scheduler.set_enabled(fast, false).unwrap();

        let report = scheduler.step(&mut host);
        assert_eq!(report.sequence_time, 10.0);
        assert_eq!(report.captured, vec![slow]);

        scheduler.set_enabled(fast, true).unwrap();
        let report = scheduler.step(&mut host);
        // next-due was 2.0, now stale: captures on a zero-delta tick
        assert_eq!(report.capture_delta, 0.0);
        assert_eq!(report.captured, vec![fast]);
        assert_eq!(
            scheduler.registry().sensor(fast).unwrap().next_due(),
            11.0
        );
    }

    #[test]
    fn violation_keeps_baseline_scale() {
        let (mut scheduler, _) = scheduler_with(&[(1.0, 1.0)]);
        let mut host = ManualHost::new(1.0);
        assert!(scheduler.step(&mut host).violation.is_none());

        host.set_time_scale(3.0);
        let report = scheduler.step(&mut host);
        let violation = report.violation.unwrap();
        assert_eq!(violation.baseline, 1.0);
        assert_eq!(violation.observed, 3.0);
        assert_eq!(report.elapsed_delta, 1.0);
    }

    #[test]
    fn new_sequence_rewinds_sensors() {
        let (mut scheduler, sensors) = scheduler_with(&[(2.0, 1.0)]);
        let mut host = ManualHost::new(1.0);
        scheduler.step(&mut host);
        scheduler.step(&mut host);
        let elapsed = scheduler.elapsed_time();

        scheduler.start_new_sequence();
        assert!(!scheduler.should_capture_this_frame(sensors[0]));
        assert_eq!(scheduler.sequence_index(), 1);
        assert_eq!(scheduler.current_virtual_time(), 0.0);
        assert_eq!(scheduler.elapsed_time(), elapsed);

        host.set_time_scale(4.0);
        let report = scheduler.step(&mut host);
        assert!(report.violation.is_none());
        assert_eq!(report.capture_delta, 1.0);
        assert_eq!(report.elapsed_delta, 4.0);
        assert_eq!(report.sequence_frame, 1);
    }

    #[test]
    fn reset_simulation_zeroes_time() {
        let (mut scheduler, sensors) = scheduler_with(&[(4.0, 10.0)]);
        let mut host = ManualHost::new(1.0);
        scheduler.step(&mut host);
        assert_eq!(scheduler.capture_delta_time(), 10.0);

        scheduler.reset_simulation();
        assert_eq!(scheduler.capture_delta_time(), 0.0);
        assert_eq!(scheduler.elapsed_time(), 0.0);
        assert_eq!(scheduler.current_virtual_time(), 0.0);
        assert!(!scheduler.should_capture_this_frame(sensors[0]));
        assert_eq!(scheduler.registry().len(), 1);

        let report = scheduler.step(&mut host);
        assert_eq!(report.capture_delta, 10.0);
        assert_eq!(report.frame_index, 2);
    }

    #[test]
    fn random_rigs_capture_on_their_own_grid() {
        use rand::rngs::StdRng;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..20 {
            let count = rng.random_range(1..=5);
            let timing: Vec<(f64, f64)> = (0..count)
                .map(|_| {
                    let period = rng.random_range(1..=20) as f64 * 0.25;
                    let first = rng.random_range(0..=12) as f64 * 0.5;
                    (period, first)
                })
                .collect();
            let (mut scheduler, sensors) = scheduler_with(&timing);
            let mut host = ManualHost::new(1.0);
            let mut captures = vec![0u32; sensors.len()];

            for _ in 0..200 {
                let report = scheduler.step(&mut host);
                assert!(!report.captured.is_empty());
                for (i, &sensor) in sensors.iter().enumerate() {
                    if !report.captured(sensor) {
                        continue;
                    }
                    let (period, first) = timing[i];
                    let expected = first + period * captures[i] as f64;
                    assert!((report.sequence_time - expected).abs() < TOLERANCE);
                    captures[i] += 1;
                }
            }
        }
    }

    #[test]
    fn registration_errors_surface() {
        let mut scheduler = FrameScheduler::new(SchedulerConfig::default().requiring_ego_description());
        assert!(scheduler.register_ego("").is_err());
        let ego = scheduler.register_ego("rig").unwrap();
        assert!(scheduler.register_sensor(ego, camera(-0.1, 0.0)).is_err());
        assert!(scheduler.register_sensor(EgoHandle(9), camera(1.0, 0.0)).is_err());
        assert!(scheduler.set_enabled(SensorHandle(3), false).is_err());
    }
}
