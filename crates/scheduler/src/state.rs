//! Scheduler state: the frame scheduler and its result correlator as one
//! owned value, passed by reference to whatever needs it.

use contracts::{
    EgoHandle, Ident, SchedulerConfig, SensorDefinition, SensorHandle, SimulationHost, TickReport,
};
use tracing::debug;

use crate::correlator::{AsyncCorrelator, FrameKey, ReservationToken};
use crate::error::Result;
use crate::scheduler::FrameScheduler;

/// Owned scheduling state with payloads of type `V`
#[derive(Debug)]
pub struct SchedulerState<V> {
    scheduler: FrameScheduler,
    correlator: AsyncCorrelator<FrameKey, V>,
}

impl<V> Default for SchedulerState<V> {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl<V> SchedulerState<V> {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            scheduler: FrameScheduler::new(config),
            correlator: AsyncCorrelator::new(),
        }
    }

    pub fn scheduler(&self) -> &FrameScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut FrameScheduler {
        &mut self.scheduler
    }

    pub fn correlator(&self) -> &AsyncCorrelator<FrameKey, V> {
        &self.correlator
    }

    pub fn correlator_mut(&mut self) -> &mut AsyncCorrelator<FrameKey, V> {
        &mut self.correlator
    }

    pub fn register_ego(&mut self, description: impl Into<String>) -> Result<EgoHandle> {
        self.scheduler.register_ego(description)
    }

    pub fn register_sensor(
        &mut self,
        ego: EgoHandle,
        definition: SensorDefinition,
    ) -> Result<SensorHandle> {
        self.scheduler.register_sensor(ego, definition)
    }

    pub fn set_enabled(&mut self, sensor: SensorHandle, enabled: bool) -> Result<()> {
        self.scheduler.set_enabled(sensor, enabled)
    }

    /// Run one engine tick
    pub fn advance<H>(&mut self, host: &mut H) -> TickReport
    where
        H: SimulationHost + ?Sized,
    {
        self.scheduler.step(host)
    }

    pub fn should_capture_this_frame(&self, sensor: SensorHandle) -> bool {
        self.scheduler.should_capture_this_frame(sensor)
    }

    pub fn current_virtual_time(&self) -> f64 {
        self.scheduler.current_virtual_time()
    }

    pub fn current_frame_elapsed_delta(&self) -> f64 {
        self.scheduler.current_frame_elapsed_delta()
    }

    pub fn frame_index(&self) -> u64 {
        self.scheduler.frame_index()
    }

    /// Reserve a result slot keyed by the current frame.
    pub fn reserve_for_frame(&mut self, sub_key: Option<Ident>) -> Result<ReservationToken> {
        let key = FrameKey {
            frame_index: self.scheduler.frame_index(),
            sub_key,
        };
        self.correlator.reserve(key)
    }

    pub fn resolve(&mut self, token: ReservationToken, payload: V) -> Result<()> {
        self.correlator.resolve(token, payload)
    }

    pub fn take_resolved(&mut self, key: &FrameKey) -> Option<V> {
        self.correlator.take_resolved(key)
    }

    /// New sequence; every pending result belongs to the retired timeline.
    pub fn start_new_sequence(&mut self) {
        self.scheduler.start_new_sequence();
        let dropped = self.correlator.invalidate_all();
        debug!(dropped, "pending results dropped for new sequence");
    }

    pub fn reset_simulation(&mut self) {
        self.scheduler.reset_simulation();
        let dropped = self.correlator.invalidate_all();
        debug!(dropped, "pending results dropped for simulation reset");
    }
}
