//! Scenario run statistics.

use std::time::Duration;

use observability::SchedulerMetricsAggregator;

/// Statistics from a scenario run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Sequences completed
    pub iterations: u32,

    /// Registered sensors
    pub sensors: usize,

    /// Delayed results taken by the consumer
    pub results_delivered: u64,

    /// Delayed results dropped by a sequence reset or the end of the run
    pub results_dropped: u64,

    /// Largest number of unresolved correlator entries after any tick
    pub peak_pending: usize,

    /// Sequence time when the last sequence ended
    pub final_sequence_time: f64,

    /// Accumulated scaled virtual time
    pub elapsed_virtual_time: f64,

    /// Wall-clock duration of the run
    pub duration: Duration,

    /// Tick metrics aggregator
    pub metrics: SchedulerMetricsAggregator,
}

impl RunStats {
    /// Ticks per wall-clock second
    pub fn ticks_per_second(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.metrics.total_ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Scenario Statistics ===\n");

        println!("Overview");
        println!("   ├─ Duration: {:.3}s", self.duration.as_secs_f64());
        println!("   ├─ Sequences: {}", self.iterations);
        println!("   ├─ Sensors: {}", self.sensors);
        println!("   ├─ Ticks/s: {:.0}", self.ticks_per_second());
        println!("   ├─ Virtual time (scaled): {:.4}", self.elapsed_virtual_time);
        println!("   └─ Last sequence time: {:.4}", self.final_sequence_time);

        println!("\nDelayed Results");
        println!("   ├─ Delivered: {}", self.results_delivered);
        println!("   ├─ Dropped at reset: {}", self.results_dropped);
        println!("   └─ Peak pending: {}", self.peak_pending);

        println!();
        print!("{}", self.metrics.summary());
        println!();
    }
}
