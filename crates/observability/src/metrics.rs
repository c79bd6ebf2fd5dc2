//! Scheduler metrics.
//!
//! Exported through the `metrics` facade per tick, and aggregated in memory
//! for the end-of-run summary.

use std::collections::BTreeMap;

use contracts::{RigGraph, TickReport};
use metrics::{counter, gauge, histogram};

/// Record the metrics of one scheduler tick.
///
/// # Example
///
/// ```ignore
/// let report = scheduler.step(&mut host);
/// record_tick_metrics(&report);
/// ```
pub fn record_tick_metrics(report: &TickReport) {
    counter!("capture_scheduler_ticks_total").increment(1);
    gauge!("capture_scheduler_frame_index").set(report.frame_index as f64);
    gauge!("capture_scheduler_sequence_index").set(report.sequence_index as f64);
    gauge!("capture_scheduler_sequence_time_seconds").set(report.sequence_time);

    histogram!("capture_scheduler_capture_delta_seconds").record(report.capture_delta);
    histogram!("capture_scheduler_elapsed_delta_seconds").record(report.elapsed_delta);

    if report.capture_delta == 0.0 {
        counter!("capture_scheduler_zero_delta_ticks_total").increment(1);
    }

    if !report.captured.is_empty() {
        counter!("capture_scheduler_captures_total").increment(report.captured.len() as u64);
    }

    if let Some(next) = report.next_capture_delta {
        gauge!("capture_scheduler_next_capture_delta_seconds").set(next);
    }
}

/// Record one capture of a named sensor
pub fn record_sensor_capture(sensor_id: &str, modality: &str) {
    counter!(
        "capture_scheduler_sensor_captures_total",
        "sensor_id" => sensor_id.to_string(),
        "modality" => modality.to_string()
    )
    .increment(1);
}

/// Record correlator occupancy
pub fn record_correlator_depth(pending: usize, resolved: usize) {
    gauge!("capture_scheduler_correlator_pending").set(pending as f64);
    gauge!("capture_scheduler_correlator_resolved").set(resolved as f64);
}

/// Record a delayed result handed to its consumer, with its latency in frames
pub fn record_result_delivered(sensor_id: &str, latency_frames: u64) {
    counter!(
        "capture_scheduler_results_delivered_total",
        "sensor_id" => sensor_id.to_string()
    )
    .increment(1);
    histogram!("capture_scheduler_result_latency_frames").record(latency_frames as f64);
}

/// In-memory aggregation of tick reports
#[derive(Debug, Clone, Default)]
pub struct SchedulerMetricsAggregator {
    pub total_ticks: u64,
    pub total_captures: u64,
    /// Ticks that traversed no virtual time
    pub zero_delta_ticks: u64,
    pub violations: u64,
    /// Distinct sequences seen
    pub sequences: u64,
    /// Unscaled capture delta per tick
    pub delta_stats: RunningStats,
    pub captures_per_sensor: BTreeMap<String, u64>,
    last_sequence: Option<u64>,
}

impl SchedulerMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &TickReport) {
        self.total_ticks += 1;
        self.total_captures += report.captured.len() as u64;
        if report.capture_delta == 0.0 {
            self.zero_delta_ticks += 1;
        }
        if report.violation.is_some() {
            self.violations += 1;
        }
        if self.last_sequence != Some(report.sequence_index) {
            self.sequences += 1;
            self.last_sequence = Some(report.sequence_index);
        }
        self.delta_stats.push(report.capture_delta);
    }

    /// Update and attribute captures to configured sensor names
    pub fn update_with_rig(&mut self, report: &TickReport, rig: &RigGraph) {
        self.update(report);
        for handle in &report.captured {
            let name = rig
                .sensor_name(*handle)
                .map(|id| id.to_string())
                .unwrap_or_else(|| handle.to_string());
            *self.captures_per_sensor.entry(name).or_insert(0) += 1;
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            total_ticks: self.total_ticks,
            total_captures: self.total_captures,
            zero_delta_ticks: self.zero_delta_ticks,
            violations: self.violations,
            sequences: self.sequences,
            captures_per_tick: if self.total_ticks > 0 {
                self.total_captures as f64 / self.total_ticks as f64
            } else {
                0.0
            },
            capture_delta: StatsSummary::from(&self.delta_stats),
            captures_per_sensor: self.captures_per_sensor.clone(),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Aggregated run metrics
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_ticks: u64,
    pub total_captures: u64,
    pub zero_delta_ticks: u64,
    pub violations: u64,
    pub sequences: u64,
    pub captures_per_tick: f64,
    pub capture_delta: StatsSummary,
    pub captures_per_sensor: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Scheduler Metrics Summary ===")?;
        writeln!(f, "Sequences: {}", self.sequences)?;
        writeln!(f, "Total ticks: {}", self.total_ticks)?;
        writeln!(
            f,
            "Captures: {} ({:.2} per tick)",
            self.total_captures, self.captures_per_tick
        )?;
        writeln!(f, "Zero-delta ticks: {}", self.zero_delta_ticks)?;
        writeln!(f, "Time-scale violations: {}", self.violations)?;
        writeln!(f, "Capture delta (s): {}", self.capture_delta)?;

        if !self.captures_per_sensor.is_empty() {
            writeln!(f, "Captures per sensor:")?;
            for (sensor, count) in &self.captures_per_sensor {
                writeln!(f, "  {}: {}", sensor, count)?;
            }
        }

        Ok(())
    }
}

/// Summary of a [`RunningStats`]
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online mean and variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}
