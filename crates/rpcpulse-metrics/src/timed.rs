// Copyright 2025 RpcPulse Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::clock::Clock;
use crate::name::MetricName;
use crate::snapshot::TimedMetricSnapshot;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Unit durations are reported in when a metric is snapshotted.
///
/// Samples are always accumulated in nanoseconds; the rate unit only affects
/// how snapshots scale them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Micros,
    Millis,
    Seconds,
}

impl RateUnit {
    /// Scales a nanosecond duration into this unit.
    pub fn scale(&self, nanos: u64) -> f64 {
        match self {
            RateUnit::Micros => nanos as f64 / 1_000.0,
            RateUnit::Millis => nanos as f64 / 1_000_000.0,
            RateUnit::Seconds => nanos as f64 / 1_000_000_000.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RateUnit::Micros => "micros",
            RateUnit::Millis => "millis",
            RateUnit::Seconds => "seconds",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unrecognized rate unit: {0}")]
pub struct ParseRateUnitError(String);

impl FromStr for RateUnit {
    type Err = ParseRateUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "micros" => Ok(RateUnit::Micros),
            "millis" => Ok(RateUnit::Millis),
            "seconds" => Ok(RateUnit::Seconds),
            other => Err(ParseRateUnitError(other.to_string())),
        }
    }
}

/// Internal counters for one timed metric.
///
/// All fields are atomics with relaxed ordering: counters are independent
/// and snapshots are eventually consistent by design.
#[derive(Debug, Default)]
struct TimedStats {
    success_count: AtomicU64,
    error_count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
    in_flight: AtomicU64,
}

/// Aggregation object for one operation name.
///
/// A timed metric accumulates duration+outcome samples. Measurements are
/// taken by starting a [`TimingEvent`] and finalizing it exactly once; the
/// event's duration then lands in these counters.
///
/// # Thread Safety
///
/// Recording is lock-free. A metric is shared as `Arc<TimedMetric>` and may
/// have any number of events in flight concurrently.
#[derive(Debug)]
pub struct TimedMetric {
    name: MetricName,
    rate_unit: RateUnit,
    clock: Arc<dyn Clock>,
    stats: TimedStats,
}

impl TimedMetric {
    pub(crate) fn new(name: MetricName, rate_unit: RateUnit, clock: Arc<dyn Clock>) -> Self {
        Self {
            name,
            rate_unit,
            clock,
            stats: TimedStats::default(),
        }
    }

    pub fn name(&self) -> &MetricName {
        &self.name
    }

    pub fn rate_unit(&self) -> RateUnit {
        self.rate_unit
    }

    /// Opens one in-flight measurement stamped with the current clock
    /// reading.
    ///
    /// The returned event must be finalized with
    /// [`TimingEvent::end_with_success`] or [`TimingEvent::end_with_error`].
    /// An event that is dropped instead stays counted as in flight
    /// permanently; abandonment is observed, never salvaged.
    pub fn start_event(self: &Arc<Self>) -> TimingEvent {
        self.stats.in_flight.fetch_add(1, Ordering::Relaxed);
        TimingEvent {
            metric: Arc::clone(self),
            start_nanos: self.clock.now_nanos(),
        }
    }

    fn record(&self, start_nanos: u64, success: bool) {
        let elapsed = self.clock.now_nanos().saturating_sub(start_nanos);

        if success {
            self.stats.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.stats.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.stats.total_nanos.fetch_add(elapsed, Ordering::Relaxed);
        self.stats.max_nanos.fetch_max(elapsed, Ordering::Relaxed);
        self.stats.in_flight.fetch_sub(1, Ordering::Relaxed);
    }

    /// Takes a best-effort point-in-time snapshot of this metric.
    pub fn snapshot(&self) -> TimedMetricSnapshot {
        let success_count = self.stats.success_count.load(Ordering::Relaxed);
        let error_count = self.stats.error_count.load(Ordering::Relaxed);
        let total_nanos = self.stats.total_nanos.load(Ordering::Relaxed);
        let max_nanos = self.stats.max_nanos.load(Ordering::Relaxed);
        let in_flight = self.stats.in_flight.load(Ordering::Relaxed);

        let completed = success_count + error_count;
        let mean_nanos = if completed == 0 {
            0
        } else {
            total_nanos / completed
        };

        TimedMetricSnapshot {
            success_count,
            error_count,
            in_flight,
            mean_duration: self.rate_unit.scale(mean_nanos),
            max_duration: self.rate_unit.scale(max_nanos),
            rate_unit: self.rate_unit.label().to_string(),
        }
    }
}

/// One in-flight, single-use measurement.
///
/// Finalizing consumes the event, so a second terminal transition is
/// unrepresentable. Ownership moves back to the metric's counters on end.
#[derive(Debug)]
pub struct TimingEvent {
    metric: Arc<TimedMetric>,
    start_nanos: u64,
}

impl TimingEvent {
    /// Finalizes this measurement as a success sample.
    pub fn end_with_success(self) {
        self.metric.record(self.start_nanos, true);
    }

    /// Finalizes this measurement as an error sample.
    pub fn end_with_error(self) {
        self.metric.record(self.start_nanos, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn metric_with_clock(rate_unit: RateUnit) -> (Arc<TimedMetric>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let metric = Arc::new(TimedMetric::new(
            MetricName::new("ws", "GetWidget"),
            rate_unit,
            clock.clone() as Arc<dyn Clock>,
        ));
        (metric, clock)
    }

    #[test]
    fn test_success_sample() {
        let (metric, clock) = metric_with_clock(RateUnit::Millis);

        let event = metric.start_event();
        clock.advance(Duration::from_millis(5));
        event.end_with_success();

        let snap = metric.snapshot();
        assert_eq!(snap.success_count, 1);
        assert_eq!(snap.error_count, 0);
        assert_eq!(snap.in_flight, 0);
        assert_eq!(snap.mean_duration, 5.0);
        assert_eq!(snap.max_duration, 5.0);
    }

    #[test]
    fn test_error_sample() {
        let (metric, clock) = metric_with_clock(RateUnit::Millis);

        let event = metric.start_event();
        clock.advance(Duration::from_millis(2));
        event.end_with_error();

        let snap = metric.snapshot();
        assert_eq!(snap.success_count, 0);
        assert_eq!(snap.error_count, 1);
        assert_eq!(snap.mean_duration, 2.0);
    }

    #[test]
    fn test_in_flight_gauge() {
        let (metric, _clock) = metric_with_clock(RateUnit::Millis);

        let a = metric.start_event();
        let b = metric.start_event();
        assert_eq!(metric.snapshot().in_flight, 2);

        a.end_with_success();
        assert_eq!(metric.snapshot().in_flight, 1);

        // An abandoned event never comes off the gauge.
        drop(b);
        assert_eq!(metric.snapshot().in_flight, 1);
        assert_eq!(metric.snapshot().success_count, 1);
    }

    #[test]
    fn test_mean_over_all_completed_samples() {
        let (metric, clock) = metric_with_clock(RateUnit::Micros);

        let event = metric.start_event();
        clock.advance(Duration::from_micros(100));
        event.end_with_success();

        let event = metric.start_event();
        clock.advance(Duration::from_micros(300));
        event.end_with_error();

        let snap = metric.snapshot();
        assert_eq!(snap.mean_duration, 200.0);
        assert_eq!(snap.max_duration, 300.0);
    }

    #[test]
    fn test_rate_unit_scaling() {
        assert_eq!(RateUnit::Micros.scale(1_500), 1.5);
        assert_eq!(RateUnit::Millis.scale(5_000_000), 5.0);
        assert_eq!(RateUnit::Seconds.scale(2_000_000_000), 2.0);
    }

    #[test]
    fn test_rate_unit_parse() {
        assert_eq!("millis".parse::<RateUnit>().unwrap(), RateUnit::Millis);
        assert_eq!("seconds".parse::<RateUnit>().unwrap(), RateUnit::Seconds);
        assert!("fortnights".parse::<RateUnit>().is_err());
    }

    #[test]
    fn test_empty_metric_snapshot() {
        let (metric, _clock) = metric_with_clock(RateUnit::Millis);
        let snap = metric.snapshot();
        assert_eq!(snap.success_count, 0);
        assert_eq!(snap.error_count, 0);
        assert_eq!(snap.mean_duration, 0.0);
    }
}
