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
use crate::snapshot::RegistrySnapshot;
use crate::timed::{RateUnit, TimedMetric};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe registry of timed metrics, keyed by canonical name.
///
/// The registry is the process-wide home of all [`TimedMetric`]s. Looking a
/// metric up is a brief read lock; the write lock is only taken the first
/// time a name is registered. Recording samples on the returned metric is
/// lock-free.
///
/// The first registration of a name fixes that metric's rate unit and
/// clock; later calls with the same name return the existing metric
/// unchanged.
///
/// # Example
///
/// ```rust
/// use rpcpulse_metrics::{MetricName, MetricRegistry, RateUnit, SystemClock};
/// use std::sync::Arc;
///
/// let registry = MetricRegistry::new();
/// let clock = Arc::new(SystemClock::new());
///
/// let name = MetricName::new("ws", "GetWidget");
/// let metric = registry.get_or_create_timed(name, RateUnit::Millis, clock);
/// metric.start_event().end_with_success();
///
/// assert_eq!(registry.snapshot().metrics["ws.GetWidget"].success_count, 1);
/// ```
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: RwLock<HashMap<MetricName, Arc<TimedMetric>>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self {
            metrics: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the timed metric registered under `name`, creating it with
    /// the given rate unit and clock if this is the first registration.
    pub fn get_or_create_timed(
        &self,
        name: MetricName,
        rate_unit: RateUnit,
        clock: Arc<dyn Clock>,
    ) -> Arc<TimedMetric> {
        {
            let metrics = self.metrics.read().unwrap();
            if let Some(metric) = metrics.get(&name) {
                return Arc::clone(metric);
            }
        }

        let mut metrics = self.metrics.write().unwrap();
        let metric = metrics
            .entry(name.clone())
            .or_insert_with(|| Arc::new(TimedMetric::new(name, rate_unit, clock)));
        Arc::clone(metric)
    }

    /// Takes a best-effort point-in-time snapshot of every registered
    /// metric, keyed by display name.
    pub fn snapshot(&self) -> RegistrySnapshot {
        let metrics = self.metrics.read().unwrap();
        RegistrySnapshot {
            metrics: metrics
                .iter()
                .map(|(name, metric)| (name.to_string(), metric.snapshot()))
                .collect(),
        }
    }
}
