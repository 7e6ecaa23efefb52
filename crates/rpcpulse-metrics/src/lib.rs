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

//! RpcPulse Metric Aggregation
//!
//! This crate provides the metric aggregation side of RpcPulse: canonical
//! metric names, a thread-safe registry of timed metrics, single-use timing
//! events, and serializable snapshots. It is consumed by the interceptor
//! layer in `rpcpulse-pipeline`, which starts a [`TimingEvent`] when a
//! message enters the pipeline and finalizes it when the exchange concludes.
//!
//! # Architecture
//!
//! - [`MetricNameCache`]: resolves local operation names to canonical
//!   [`MetricName`]s without per-call string churn
//! - [`MetricRegistry`]: thread-safe get-or-create storage for
//!   [`TimedMetric`]s
//! - [`TimedMetric`] / [`TimingEvent`]: one aggregation object per operation
//!   name, and the move-only handle for one in-flight measurement
//! - [`RegistrySnapshot`]: serializable point-in-time view of all metrics
//!
//! # Usage Example
//!
//! ```rust
//! use rpcpulse_metrics::{MetricNameCache, MetricRegistry, RateUnit, SystemClock};
//! use std::sync::Arc;
//!
//! let cache = MetricNameCache::new("webservice");
//! let registry = MetricRegistry::new();
//! let clock = Arc::new(SystemClock::new());
//!
//! let name = cache.resolve("GetWidget");
//! let metric = registry.get_or_create_timed(name, RateUnit::Millis, clock);
//!
//! let event = metric.start_event();
//! // ... handle the call ...
//! event.end_with_success();
//!
//! let snapshot = registry.snapshot();
//! assert_eq!(snapshot.metrics["webservice.GetWidget"].success_count, 1);
//! ```
//!
//! # Thread Safety
//!
//! The registry and name cache are safe to share across threads behind
//! `Arc`. Counter updates on the hot path are lock-free atomics with relaxed
//! ordering; locks are only taken to create new entries.

mod clock;
mod name;
mod registry;
mod snapshot;
mod timed;

pub use clock::{Clock, ManualClock, SystemClock};
pub use name::{MetricName, MetricNameCache};
pub use registry::MetricRegistry;
pub use snapshot::{RegistrySnapshot, TimedMetricSnapshot};
pub use timed::{ParseRateUnitError, RateUnit, TimedMetric, TimingEvent};
