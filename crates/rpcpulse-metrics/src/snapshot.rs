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

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Point-in-time view of one timed metric.
///
/// Durations are scaled to the metric's rate unit, named in `rate_unit`.
/// `in_flight` counts events started but not yet finalized, including
/// abandoned ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedMetricSnapshot {
    pub success_count: u64,
    pub error_count: u64,
    pub in_flight: u64,
    pub mean_duration: f64,
    pub max_duration: f64,
    pub rate_unit: String,
}

/// Complete snapshot of a metric registry, keyed by metric display name.
///
/// Snapshots are eventually consistent: counters are read without
/// coordination, so a snapshot taken while calls are in progress may see a
/// sample's outcome before its duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    pub metrics: HashMap<String, TimedMetricSnapshot>,
}
