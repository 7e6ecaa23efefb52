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

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Canonical identifier for one timed metric.
///
/// A metric name is a `group` (fixed per deployment, e.g. `"webservice"`)
/// plus the local operation name. Both parts are `Arc`-backed so cloning a
/// name on the hot path never reallocates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricName {
    group: Arc<str>,
    name: Arc<str>,
}

impl MetricName {
    pub fn new(group: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
        }
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.group, self.name)
    }
}

/// Get-or-create cache from local operation names to canonical
/// [`MetricName`]s.
///
/// The interceptor layer resolves every message's operation name through
/// this cache rather than constructing names ad hoc, so repeated calls for
/// the same operation share one canonical name. Read-mostly: the write lock
/// is only taken the first time an operation is seen.
///
/// # Example
///
/// ```
/// use rpcpulse_metrics::MetricNameCache;
///
/// let cache = MetricNameCache::new("webservice");
/// let a = cache.resolve("GetWidget");
/// let b = cache.resolve("GetWidget");
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "webservice.GetWidget");
/// ```
#[derive(Debug)]
pub struct MetricNameCache {
    group: Arc<str>,
    names: RwLock<HashMap<String, MetricName>>,
}

impl MetricNameCache {
    pub fn new(group: impl Into<Arc<str>>) -> Self {
        Self {
            group: group.into(),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Resolves a local operation name to its canonical metric name.
    ///
    /// Pure lookup/creation with no other visible side effects. Resolving
    /// the same key twice returns equal names backed by the same canonical
    /// storage.
    pub fn resolve(&self, local_name: &str) -> MetricName {
        {
            let names = self.names.read().unwrap();
            if let Some(name) = names.get(local_name) {
                return name.clone();
            }
        }

        let mut names = self.names.write().unwrap();
        names
            .entry(local_name.to_string())
            .or_insert_with(|| MetricName::new(Arc::clone(&self.group), local_name))
            .clone()
    }
}
