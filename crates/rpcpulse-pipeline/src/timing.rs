//! Shared response-timing behavior.
//!
//! [`ResponseTimer`] provides the begin/end/fault operations both
//! interceptor directions need, decoupled from which pipeline phase invokes
//! them. The inbound and outbound interceptors each hold an `Arc` to one
//! shared timer; they never reference each other.

use crate::message::{Exchange, FaultMode, Message};
use rpcpulse_metrics::{Clock, MetricNameCache, MetricRegistry, RateUnit};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Begin/end timing operations shared by the interceptor directions.
///
/// All operations are infallible observers: malformed pipeline states
/// (absent exchange or message, missing operation name, end without begin)
/// are silent no-ops, never errors. See the crate docs for the full error
/// model.
#[derive(Debug)]
pub struct ResponseTimer {
    name_cache: Arc<MetricNameCache>,
    registry: Arc<MetricRegistry>,
    rate_unit: RateUnit,
    clock: Arc<dyn Clock>,
    dropped_events: AtomicU64,
}

impl ResponseTimer {
    pub fn new(
        name_cache: Arc<MetricNameCache>,
        registry: Arc<MetricRegistry>,
        rate_unit: RateUnit,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            name_cache,
            registry,
            rate_unit,
            clock,
            dropped_events: AtomicU64::new(0),
        }
    }

    /// True only if the message explicitly carries the requestor role.
    ///
    /// A missing message or absent role yields `false`.
    pub fn is_client(&self, message: Option<&Message>) -> bool {
        message.map_or(false, Message::requestor_role)
    }

    /// Normalizes the message's fault classification onto the exchange.
    ///
    /// An unset fault mode defaults to [`FaultMode::RuntimeFault`]. Writing
    /// to the exchange rather than the message gives later stages a stable
    /// classification independent of the message's lifetime.
    pub fn set_fault(&self, message: &Message, exchange: &Exchange) {
        let mode = message.fault_mode().unwrap_or(FaultMode::RuntimeFault);
        exchange.set_fault_mode(mode);
    }

    /// Starts timing the exchange for the message's operation.
    ///
    /// No-op if the exchange or message is absent, or the message carries
    /// no operation name. Otherwise resolves the operation through the name
    /// cache, starts an event on the corresponding timed metric and stores
    /// it on the exchange. If an event was already in flight it is
    /// displaced without being finalized; the dropped sample is counted and
    /// logged rather than silently lost.
    pub fn begin_handling(&self, exchange: Option<&Exchange>, message: Option<&Message>) {
        let (Some(exchange), Some(message)) = (exchange, message) else {
            return;
        };
        let Some(operation) = message.operation() else {
            return;
        };

        let name = self.name_cache.resolve(operation);
        let metric =
            self.registry
                .get_or_create_timed(name, self.rate_unit, Arc::clone(&self.clock));

        debug!(operation, "begin handling message");
        if exchange.put_timing_event(metric.start_event()).is_some() {
            self.dropped_events.fetch_add(1, Ordering::Relaxed);
            warn!(
                operation,
                "begin handling replaced an in-flight timing event; prior sample dropped"
            );
        }
    }

    /// Finalizes the exchange's timing event, auto-detecting faults.
    ///
    /// Records an error sample iff the given message is identical to the
    /// exchange's recorded in- or out-fault message, a success sample
    /// otherwise.
    pub fn end_handling(&self, exchange: Option<&Exchange>, message: Option<&Message>) {
        self.finish(false, exchange, message);
    }

    /// Finalizes the exchange's timing event as an error unconditionally.
    pub fn end_handling_with_fault(&self, exchange: Option<&Exchange>, message: Option<&Message>) {
        self.finish(true, exchange, message);
    }

    fn finish(&self, is_fault: bool, exchange: Option<&Exchange>, message: Option<&Message>) {
        let Some(exchange) = exchange else {
            return;
        };
        // The take clears the slot: a second end call finds nothing and
        // no-ops, as does an end with no matching begin.
        let Some(event) = exchange.take_timing_event() else {
            return;
        };

        let fault = is_fault || message.is_some_and(|m| exchange.is_fault_message(m));
        debug!(fault, "end handling message");
        if fault {
            event.end_with_error();
        } else {
            event.end_with_success();
        }
    }

    /// Number of in-flight events displaced by a repeated begin-handling
    /// call on the same exchange. Non-zero values indicate pipeline
    /// mis-wiring.
    pub fn dropped_events(&self) -> u64 {
        self.dropped_events.load(Ordering::Relaxed)
    }
}
