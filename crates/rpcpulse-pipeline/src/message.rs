//! Message and exchange correlation model.
//!
//! A [`Message`] is one directional transmission (request or response); an
//! [`Exchange`] is the shared correlation context for one logical call,
//! spanning its request and response. The exchange is the only channel
//! between the inbound and outbound interceptors: the in-flight timing
//! event is stashed in a typed slot at begin-handling time and taken back
//! out at end-handling time.

use rpcpulse_metrics::TimingEvent;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Classification of how a message concluded.
///
/// "Unset" is represented as the absence of a value. Fault normalization
/// defaults an unset mode to [`FaultMode::RuntimeFault`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// A checked, application-level fault declared by the service contract.
    ApplicationFault,
    /// A runtime or transport fault not declared by the contract.
    RuntimeFault,
}

/// Process-unique message identity.
///
/// Fault detection compares messages by identity, not structure: a message
/// is "the" fault message only if the runtime itself recorded it as such on
/// the exchange.
pub type MessageId = u64;

static MESSAGE_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_message_id() -> MessageId {
    MESSAGE_ID_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// One directional transmission belonging to an exchange.
///
/// Read-only from the instrumentation's perspective; fault normalization
/// writes the defaulted fault mode onto the exchange, never back onto the
/// message.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    operation: Option<String>,
    requestor_role: bool,
    fault_mode: Option<FaultMode>,
    exchange: Option<Arc<Exchange>>,
}

impl Message {
    pub fn new() -> Self {
        Self {
            id: next_message_id(),
            operation: None,
            requestor_role: false,
            fault_mode: None,
            exchange: None,
        }
    }

    /// Sets the qualified operation name this message targets.
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Marks this message as sent in the requestor (client) role.
    pub fn with_requestor_role(mut self, requestor_role: bool) -> Self {
        self.requestor_role = requestor_role;
        self
    }

    pub fn with_fault_mode(mut self, fault_mode: FaultMode) -> Self {
        self.fault_mode = Some(fault_mode);
        self
    }

    /// Attaches this message to its exchange.
    pub fn with_exchange(mut self, exchange: Arc<Exchange>) -> Self {
        self.exchange = Some(exchange);
        self
    }

    pub fn id(&self) -> MessageId {
        self.id
    }

    pub fn operation(&self) -> Option<&str> {
        self.operation.as_deref()
    }

    pub fn requestor_role(&self) -> bool {
        self.requestor_role
    }

    pub fn fault_mode(&self) -> Option<FaultMode> {
        self.fault_mode
    }

    pub fn exchange(&self) -> Option<&Arc<Exchange>> {
        self.exchange.as_ref()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared correlation context for one logical call.
///
/// The runtime owns the exchange for the duration of the call and
/// guarantees that begin- and end-handling for the *same* exchange never
/// run concurrently; different exchanges are fully independent. The slots
/// still sit behind mutexes so the type is `Send + Sync` without any
/// unsafe code.
///
/// Invariant: at most one timing event is active per exchange.
/// [`Exchange::take_timing_event`] clears the slot, which is what makes a
/// second end-handling call a no-op.
#[derive(Debug, Default)]
pub struct Exchange {
    timing_event: Mutex<Option<TimingEvent>>,
    fault_mode: Mutex<Option<FaultMode>>,
    in_fault_message: Mutex<Option<MessageId>>,
    out_fault_message: Mutex<Option<MessageId>>,
}

impl Exchange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the in-flight timing event, returning any event it displaced.
    ///
    /// A displaced event was never finalized; the caller decides whether to
    /// surface that (the timer counts it as a dropped sample).
    pub fn put_timing_event(&self, event: TimingEvent) -> Option<TimingEvent> {
        self.timing_event.lock().unwrap().replace(event)
    }

    /// Removes and returns the in-flight timing event, if any.
    pub fn take_timing_event(&self) -> Option<TimingEvent> {
        self.timing_event.lock().unwrap().take()
    }

    pub fn set_fault_mode(&self, mode: FaultMode) {
        *self.fault_mode.lock().unwrap() = Some(mode);
    }

    pub fn fault_mode(&self) -> Option<FaultMode> {
        *self.fault_mode.lock().unwrap()
    }

    /// Records the message the runtime classified as the inbound fault.
    pub fn set_in_fault_message(&self, message: &Message) {
        *self.in_fault_message.lock().unwrap() = Some(message.id());
    }

    /// Records the message the runtime classified as the outbound fault.
    pub fn set_out_fault_message(&self, message: &Message) {
        *self.out_fault_message.lock().unwrap() = Some(message.id());
    }

    /// True iff `message` is identical to a recorded fault message.
    pub fn is_fault_message(&self, message: &Message) -> bool {
        let id = message.id();
        *self.in_fault_message.lock().unwrap() == Some(id)
            || *self.out_fault_message.lock().unwrap() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids_are_unique() {
        let a = Message::new();
        let b = Message::new();
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_fault_message_identity_not_structure() {
        let exchange = Exchange::new();
        let fault = Message::new().with_operation("GetWidget");
        let lookalike = Message::new().with_operation("GetWidget");

        exchange.set_in_fault_message(&fault);
        assert!(exchange.is_fault_message(&fault));
        assert!(!exchange.is_fault_message(&lookalike));
    }

    #[test]
    fn test_out_fault_message() {
        let exchange = Exchange::new();
        let fault = Message::new();
        exchange.set_out_fault_message(&fault);
        assert!(exchange.is_fault_message(&fault));
    }

    #[test]
    fn test_fault_mode_slot() {
        let exchange = Exchange::new();
        assert_eq!(exchange.fault_mode(), None);
        exchange.set_fault_mode(FaultMode::ApplicationFault);
        assert_eq!(exchange.fault_mode(), Some(FaultMode::ApplicationFault));
    }

    #[test]
    fn test_take_clears_timing_slot() {
        use rpcpulse_metrics::{
            Clock, ManualClock, MetricName, MetricRegistry, RateUnit,
        };
        use std::sync::Arc;

        let registry = MetricRegistry::new();
        let clock = Arc::new(ManualClock::new());
        let metric = registry.get_or_create_timed(
            MetricName::new("ws", "Ping"),
            RateUnit::Millis,
            clock as Arc<dyn Clock>,
        );

        let exchange = Exchange::new();
        assert!(exchange.put_timing_event(metric.start_event()).is_none());
        assert!(exchange.take_timing_event().is_some());
        assert!(exchange.take_timing_event().is_none());
    }
}
