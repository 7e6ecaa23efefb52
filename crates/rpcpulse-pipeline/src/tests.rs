//! Behavior tests for the shared response-timing operations.
//!
//! These cover the begin/end pairing guarantees: exactly-once finalization,
//! idempotent end-handling, fault classification, and the defensive no-op
//! paths for malformed pipeline states.

use crate::message::{Exchange, FaultMode, Message};
use crate::timing::ResponseTimer;
use rpcpulse_metrics::{Clock, ManualClock, MetricNameCache, MetricRegistry, RateUnit};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    timer: ResponseTimer,
    registry: Arc<MetricRegistry>,
    clock: Arc<ManualClock>,
}

fn fixture() -> Fixture {
    let registry = Arc::new(MetricRegistry::new());
    let clock = Arc::new(ManualClock::new());
    let timer = ResponseTimer::new(
        Arc::new(MetricNameCache::new("ws")),
        Arc::clone(&registry),
        RateUnit::Millis,
        clock.clone() as Arc<dyn Clock>,
    );
    Fixture {
        timer,
        registry,
        clock,
    }
}

#[test]
fn test_begin_then_end_records_one_success() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.clock.advance(Duration::from_millis(7));
    let response = Message::new();
    f.timer.end_handling(Some(&exchange), Some(&response));

    let snap = f.registry.snapshot();
    let widget = &snap.metrics["ws.GetWidget"];
    assert_eq!(widget.success_count, 1);
    assert_eq!(widget.error_count, 0);
    assert_eq!(widget.in_flight, 0);
    assert_eq!(widget.mean_duration, 7.0);
}

#[test]
fn test_begin_then_end_with_fault_records_one_error() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.timer
        .end_handling_with_fault(Some(&exchange), Some(&request));

    let snap = f.registry.snapshot();
    assert_eq!(snap.metrics["ws.GetWidget"].success_count, 0);
    assert_eq!(snap.metrics["ws.GetWidget"].error_count, 1);
}

#[test]
fn test_begin_with_absent_exchange_is_a_noop() {
    let f = fixture();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(None, Some(&request));

    assert!(f.registry.snapshot().metrics.is_empty());
}

#[test]
fn test_begin_with_absent_message_is_a_noop() {
    let f = fixture();
    let exchange = Exchange::new();

    f.timer.begin_handling(Some(&exchange), None);

    assert!(f.registry.snapshot().metrics.is_empty());
    assert!(exchange.take_timing_event().is_none());
}

#[test]
fn test_begin_without_operation_name_is_a_noop() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new();

    f.timer.begin_handling(Some(&exchange), Some(&request));

    assert!(f.registry.snapshot().metrics.is_empty());
    assert!(exchange.take_timing_event().is_none());
}

#[test]
fn test_end_without_begin_is_a_noop() {
    let f = fixture();
    let exchange = Exchange::new();
    let response = Message::new();

    f.timer.end_handling(Some(&exchange), Some(&response));
    f.timer
        .end_handling_with_fault(Some(&exchange), Some(&response));
    f.timer.end_handling(None, None);

    assert!(f.registry.snapshot().metrics.is_empty());
}

#[test]
fn test_second_end_is_a_noop() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.timer.end_handling(Some(&exchange), Some(&request));
    // The first end cleared the slot; neither variant finds an event now.
    f.timer.end_handling(Some(&exchange), Some(&request));
    f.timer
        .end_handling_with_fault(Some(&exchange), Some(&request));

    let snap = f.registry.snapshot();
    assert_eq!(snap.metrics["ws.GetWidget"].success_count, 1);
    assert_eq!(snap.metrics["ws.GetWidget"].error_count, 0);
}

#[test]
fn test_is_client_truth_table() {
    let f = fixture();
    assert!(!f.timer.is_client(None));
    assert!(!f.timer.is_client(Some(&Message::new())));
    assert!(!f
        .timer
        .is_client(Some(&Message::new().with_requestor_role(false))));
    assert!(f
        .timer
        .is_client(Some(&Message::new().with_requestor_role(true))));
}

#[test]
fn test_set_fault_defaults_to_runtime_fault() {
    let f = fixture();
    let exchange = Exchange::new();
    let message = Message::new();

    f.timer.set_fault(&message, &exchange);

    assert_eq!(exchange.fault_mode(), Some(FaultMode::RuntimeFault));
}

#[test]
fn test_set_fault_keeps_existing_mode() {
    let f = fixture();
    let exchange = Exchange::new();
    let message = Message::new().with_fault_mode(FaultMode::ApplicationFault);

    f.timer.set_fault(&message, &exchange);

    assert_eq!(exchange.fault_mode(), Some(FaultMode::ApplicationFault));
}

#[test]
fn test_end_detects_recorded_fault_message() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");
    let fault = Message::new();
    exchange.set_in_fault_message(&fault);

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.timer.end_handling(Some(&exchange), Some(&fault));

    let snap = f.registry.snapshot();
    assert_eq!(snap.metrics["ws.GetWidget"].error_count, 1);
    assert_eq!(snap.metrics["ws.GetWidget"].success_count, 0);
}

#[test]
fn test_end_with_non_fault_message_records_success() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");
    let fault = Message::new();
    exchange.set_out_fault_message(&fault);

    f.timer.begin_handling(Some(&exchange), Some(&request));
    let ordinary = Message::new();
    f.timer.end_handling(Some(&exchange), Some(&ordinary));

    let snap = f.registry.snapshot();
    assert_eq!(snap.metrics["ws.GetWidget"].success_count, 1);
    assert_eq!(snap.metrics["ws.GetWidget"].error_count, 0);
}

#[test]
fn test_double_begin_drops_the_first_sample() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.timer.begin_handling(Some(&exchange), Some(&request));
    assert_eq!(f.timer.dropped_events(), 1);

    f.timer.end_handling(Some(&exchange), Some(&request));

    let snap = f.registry.snapshot();
    let widget = &snap.metrics["ws.GetWidget"];
    // Only the second event landed; the displaced one stays in flight
    // forever.
    assert_eq!(widget.success_count, 1);
    assert_eq!(widget.in_flight, 1);
}

#[test]
fn test_abandoned_exchange_leaves_event_in_flight() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    drop(exchange);

    let snap = f.registry.snapshot();
    let widget = &snap.metrics["ws.GetWidget"];
    assert_eq!(widget.success_count, 0);
    assert_eq!(widget.error_count, 0);
    assert_eq!(widget.in_flight, 1);
}

#[test]
fn test_end_with_absent_message_records_success() {
    let f = fixture();
    let exchange = Exchange::new();
    let request = Message::new().with_operation("GetWidget");

    f.timer.begin_handling(Some(&exchange), Some(&request));
    f.timer.end_handling(Some(&exchange), None);

    let snap = f.registry.snapshot();
    assert_eq!(snap.metrics["ws.GetWidget"].success_count, 1);
}
