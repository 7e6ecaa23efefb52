//! RpcPulse Pipeline Instrumentation
//!
//! This crate measures the elapsed time and outcome of RPC message
//! exchanges flowing through a phased interceptor pipeline. An inbound
//! interceptor starts a timing event when a message enters the pipeline;
//! an outbound (or fault) interceptor finalizes it exactly once when the
//! exchange concludes, classifying the outcome as success or error.
//!
//! # Architecture
//!
//! The two interceptor directions never hold references to each other. They
//! communicate solely through the [`Exchange`], the shared correlation
//! context for one logical call, which carries the in-flight
//! `TimingEvent` in a typed slot:
//!
//! - [`InboundTimingInterceptor`]: runs before dispatch, resolves the
//!   message's operation name through the [`MetricNameCache`], starts an
//!   event and stores it on the exchange
//! - [`OutboundTimingInterceptor`]: runs after normal completion, finalizes
//!   the event (error iff the message is the exchange's recorded fault
//!   message)
//! - [`FaultTimingInterceptor`]: runs on the dedicated fault phase,
//!   normalizes the fault classification onto the exchange and finalizes
//!   the event as an error
//!
//! Both directions are thin wrappers over one shared [`ResponseTimer`],
//! composed rather than inherited.
//!
//! # Error Model
//!
//! Message handling never returns an error and never panics: an absent
//! exchange or message, a message without an operation name, and an
//! end-handling call with no matching begin are all silent no-ops. The
//! instrumentation is purely an observer and must not alter the outcome of
//! the underlying call.
//!
//! # Example
//!
//! ```rust
//! use rpcpulse_metrics::{MetricNameCache, MetricRegistry};
//! use rpcpulse_pipeline::{Exchange, Interceptor, InterceptorConfig, Message};
//! use std::sync::Arc;
//!
//! let config = InterceptorConfig::new(
//!     "receive",
//!     "send",
//!     "fault",
//!     Arc::new(MetricNameCache::new("webservice")),
//!     Arc::new(MetricRegistry::new()),
//! ).unwrap();
//! let registry = Arc::clone(&config.registry);
//! let interceptors = config.build();
//!
//! let exchange = Arc::new(Exchange::new());
//! let request = Message::new()
//!     .with_operation("GetWidget")
//!     .with_exchange(Arc::clone(&exchange));
//!
//! interceptors.inbound.handle_message(&request);
//! // ... dispatch ...
//! let response = Message::new().with_exchange(exchange);
//! interceptors.outbound.handle_message(&response);
//!
//! let snap = registry.snapshot();
//! assert_eq!(snap.metrics["webservice.GetWidget"].success_count, 1);
//! ```

pub mod error;
pub mod interceptor;
pub mod message;
pub mod timing;

#[cfg(test)]
mod tests;

pub use error::{ConfigError, Result};
pub use interceptor::{
    FaultTimingInterceptor, InboundTimingInterceptor, Interceptor, InterceptorConfig,
    OutboundTimingInterceptor, Phase, TimingInterceptors,
};
pub use message::{Exchange, FaultMode, Message, MessageId};
pub use timing::ResponseTimer;
