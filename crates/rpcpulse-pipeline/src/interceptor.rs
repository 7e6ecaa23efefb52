//! Pipeline interceptors and their attachment configuration.
//!
//! The host pipeline invokes interceptors at named phases; which phases,
//! and in what order, is the host's concern and supplied here only as
//! configuration. Each interceptor is a thin directional wrapper over the
//! shared [`ResponseTimer`].

use crate::error::{ConfigError, Result};
use crate::message::Message;
use crate::timing::ResponseTimer;
use rpcpulse_metrics::{Clock, MetricNameCache, MetricRegistry, RateUnit, SystemClock};
use std::sync::Arc;
use tracing::debug;

/// Named pipeline phase an interceptor attaches to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase(String);

impl Phase {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConfigError::EmptyPhase);
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Constructor-time configuration for the timing interceptors.
///
/// Recognized options: the phases each instance attaches to, the
/// operation-name resolver, the metric registry, the rate unit used when
/// reporting durations, and the clock. Rate unit defaults to milliseconds
/// and the clock to [`SystemClock`].
///
/// # Example
///
/// ```rust
/// use rpcpulse_metrics::{MetricNameCache, MetricRegistry, RateUnit};
/// use rpcpulse_pipeline::InterceptorConfig;
/// use std::sync::Arc;
///
/// let config = InterceptorConfig::new(
///     "receive",
///     "send",
///     "fault",
///     Arc::new(MetricNameCache::new("webservice")),
///     Arc::new(MetricRegistry::new()),
/// )
/// .unwrap()
/// .with_rate_unit(RateUnit::Micros);
/// let interceptors = config.build();
/// ```
#[derive(Debug)]
pub struct InterceptorConfig {
    pub inbound_phase: Phase,
    pub outbound_phase: Phase,
    pub fault_phase: Phase,
    pub name_cache: Arc<MetricNameCache>,
    pub registry: Arc<MetricRegistry>,
    pub rate_unit: RateUnit,
    pub clock: Arc<dyn Clock>,
}

impl InterceptorConfig {
    pub fn new(
        inbound_phase: impl Into<String>,
        outbound_phase: impl Into<String>,
        fault_phase: impl Into<String>,
        name_cache: Arc<MetricNameCache>,
        registry: Arc<MetricRegistry>,
    ) -> Result<Self> {
        Ok(Self {
            inbound_phase: Phase::new(inbound_phase)?,
            outbound_phase: Phase::new(outbound_phase)?,
            fault_phase: Phase::new(fault_phase)?,
            name_cache,
            registry,
            rate_unit: RateUnit::Millis,
            clock: Arc::new(SystemClock::new()),
        })
    }

    pub fn with_rate_unit(mut self, rate_unit: RateUnit) -> Self {
        self.rate_unit = rate_unit;
        self
    }

    /// Sets the rate unit from its configuration-string form
    /// (`"micros"`, `"millis"`, `"seconds"`).
    pub fn with_rate_unit_name(mut self, rate_unit: &str) -> Result<Self> {
        self.rate_unit = rate_unit.parse()?;
        Ok(self)
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Builds the three interceptors around one shared timer.
    pub fn build(self) -> TimingInterceptors {
        let timer = Arc::new(ResponseTimer::new(
            self.name_cache,
            self.registry,
            self.rate_unit,
            self.clock,
        ));
        TimingInterceptors {
            inbound: InboundTimingInterceptor::new(self.inbound_phase, Arc::clone(&timer)),
            outbound: OutboundTimingInterceptor::new(self.outbound_phase, Arc::clone(&timer)),
            fault: FaultTimingInterceptor::new(self.fault_phase, Arc::clone(&timer)),
            timer,
        }
    }
}

/// The interceptor set built from one [`InterceptorConfig`].
///
/// `timer` is the shared timing behavior, exposed for its diagnostic
/// counter.
#[derive(Debug)]
pub struct TimingInterceptors {
    pub inbound: InboundTimingInterceptor,
    pub outbound: OutboundTimingInterceptor,
    pub fault: FaultTimingInterceptor,
    pub timer: Arc<ResponseTimer>,
}

/// Cross-cutting handler the host pipeline invokes at its phase.
///
/// Handlers never fail: instrumentation must not alter the outcome of the
/// underlying call or interrupt the pipeline.
pub trait Interceptor: Send + Sync {
    fn phase(&self) -> &Phase;
    fn handle_message(&self, message: &Message);
}

/// Starts timing when a message enters the pipeline, before dispatch.
///
/// Tolerates a message whose exchange is not yet attached; nothing is
/// recorded in that case.
#[derive(Debug)]
pub struct InboundTimingInterceptor {
    phase: Phase,
    timer: Arc<ResponseTimer>,
}

impl InboundTimingInterceptor {
    pub fn new(phase: Phase, timer: Arc<ResponseTimer>) -> Self {
        Self { phase, timer }
    }
}

impl Interceptor for InboundTimingInterceptor {
    fn phase(&self) -> &Phase {
        &self.phase
    }

    fn handle_message(&self, message: &Message) {
        debug!(
            phase = self.phase.name(),
            client = self.timer.is_client(Some(message)),
            "inbound timing interceptor"
        );
        let exchange = message.exchange().map(Arc::as_ref);
        self.timer.begin_handling(exchange, Some(message));
    }
}

/// Finalizes timing on the normal post-dispatch phase.
#[derive(Debug)]
pub struct OutboundTimingInterceptor {
    phase: Phase,
    timer: Arc<ResponseTimer>,
}

impl OutboundTimingInterceptor {
    pub fn new(phase: Phase, timer: Arc<ResponseTimer>) -> Self {
        Self { phase, timer }
    }
}

impl Interceptor for OutboundTimingInterceptor {
    fn phase(&self) -> &Phase {
        &self.phase
    }

    fn handle_message(&self, message: &Message) {
        let exchange = message.exchange().map(Arc::as_ref);
        self.timer.end_handling(exchange, Some(message));
    }
}

/// Finalizes timing on the dedicated fault phase.
///
/// Normalizes the fault classification onto the exchange first, so it
/// outlives the message, then records an error sample unconditionally.
#[derive(Debug)]
pub struct FaultTimingInterceptor {
    phase: Phase,
    timer: Arc<ResponseTimer>,
}

impl FaultTimingInterceptor {
    pub fn new(phase: Phase, timer: Arc<ResponseTimer>) -> Self {
        Self { phase, timer }
    }
}

impl Interceptor for FaultTimingInterceptor {
    fn phase(&self) -> &Phase {
        &self.phase
    }

    fn handle_message(&self, message: &Message) {
        let exchange = message.exchange().map(Arc::as_ref);
        if let Some(exchange) = exchange {
            self.timer.set_fault(message, exchange);
        }
        self.timer.end_handling_with_fault(exchange, Some(message));
    }
}
