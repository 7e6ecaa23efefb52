use rpcpulse_metrics::ParseRateUnitError;
use thiserror::Error;

/// Errors surfaced at interceptor construction time.
///
/// Message handling itself never fails; only the configuration surface
/// (phase names, rate units) is validated, and only once, when the
/// interceptors are built.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("interceptor phase name must not be empty")]
    EmptyPhase,

    #[error(transparent)]
    RateUnit(#[from] ParseRateUnitError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
