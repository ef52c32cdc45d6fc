//! Safety validation for regime signals.
//!
//! [`SaflaValidator`] runs five layers of checks over the market data, the
//! computed signals and their consensus, behind a rate limiter and a circuit
//! breaker. [`ProductionPipeline`] wraps calculation and validation in
//! retries with backoff and falls back to conservative defaults.

pub mod clock;
pub mod config;
pub mod error;
pub mod fallback;
pub mod guards;
pub mod layers;
pub mod production;
pub mod report;
pub mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    create_config_template, load_config, load_layered_config, save_config, CircuitBreakerConfig,
    PriceRange, RateLimitConfig, RegimeConfig, RiskBoundaryConfig, ValidationConfig,
};
pub use error::{PipelineError, SafetyError};
pub use fallback::{emergency_report, safe_defaults, SafeDefaults};
pub use guards::{BreakerState, CircuitBreaker, CircuitBreakerStatus, RateLimitStatus, RateLimiter};
pub use production::{
    Backoff, DataQuality, PipelineMetadata, PipelineResult, ProductionConfig, ProductionPipeline,
};
pub use report::{
    AuditEntry, SafetyReport, SafetyStatus, Severity, ValidationCategory, ValidationResult,
};
pub use validator::{SaflaValidator, ValidatorStatus};
