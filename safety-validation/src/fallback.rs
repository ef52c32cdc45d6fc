//! Conservative defaults returned when the real computation cannot be trusted

use crate::guards::CircuitBreakerStatus;
use crate::report::{SafetyReport, SafetyStatus, Severity, ValidationCategory, ValidationResult, MAX_RISK_SCORE};
use chrono::Utc;
use common::{ConsensusSignal, MarketData, SignalOutcome};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct SafeDefaults {
    /// Every required symbol, each with an empty series
    pub market_data: MarketData,
    pub signals: Vec<SignalOutcome>,
    /// Mixed with confidence 0.1
    pub consensus: ConsensusSignal,
}

pub fn safe_defaults(required_symbols: &[String]) -> SafeDefaults {
    SafeDefaults {
        market_data: required_symbols
            .iter()
            .map(|symbol| (symbol.clone(), Vec::new()))
            .collect(),
        signals: Vec::new(),
        consensus: ConsensusSignal::fallback(),
    }
}

/// Unsafe report with maximum risk, describing why the pipeline gave up
pub fn emergency_report(reason: &str, circuit_breaker_status: CircuitBreakerStatus) -> SafetyReport {
    let result = ValidationResult::new(
        Severity::Critical,
        ValidationCategory::Calculation,
        format!("Pipeline failure: {}", reason),
    )
    .with_suggestion("Investigate the pipeline failure before relying on regime signals");

    SafetyReport {
        id: Uuid::new_v4(),
        timestamp: Utc::now(),
        overall_status: SafetyStatus::Unsafe,
        risk_score: MAX_RISK_SCORE,
        validation_results: vec![result],
        circuit_breaker_status,
        recommendations: vec![
            "Using safe defaults, do not act on regime signals".to_string(),
            "Investigate the pipeline failure before relying on regime signals".to_string(),
        ],
        audit_trail: vec![format!("emergency fallback: {}", reason)],
    }
}
