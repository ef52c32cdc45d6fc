//! SAFLA validator: layered checks behind a rate limiter and circuit breaker

use crate::clock::{Clock, SystemClock};
use crate::config::ValidationConfig;
use crate::error::SafetyError;
use crate::guards::{CircuitBreaker, CircuitBreakerStatus, RateLimitStatus, RateLimiter};
use crate::layers::{calculation, data_integrity, market_data, risk_boundary, signal_logic};
use crate::report::{
    recommendations, risk_score, AuditEntry, SafetyReport, SafetyStatus, ValidationResult,
};
use chrono::{DateTime, Utc};
use common::{ConsensusSignal, MarketData, Signal, SignalOutcome};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Guard and audit state shared by every caller of one validator
#[derive(Debug)]
struct SafetyState {
    breaker: CircuitBreaker,
    limiter: RateLimiter,
    audit: VecDeque<AuditEntry>,
}

impl SafetyState {
    fn push_audit(&mut self, entry: AuditEntry, capacity: usize) {
        let capacity = capacity.max(1);
        self.audit.push_back(entry);
        while self.audit.len() > capacity {
            self.audit.pop_front();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorStatus {
    pub circuit_breaker: CircuitBreakerStatus,
    pub rate_limit: RateLimitStatus,
    pub audit_entries: usize,
}

/// Build one per process and share it behind an `Arc`
#[derive(Debug)]
pub struct SaflaValidator {
    config: ValidationConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<SafetyState>,
}

impl SaflaValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: ValidationConfig, clock: Arc<dyn Clock>) -> Self {
        let state = SafetyState {
            breaker: CircuitBreaker::new(&config.circuit_breaker),
            limiter: RateLimiter::new(&config.rate_limit),
            audit: VecDeque::new(),
        };
        Self {
            config,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Current time on the validator's clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn state(&self) -> MutexGuard<'_, SafetyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn check_rate_limit(&self) -> Result<(), SafetyError> {
        let now = self.clock.now();
        self.state().limiter.check(now)
    }

    pub fn check_circuit_breaker(&self) -> Result<(), SafetyError> {
        let now = self.clock.now();
        self.state().breaker.check(now)
    }

    pub fn record_failure(&self) {
        let now = self.clock.now();
        self.state().breaker.record_failure(now);
    }

    pub fn record_success(&self) {
        self.state().breaker.record_success();
    }

    pub fn status(&self) -> ValidatorStatus {
        let state = self.state();
        ValidatorStatus {
            circuit_breaker: state.breaker.status(),
            rate_limit: state.limiter.status(),
            audit_entries: state.audit.len(),
        }
    }

    pub fn circuit_breaker_status(&self) -> CircuitBreakerStatus {
        self.state().breaker.status()
    }

    /// Most recent audit entries, newest last
    pub fn audit_trail(&self, limit: usize) -> Vec<AuditEntry> {
        let state = self.state();
        let skip = state.audit.len().saturating_sub(limit);
        state.audit.iter().skip(skip).cloned().collect()
    }

    /// Bounds and direction consistency of one signal, without touching guard state
    pub fn validate_signal(&self, signal: &Signal) -> Vec<ValidationResult> {
        calculation::validate_signal(signal, &self.config)
    }

    /// Run every layer and record the outcome with the breaker and audit trail.
    ///
    /// The guard decision and the breaker record happen under one lock, so
    /// concurrent callers are serialized and cannot share a cooldown expiry.
    pub fn validate_comprehensive(
        &self,
        data: &MarketData,
        outcomes: &[SignalOutcome],
        consensus: &ConsensusSignal,
    ) -> Result<SafetyReport, SafetyError> {
        let now = self.clock.now();
        let mut trail = Vec::new();

        let mut state = self.state();
        state.limiter.check(now)?;
        state.breaker.check(now)?;
        trail.push(format!("{}: guards passed", now.to_rfc3339()));

        let mut results = Vec::new();
        let layers: [(&str, Vec<ValidationResult>); 5] = [
            ("data integrity", data_integrity::validate(data, &self.config, now)),
            ("market data", market_data::validate(data, &self.config)),
            ("calculation", calculation::validate(outcomes, &self.config)),
            ("signal logic", signal_logic::validate(outcomes, consensus)),
            (
                "risk boundary",
                risk_boundary::validate(data, outcomes, consensus, &self.config.risk_boundaries),
            ),
        ];
        for (layer, findings) in layers {
            debug!(layer, findings = findings.len(), "Validation layer finished");
            trail.push(format!("{}: {} findings", layer, findings.len()));
            results.extend(findings);
        }

        let overall_status = SafetyStatus::from_results(&results);
        let score = risk_score(&results);
        let recommendations = recommendations(&results, overall_status);

        if overall_status == SafetyStatus::Unsafe {
            state.breaker.record_failure(now);
        } else {
            state.breaker.record_success();
        }
        let circuit_breaker_status = state.breaker.status();
        trail.push(format!(
            "breaker {:?} after {} consecutive failures",
            circuit_breaker_status.state, circuit_breaker_status.consecutive_failures
        ));

        let report = SafetyReport {
            id: Uuid::new_v4(),
            timestamp: now,
            overall_status,
            risk_score: score,
            validation_results: results,
            circuit_breaker_status,
            recommendations,
            audit_trail: trail,
        };

        state.push_audit(
            AuditEntry {
                id: report.id,
                timestamp: now,
                status: overall_status,
                risk_score: score,
                issue_count: report.issue_count(),
                signal_count: outcomes.iter().filter(|o| o.is_available()).count(),
            },
            self.config.audit_capacity,
        );
        drop(state);

        match overall_status {
            SafetyStatus::Safe => info!(risk_score = score, "Safety validation passed"),
            SafetyStatus::Warning => warn!(
                risk_score = score,
                issues = report.issue_count(),
                "Safety validation passed with warnings"
            ),
            SafetyStatus::Unsafe => warn!(
                risk_score = score,
                issues = report.issue_count(),
                "Safety validation FAILED - signals are unsafe"
            ),
        }

        Ok(report)
    }
}

impl Default for SaflaValidator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::guards::BreakerState;
    use crate::layers::test_support::{clean_market_data, last_date};
    use crate::report::{Severity, ValidationCategory};
    use chrono::Duration;
    use signal_generation::SignalOrchestrator;

    fn validator(config: ValidationConfig) -> (SaflaValidator, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(last_date() + Duration::hours(1)));
        (SaflaValidator::with_clock(config, clock.clone()), clock)
    }

    fn run(validator: &SaflaValidator, data: &MarketData) -> Result<SafetyReport, SafetyError> {
        let orchestrator = SignalOrchestrator::default();
        let outcomes = orchestrator.calculate_all_signals(data);
        let consensus = orchestrator.calculate_consensus_signal(&outcomes);
        validator.validate_comprehensive(data, &outcomes, &consensus)
    }

    fn corrupted_market_data() -> MarketData {
        let mut data = clean_market_data();
        if let Some(spy) = data.get_mut("SPY") {
            spy[100].close = 1_000_000.0;
        }
        data
    }

    #[test]
    fn test_clean_data_is_safe() {
        let (validator, _) = validator(ValidationConfig::default());
        let report = run(&validator, &clean_market_data()).unwrap();

        assert_eq!(report.overall_status, SafetyStatus::Safe);
        assert_eq!(report.risk_score, 0);
        assert_eq!(report.recommendations, vec!["All safety checks passed"]);
        assert_eq!(validator.audit_trail(10).len(), 1);
        assert_eq!(validator.audit_trail(10)[0].signal_count, 5);
    }

    #[test]
    fn test_out_of_range_spy_is_unsafe() {
        let (validator, _) = validator(ValidationConfig::default());
        let report = run(&validator, &corrupted_market_data()).unwrap();

        assert_eq!(report.overall_status, SafetyStatus::Unsafe);
        assert!(report.validation_results.iter().any(|r| {
            r.severity == Severity::Error
                && r.category == ValidationCategory::MarketData
                && r.symbol.as_deref() == Some("SPY")
        }));
        assert_eq!(report.circuit_breaker_status.consecutive_failures, 1);
    }

    #[test]
    fn test_rate_limit_rejects_over_limit_call() {
        let mut config = ValidationConfig::default();
        config.rate_limit.max_per_minute = 5;
        // empty data always fails validation, keep the breaker out of the way
        config.circuit_breaker.failure_threshold = 100;
        let (validator, clock) = validator(config);
        let empty = MarketData::new();
        let consensus = ConsensusSignal::empty();

        for _ in 0..5 {
            assert!(validator.validate_comprehensive(&empty, &[], &consensus).is_ok());
            clock.advance(Duration::seconds(1));
        }
        let err = validator
            .validate_comprehensive(&empty, &[], &consensus)
            .unwrap_err();
        assert!(matches!(err, SafetyError::RateLimited { .. }));
        assert_eq!(err.recovery_time(), last_date() + Duration::hours(1) + Duration::minutes(1));
        // rejected calls leave no audit entry
        assert_eq!(validator.status().audit_entries, 5);
    }

    #[test]
    fn test_breaker_opens_then_recovers() {
        let (validator, clock) = validator(ValidationConfig::default());
        let bad = corrupted_market_data();

        for _ in 0..3 {
            assert!(run(&validator, &bad).is_ok());
        }
        assert_eq!(validator.status().circuit_breaker.state, BreakerState::Open);

        clock.advance(Duration::seconds(60));
        let err = run(&validator, &bad).unwrap_err();
        assert!(matches!(err, SafetyError::CircuitOpen { .. }));

        clock.advance(Duration::seconds(241));
        let report = run(&validator, &clean_market_data()).unwrap();
        assert!(report.is_safe());
        let status = validator.status().circuit_breaker;
        assert_eq!(status.state, BreakerState::Closed);
        assert_eq!(status.consecutive_failures, 0);
    }

    #[test]
    fn test_cooldown_starts_a_fresh_failure_streak() {
        let (validator, clock) = validator(ValidationConfig::default());
        let bad = corrupted_market_data();

        for _ in 0..3 {
            assert!(run(&validator, &bad).is_ok());
        }
        clock.advance(Duration::seconds(301));

        // one failure after the cooldown does not reopen the breaker
        let report = run(&validator, &bad).unwrap();
        assert_eq!(report.circuit_breaker_status.state, BreakerState::Closed);
        assert_eq!(report.circuit_breaker_status.consecutive_failures, 1);
        assert!(run(&validator, &bad).is_ok());
        assert_eq!(validator.circuit_breaker_status().consecutive_failures, 2);

        // the third one does, and the breaker still recovers afterwards
        assert!(run(&validator, &bad).is_ok());
        assert_eq!(validator.circuit_breaker_status().state, BreakerState::Open);
        assert!(matches!(
            run(&validator, &clean_market_data()),
            Err(SafetyError::CircuitOpen { .. })
        ));

        clock.advance(Duration::seconds(301));
        let report = run(&validator, &clean_market_data()).unwrap();
        assert!(report.is_safe());
        assert_eq!(report.circuit_breaker_status.consecutive_failures, 0);
    }

    #[test]
    fn test_concurrent_callers_share_one_guard_decision() {
        let mut config = ValidationConfig::default();
        config.circuit_breaker.failure_threshold = 1;
        let (validator, clock) = validator(config);
        let bad = corrupted_market_data();
        let orchestrator = SignalOrchestrator::default();
        let outcomes = orchestrator.calculate_all_signals(&bad);
        let consensus = orchestrator.calculate_consensus_signal(&outcomes);

        assert!(validator.validate_comprehensive(&bad, &outcomes, &consensus).is_ok());
        assert_eq!(validator.circuit_breaker_status().state, BreakerState::Open);
        clock.advance(Duration::seconds(301));

        // after the cooldown exactly one caller gets through and reopens the breaker
        let passed = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| validator.validate_comprehensive(&bad, &outcomes, &consensus).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap())
                .filter(|passed| *passed)
                .count()
        });
        assert_eq!(passed, 1);
        assert_eq!(validator.status().audit_entries, 2);
    }

    #[test]
    fn test_audit_trail_is_bounded() {
        let mut config = ValidationConfig::default();
        config.audit_capacity = 3;
        config.circuit_breaker.failure_threshold = 100;
        let (validator, _) = validator(config);
        let empty = MarketData::new();
        let consensus = ConsensusSignal::empty();

        let ids: Vec<Uuid> = (0..5)
            .map(|_| validator.validate_comprehensive(&empty, &[], &consensus).unwrap().id)
            .collect();

        let trail = validator.audit_trail(10);
        assert_eq!(trail.len(), 3);
        let trail_ids: Vec<Uuid> = trail.iter().map(|e| e.id).collect();
        assert_eq!(trail_ids, ids[2..].to_vec());
        assert_eq!(validator.audit_trail(1)[0].id, ids[4]);
    }
}
