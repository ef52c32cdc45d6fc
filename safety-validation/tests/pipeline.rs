use chrono::{DateTime, Duration, NaiveDate, Utc};
use common::{ConsensusDirection, MarketData, PricePoint, REQUIRED_SYMBOLS, SPY};
use safety_validation::{
    Backoff, ManualClock, PipelineError, ProductionConfig, ProductionPipeline, SafetyError,
    SafetyStatus, SaflaValidator, Severity, ValidationCategory, ValidationConfig,
};
use signal_generation::SignalOrchestrator;
use std::sync::Arc;

const DAYS: i64 = 250;

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
}

fn last_day() -> DateTime<Utc> {
    (first_day() + Duration::days(DAYS - 1))
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
}

fn series(symbol: &str, base: f64, drift: f64) -> Vec<PricePoint> {
    (0..DAYS)
        .map(|i| {
            let date = first_day() + Duration::days(i);
            let close = base * (1.0 + drift).powi(i as i32) * (1.0 + 0.008 * (i as f64 * 0.9).cos());
            PricePoint::new(date.format("%Y-%m-%d").to_string(), symbol, close).with_volume(1_000_000.0)
        })
        .collect()
}

/// Equities drifting up, defensives flat, calm volatility
fn market() -> MarketData {
    let params = [
        (420.0, 0.0008),
        (68.0, 0.0),
        (55.0, 0.0006),
        (190.0, 0.0),
        (96.0, 0.0),
        (92.0, 0.0),
        (16.0, 0.0),
    ];
    REQUIRED_SYMBOLS
        .iter()
        .zip(params)
        .map(|(symbol, (base, drift))| (symbol.to_string(), series(symbol, base, drift)))
        .collect()
}

fn config() -> ProductionConfig {
    ProductionConfig {
        max_retries: 2,
        backoff: Backoff::Fixed { delay_ms: 1 },
        attempt_timeout_ms: 5_000,
        enable_fallbacks: true,
        safety_mode: true,
    }
}

fn pipeline() -> ProductionPipeline {
    let clock = Arc::new(ManualClock::new(last_day() + Duration::hours(6)));
    let validator = Arc::new(SaflaValidator::with_clock(ValidationConfig::default(), clock));
    ProductionPipeline::new(SignalOrchestrator::default(), validator, config())
}

#[tokio::test]
async fn clean_data_passes_validation() {
    let pipeline = pipeline();
    let result = pipeline.run(market()).await.unwrap();

    assert!(result.safety_report.is_safe());
    assert_eq!(result.safety_report.count_severity(Severity::Error), 0);
    assert_eq!(result.signals.iter().filter(|s| s.is_available()).count(), 5);
    assert_eq!(result.consensus.direction, ConsensusDirection::RiskOn);
    assert!(!result.metadata.used_fallback);
    assert_eq!(result.metadata.data_quality.freshness_hours, Some(6.0));

    let audit = pipeline.validator().audit_trail(10);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].id, result.safety_report.id);
}

#[tokio::test]
async fn corrupted_spy_falls_back_to_safe_defaults() {
    let mut data = market();
    if let Some(spy) = data.get_mut(SPY) {
        spy[200].close = 1_000_000.0;
    }

    let result = pipeline().run(data).await.unwrap();

    assert_eq!(result.safety_report.overall_status, SafetyStatus::Unsafe);
    assert!(result.safety_report.validation_results.iter().any(|r| {
        r.category == ValidationCategory::MarketData && r.severity == Severity::Error
    }));
    assert!(result.metadata.used_fallback);
    assert!(result.signals.is_empty());
    assert_eq!(result.consensus.direction, ConsensusDirection::Mixed);
    assert_eq!(result.consensus.confidence, 0.1);
}

#[tokio::test]
async fn open_breaker_stops_the_pipeline_without_retrying() {
    let pipeline = pipeline();
    let mut data = market();
    if let Some(spy) = data.get_mut(SPY) {
        spy[10].close = 5.0;
    }

    for _ in 0..3 {
        let result = pipeline.run(data.clone()).await.unwrap();
        assert!(!result.safety_report.is_safe());
    }

    let err = pipeline.run(market()).await.unwrap_err();
    match err {
        PipelineError::Safety(SafetyError::CircuitOpen { cooldown_until }) => {
            assert_eq!(cooldown_until, last_day() + Duration::hours(6) + Duration::minutes(5));
        }
        other => panic!("expected an open breaker, got {other}"),
    }
    // the rejected run never reached the audit trail
    assert_eq!(pipeline.validator().status().audit_entries, 3);
}
