use crate::config::RiskBoundaryConfig;
use crate::report::{Severity, ValidationCategory, ValidationResult};
use common::{
    latest_valid_close, valid_closes, ConsensusSignal, MarketData, MethodologyCategory, Signal,
    SignalOutcome, SignalStrength, SPY, VIX,
};
use risk_metrics::RiskSnapshot;
use std::collections::HashMap;

const CATEGORY: ValidationCategory = ValidationCategory::RiskBoundary;

/// Market extremes, unjustified confidence and methodology concentration
pub fn validate(
    data: &MarketData,
    outcomes: &[SignalOutcome],
    consensus: &ConsensusSignal,
    config: &RiskBoundaryConfig,
) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    if let Some(vix) = data.get(VIX).and_then(|series| latest_valid_close(series)) {
        if vix > config.vix_critical_level {
            results.push(
                ValidationResult::new(
                    Severity::Critical,
                    CATEGORY,
                    format!("VIX at {:.1} signals extreme market stress", vix),
                )
                .with_symbol(VIX)
                .with_suggestion("Halt regime-driven allocation changes until volatility normalises"),
            );
        } else if vix < config.vix_complacency_level {
            results.push(
                ValidationResult::new(
                    Severity::Warning,
                    CATEGORY,
                    format!("VIX at {:.1} suggests complacency", vix),
                )
                .with_symbol(VIX),
            );
        }
    }

    let signals: Vec<&Signal> = outcomes.iter().filter_map(SignalOutcome::signal).collect();

    let strong = signals
        .iter()
        .filter(|s| s.strength == SignalStrength::Strong)
        .count();
    if !consensus.direction.is_mixed()
        && consensus.confidence > config.high_confidence
        && strong < config.min_strong_signals
    {
        results.push(ValidationResult::new(
            Severity::Warning,
            CATEGORY,
            format!(
                "Consensus confidence {:.2} backed by only {} strong signals",
                consensus.confidence, strong
            ),
        ));
    }

    if let Some((category, share)) = dominant_category(&signals) {
        if share > config.max_category_share {
            results.push(ValidationResult::new(
                Severity::Warning,
                CATEGORY,
                format!(
                    "{:.0}% of signals come from the {} methodology",
                    share * 100.0,
                    category.as_str()
                ),
            ));
        }
    }

    let spy_closes = data.get(SPY).map(|series| valid_closes(series)).unwrap_or_default();
    if let Some(snapshot) = RiskSnapshot::from_closes(&spy_closes, config.risk_free_rate) {
        if snapshot.is_stressed() {
            results.push(
                ValidationResult::new(
                    Severity::Info,
                    CATEGORY,
                    format!(
                        "SPY under stress: drawdown {:.1}%, volatility {}",
                        snapshot.max_drawdown * 100.0,
                        snapshot
                            .annualized_volatility
                            .map_or("n/a".to_string(), |v| format!("{:.1}%", v * 100.0))
                    ),
                )
                .with_symbol(SPY),
            );
        }
    }

    results
}

/// Most common methodology and its share of the signal set
fn dominant_category(signals: &[&Signal]) -> Option<(MethodologyCategory, f64)> {
    let mut counts: HashMap<MethodologyCategory, usize> = HashMap::new();
    for signal in signals {
        *counts.entry(signal.signal_type.category()).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(category, count)| (category, count as f64 / signals.len() as f64))
}
