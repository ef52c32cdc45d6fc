use crate::config::ValidationConfig;
use crate::report::{Severity, ValidationCategory, ValidationResult};
use common::{Signal, SignalDirection, SignalOutcome, SignalType};

const CATEGORY: ValidationCategory = ValidationCategory::Calculation;

/// More missing signal types than this makes the consensus unreliable
const MAX_MISSING_TYPES: usize = 2;

const CURVE_UPPER_BAND: f64 = 1.005;
const CURVE_LOWER_BAND: f64 = 0.995;

/// Sanity of every computed signal plus coverage of the signal set
pub fn validate(outcomes: &[SignalOutcome], config: &ValidationConfig) -> Vec<ValidationResult> {
    let signals: Vec<&Signal> = outcomes.iter().filter_map(SignalOutcome::signal).collect();

    let mut results: Vec<ValidationResult> = signals
        .iter()
        .flat_map(|signal| validate_signal(signal, config))
        .collect();

    let missing: Vec<&str> = SignalType::ALL
        .iter()
        .filter(|t| !signals.iter().any(|s| s.signal_type == **t))
        .map(|t| t.as_str())
        .collect();
    if missing.len() > MAX_MISSING_TYPES {
        results.push(
            ValidationResult::new(
                Severity::Warning,
                CATEGORY,
                format!(
                    "Only {} of {} signals available, consensus is unreliable",
                    SignalType::ALL.len() - missing.len(),
                    SignalType::ALL.len()
                ),
            )
            .with_examples(missing.iter().map(|s| s.to_string()).collect())
            .with_suggestion("Restore the missing input series before trusting the consensus"),
        );
    }

    results
}

/// Numeric bounds and direction self-consistency of a single signal
pub fn validate_signal(signal: &Signal, config: &ValidationConfig) -> Vec<ValidationResult> {
    let mut results = Vec::new();
    let name = signal.signal_type.as_str();

    if !signal.raw_value.is_finite() || signal.raw_value.abs() > config.max_signal_raw_value {
        results.push(
            ValidationResult::new(
                Severity::Error,
                CATEGORY,
                format!(
                    "{} raw value {} outside +/-{}",
                    name, signal.raw_value, config.max_signal_raw_value
                ),
            )
            .with_suggestion(format!("Check the input series behind {}", name)),
        );
    }

    if !signal.confidence.is_finite() || !(0.0..=1.0).contains(&signal.confidence) {
        results.push(ValidationResult::new(
            Severity::Error,
            CATEGORY,
            format!("{} confidence {} outside [0, 1]", name, signal.confidence),
        ));
    } else if signal.confidence < config.min_signal_confidence {
        results.push(ValidationResult::new(
            Severity::Warning,
            CATEGORY,
            format!(
                "{} confidence {:.3} below minimum {}",
                name, signal.confidence, config.min_signal_confidence
            ),
        ));
    }

    // fallback placeholders carry a neutral reading regardless of raw value
    if signal.raw_value.is_finite()
        && !signal.metadata.is_fallback()
        && !direction_consistent(signal.signal_type, signal.raw_value, signal.direction)
    {
        results.push(
            ValidationResult::new(
                Severity::Error,
                CATEGORY,
                format!(
                    "Logic inconsistency: {} reads {} but raw value {:.4} implies otherwise",
                    name, signal.direction, signal.raw_value
                ),
            )
            .with_suggestion(format!("Review the {} calculator thresholds", name)),
        );
    }

    results
}

/// Whether `direction` is what `raw_value` implies for this signal type
fn direction_consistent(signal_type: SignalType, raw_value: f64, direction: SignalDirection) -> bool {
    use SignalDirection::*;

    let expected = match signal_type {
        SignalType::UtilitiesSpy if raw_value > 1.0 => RiskOff,
        SignalType::UtilitiesSpy => RiskOn,
        SignalType::LumberGold if raw_value > 1.0 => RiskOn,
        SignalType::LumberGold => RiskOff,
        SignalType::TreasuryCurve if raw_value > CURVE_UPPER_BAND => RiskOn,
        SignalType::TreasuryCurve if raw_value < CURVE_LOWER_BAND => RiskOff,
        SignalType::TreasuryCurve => Neutral,
        SignalType::VixDefensive if raw_value < 1.0 => RiskOff,
        SignalType::VixDefensive => RiskOn,
        // the short average may pull the call to Neutral
        SignalType::SpMovingAverage => {
            return match direction {
                Neutral => true,
                RiskOn => raw_value >= 1.0,
                RiskOff => raw_value <= 1.0,
            }
        }
    };
    direction == expected
}
