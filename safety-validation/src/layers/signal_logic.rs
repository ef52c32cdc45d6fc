use crate::report::{Severity, ValidationCategory, ValidationResult};
use common::{ConsensusSignal, Signal, SignalDirection, SignalOutcome};

const CATEGORY: ValidationCategory = ValidationCategory::SignalLogic;

/// Signals above this confidence that disagree are reported for review
const CONFLICT_CONFIDENCE: f64 = 0.7;
const CLEAR_MAJORITY_MIN_SIGNALS: usize = 3;
const CLEAR_MAJORITY_MARGIN: usize = 2;

/// Consistency between the signal set and the consensus built from it
pub fn validate(outcomes: &[SignalOutcome], consensus: &ConsensusSignal) -> Vec<ValidationResult> {
    let signals: Vec<&Signal> = outcomes.iter().filter_map(SignalOutcome::signal).collect();
    let count = |direction: SignalDirection| signals.iter().filter(|s| s.direction == direction).count();

    let risk_on = count(SignalDirection::RiskOn);
    let risk_off = count(SignalDirection::RiskOff);
    let neutral = count(SignalDirection::Neutral);

    let mut results = Vec::new();

    if (risk_on, risk_off, neutral)
        != (consensus.risk_on_count, consensus.risk_off_count, consensus.neutral_count)
    {
        results.push(
            ValidationResult::new(
                Severity::Error,
                CATEGORY,
                format!(
                    "Consensus counts {}/{}/{} (on/off/neutral) do not match signals {}/{}/{}",
                    consensus.risk_on_count,
                    consensus.risk_off_count,
                    consensus.neutral_count,
                    risk_on,
                    risk_off,
                    neutral
                ),
            )
            .with_suggestion("Recompute the consensus from the current signal set"),
        );
    }

    if consensus.direction.is_mixed()
        && signals.len() >= CLEAR_MAJORITY_MIN_SIGNALS
        && risk_on.abs_diff(risk_off) >= CLEAR_MAJORITY_MARGIN
    {
        results.push(ValidationResult::new(
            Severity::Warning,
            CATEGORY,
            format!(
                "Mixed consensus despite a clear majority ({} Risk-On vs {} Risk-Off)",
                risk_on, risk_off
            ),
        ));
    }

    for (i, a) in signals.iter().enumerate() {
        for b in &signals[i + 1..] {
            if a.confidence > CONFLICT_CONFIDENCE
                && b.confidence > CONFLICT_CONFIDENCE
                && a.direction.opposes(b.direction)
            {
                results.push(ValidationResult::new(
                    Severity::Info,
                    CATEGORY,
                    format!(
                        "Conflict: {} ({}, {:.2}) vs {} ({}, {:.2})",
                        a.signal_type, a.direction, a.confidence, b.signal_type, b.direction, b.confidence
                    ),
                ));
            }
        }
    }

    results
}
