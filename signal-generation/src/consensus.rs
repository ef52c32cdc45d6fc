// Consensus Aggregation
// Weighted vote across whatever signals could be computed

use chrono::Utc;
use common::{ConsensusDirection, ConsensusSignal, Signal, SignalDirection, SignalOutcome};
use tracing::debug;

/// Weight gap below which the vote is Mixed
pub const MIXED_THRESHOLD: f64 = 0.1;
/// Weight gap above which confidence is boosted
pub const STRONG_CONSENSUS_THRESHOLD: f64 = 0.3;
/// Fewer valid signals than this discounts confidence
pub const QUORUM: usize = 3;

const STRONG_CONSENSUS_BOOST: f64 = 1.2;
const LOW_COVERAGE_DISCOUNT: f64 = 0.8;
const MAX_DIRECTIONAL_CONFIDENCE: f64 = 0.9;
const MIN_CONSENSUS_CONFIDENCE: f64 = 0.1;

/// Sum of `confidence * strength multiplier` for one direction, divided by
/// the total signal count. Terms are summed in sorted order so the result
/// does not depend on input order.
fn weighted_strength(signals: &[Signal], direction: SignalDirection) -> f64 {
    let mut terms: Vec<f64> = signals
        .iter()
        .filter(|s| s.direction == direction)
        .map(|s| s.confidence * s.strength.multiplier())
        .collect();
    terms.sort_by(|a, b| a.total_cmp(b));
    terms.iter().sum::<f64>() / signals.len() as f64
}

/// Consensus from calculator outcomes, ignoring unavailable ones
pub fn calculate_consensus(outcomes: &[SignalOutcome]) -> ConsensusSignal {
    let signals = outcomes
        .iter()
        .filter_map(SignalOutcome::signal)
        .cloned()
        .collect();
    consensus_from_signals(signals)
}

pub fn consensus_from_signals(signals: Vec<Signal>) -> ConsensusSignal {
    if signals.is_empty() {
        debug!("No valid signals, consensus is empty");
        return ConsensusSignal::empty();
    }

    let count = |direction: SignalDirection| {
        signals.iter().filter(|s| s.direction == direction).count()
    };
    let risk_on_count = count(SignalDirection::RiskOn);
    let risk_off_count = count(SignalDirection::RiskOff);
    let neutral_count = count(SignalDirection::Neutral);

    let risk_on_weight = weighted_strength(&signals, SignalDirection::RiskOn);
    let risk_off_weight = weighted_strength(&signals, SignalDirection::RiskOff);
    let weight_difference = (risk_on_weight - risk_off_weight).abs();

    let (direction, mut confidence) = if weight_difference < MIXED_THRESHOLD {
        (
            ConsensusDirection::Mixed,
            (1.0 - weight_difference * 2.0).max(MIN_CONSENSUS_CONFIDENCE),
        )
    } else {
        let direction = if risk_on_weight > risk_off_weight {
            ConsensusDirection::RiskOn
        } else {
            ConsensusDirection::RiskOff
        };
        (direction, (0.5 + weight_difference).min(MAX_DIRECTIONAL_CONFIDENCE))
    };

    if weight_difference > STRONG_CONSENSUS_THRESHOLD {
        confidence = (confidence * STRONG_CONSENSUS_BOOST).min(1.0);
    }
    if signals.len() < QUORUM {
        confidence *= LOW_COVERAGE_DISCOUNT;
    }
    let confidence = confidence.max(MIN_CONSENSUS_CONFIDENCE);

    debug!(
        risk_on_weight,
        risk_off_weight,
        direction = %direction,
        confidence,
        signals = signals.len(),
        "Computed consensus"
    );

    ConsensusSignal {
        direction,
        confidence,
        risk_on_count,
        risk_off_count,
        neutral_count,
        constituent_signals: signals,
        timestamp: Utc::now(),
    }
}
