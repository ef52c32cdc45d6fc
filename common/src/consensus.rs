//! Aggregate regime call.

use crate::signal::{Signal, SignalDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConsensusDirection {
    #[serde(rename = "Risk-On")]
    RiskOn,
    #[serde(rename = "Risk-Off")]
    RiskOff,
    Mixed,
}

impl ConsensusDirection {
    pub fn is_mixed(&self) -> bool {
        matches!(self, ConsensusDirection::Mixed)
    }
}

impl fmt::Display for ConsensusDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsensusDirection::RiskOn => f.write_str("Risk-On"),
            ConsensusDirection::RiskOff => f.write_str("Risk-Off"),
            ConsensusDirection::Mixed => f.write_str("Mixed"),
        }
    }
}

/// Consensus across the available signals.
///
/// The three counts always partition `constituent_signals` by direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusSignal {
    pub direction: ConsensusDirection,
    pub confidence: f64,
    pub risk_on_count: usize,
    pub risk_off_count: usize,
    pub neutral_count: usize,
    pub constituent_signals: Vec<Signal>,
    pub timestamp: DateTime<Utc>,
}

impl ConsensusSignal {
    /// Consensus when no signal could be computed
    pub fn empty() -> Self {
        Self::mixed_with_confidence(0.0)
    }

    /// Conservative consensus used by safety fallbacks
    pub fn fallback() -> Self {
        Self::mixed_with_confidence(0.1)
    }

    fn mixed_with_confidence(confidence: f64) -> Self {
        Self {
            direction: ConsensusDirection::Mixed,
            confidence,
            risk_on_count: 0,
            risk_off_count: 0,
            neutral_count: 0,
            constituent_signals: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn signal_count(&self) -> usize {
        self.constituent_signals.len()
    }

    /// Count constituents pointing in `direction`
    pub fn count_direction(&self, direction: SignalDirection) -> usize {
        self.constituent_signals
            .iter()
            .filter(|s| s.direction == direction)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_fallback() {
        let empty = ConsensusSignal::empty();
        assert_eq!(empty.direction, ConsensusDirection::Mixed);
        assert_eq!(empty.confidence, 0.0);
        assert_eq!(empty.signal_count(), 0);

        let fallback = ConsensusSignal::fallback();
        assert!(fallback.direction.is_mixed());
        assert_eq!(fallback.confidence, 0.1);
    }
}
