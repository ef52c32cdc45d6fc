use super::{
    bounded_confidence, closes_with_history, lookup, window_ratio, SignalCalculator,
    DENOMINATOR_EPSILON, MIN_CONFIDENCE,
};
use common::{
    LumberGoldDiagnostics, MarketData, PricePoint, Signal, SignalDiagnostics, SignalDirection,
    SignalOutcome, SignalStrength, SignalType, GLD, WOOD,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LumberGoldParams {
    /// About 13 weeks of trading days
    pub lookback: usize,
}

impl Default for LumberGoldParams {
    fn default() -> Self {
        Self { lookback: 91 }
    }
}

fn neutral_fallback(lookback: usize, lumber_ratio: f64, gold_ratio: f64, why: &str) -> SignalOutcome {
    debug!(lumber_ratio, gold_ratio, why, "Lumber/Gold neutral fallback");
    Signal::checked(
        SignalDirection::Neutral,
        SignalStrength::Weak,
        MIN_CONFIDENCE,
        1.0,
        SignalDiagnostics::LumberGold(LumberGoldDiagnostics {
            lookback,
            lumber_ratio,
            gold_ratio,
            fallback: Some(why.to_string()),
        }),
    )
}

/// Lumber vs gold relative performance.
///
/// Lumber leading gold has historically preceded lower-volatility regimes,
/// so a ratio above 1.0 reads Risk-On.
pub fn calculate_lumber_gold(
    lumber: &[PricePoint],
    gold: &[PricePoint],
    params: &LumberGoldParams,
) -> SignalOutcome {
    let required = params.lookback + 1;
    let (lumber, gold) = match (
        closes_with_history(lumber, WOOD, required),
        closes_with_history(gold, GLD, required),
    ) {
        (Ok(lumber), Ok(gold)) => (lumber, gold),
        (Err(reason), _) | (_, Err(reason)) => return SignalOutcome::Unavailable(reason),
    };

    let (lumber_ratio, gold_ratio) = match (
        window_ratio(&lumber, params.lookback),
        window_ratio(&gold, params.lookback),
    ) {
        (Some(l), Some(g)) => (l, g),
        (l, g) => {
            return neutral_fallback(
                params.lookback,
                l.unwrap_or(f64::NAN),
                g.unwrap_or(f64::NAN),
                "invalid start price",
            )
        }
    };

    if gold_ratio.abs() < DENOMINATOR_EPSILON {
        return neutral_fallback(params.lookback, lumber_ratio, gold_ratio, "near-zero gold ratio");
    }

    let ratio = lumber_ratio / gold_ratio;
    let direction = if ratio > 1.0 {
        SignalDirection::RiskOn
    } else {
        SignalDirection::RiskOff
    };
    let deviation = (ratio - 1.0).abs();
    let strength = SignalStrength::from_deviation(deviation, 0.15, 0.05);
    let confidence = bounded_confidence(deviation * 5.0);

    debug!(ratio, lumber_ratio, gold_ratio, direction = %direction, "Lumber/Gold signal");

    Signal::checked(
        direction,
        strength,
        confidence,
        ratio,
        SignalDiagnostics::LumberGold(LumberGoldDiagnostics {
            lookback: params.lookback,
            lumber_ratio,
            gold_ratio,
            fallback: None,
        }),
    )
}

#[derive(Debug, Clone, Default)]
pub struct LumberGoldCalculator {
    params: LumberGoldParams,
}

impl LumberGoldCalculator {
    pub fn new(params: LumberGoldParams) -> Self {
        Self { params }
    }
}

impl SignalCalculator for LumberGoldCalculator {
    fn signal_type(&self) -> SignalType {
        SignalType::LumberGold
    }

    fn required_symbols(&self) -> &'static [&'static str] {
        &[WOOD, GLD]
    }

    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome> {
        let (lumber, gold) = match (lookup(data, WOOD), lookup(data, GLD)) {
            (Ok(lumber), Ok(gold)) => (lumber, gold),
            (Err(reason), _) | (_, Err(reason)) => return Ok(SignalOutcome::Unavailable(reason)),
        };
        Ok(calculate_lumber_gold(lumber, gold, &self.params))
    }
}
