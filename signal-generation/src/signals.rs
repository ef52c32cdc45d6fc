// Regime Signal Calculators
// Each calculator turns one or two price series into a typed signal

use common::{
    valid_closes, MarketData, PricePoint, SignalOutcome, SignalType, UnavailableReason,
};

pub mod lumber_gold;
pub mod moving_average;
pub mod treasury_curve;
pub mod utilities_spy;
pub mod vix_defensive;

pub use lumber_gold::{calculate_lumber_gold, LumberGoldCalculator, LumberGoldParams};
pub use moving_average::{calculate_moving_average, MovingAverageCalculator, MovingAverageParams};
pub use treasury_curve::{calculate_treasury_curve, TreasuryCurveCalculator, TreasuryCurveParams};
pub use utilities_spy::{calculate_utilities_spy, UtilitiesSpyCalculator, UtilitiesSpyParams};
pub use vix_defensive::{calculate_vix_defensive, VixDefensiveCalculator, VixDefensiveParams};

/// Confidence never drops to zero for a computed signal
pub const MIN_CONFIDENCE: f64 = 0.1;

/// Denominators closer to zero than this trigger the neutral fallback
pub(crate) const DENOMINATOR_EPSILON: f64 = 1e-10;

/// Signal calculator trait
pub trait SignalCalculator: Send + Sync {
    fn signal_type(&self) -> SignalType;

    /// Symbols this calculator reads from `MarketData`
    fn required_symbols(&self) -> &'static [&'static str];

    /// Missing or short input is an `Unavailable` outcome, not an error.
    /// Errors are reserved for genuine calculator faults.
    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome>;
}

/// Look a series up by symbol
pub(crate) fn lookup<'a>(
    data: &'a MarketData,
    symbol: &str,
) -> Result<&'a [PricePoint], UnavailableReason> {
    data.get(symbol)
        .map(Vec::as_slice)
        .ok_or_else(|| UnavailableReason::MissingSeries {
            symbol: symbol.to_string(),
        })
}

/// Valid closes, provided at least `required` of them survive filtering
pub(crate) fn closes_with_history(
    series: &[PricePoint],
    symbol: &str,
    required: usize,
) -> Result<Vec<f64>, UnavailableReason> {
    // Cheap length check before filtering
    if series.len() < required {
        return Err(UnavailableReason::InsufficientData {
            symbol: symbol.to_string(),
            required,
            available: series.len(),
        });
    }

    let closes = valid_closes(series);
    if closes.len() < required {
        return Err(UnavailableReason::InsufficientData {
            symbol: symbol.to_string(),
            required,
            available: closes.len(),
        });
    }
    Ok(closes)
}

/// `end / start` over the trailing `lookback` periods
pub(crate) fn window_ratio(closes: &[f64], lookback: usize) -> Option<f64> {
    let end = *closes.last()?;
    let start = *closes.get(closes.len().checked_sub(lookback + 1)?)?;
    risk_metrics::total_return(start, end).map(|r| r + 1.0)
}

/// Clamp into `[MIN_CONFIDENCE, 1.0]`, passing NaN through so the signal is rejected
pub(crate) fn bounded_confidence(value: f64) -> f64 {
    if !value.is_finite() {
        return f64::NAN;
    }
    value.min(1.0).max(MIN_CONFIDENCE)
}
