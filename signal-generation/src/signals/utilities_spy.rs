use super::{
    bounded_confidence, closes_with_history, lookup, window_ratio, SignalCalculator,
    DENOMINATOR_EPSILON, MIN_CONFIDENCE,
};
use common::{
    MarketData, PricePoint, Signal, SignalDiagnostics, SignalDirection, SignalOutcome,
    SignalStrength, SignalType, UnavailableReason, UtilitiesSpyDiagnostics, SPY, XLU,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilitiesSpyParams {
    /// Trading days in the relative-performance window
    pub lookback: usize,
}

impl Default for UtilitiesSpyParams {
    fn default() -> Self {
        Self { lookback: 21 }
    }
}

/// Utilities vs S&P 500 relative performance.
///
/// Utilities outperforming the broad market is a defensive rotation, so a
/// ratio above 1.0 reads Risk-Off.
pub fn calculate_utilities_spy(
    xlu: &[PricePoint],
    spy: &[PricePoint],
    params: &UtilitiesSpyParams,
) -> SignalOutcome {
    let required = params.lookback + 1;
    let (xlu, spy) = match (
        closes_with_history(xlu, XLU, required),
        closes_with_history(spy, SPY, required),
    ) {
        (Ok(xlu), Ok(spy)) => (xlu, spy),
        (Err(reason), _) | (_, Err(reason)) => return SignalOutcome::Unavailable(reason),
    };

    let (xlu_ratio, spy_ratio) = match (
        window_ratio(&xlu, params.lookback),
        window_ratio(&spy, params.lookback),
    ) {
        (Some(x), Some(s)) => (x, s),
        _ => {
            return SignalOutcome::Unavailable(UnavailableReason::NonFiniteResult {
                signal_type: SignalType::UtilitiesSpy,
            })
        }
    };

    let mut diagnostics = UtilitiesSpyDiagnostics {
        lookback: params.lookback,
        xlu_return: xlu_ratio - 1.0,
        spy_return: spy_ratio - 1.0,
        fallback: None,
    };

    // 1 + SPY return
    if spy_ratio.abs() < DENOMINATOR_EPSILON {
        debug!(spy_ratio, "Utilities/SPY denominator near zero, emitting neutral fallback");
        diagnostics.fallback = Some("near-zero SPY return denominator".to_string());
        return Signal::checked(
            SignalDirection::Neutral,
            SignalStrength::Weak,
            MIN_CONFIDENCE,
            1.0,
            SignalDiagnostics::UtilitiesSpy(diagnostics),
        );
    }

    let ratio = xlu_ratio / spy_ratio;
    let direction = if ratio > 1.0 {
        SignalDirection::RiskOff
    } else {
        SignalDirection::RiskOn
    };
    let deviation = (ratio - 1.0).abs();
    let strength = SignalStrength::from_deviation(deviation, 0.05, 0.02);
    let confidence = bounded_confidence(deviation * 10.0);

    debug!(
        ratio,
        xlu_return = diagnostics.xlu_return,
        spy_return = diagnostics.spy_return,
        direction = %direction,
        "Utilities/SPY signal"
    );

    Signal::checked(
        direction,
        strength,
        confidence,
        ratio,
        SignalDiagnostics::UtilitiesSpy(diagnostics),
    )
}

#[derive(Debug, Clone, Default)]
pub struct UtilitiesSpyCalculator {
    params: UtilitiesSpyParams,
}

impl UtilitiesSpyCalculator {
    pub fn new(params: UtilitiesSpyParams) -> Self {
        Self { params }
    }
}

impl SignalCalculator for UtilitiesSpyCalculator {
    fn signal_type(&self) -> SignalType {
        SignalType::UtilitiesSpy
    }

    fn required_symbols(&self) -> &'static [&'static str] {
        &[XLU, SPY]
    }

    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome> {
        let (xlu, spy) = match (lookup(data, XLU), lookup(data, SPY)) {
            (Ok(xlu), Ok(spy)) => (xlu, spy),
            (Err(reason), _) | (_, Err(reason)) => return Ok(SignalOutcome::Unavailable(reason)),
        };
        Ok(calculate_utilities_spy(xlu, spy, &self.params))
    }
}
