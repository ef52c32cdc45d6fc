use super::{
    bounded_confidence, closes_with_history, lookup, window_ratio, SignalCalculator,
    DENOMINATOR_EPSILON,
};
use common::{
    MarketData, PricePoint, Signal, SignalDiagnostics, SignalDirection, SignalOutcome,
    SignalStrength, SignalType, TreasuryCurveDiagnostics, UnavailableReason, IEF, TLT,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ratios inside `(LOWER_BAND, UPPER_BAND)` are Neutral
pub const UPPER_BAND: f64 = 1.005;
pub const LOWER_BAND: f64 = 0.995;

const DIVERGENCE_THRESHOLD: f64 = 0.01;
const DIVERGENCE_BOOST: f64 = 1.2;
const STRESS_MOVE: f64 = 0.05;
const STRESS_BOOST: f64 = 1.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TreasuryCurveParams {
    pub lookback: usize,
}

impl Default for TreasuryCurveParams {
    fn default() -> Self {
        Self { lookback: 21 }
    }
}

/// Intermediate (IEF) vs long (TLT) Treasury total return.
///
/// Uses a dead-band around 1.0 rather than a bare threshold.
pub fn calculate_treasury_curve(
    ief: &[PricePoint],
    tlt: &[PricePoint],
    params: &TreasuryCurveParams,
) -> SignalOutcome {
    let required = params.lookback + 1;
    let (ief, tlt) = match (
        closes_with_history(ief, IEF, required),
        closes_with_history(tlt, TLT, required),
    ) {
        (Ok(ief), Ok(tlt)) => (ief, tlt),
        (Err(reason), _) | (_, Err(reason)) => return SignalOutcome::Unavailable(reason),
    };

    let (ief_total, tlt_total) = match (
        window_ratio(&ief, params.lookback),
        window_ratio(&tlt, params.lookback),
    ) {
        (Some(i), Some(t)) if t.abs() >= DENOMINATOR_EPSILON => (i, t),
        _ => {
            return SignalOutcome::Unavailable(UnavailableReason::NonFiniteResult {
                signal_type: SignalType::TreasuryCurve,
            })
        }
    };

    let ief_return = ief_total - 1.0;
    let tlt_return = tlt_total - 1.0;
    let ratio = ief_total / tlt_total;

    let direction = if ratio > UPPER_BAND {
        SignalDirection::RiskOn
    } else if ratio < LOWER_BAND {
        SignalDirection::RiskOff
    } else {
        SignalDirection::Neutral
    };
    let deviation = (ratio - 1.0).abs();
    let strength = SignalStrength::from_deviation(deviation, 0.02, 0.01);

    let return_spread = ief_return - tlt_return;
    let divergence_boost = return_spread.abs() > DIVERGENCE_THRESHOLD;
    let stress_boost = direction == SignalDirection::RiskOff
        && (ief_return.abs() > STRESS_MOVE || tlt_return.abs() > STRESS_MOVE);

    let mut confidence = deviation * 50.0;
    if divergence_boost {
        confidence *= DIVERGENCE_BOOST;
    }
    if stress_boost {
        confidence *= STRESS_BOOST;
    }
    let confidence = bounded_confidence(confidence);

    let window = |closes: &[f64]| closes[closes.len() - required..].to_vec();
    let return_correlation = risk_metrics::correlation(
        &risk_metrics::simple_returns(&window(&ief)),
        &risk_metrics::simple_returns(&window(&tlt)),
    );

    debug!(
        ratio,
        ief_return,
        tlt_return,
        divergence_boost,
        stress_boost,
        direction = %direction,
        "Treasury curve signal"
    );

    Signal::checked(
        direction,
        strength,
        confidence,
        ratio,
        SignalDiagnostics::TreasuryCurve(TreasuryCurveDiagnostics {
            lookback: params.lookback,
            ief_return,
            tlt_return,
            return_spread,
            return_correlation,
            divergence_boost,
            stress_boost,
        }),
    )
}

#[derive(Debug, Clone, Default)]
pub struct TreasuryCurveCalculator {
    params: TreasuryCurveParams,
}

impl TreasuryCurveCalculator {
    pub fn new(params: TreasuryCurveParams) -> Self {
        Self { params }
    }
}

impl SignalCalculator for TreasuryCurveCalculator {
    fn signal_type(&self) -> SignalType {
        SignalType::TreasuryCurve
    }

    fn required_symbols(&self) -> &'static [&'static str] {
        &[IEF, TLT]
    }

    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome> {
        let (ief, tlt) = match (lookup(data, IEF), lookup(data, TLT)) {
            (Ok(ief), Ok(tlt)) => (ief, tlt),
            (Err(reason), _) | (_, Err(reason)) => return Ok(SignalOutcome::Unavailable(reason)),
        };
        Ok(calculate_treasury_curve(ief, tlt, &self.params))
    }
}
