use super::{bounded_confidence, closes_with_history, lookup, SignalCalculator};
use common::{
    MarketData, PricePoint, Signal, SignalDiagnostics, SignalDirection, SignalOutcome,
    SignalStrength, SignalType, UnavailableReason, VixDefensiveDiagnostics, VIX,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

const LOW_EXTREME: f64 = 10.0;
const HIGH_EXTREME: f64 = 30.0;
const TREND_WINDOW: usize = 5;
const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VixDefensiveParams {
    /// Levels below this read as complacency
    pub threshold: f64,
}

impl Default for VixDefensiveParams {
    fn default() -> Self {
        Self { threshold: 12.5 }
    }
}

/// Contrarian volatility signal from the latest VIX level.
///
/// A quiet VIX is treated as complacency, so readings below the threshold
/// are Risk-Off. The raw value is `current / threshold`.
pub fn calculate_vix_defensive(vix: &[PricePoint], params: &VixDefensiveParams) -> SignalOutcome {
    let levels = match closes_with_history(vix, VIX, 1) {
        Ok(levels) => levels,
        Err(reason) => return SignalOutcome::Unavailable(reason),
    };
    if !(params.threshold.is_finite() && params.threshold > 0.0) {
        return SignalOutcome::Unavailable(UnavailableReason::NonFiniteResult {
            signal_type: SignalType::VixDefensive,
        });
    }

    let current = levels[levels.len() - 1];
    let direction = if current < params.threshold {
        SignalDirection::RiskOff
    } else {
        SignalDirection::RiskOn
    };

    let relative_distance = (current - params.threshold).abs() / params.threshold;
    let strength = SignalStrength::from_deviation(relative_distance, 0.4, 0.2);

    let mut confidence = (relative_distance * 2.0).min(1.0);
    let extreme_reading = current < LOW_EXTREME || current > HIGH_EXTREME;
    if current < LOW_EXTREME {
        confidence *= 1.5;
    } else if current > HIGH_EXTREME {
        confidence *= 1.3;
    }
    let confidence = bounded_confidence(confidence);

    let percentile_rank = risk_metrics::percentile_rank(&levels, current);
    let trend = risk_metrics::classify_trend(&levels, TREND_WINDOW, TREND_THRESHOLD);

    debug!(
        current,
        threshold = params.threshold,
        relative_distance,
        ?trend,
        direction = %direction,
        "VIX defensive signal"
    );

    Signal::checked(
        direction,
        strength,
        confidence,
        current / params.threshold,
        SignalDiagnostics::VixDefensive(VixDefensiveDiagnostics {
            current_level: current,
            threshold: params.threshold,
            relative_distance,
            percentile_rank,
            trend,
            extreme_reading,
        }),
    )
}

#[derive(Debug, Clone, Default)]
pub struct VixDefensiveCalculator {
    params: VixDefensiveParams,
}

impl VixDefensiveCalculator {
    pub fn new(params: VixDefensiveParams) -> Self {
        Self { params }
    }
}

impl SignalCalculator for VixDefensiveCalculator {
    fn signal_type(&self) -> SignalType {
        SignalType::VixDefensive
    }

    fn required_symbols(&self) -> &'static [&'static str] {
        &[VIX]
    }

    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome> {
        match lookup(data, VIX) {
            Ok(vix) => Ok(calculate_vix_defensive(vix, &self.params)),
            Err(reason) => Ok(SignalOutcome::Unavailable(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::series;
    use crate::signals::MIN_CONFIDENCE;
    use common::Trend;

    fn run(levels: &[f64]) -> SignalOutcome {
        calculate_vix_defensive(&series(VIX, levels), &VixDefensiveParams::default())
    }

    fn diagnostics(signal: &Signal) -> &VixDefensiveDiagnostics {
        match &signal.metadata {
            SignalDiagnostics::VixDefensive(d) => d,
            other => panic!("unexpected diagnostics {:?}", other),
        }
    }

    #[test]
    fn test_elevated_vix_is_risk_on() {
        let signal = run(&[18.0, 20.0, 25.0]).into_signal().unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOn);
        assert_eq!(signal.strength, SignalStrength::Strong);
        assert_eq!(signal.confidence, 1.0);
        assert_eq!(signal.raw_value, 2.0);
    }

    #[test]
    fn test_quiet_vix_is_risk_off() {
        // relative distance 0.12
        let signal = run(&[11.0]).into_signal().unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOff);
        assert_eq!(signal.strength, SignalStrength::Weak);
        assert!((signal.confidence - 0.24).abs() < 1e-9);
        assert!(!diagnostics(&signal).extreme_reading);
    }

    #[test]
    fn test_deterministic_output() {
        let levels = [14.0, 15.5, 13.2, 16.8, 17.1];
        let a = run(&levels).into_signal().unwrap();
        let b = run(&levels).into_signal().unwrap();
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.strength, b.strength);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.raw_value, b.raw_value);
        assert_eq!(diagnostics(&a).percentile_rank, diagnostics(&b).percentile_rank);
    }

    #[test]
    fn test_extreme_low_reading_is_boosted() {
        // relative distance 0.28 -> 0.56 * 1.5
        let signal = run(&[9.0]).into_signal().unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOff);
        assert_eq!(signal.strength, SignalStrength::Moderate);
        assert!((signal.confidence - 0.84).abs() < 1e-9);
        assert!(diagnostics(&signal).extreme_reading);
    }

    #[test]
    fn test_threshold_reading_is_risk_on() {
        let signal = run(&[12.5]).into_signal().unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOn);
        assert_eq!(signal.strength, SignalStrength::Weak);
        assert_eq!(signal.confidence, MIN_CONFIDENCE);
    }

    #[test]
    fn test_diagnostics_track_history() {
        let signal = run(&[12.0, 13.0, 14.0, 15.0, 20.0]).into_signal().unwrap();
        let d = diagnostics(&signal);
        assert_eq!(d.trend, Trend::Rising);
        assert_eq!(d.percentile_rank, Some(90.0));

        let signal = run(&[20.0, 20.0, 20.0, 20.0, 20.0]).into_signal().unwrap();
        assert_eq!(diagnostics(&signal).trend, Trend::Stable);
    }

    #[test]
    fn test_empty_or_invalid_series_is_unavailable() {
        assert!(!run(&[]).is_available());
        assert!(!run(&[f64::NAN]).is_available());

        let params = VixDefensiveParams { threshold: 0.0 };
        assert!(!calculate_vix_defensive(&series(VIX, &[15.0]), &params).is_available());
    }
}
