use super::{bounded_confidence, closes_with_history, lookup, SignalCalculator};
use common::{
    Crossover, MarketData, MovingAverageDiagnostics, PricePoint, Signal, SignalDiagnostics,
    SignalDirection, SignalOutcome, SignalStrength, SignalType, UnavailableReason, SPY,
};
use risk_metrics::simple_moving_average;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingAverageParams {
    pub short: usize,
    pub long: usize,
    /// How many periods back the crossover comparison looks
    pub crossover_offset: usize,
}

impl Default for MovingAverageParams {
    fn default() -> Self {
        Self {
            short: 50,
            long: 200,
            crossover_offset: 5,
        }
    }
}

fn percent_distance(price: f64, average: f64) -> f64 {
    (price - average) / average * 100.0
}

fn detect_crossover(closes: &[f64], params: &MovingAverageParams) -> Option<Crossover> {
    let earlier = &closes[..closes.len().checked_sub(params.crossover_offset)?];
    let before = (
        simple_moving_average(earlier, params.short)?,
        simple_moving_average(earlier, params.long)?,
    );
    let now = (
        simple_moving_average(closes, params.short)?,
        simple_moving_average(closes, params.long)?,
    );

    if before.0 <= before.1 && now.0 > now.1 {
        Some(Crossover::Bullish)
    } else if before.0 >= before.1 && now.0 < now.1 {
        Some(Crossover::Bearish)
    } else {
        None
    }
}

/// S&P 500 price against its short and long simple moving averages.
///
/// The raw value is `price / long MA`.
pub fn calculate_moving_average(spy: &[PricePoint], params: &MovingAverageParams) -> SignalOutcome {
    let closes = match closes_with_history(spy, SPY, params.long + 1) {
        Ok(closes) => closes,
        Err(reason) => return SignalOutcome::Unavailable(reason),
    };

    let price = closes[closes.len() - 1];
    let (short_ma, long_ma) = match (
        simple_moving_average(&closes, params.short),
        simple_moving_average(&closes, params.long),
    ) {
        (Some(s), Some(l)) if s > 0.0 && l > 0.0 => (s, l),
        _ => {
            return SignalOutcome::Unavailable(UnavailableReason::NonFiniteResult {
                signal_type: SignalType::SpMovingAverage,
            })
        }
    };

    let distance_from_short = percent_distance(price, short_ma);
    let distance_from_long = percent_distance(price, long_ma);
    let average_distance = (distance_from_short.abs() + distance_from_long.abs()) / 2.0;

    let direction = if price > short_ma && price > long_ma {
        SignalDirection::RiskOn
    } else if price < short_ma && price < long_ma {
        SignalDirection::RiskOff
    } else {
        SignalDirection::Neutral
    };
    let strength = SignalStrength::from_deviation(average_distance, 5.0, 2.0);

    // Split trend gets less confidence the further price strays
    let confidence = match direction {
        SignalDirection::Neutral => bounded_confidence(0.5 - average_distance / 20.0),
        _ => bounded_confidence(0.6 + (average_distance / 10.0).min(1.0) * 0.4),
    };

    let crossover = detect_crossover(&closes, params);

    debug!(
        price,
        short_ma,
        long_ma,
        average_distance,
        ?crossover,
        direction = %direction,
        "Moving average signal"
    );

    Signal::checked(
        direction,
        strength,
        confidence,
        price / long_ma,
        SignalDiagnostics::SpMovingAverage(MovingAverageDiagnostics {
            price,
            short_period: params.short,
            long_period: params.long,
            short_ma,
            long_ma,
            distance_from_short,
            distance_from_long,
            average_distance,
            crossover,
        }),
    )
}

#[derive(Debug, Clone, Default)]
pub struct MovingAverageCalculator {
    params: MovingAverageParams,
}

impl MovingAverageCalculator {
    pub fn new(params: MovingAverageParams) -> Self {
        Self { params }
    }
}

impl SignalCalculator for MovingAverageCalculator {
    fn signal_type(&self) -> SignalType {
        SignalType::SpMovingAverage
    }

    fn required_symbols(&self) -> &'static [&'static str] {
        &[SPY]
    }

    fn calculate(&self, data: &MarketData) -> anyhow::Result<SignalOutcome> {
        match lookup(data, SPY) {
            Ok(spy) => Ok(calculate_moving_average(spy, &self.params)),
            Err(reason) => Ok(SignalOutcome::Unavailable(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::{linear, series};
    use crate::signals::MIN_CONFIDENCE;

    fn small() -> MovingAverageParams {
        MovingAverageParams {
            short: 2,
            long: 4,
            crossover_offset: 5,
        }
    }

    fn diagnostics(signal: &Signal) -> &MovingAverageDiagnostics {
        match &signal.metadata {
            SignalDiagnostics::SpMovingAverage(d) => d,
            other => panic!("unexpected diagnostics {:?}", other),
        }
    }

    #[test]
    fn test_uptrend_is_strong_risk_on() {
        let spy = series(SPY, &linear(100.0, 200.0, 201));
        let signal = calculate_moving_average(&spy, &MovingAverageParams::default())
            .into_signal()
            .unwrap();

        assert_eq!(signal.direction, SignalDirection::RiskOn);
        assert_eq!(signal.strength, SignalStrength::Strong);
        assert_eq!(signal.confidence, 1.0);
        assert!(signal.raw_value > 1.0);
    }

    #[test]
    fn test_deterministic_output() {
        let spy = series(SPY, &linear(300.0, 330.0, 220));
        let a = calculate_moving_average(&spy, &MovingAverageParams::default())
            .into_signal()
            .unwrap();
        let b = calculate_moving_average(&spy, &MovingAverageParams::default())
            .into_signal()
            .unwrap();
        assert_eq!(a.direction, b.direction);
        assert_eq!(a.strength, b.strength);
        assert_eq!(a.confidence, b.confidence);
        assert_eq!(a.raw_value, b.raw_value);
        assert_eq!(diagnostics(&a).crossover, diagnostics(&b).crossover);
    }

    #[test]
    fn test_downtrend_is_risk_off() {
        let spy = series(SPY, &linear(200.0, 100.0, 201));
        let signal = calculate_moving_average(&spy, &MovingAverageParams::default())
            .into_signal()
            .unwrap();

        assert_eq!(signal.direction, SignalDirection::RiskOff);
        assert!(signal.raw_value < 1.0);
    }

    #[test]
    fn test_split_trend_is_neutral_with_low_confidence() {
        let mut closes = vec![100.0; 151];
        closes.extend(std::iter::repeat(130.0).take(49));
        closes.push(110.0);

        let signal = calculate_moving_average(&series(SPY, &closes), &MovingAverageParams::default())
            .into_signal()
            .unwrap();

        // below the 50-day average, above the 200-day average
        assert_eq!(signal.direction, SignalDirection::Neutral);
        assert_eq!(signal.confidence, MIN_CONFIDENCE);
        let d = diagnostics(&signal);
        assert!((d.short_ma - 129.6).abs() < 1e-9);
        assert!((d.long_ma - 107.4).abs() < 1e-9);
        assert_eq!(d.crossover, None);
    }

    #[test]
    fn test_moderate_distance_confidence() {
        // short MA 103, long MA 101.2, average distance ~3.8%
        let mut closes = vec![100.0; 5];
        closes.push(106.0);
        let params = MovingAverageParams {
            short: 2,
            long: 5,
            crossover_offset: 5,
        };
        let signal = calculate_moving_average(&series(SPY, &closes), &params)
            .into_signal()
            .unwrap();
        let d = diagnostics(&signal);
        assert_eq!(signal.strength, SignalStrength::Moderate);
        let expected = 0.6 + (d.average_distance / 10.0).min(1.0) * 0.4;
        assert_eq!(signal.direction, SignalDirection::RiskOn);
        assert!((signal.confidence - expected).abs() < 1e-12);
        assert!(signal.confidence < 1.0);
    }

    #[test]
    fn test_crossover_detection() {
        let mut closes = vec![10.0; 7];
        closes.extend([9.0, 8.0, 12.0, 14.0]);
        let signal = calculate_moving_average(&series(SPY, &closes), &small())
            .into_signal()
            .unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOn);
        assert_eq!(diagnostics(&signal).crossover, Some(Crossover::Bullish));

        let mut closes = vec![10.0; 7];
        closes.extend([11.0, 12.0, 8.0, 6.0]);
        let signal = calculate_moving_average(&series(SPY, &closes), &small())
            .into_signal()
            .unwrap();
        assert_eq!(signal.direction, SignalDirection::RiskOff);
        assert_eq!(diagnostics(&signal).crossover, Some(Crossover::Bearish));
    }

    #[test]
    fn test_requires_long_plus_one_points() {
        let spy = series(SPY, &[100.0; 200]);
        let outcome = calculate_moving_average(&spy, &MovingAverageParams::default());
        assert!(matches!(
            outcome,
            SignalOutcome::Unavailable(UnavailableReason::InsufficientData { required: 201, .. })
        ));
    }
}
