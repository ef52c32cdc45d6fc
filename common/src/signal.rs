//! Regime signal types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five regime indicators
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SignalType {
    UtilitiesSpy,
    LumberGold,
    TreasuryCurve,
    VixDefensive,
    SpMovingAverage,
}

impl SignalType {
    pub const ALL: [SignalType; 5] = [
        SignalType::UtilitiesSpy,
        SignalType::LumberGold,
        SignalType::TreasuryCurve,
        SignalType::VixDefensive,
        SignalType::SpMovingAverage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalType::UtilitiesSpy => "utilities_spy",
            SignalType::LumberGold => "lumber_gold",
            SignalType::TreasuryCurve => "treasury_curve",
            SignalType::VixDefensive => "vix_defensive",
            SignalType::SpMovingAverage => "sp_moving_average",
        }
    }

    /// Methodology family, used for concentration checks
    pub fn category(&self) -> MethodologyCategory {
        match self {
            SignalType::UtilitiesSpy => MethodologyCategory::SectorRotation,
            SignalType::LumberGold => MethodologyCategory::Commodity,
            SignalType::TreasuryCurve => MethodologyCategory::FixedIncome,
            SignalType::VixDefensive => MethodologyCategory::Volatility,
            SignalType::SpMovingAverage => MethodologyCategory::TrendFollowing,
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MethodologyCategory {
    SectorRotation,
    Commodity,
    FixedIncome,
    Volatility,
    TrendFollowing,
}

impl MethodologyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            MethodologyCategory::SectorRotation => "sector-rotation",
            MethodologyCategory::Commodity => "commodity",
            MethodologyCategory::FixedIncome => "fixed-income",
            MethodologyCategory::Volatility => "volatility",
            MethodologyCategory::TrendFollowing => "trend-following",
        }
    }
}

/// Regime call
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalDirection {
    #[serde(rename = "Risk-On")]
    RiskOn,
    #[serde(rename = "Risk-Off")]
    RiskOff,
    Neutral,
}

impl SignalDirection {
    /// True for Risk-On vs Risk-Off pairs; Neutral never opposes anything
    pub fn opposes(&self, other: SignalDirection) -> bool {
        matches!(
            (self, other),
            (SignalDirection::RiskOn, SignalDirection::RiskOff)
                | (SignalDirection::RiskOff, SignalDirection::RiskOn)
        )
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalDirection::RiskOn => f.write_str("Risk-On"),
            SignalDirection::RiskOff => f.write_str("Risk-Off"),
            SignalDirection::Neutral => f.write_str("Neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SignalStrength {
    Strong,
    Moderate,
    Weak,
}

impl SignalStrength {
    /// Weight applied to confidence in the consensus step
    pub fn multiplier(&self) -> f64 {
        match self {
            SignalStrength::Strong => 1.0,
            SignalStrength::Moderate => 0.75,
            SignalStrength::Weak => 0.5,
        }
    }

    /// Band a deviation: above `strong` is Strong, above `moderate` is Moderate
    pub fn from_deviation(deviation: f64, strong: f64, moderate: f64) -> Self {
        if deviation > strong {
            SignalStrength::Strong
        } else if deviation > moderate {
            SignalStrength::Moderate
        } else {
            SignalStrength::Weak
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Crossover {
    Bullish,
    Bearish,
}

/// A typed regime signal with its diagnostics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub direction: SignalDirection,
    pub strength: SignalStrength,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub raw_value: f64,
    pub date: DateTime<Utc>,
    pub metadata: SignalDiagnostics,
}

impl Signal {
    /// Build a signal, refusing non-finite numbers or out-of-range confidence
    pub fn checked(
        direction: SignalDirection,
        strength: SignalStrength,
        confidence: f64,
        raw_value: f64,
        metadata: SignalDiagnostics,
    ) -> SignalOutcome {
        let signal_type = metadata.signal_type();
        if !raw_value.is_finite() || !confidence.is_finite() || !(0.0..=1.0).contains(&confidence)
        {
            return SignalOutcome::Unavailable(UnavailableReason::NonFiniteResult { signal_type });
        }

        SignalOutcome::Available(Signal {
            signal_type,
            direction,
            strength,
            confidence,
            raw_value,
            date: Utc::now(),
            metadata,
        })
    }
}

/// Per-indicator diagnostics attached to a signal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SignalDiagnostics {
    UtilitiesSpy(UtilitiesSpyDiagnostics),
    LumberGold(LumberGoldDiagnostics),
    TreasuryCurve(TreasuryCurveDiagnostics),
    VixDefensive(VixDefensiveDiagnostics),
    SpMovingAverage(MovingAverageDiagnostics),
}

impl SignalDiagnostics {
    /// True when the calculator fell back to a neutral placeholder
    pub fn is_fallback(&self) -> bool {
        match self {
            SignalDiagnostics::UtilitiesSpy(d) => d.fallback.is_some(),
            SignalDiagnostics::LumberGold(d) => d.fallback.is_some(),
            _ => false,
        }
    }

    pub fn signal_type(&self) -> SignalType {
        match self {
            SignalDiagnostics::UtilitiesSpy(_) => SignalType::UtilitiesSpy,
            SignalDiagnostics::LumberGold(_) => SignalType::LumberGold,
            SignalDiagnostics::TreasuryCurve(_) => SignalType::TreasuryCurve,
            SignalDiagnostics::VixDefensive(_) => SignalType::VixDefensive,
            SignalDiagnostics::SpMovingAverage(_) => SignalType::SpMovingAverage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilitiesSpyDiagnostics {
    pub lookback: usize,
    pub xlu_return: f64,
    pub spy_return: f64,
    /// Set when the near-zero denominator fallback produced the signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LumberGoldDiagnostics {
    pub lookback: usize,
    pub lumber_ratio: f64,
    pub gold_ratio: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreasuryCurveDiagnostics {
    pub lookback: usize,
    pub ief_return: f64,
    pub tlt_return: f64,
    pub return_spread: f64,
    /// Pearson correlation of the two daily return streams over the window
    pub return_correlation: Option<f64>,
    pub divergence_boost: bool,
    pub stress_boost: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VixDefensiveDiagnostics {
    pub current_level: f64,
    pub threshold: f64,
    pub relative_distance: f64,
    /// 0 to 100 within the supplied window
    pub percentile_rank: Option<f64>,
    pub trend: Trend,
    pub extreme_reading: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverageDiagnostics {
    pub price: f64,
    pub short_period: usize,
    pub long_period: usize,
    pub short_ma: f64,
    pub long_ma: f64,
    /// Percent distance of price from each average
    pub distance_from_short: f64,
    pub distance_from_long: f64,
    pub average_distance: f64,
    pub crossover: Option<Crossover>,
}

/// Why a calculator produced no signal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnavailableReason {
    MissingSeries { symbol: String },
    InsufficientData {
        symbol: String,
        required: usize,
        available: usize,
    },
    NonFiniteResult { signal_type: SignalType },
    CalculatorFailed { message: String },
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnavailableReason::MissingSeries { symbol } => {
                write!(f, "no price series for {}", symbol)
            }
            UnavailableReason::InsufficientData {
                symbol,
                required,
                available,
            } => write!(
                f,
                "{} has {} valid points, {} required",
                symbol, available, required
            ),
            UnavailableReason::NonFiniteResult { signal_type } => {
                write!(f, "{} produced a non-finite result", signal_type)
            }
            UnavailableReason::CalculatorFailed { message } => {
                write!(f, "calculator failed: {}", message)
            }
        }
    }
}

/// Result of one calculator run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    Available(Signal),
    Unavailable(UnavailableReason),
}

impl SignalOutcome {
    pub fn signal(&self) -> Option<&Signal> {
        match self {
            SignalOutcome::Available(signal) => Some(signal),
            SignalOutcome::Unavailable(_) => None,
        }
    }

    pub fn into_signal(self) -> Option<Signal> {
        match self {
            SignalOutcome::Available(signal) => Some(signal),
            SignalOutcome::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, SignalOutcome::Available(_))
    }

    pub fn insufficient(symbol: &str, required: usize, available: usize) -> Self {
        SignalOutcome::Unavailable(UnavailableReason::InsufficientData {
            symbol: symbol.to_string(),
            required,
            available,
        })
    }

    pub fn missing(symbol: &str) -> Self {
        SignalOutcome::Unavailable(UnavailableReason::MissingSeries {
            symbol: symbol.to_string(),
        })
    }
}
