//! Market data types and the input collaborator contract.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

pub const SPY: &str = "SPY";
pub const XLU: &str = "XLU";
pub const WOOD: &str = "WOOD";
pub const GLD: &str = "GLD";
pub const IEF: &str = "IEF";
pub const TLT: &str = "TLT";
pub const VIX: &str = "^VIX";

/// Every symbol the five regime signals read from.
pub const REQUIRED_SYMBOLS: [&str; 7] = [SPY, XLU, WOOD, GLD, IEF, TLT, VIX];

/// One daily close for one symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Calendar date, `YYYY-MM-DD` or RFC 3339
    pub date: String,
    pub symbol: String,
    /// Missing closes deserialize to NaN so they are excluded instead of coerced to zero
    #[serde(default = "missing_close", deserialize_with = "nullable_close")]
    pub close: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

fn missing_close() -> f64 {
    f64::NAN
}

fn nullable_close<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl PricePoint {
    pub fn new(date: impl Into<String>, symbol: impl Into<String>, close: f64) -> Self {
        Self {
            date: date.into(),
            symbol: symbol.into(),
            close,
            volume: None,
        }
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// True when the close is usable for calculation
    pub fn has_valid_close(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }

    /// Full integrity check: usable close, non-negative volume, date and symbol present
    pub fn is_valid(&self) -> bool {
        self.has_valid_close()
            && !self.date.trim().is_empty()
            && !self.symbol.trim().is_empty()
            && self.volume.map_or(true, |v| v.is_finite() && v >= 0.0)
    }

    /// Parse the date into a UTC timestamp (midnight for plain calendar dates)
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.trim();
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Ascending by date, most recent last
pub type PriceSeries = Vec<PricePoint>;

/// Price series keyed by symbol
pub type MarketData = HashMap<String, PriceSeries>;

/// Closes of the points that pass the close check, order preserved
pub fn valid_closes(series: &[PricePoint]) -> Vec<f64> {
    series
        .iter()
        .filter(|p| p.has_valid_close())
        .map(|p| p.close)
        .collect()
}

/// Most recent usable close in a series
pub fn latest_valid_close(series: &[PricePoint]) -> Option<f64> {
    series
        .iter()
        .rev()
        .find(|p| p.has_valid_close())
        .map(|p| p.close)
}

/// Supplies price history for a set of symbols.
///
/// Fetching, caching and retrying against a concrete provider lives behind
/// this trait; the engine only consumes materialized series.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch(&self, symbols: &[&str]) -> anyhow::Result<MarketData>;
}
