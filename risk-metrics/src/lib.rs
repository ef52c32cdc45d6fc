//! Statistical and risk helpers shared by the signal calculators and the
//! safety validator.
//!
//! Everything here is a pure function over `f64` slices; callers filter
//! invalid closes before handing series in.

mod risk;
mod stats;

pub use risk::{
    annualized_volatility, expected_shortfall, max_drawdown, sharpe_ratio, value_at_risk,
    RiskSnapshot, TRADING_DAYS_PER_YEAR,
};
pub use stats::{
    classify_trend, correlation, identical_consecutive_count, mean, percent_change,
    percentile_rank, simple_moving_average, simple_returns, std_dev, total_return,
};
