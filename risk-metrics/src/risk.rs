//! Risk metrics over daily closes

use crate::stats::{mean, simple_returns, std_dev};
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics};

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Annualized standard deviation of daily returns
pub fn annualized_volatility(returns: &[f64]) -> Option<f64> {
    std_dev(returns).map(|sd| sd * TRADING_DAYS_PER_YEAR.sqrt())
}

/// Annualized Sharpe ratio from daily returns
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> Option<f64> {
    let mean_return = mean(returns)?;
    let sd = std_dev(returns)?;

    if sd == 0.0 {
        return Some(0.0);
    }

    let annualized_mean = mean_return * TRADING_DAYS_PER_YEAR;
    let annualized_std = sd * TRADING_DAYS_PER_YEAR.sqrt();
    Some((annualized_mean - risk_free_rate) / annualized_std)
}

/// Largest peak-to-trough decline as a fraction of the peak
pub fn max_drawdown(values: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut max_drawdown: f64 = 0.0;

    for &value in values {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            max_drawdown = max_drawdown.max((peak - value) / peak);
        }
    }

    max_drawdown
}

/// Historical value at risk, reported as a positive loss fraction
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Option<f64> {
    if returns.len() < 2 || !(0.0..1.0).contains(&confidence) {
        return None;
    }
    let mut data = Data::new(returns.to_vec());
    let cutoff = data.quantile(1.0 - confidence);
    cutoff.is_finite().then_some((-cutoff).max(0.0))
}

/// Average loss beyond the VaR cutoff
pub fn expected_shortfall(returns: &[f64], confidence: f64) -> Option<f64> {
    let var = value_at_risk(returns, confidence)?;
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= -var).collect();
    match mean(&tail) {
        Some(avg) => Some((-avg).max(0.0)),
        None => Some(var),
    }
}

/// Risk profile of one price series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskSnapshot {
    pub observations: usize,
    pub annualized_volatility: Option<f64>,
    pub max_drawdown: f64,
    pub var_95: Option<f64>,
    pub expected_shortfall_95: Option<f64>,
    pub sharpe_ratio: Option<f64>,
}

impl RiskSnapshot {
    /// Build a snapshot from valid closes, `None` below two closes
    pub fn from_closes(closes: &[f64], risk_free_rate: f64) -> Option<Self> {
        if closes.len() < 2 {
            return None;
        }

        let returns = simple_returns(closes);
        let snapshot = Self {
            observations: closes.len(),
            annualized_volatility: annualized_volatility(&returns),
            max_drawdown: max_drawdown(closes),
            var_95: value_at_risk(&returns, 0.95),
            expected_shortfall_95: expected_shortfall(&returns, 0.95),
            sharpe_ratio: sharpe_ratio(&returns, risk_free_rate),
        };

        tracing::debug!(
            observations = snapshot.observations,
            max_drawdown = snapshot.max_drawdown,
            "Computed risk snapshot"
        );

        Some(snapshot)
    }

    /// Rough regime stress flag: deep drawdown or very high volatility
    pub fn is_stressed(&self) -> bool {
        self.max_drawdown > 0.20 || self.annualized_volatility.map_or(false, |v| v > 0.40)
    }
}
