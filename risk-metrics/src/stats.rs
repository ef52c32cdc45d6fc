//! Descriptive statistics over price and return series

use common::Trend;
use statrs::statistics::Statistics;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().mean())
}

/// Sample standard deviation, `None` below two observations
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let sd = values.iter().std_dev();
    sd.is_finite().then_some(sd)
}

/// `end / start - 1`, `None` when the start is not a usable price
pub fn total_return(start: f64, end: f64) -> Option<f64> {
    if start <= 0.0 || !start.is_finite() || !end.is_finite() {
        return None;
    }
    Some(end / start - 1.0)
}

/// Fractional change between two observations
pub fn percent_change(previous: f64, current: f64) -> Option<f64> {
    if previous == 0.0 || !previous.is_finite() || !current.is_finite() {
        return None;
    }
    Some((current - previous) / previous)
}

/// Period-over-period simple returns
pub fn simple_returns(values: &[f64]) -> Vec<f64> {
    values
        .windows(2)
        .filter_map(|w| total_return(w[0], w[1]))
        .collect()
}

/// Mean of the last `period` values
pub fn simple_moving_average(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    mean(&values[values.len() - period..])
}

/// Where `value` sits within `values`, 0 to 100.
///
/// Ties count half, so a value equal to every observation ranks at 50.
pub fn percentile_rank(values: &[f64], value: f64) -> Option<f64> {
    if values.is_empty() || !value.is_finite() {
        return None;
    }
    let below = values.iter().filter(|v| **v < value).count() as f64;
    let equal = values.iter().filter(|v| **v == value).count() as f64;
    Some((below + 0.5 * equal) / values.len() as f64 * 100.0)
}

/// Compare the early and late halves of the trailing `window` observations.
///
/// A change above `threshold` is Rising, below `-threshold` Falling.
pub fn classify_trend(values: &[f64], window: usize, threshold: f64) -> Trend {
    let window = window.min(values.len());
    if window < 2 {
        return Trend::Stable;
    }

    let recent = &values[values.len() - window..];
    let half = window / 2;
    let early = mean(&recent[..half]);
    let late = mean(&recent[window - half..]);

    match (early, late) {
        (Some(early), Some(late)) => match percent_change(early, late) {
            Some(change) if change > threshold => Trend::Rising,
            Some(change) if change < -threshold => Trend::Falling,
            _ => Trend::Stable,
        },
        _ => Trend::Stable,
    }
}

/// Pearson correlation over the overlapping tail of two series
pub fn correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    let n = a.len().min(b.len());
    if n < 2 {
        return None;
    }

    let a = &a[a.len() - n..];
    let b = &b[b.len() - n..];
    let mean_a = mean(a)?;
    let mean_b = mean(b)?;

    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        covariance += da * db;
        variance_a += da * da;
        variance_b += db * db;
    }

    let denominator = (variance_a * variance_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some(covariance / denominator)
}

/// Number of observations equal to their predecessor
pub fn identical_consecutive_count(values: &[f64]) -> usize {
    values.windows(2).filter(|w| w[0] == w[1]).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(std_dev(&[1.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 1e-3);
    }

    #[test]
    fn test_total_return_guards_start() {
        assert!((total_return(100.0, 110.0).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(total_return(0.0, 110.0), None);
        assert_eq!(total_return(100.0, f64::NAN), None);
    }

    #[test]
    fn test_simple_moving_average_uses_tail() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(simple_moving_average(&values, 2), Some(4.5));
        assert_eq!(simple_moving_average(&values, 5), Some(3.0));
        assert_eq!(simple_moving_average(&values, 6), None);
        assert_eq!(simple_moving_average(&values, 0), None);
    }

    #[test]
    fn test_percentile_rank() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile_rank(&values, 5.0), Some(0.0));
        assert_eq!(percentile_rank(&values, 50.0), Some(100.0));
        assert_eq!(percentile_rank(&values, 30.0), Some(62.5));
        assert_eq!(percentile_rank(&[], 1.0), None);
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(&[10.0, 10.5, 11.0, 12.0, 13.0], 5, 0.05), Trend::Rising);
        assert_eq!(classify_trend(&[20.0, 19.0, 18.0, 16.0, 15.0], 5, 0.05), Trend::Falling);
        assert_eq!(classify_trend(&[15.0, 15.1, 15.0, 15.2, 15.1], 5, 0.05), Trend::Stable);
        assert_eq!(classify_trend(&[15.0], 5, 0.05), Trend::Stable);
    }

    #[test]
    fn test_correlation() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [2.0, 4.0, 6.0, 8.0];
        let c = [8.0, 6.0, 4.0, 2.0];
        assert!((correlation(&a, &b).unwrap() - 1.0).abs() < 1e-12);
        assert!((correlation(&a, &c).unwrap() + 1.0).abs() < 1e-12);
        assert_eq!(correlation(&a, &[1.0, 1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn test_identical_consecutive_count() {
        assert_eq!(identical_consecutive_count(&[1.0, 1.0, 1.0, 2.0, 2.0]), 3);
        assert_eq!(identical_consecutive_count(&[1.0]), 0);
    }
}
