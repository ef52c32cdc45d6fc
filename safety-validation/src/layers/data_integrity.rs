use crate::config::ValidationConfig;
use crate::report::{Severity, ValidationCategory, ValidationResult};
use chrono::{DateTime, Utc};
use common::{MarketData, PricePoint};

const CATEGORY: ValidationCategory = ValidationCategory::DataIntegrity;

/// Presence, length, validity, freshness and labelling of each required series
pub fn validate(data: &MarketData, config: &ValidationConfig, now: DateTime<Utc>) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    for symbol in &config.required_symbols {
        let series = match data.get(symbol) {
            Some(series) if !series.is_empty() => series,
            _ => {
                results.push(
                    ValidationResult::new(Severity::Error, CATEGORY, format!("No data for {}", symbol))
                        .with_symbol(symbol)
                        .with_suggestion(format!("Check the data feed for {}", symbol)),
                );
                continue;
            }
        };
        results.extend(validate_series(symbol, series, config, now));
    }

    results
}

fn validate_series(
    symbol: &str,
    series: &[PricePoint],
    config: &ValidationConfig,
    now: DateTime<Utc>,
) -> Vec<ValidationResult> {
    let mut results = Vec::new();

    if series.len() < config.min_data_points {
        results.push(
            ValidationResult::new(
                Severity::Warning,
                CATEGORY,
                format!(
                    "{} has {} points, at least {} expected",
                    symbol,
                    series.len(),
                    config.min_data_points
                ),
            )
            .with_symbol(symbol)
            .with_suggestion(format!("Fetch a longer history for {}", symbol)),
        );
    }

    let invalid: Vec<&PricePoint> = series.iter().filter(|p| !p.is_valid()).collect();
    let invalid_pct = invalid.len() as f64 / series.len() as f64 * 100.0;
    if invalid_pct > config.max_missing_data_pct {
        results.push(
            ValidationResult::new(
                Severity::Error,
                CATEGORY,
                format!(
                    "{:.1}% of {} points are invalid (limit {:.1}%)",
                    invalid_pct, symbol, config.max_missing_data_pct
                ),
            )
            .with_symbol(symbol)
            .with_examples(invalid.iter().take(3).map(|p| describe(p)).collect())
            .with_suggestion(format!("Re-download {} and drop unusable rows", symbol)),
        );
    }

    match series.iter().filter_map(PricePoint::timestamp).max() {
        Some(latest) => {
            let age_hours = (now - latest).num_hours();
            if age_hours > config.max_data_age_hours {
                results.push(
                    ValidationResult::new(
                        Severity::Warning,
                        CATEGORY,
                        format!("{} data is {} hours old", symbol, age_hours),
                    )
                    .with_symbol(symbol)
                    .with_suggestion(format!("Refresh {} before trading on it", symbol)),
                );
            }
        }
        None => results.push(
            ValidationResult::new(
                Severity::Warning,
                CATEGORY,
                format!("Could not determine freshness of {} data", symbol),
            )
            .with_symbol(symbol),
        ),
    }

    let mislabelled: Vec<&PricePoint> = series.iter().filter(|p| p.symbol != symbol).collect();
    if !mislabelled.is_empty() {
        results.push(
            ValidationResult::new(
                Severity::Error,
                CATEGORY,
                format!(
                    "{} points in the {} series carry another symbol",
                    mislabelled.len(),
                    symbol
                ),
            )
            .with_symbol(symbol)
            .with_examples(mislabelled.iter().take(3).map(|p| describe(p)).collect())
            .with_suggestion("Check the symbol mapping in the data loader"),
        );
    }

    results
}

fn describe(point: &PricePoint) -> String {
    format!("{} {}: {}", point.date, point.symbol, point.close)
}
