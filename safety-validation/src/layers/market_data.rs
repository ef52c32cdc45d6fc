use crate::config::ValidationConfig;
use crate::report::{Severity, ValidationCategory, ValidationResult};
use common::{MarketData, PricePoint};
use risk_metrics::{identical_consecutive_count, percent_change};

const CATEGORY: ValidationCategory = ValidationCategory::MarketData;

/// Share of repeated consecutive closes that looks like a frozen feed
const MAX_IDENTICAL_SHARE: f64 = 0.10;
/// Single-day move treated as a likely bad tick
const SUSPICIOUS_JUMP: f64 = 0.50;
const MAX_EXAMPLES: usize = 3;

/// Price sanity per symbol: configured ranges, daily moves and suspicious patterns
pub fn validate(data: &MarketData, config: &ValidationConfig) -> Vec<ValidationResult> {
    let mut symbols: Vec<&String> = data.keys().collect();
    symbols.sort();

    let mut results = Vec::new();
    for symbol in symbols {
        let points: Vec<&PricePoint> = data[symbol].iter().filter(|p| p.has_valid_close()).collect();
        if points.is_empty() {
            continue;
        }

        if let Some(range) = config.price_ranges.get(symbol.as_str()) {
            let outside: Vec<&&PricePoint> = points.iter().filter(|p| !range.contains(p.close)).collect();
            if !outside.is_empty() {
                results.push(
                    ValidationResult::new(
                        Severity::Error,
                        CATEGORY,
                        format!(
                            "{} {} prices outside the plausible range {}-{}",
                            outside.len(),
                            symbol,
                            range.min,
                            range.max
                        ),
                    )
                    .with_symbol(symbol.as_str())
                    .with_examples(
                        outside
                            .iter()
                            .take(MAX_EXAMPLES)
                            .map(|p| format!("{}: {}", p.date, p.close))
                            .collect(),
                    )
                    .with_suggestion(format!("Verify {} prices against a second source", symbol)),
                );
            }
        }

        let max_change = config.max_daily_change_pct / 100.0;
        let mut large_moves = Vec::new();
        let mut jumps = 0;
        for pair in points.windows(2) {
            let change = match percent_change(pair[0].close, pair[1].close) {
                Some(change) => change,
                None => continue,
            };
            if change.abs() > max_change {
                large_moves.push(format!("{}: {:+.1}%", pair[1].date, change * 100.0));
            }
            if change.abs() > SUSPICIOUS_JUMP {
                jumps += 1;
            }
        }

        if !large_moves.is_empty() {
            results.push(
                ValidationResult::new(
                    Severity::Warning,
                    CATEGORY,
                    format!(
                        "{} day-over-day moves in {} exceed {}%",
                        large_moves.len(),
                        symbol,
                        config.max_daily_change_pct
                    ),
                )
                .with_symbol(symbol.as_str())
                .with_examples(large_moves.into_iter().take(MAX_EXAMPLES).collect())
                .with_suggestion(format!(
                    "Check {} for splits, mergers or bad ticks",
                    symbol
                )),
            );
        }

        let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
        let identical_share = identical_consecutive_count(&closes) as f64 / closes.len() as f64;
        if identical_share > MAX_IDENTICAL_SHARE {
            results.push(
                ValidationResult::new(
                    Severity::Warning,
                    CATEGORY,
                    format!(
                        "Suspicious pattern in {}: {:.0}% of closes repeat the previous close",
                        symbol,
                        identical_share * 100.0
                    ),
                )
                .with_symbol(symbol.as_str())
                .with_suggestion(format!("Check whether the {} feed is stale", symbol)),
            );
        }

        if jumps > 0 {
            results.push(
                ValidationResult::new(
                    Severity::Warning,
                    CATEGORY,
                    format!(
                        "Suspicious pattern in {}: {} single-day jumps above {:.0}%",
                        symbol,
                        jumps,
                        SUSPICIOUS_JUMP * 100.0
                    ),
                )
                .with_symbol(symbol.as_str()),
            );
        }
    }

    results
}
