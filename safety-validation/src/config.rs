//! Safety validation configuration

use crate::production::ProductionConfig;
use anyhow::Context;
use common::{REQUIRED_SYMBOLS, GLD, IEF, SPY, TLT, VIX, WOOD, XLU};
use serde::{Deserialize, Serialize};
use signal_generation::OrchestratorConfig;
use std::collections::HashMap;

/// Validator thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Symbols every snapshot must carry
    #[serde(default = "default_required_symbols")]
    pub required_symbols: Vec<String>,

    /// Fewer points than this is a warning
    #[serde(default = "default_min_data_points")]
    pub min_data_points: usize,

    /// Latest point older than this is stale
    #[serde(default = "default_max_data_age_hours")]
    pub max_data_age_hours: i64,

    /// Percentage of invalid points tolerated per series
    #[serde(default = "default_max_missing_data_pct")]
    pub max_missing_data_pct: f64,

    /// Plausible close range per symbol
    #[serde(default = "default_price_ranges")]
    pub price_ranges: HashMap<String, PriceRange>,

    /// Day-over-day move (percent) flagged as a possible split or bad tick
    #[serde(default = "default_max_daily_change_pct")]
    pub max_daily_change_pct: f64,

    /// Largest acceptable |raw value| of a signal
    #[serde(default = "default_max_signal_raw_value")]
    pub max_signal_raw_value: f64,

    #[serde(default = "default_min_signal_confidence")]
    pub min_signal_confidence: f64,

    #[serde(default)]
    pub risk_boundaries: RiskBoundaryConfig,

    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Audit entries kept before the oldest are evicted
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            required_symbols: default_required_symbols(),
            min_data_points: default_min_data_points(),
            max_data_age_hours: default_max_data_age_hours(),
            max_missing_data_pct: default_max_missing_data_pct(),
            price_ranges: default_price_ranges(),
            max_daily_change_pct: default_max_daily_change_pct(),
            max_signal_raw_value: default_max_signal_raw_value(),
            min_signal_confidence: default_min_signal_confidence(),
            risk_boundaries: RiskBoundaryConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            rate_limit: RateLimitConfig::default(),
            audit_capacity: default_audit_capacity(),
        }
    }
}

fn default_required_symbols() -> Vec<String> {
    REQUIRED_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_min_data_points() -> usize {
    21
}

fn default_max_data_age_hours() -> i64 {
    24
}

fn default_max_missing_data_pct() -> f64 {
    5.0
}

fn default_max_daily_change_pct() -> f64 {
    25.0
}

fn default_max_signal_raw_value() -> f64 {
    5.0
}

fn default_min_signal_confidence() -> f64 {
    0.05
}

fn default_audit_capacity() -> usize {
    1000
}

fn default_price_ranges() -> HashMap<String, PriceRange> {
    [
        (SPY, 50.0, 1000.0),
        (XLU, 20.0, 200.0),
        (WOOD, 10.0, 500.0),
        (GLD, 50.0, 500.0),
        (IEF, 50.0, 200.0),
        (TLT, 50.0, 300.0),
        (VIX, 5.0, 100.0),
    ]
    .into_iter()
    .map(|(symbol, min, max)| (symbol.to_string(), PriceRange { min, max }))
    .collect()
}

/// Inclusive price bounds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }
}

/// Thresholds for the risk-boundary layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBoundaryConfig {
    /// VIX above this is a critical finding
    #[serde(default = "default_vix_critical_level")]
    pub vix_critical_level: f64,

    /// VIX below this warns about complacency
    #[serde(default = "default_vix_complacency_level")]
    pub vix_complacency_level: f64,

    /// Consensus confidence that needs strong evidence behind it
    #[serde(default = "default_high_confidence")]
    pub high_confidence: f64,

    #[serde(default = "default_min_strong_signals")]
    pub min_strong_signals: usize,

    /// Largest share of signals one methodology may contribute
    #[serde(default = "default_max_category_share")]
    pub max_category_share: f64,

    /// Used for the SPY risk snapshot
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
}

impl Default for RiskBoundaryConfig {
    fn default() -> Self {
        Self {
            vix_critical_level: default_vix_critical_level(),
            vix_complacency_level: default_vix_complacency_level(),
            high_confidence: default_high_confidence(),
            min_strong_signals: default_min_strong_signals(),
            max_category_share: default_max_category_share(),
            risk_free_rate: default_risk_free_rate(),
        }
    }
}

fn default_vix_critical_level() -> f64 {
    50.0
}

fn default_vix_complacency_level() -> f64 {
    10.0
}

fn default_high_confidence() -> f64 {
    0.8
}

fn default_min_strong_signals() -> usize {
    2
}

fn default_max_category_share() -> f64 {
    0.8
}

fn default_risk_free_rate() -> f64 {
    0.05
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failed validations before the breaker opens
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: i64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown_seconds() -> i64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_per_minute")]
    pub max_per_minute: u32,

    #[serde(default = "default_max_per_hour")]
    pub max_per_hour: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_per_minute: default_max_per_minute(),
            max_per_hour: default_max_per_hour(),
        }
    }
}

fn default_max_per_minute() -> u32 {
    100
}

fn default_max_per_hour() -> u32 {
    1000
}

/// Everything the `regime-check` binary can be configured with
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegimeConfig {
    #[serde(default)]
    pub validation: ValidationConfig,

    #[serde(default)]
    pub signals: OrchestratorConfig,

    #[serde(default)]
    pub production: ProductionConfig,
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> anyhow::Result<RegimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path))?;
    let config: RegimeConfig =
        toml::from_str(&content).with_context(|| format!("parsing config file {}", path))?;
    Ok(config)
}

/// Save configuration to TOML file
pub fn save_config(config: &RegimeConfig, path: &str) -> anyhow::Result<()> {
    let content = toml::to_string_pretty(config).context("serializing config")?;
    std::fs::write(path, content).with_context(|| format!("writing config file {}", path))?;
    Ok(())
}

/// Defaults, then the optional TOML file, then `REGIME__SECTION__KEY` variables
pub fn load_layered_config(path: Option<&str>) -> anyhow::Result<RegimeConfig> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::new(path, config::FileFormat::Toml));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix("REGIME")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("loading layered config from {}", path.unwrap_or("defaults")))?;
    let mut config: RegimeConfig = settings
        .try_deserialize()
        .context("deserializing layered config")?;

    // Keys may come back lowercased from the layered loader
    let validation = &mut config.validation;
    validation.price_ranges = validation
        .price_ranges
        .drain()
        .map(|(symbol, range)| (symbol.to_uppercase(), range))
        .collect();
    for symbol in &mut validation.required_symbols {
        *symbol = symbol.to_uppercase();
    }
    Ok(config)
}

/// Create a default configuration file template
pub fn create_config_template(path: &str) -> anyhow::Result<()> {
    let template = "# Regime Signal Safety Configuration
# Every key is optional; missing keys take the defaults shown here

[validation]
# Minimum points per series before a warning
min_data_points = 21

# Latest point older than this (hours) is stale
max_data_age_hours = 24

# Percentage of invalid points tolerated per series
max_missing_data_pct = 5.0

# Day-over-day move (percent) flagged as a possible split or bad tick
max_daily_change_pct = 25.0

# Largest acceptable |raw value| of a signal
max_signal_raw_value = 5.0

# Signals below this confidence draw a warning
min_signal_confidence = 0.05

# Audit entries kept in memory
audit_capacity = 1000

# Plausible close range per symbol
[validation.price_ranges.SPY]
min = 50.0
max = 1000.0

[validation.price_ranges.XLU]
min = 20.0
max = 200.0

[validation.price_ranges.WOOD]
min = 10.0
max = 500.0

[validation.price_ranges.GLD]
min = 50.0
max = 500.0

[validation.price_ranges.IEF]
min = 50.0
max = 200.0

[validation.price_ranges.TLT]
min = 50.0
max = 300.0

[validation.price_ranges.\"^VIX\"]
min = 5.0
max = 100.0

[validation.risk_boundaries]
vix_critical_level = 50.0
vix_complacency_level = 10.0
high_confidence = 0.8
min_strong_signals = 2
max_category_share = 0.8
risk_free_rate = 0.05

[validation.circuit_breaker]
# Consecutive failed validations before the breaker opens
failure_threshold = 3

# Cooldown after the breaker opens (seconds)
cooldown_seconds = 300

[validation.rate_limit]
max_per_minute = 100
max_per_hour = 1000

[signals.utilities_spy]
lookback = 21

[signals.lumber_gold]
lookback = 91

[signals.treasury_curve]
lookback = 21

[signals.vix_defensive]
threshold = 12.5

[signals.moving_average]
short = 50
long = 200
crossover_offset = 5

[production]
max_retries = 3
attempt_timeout_ms = 30000
enable_fallbacks = true
safety_mode = true

[production.backoff]
strategy = \"exponential\"
base_ms = 100
factor = 2.0
max_ms = 2000
jitter = true
";

    std::fs::write(path, template)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ValidationConfig::default();
        assert_eq!(config.min_data_points, 21);
        assert_eq!(config.required_symbols.len(), 7);
        assert_eq!(config.price_ranges[SPY], PriceRange { min: 50.0, max: 1000.0 });
        assert_eq!(config.price_ranges[VIX], PriceRange { min: 5.0, max: 100.0 });
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.rate_limit.max_per_minute, 100);
    }

    #[test]
    fn test_config_serialization() {
        let config = RegimeConfig::default();
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: RegimeConfig = toml::from_str(&serialized).unwrap();

        assert_eq!(
            config.validation.max_daily_change_pct,
            deserialized.validation.max_daily_change_pct
        );
        assert_eq!(deserialized.production.max_retries, 3);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RegimeConfig = toml::from_str(
            "[validation.circuit_breaker]\nfailure_threshold = 5\n\n[signals.vix_defensive]\nthreshold = 14.0\n",
        )
        .unwrap();

        assert_eq!(config.validation.circuit_breaker.failure_threshold, 5);
        assert_eq!(config.validation.circuit_breaker.cooldown_seconds, 300);
        assert_eq!(config.signals.vix_defensive.threshold, 14.0);
        assert_eq!(config.validation.price_ranges.len(), 7);
    }

    #[test]
    fn test_template_parses() {
        let path = std::env::temp_dir().join(format!("regime-template-{}.toml", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        create_config_template(&path).unwrap();
        let config = load_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.validation.max_signal_raw_value, 5.0);
        assert_eq!(config.signals.moving_average.long, 200);
        assert_eq!(config.production.attempt_timeout_ms, 30_000);
        assert_eq!(config.validation.price_ranges.len(), 7);
    }

    #[test]
    fn test_layered_config_reads_file() {
        let path = std::env::temp_dir().join(format!("regime-layered-{}.toml", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();
        std::fs::write(
            &path,
            "[validation]\nmin_data_points = 30\n\n[validation.price_ranges.SPY]\nmin = 100.0\nmax = 900.0\n",
        )
        .unwrap();

        let config = load_layered_config(Some(&path)).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.validation.min_data_points, 30);
        assert_eq!(config.validation.price_ranges[SPY], PriceRange { min: 100.0, max: 900.0 });
        assert_eq!(config.signals.utilities_spy.lookback, 21);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let path = std::env::temp_dir().join(format!("regime-missing-{}.toml", uuid::Uuid::new_v4()));
        let path = path.to_string_lossy().to_string();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains(&path));

        let err = load_layered_config(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains(&path));
    }
}
