//! Production pipeline: calculate, validate, retry with backoff, fall back

use crate::error::PipelineError;
use crate::fallback::{emergency_report, safe_defaults};
use crate::report::SafetyReport;
use crate::validator::SaflaValidator;
use chrono::{DateTime, Utc};
use common::{
    valid_closes, ConsensusSignal, MarketData, MarketDataSource, PricePoint, SignalOutcome, SPY,
};
use risk_metrics::RiskSnapshot;
use serde::{Deserialize, Serialize};
use signal_generation::SignalOrchestrator;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Delay between pipeline attempts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Backoff {
    Fixed {
        delay_ms: u64,
    },
    /// `base_ms * factor ^ attempt`, capped at `max_ms`, optionally jittered by +/- 50%
    Exponential {
        base_ms: u64,
        factor: f64,
        max_ms: u64,
        jitter: bool,
    },
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            base_ms: 100,
            factor: 2.0,
            max_ms: 2000,
            jitter: true,
        }
    }
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based)
    pub fn delay(self, attempt: u32) -> Duration {
        match self {
            Self::Fixed { delay_ms } => Duration::from_millis(delay_ms),
            Self::Exponential {
                base_ms,
                factor,
                max_ms,
                jitter,
            } => {
                let scaled = base_ms as f64 * factor.powi(attempt as i32);
                let capped = scaled.min(max_ms as f64).max(0.0) as u64;
                if !jitter {
                    return Duration::from_millis(capped);
                }

                let spread = capped / 2;
                let offset = fastrand::u64(0..=spread * 2);
                Duration::from_millis(capped - spread + offset)
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionConfig {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub backoff: Backoff,

    /// Budget for the calculation step of one attempt
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    /// Return safe defaults instead of an error once retries are exhausted
    #[serde(default = "default_true")]
    pub enable_fallbacks: bool,

    /// Replace signals judged unsafe with safe defaults
    #[serde(default = "default_true")]
    pub safety_mode: bool,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            backoff: Backoff::default(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            enable_fallbacks: true,
            safety_mode: true,
        }
    }
}

impl ProductionConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_attempt_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

/// Coverage, validity and freshness of one market snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataQuality {
    /// Share of required symbols with a non-empty series
    pub symbol_coverage: f64,
    /// Share of all supplied points that are usable
    pub point_validity: f64,
    /// Age of the newest dated point across all symbols
    pub freshness_hours: Option<f64>,
}

impl DataQuality {
    pub fn assess(data: &MarketData, required_symbols: &[String], now: DateTime<Utc>) -> Self {
        let covered = required_symbols
            .iter()
            .filter(|symbol| data.get(symbol.as_str()).map_or(false, |s| !s.is_empty()))
            .count();
        let symbol_coverage = if required_symbols.is_empty() {
            1.0
        } else {
            covered as f64 / required_symbols.len() as f64
        };

        let points: Vec<&PricePoint> = data.values().flatten().collect();
        let point_validity = if points.is_empty() {
            0.0
        } else {
            points.iter().filter(|p| p.is_valid()).count() as f64 / points.len() as f64
        };

        let freshness_hours = points
            .iter()
            .filter_map(|p| p.timestamp())
            .max()
            .map(|latest| (now - latest).num_minutes() as f64 / 60.0);

        Self {
            symbol_coverage,
            point_validity,
            freshness_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineMetadata {
    pub retry_count: u32,
    pub processing_time_ms: u64,
    pub data_quality: DataQuality,
    /// Signals and consensus were replaced by safe defaults
    pub used_fallback: bool,
    /// SPY risk profile of the input data
    pub risk_snapshot: Option<RiskSnapshot>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub signals: Vec<SignalOutcome>,
    pub consensus: ConsensusSignal,
    pub safety_report: SafetyReport,
    pub metadata: PipelineMetadata,
}

pub struct ProductionPipeline {
    orchestrator: Arc<SignalOrchestrator>,
    validator: Arc<SaflaValidator>,
    config: ProductionConfig,
}

impl ProductionPipeline {
    pub fn new(
        orchestrator: SignalOrchestrator,
        validator: Arc<SaflaValidator>,
        config: ProductionConfig,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            validator,
            config,
        }
    }

    pub fn validator(&self) -> &Arc<SaflaValidator> {
        &self.validator
    }

    pub fn config(&self) -> &ProductionConfig {
        &self.config
    }

    /// Fetch the required symbols from `source`, then [`run`](Self::run)
    pub async fn run_from_source(
        &self,
        source: &dyn MarketDataSource,
    ) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let symbols = self.orchestrator.required_symbols();
        let symbols = symbols.as_slice();

        let (fetched, retries) = self
            .retry("market data fetch", move || async move {
                source.fetch(symbols).await.map_err(PipelineError::Source)
            })
            .await;

        match fetched {
            Ok(data) => self.run(data).await,
            Err(err) => self.fallback_or_error(err, retries, started, &MarketData::new()),
        }
    }

    /// Calculate and validate `data`, retrying failed attempts with backoff
    pub async fn run(&self, data: MarketData) -> Result<PipelineResult, PipelineError> {
        let started = Instant::now();
        let data = Arc::new(data);
        let input = &data;

        let (attempt, retries) = self
            .retry("signal pipeline", move || self.attempt(input))
            .await;

        let (signals, consensus, safety_report) = match attempt {
            Ok(result) => result,
            Err(err) => return self.fallback_or_error(err, retries, started, &data),
        };

        let used_fallback = !safety_report.is_safe() && self.config.safety_mode;
        let (signals, consensus) = if used_fallback {
            warn!(
                risk_score = safety_report.risk_score,
                "Signals failed safety validation, returning safe defaults"
            );
            let defaults = safe_defaults(&self.validator.config().required_symbols);
            (defaults.signals, defaults.consensus)
        } else {
            (signals, consensus)
        };

        info!(
            consensus = %consensus.direction,
            confidence = consensus.confidence,
            status = %safety_report.overall_status,
            retries,
            "Pipeline finished"
        );

        Ok(PipelineResult {
            signals,
            consensus,
            safety_report,
            metadata: self.metadata(&data, retries, started, used_fallback),
        })
    }

    async fn attempt(
        &self,
        data: &Arc<MarketData>,
    ) -> Result<(Vec<SignalOutcome>, ConsensusSignal, SafetyReport), PipelineError> {
        let orchestrator = Arc::clone(&self.orchestrator);
        let input = Arc::clone(data);
        let task = tokio::task::spawn_blocking(move || {
            let outcomes = orchestrator.calculate_all_signals(&input);
            let consensus = orchestrator.calculate_consensus_signal(&outcomes);
            (outcomes, consensus)
        });

        let timeout = self.config.attempt_timeout();
        let (outcomes, consensus) = match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_error)) => return Err(PipelineError::Calculation(join_error.to_string())),
            Err(_) => return Err(PipelineError::Timeout { after: timeout }),
        };

        let report = self.validator.validate_comprehensive(data, &outcomes, &consensus)?;
        Ok((outcomes, consensus, report))
    }

    /// Run `op` until it succeeds, fails for good, or retries run out.
    /// Returns the last result and the number of retries made.
    async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> (Result<T, PipelineError>, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Ok(value) => return (Ok(value), retries),
                Err(err) if !err.is_retryable() => {
                    warn!(error = %err, "{} rejected by safety guard", what);
                    return (Err(err), retries);
                }
                Err(err) if retries < self.config.max_retries => {
                    let delay = self.config.backoff.delay(retries);
                    warn!(
                        attempt = retries + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "{} failed, retrying",
                        what
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
                Err(err) => {
                    error!(retries, error = %err, "{} failed after all retries", what);
                    return (Err(err), retries);
                }
            }
        }
    }

    /// Safe defaults with an emergency report, unless fallbacks are off or
    /// the failure came from a safety guard
    fn fallback_or_error(
        &self,
        err: PipelineError,
        retries: u32,
        started: Instant,
        data: &MarketData,
    ) -> Result<PipelineResult, PipelineError> {
        if !self.config.enable_fallbacks || !err.is_retryable() {
            return Err(err);
        }

        error!(error = %err, "Pipeline failed - returning emergency safe defaults");
        let defaults = safe_defaults(&self.validator.config().required_symbols);
        let report = emergency_report(&err.to_string(), self.validator.circuit_breaker_status());

        Ok(PipelineResult {
            signals: defaults.signals,
            consensus: defaults.consensus,
            safety_report: report,
            metadata: self.metadata(data, retries, started, true),
        })
    }

    fn metadata(
        &self,
        data: &MarketData,
        retry_count: u32,
        started: Instant,
        used_fallback: bool,
    ) -> PipelineMetadata {
        let validation = self.validator.config();
        let spy_closes = data.get(SPY).map(|s| valid_closes(s)).unwrap_or_default();

        PipelineMetadata {
            retry_count,
            processing_time_ms: started.elapsed().as_millis() as u64,
            data_quality: DataQuality::assess(data, &validation.required_symbols, self.validator.now()),
            used_fallback,
            risk_snapshot: RiskSnapshot::from_closes(
                &spy_closes,
                validation.risk_boundaries.risk_free_rate,
            ),
        }
    }
}
