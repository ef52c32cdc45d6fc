use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{MarketData, MarketDataSource};
use safety_validation::{load_layered_config, ProductionPipeline, SaflaValidator};
use signal_generation::SignalOrchestrator;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::fmt;

/// Market data stored as `{ "SPY": [PricePoint, ...], ... }`
struct JsonFileSource {
    path: String,
}

#[async_trait]
impl MarketDataSource for JsonFileSource {
    async fn fetch(&self, symbols: &[&str]) -> Result<MarketData> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading market data from {}", self.path))?;
        let mut data: MarketData = serde_json::from_str(&content)
            .with_context(|| format!("parsing market data in {}", self.path))?;
        data.retain(|symbol, _| symbols.contains(&symbol.as_str()));
        Ok(data)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let level = if std::env::var_os("REGIME_DEBUG").is_some() {
        Level::DEBUG
    } else {
        Level::INFO
    };
    fmt().with_max_level(level).with_writer(std::io::stderr).init();

    let mut args = std::env::args().skip(1);
    let data_path = match args.next() {
        Some(path) => path,
        None => anyhow::bail!("usage: regime-check <market-data.json> [config.toml]"),
    };
    let config_path = args.next();

    let config = load_layered_config(config_path.as_deref())?;
    info!("Regime check for {}", data_path);

    let validator = Arc::new(SaflaValidator::new(config.validation));
    let pipeline = ProductionPipeline::new(
        SignalOrchestrator::new(&config.signals),
        validator,
        config.production,
    );

    let source = JsonFileSource { path: data_path };
    let result = pipeline.run_from_source(&source).await?;

    info!(
        "Consensus {} ({:.2}), safety {} with risk score {}",
        result.consensus.direction,
        result.consensus.confidence,
        result.safety_report.overall_status,
        result.safety_report.risk_score
    );
    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
