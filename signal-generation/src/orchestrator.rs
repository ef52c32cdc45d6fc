// Signal Orchestrator
// Runs every registered calculator over one market snapshot

use super::consensus::calculate_consensus;
use super::signals::{
    LumberGoldCalculator, LumberGoldParams, MovingAverageCalculator, MovingAverageParams,
    SignalCalculator, TreasuryCurveCalculator, TreasuryCurveParams, UtilitiesSpyCalculator,
    UtilitiesSpyParams, VixDefensiveCalculator, VixDefensiveParams,
};
use common::{ConsensusSignal, MarketData, SignalOutcome, SignalType, UnavailableReason};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Calculators cheap and decisive enough for latency-sensitive callers
pub const FAST_SIGNALS: [SignalType; 2] = [SignalType::UtilitiesSpy, SignalType::VixDefensive];

/// Per-calculator parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub utilities_spy: UtilitiesSpyParams,
    pub lumber_gold: LumberGoldParams,
    pub treasury_curve: TreasuryCurveParams,
    pub vix_defensive: VixDefensiveParams,
    pub moving_average: MovingAverageParams,
}

pub struct SignalOrchestrator {
    calculators: Vec<Box<dyn SignalCalculator>>,
}

impl SignalOrchestrator {
    /// Orchestrator with the five standard calculators
    pub fn new(config: &OrchestratorConfig) -> Self {
        Self::empty()
            .add_calculator(Box::new(UtilitiesSpyCalculator::new(config.utilities_spy.clone())))
            .add_calculator(Box::new(LumberGoldCalculator::new(config.lumber_gold.clone())))
            .add_calculator(Box::new(TreasuryCurveCalculator::new(config.treasury_curve.clone())))
            .add_calculator(Box::new(VixDefensiveCalculator::new(config.vix_defensive.clone())))
            .add_calculator(Box::new(MovingAverageCalculator::new(config.moving_average.clone())))
    }

    pub fn empty() -> Self {
        Self {
            calculators: Vec::new(),
        }
    }

    pub fn add_calculator(mut self, calculator: Box<dyn SignalCalculator>) -> Self {
        debug!("Adding signal calculator: {}", calculator.signal_type());
        self.calculators.push(calculator);
        self
    }

    /// Every symbol any calculator reads, in first-use order
    pub fn required_symbols(&self) -> Vec<&'static str> {
        let mut symbols: Vec<&'static str> = Vec::new();
        for symbol in self.calculators.iter().flat_map(|c| c.required_symbols()) {
            if !symbols.contains(symbol) {
                symbols.push(*symbol);
            }
        }
        symbols
    }

    /// One outcome per calculator, in registration order.
    ///
    /// A calculator error or panic degrades that signal to `Unavailable`
    /// instead of failing the batch.
    pub fn calculate_all_signals(&self, data: &MarketData) -> Vec<SignalOutcome> {
        self.run(data, |_| true)
    }

    /// Only the calculators in [`FAST_SIGNALS`]
    pub fn calculate_fast_signals(&self, data: &MarketData) -> Vec<SignalOutcome> {
        self.run(data, |c| FAST_SIGNALS.contains(&c.signal_type()))
    }

    pub fn calculate_consensus_signal(&self, outcomes: &[SignalOutcome]) -> ConsensusSignal {
        calculate_consensus(outcomes)
    }

    pub fn calculator_count(&self) -> usize {
        self.calculators.len()
    }

    fn run<F>(&self, data: &MarketData, include: F) -> Vec<SignalOutcome>
    where
        F: Fn(&dyn SignalCalculator) -> bool,
    {
        let outcomes: Vec<SignalOutcome> = self
            .calculators
            .iter()
            .filter(|calculator| include(&***calculator))
            .map(|calculator| match calculate_isolated(&**calculator, data) {
                Ok(outcome) => {
                    if let SignalOutcome::Unavailable(reason) = &outcome {
                        debug!("No signal from {}: {}", calculator.signal_type(), reason);
                    }
                    outcome
                }
                Err(e) => {
                    warn!("Error calculating {} signal: {:#}", calculator.signal_type(), e);
                    SignalOutcome::Unavailable(UnavailableReason::CalculatorFailed {
                        message: e.to_string(),
                    })
                }
            })
            .collect();

        let available = outcomes.iter().filter(|o| o.is_available()).count();
        info!("Calculated {} of {} signals", available, outcomes.len());
        outcomes
    }
}

/// Run one calculator, turning a panic into an error
fn calculate_isolated(
    calculator: &dyn SignalCalculator,
    data: &MarketData,
) -> anyhow::Result<SignalOutcome> {
    panic::catch_unwind(AssertUnwindSafe(|| calculator.calculate(data))).unwrap_or_else(|payload| {
        Err(anyhow::anyhow!("calculator panicked: {}", panic_message(&*payload)))
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

impl Default for SignalOrchestrator {
    fn default() -> Self {
        Self::new(&OrchestratorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::test_support::{compounding, linear, series};
    use common::{REQUIRED_SYMBOLS, GLD, IEF, SPY, TLT, VIX, WOOD, XLU};

    struct BrokenCalculator;

    impl SignalCalculator for BrokenCalculator {
        fn signal_type(&self) -> SignalType {
            SignalType::LumberGold
        }

        fn required_symbols(&self) -> &'static [&'static str] {
            &[WOOD]
        }

        fn calculate(&self, _data: &MarketData) -> anyhow::Result<SignalOutcome> {
            anyhow::bail!("feed exploded")
        }
    }

    struct PanickingCalculator;

    impl SignalCalculator for PanickingCalculator {
        fn signal_type(&self) -> SignalType {
            SignalType::TreasuryCurve
        }

        fn required_symbols(&self) -> &'static [&'static str] {
            &[IEF, TLT]
        }

        fn calculate(&self, _data: &MarketData) -> anyhow::Result<SignalOutcome> {
            panic!("curve index out of bounds");
        }
    }

    fn market_data() -> MarketData {
        let mut data = MarketData::new();
        data.insert(SPY.into(), series(SPY, &compounding(400.0, 0.002, 220)));
        data.insert(XLU.into(), series(XLU, &[70.0; 220]));
        data.insert(WOOD.into(), series(WOOD, &linear(50.0, 60.0, 220)));
        data.insert(GLD.into(), series(GLD, &[180.0; 220]));
        data.insert(IEF.into(), series(IEF, &[95.0; 220]));
        data.insert(TLT.into(), series(TLT, &[90.0; 220]));
        data.insert(VIX.into(), series(VIX, &[18.0; 220]));
        data
    }

    #[test]
    fn test_required_symbols_cover_all_inputs() {
        let orchestrator = SignalOrchestrator::default();
        let mut symbols = orchestrator.required_symbols();
        symbols.sort();
        let mut expected = REQUIRED_SYMBOLS.to_vec();
        expected.sort();
        assert_eq!(symbols, expected);
        assert_eq!(orchestrator.calculator_count(), 5);
    }

    #[test]
    fn test_all_signals_with_full_data() {
        let orchestrator = SignalOrchestrator::default();
        let outcomes = orchestrator.calculate_all_signals(&market_data());

        assert_eq!(outcomes.len(), 5);
        assert!(outcomes.iter().all(SignalOutcome::is_available));

        let consensus = orchestrator.calculate_consensus_signal(&outcomes);
        assert_eq!(consensus.signal_count(), 5);
        assert_eq!(
            consensus.risk_on_count + consensus.risk_off_count + consensus.neutral_count,
            5
        );
    }

    #[test]
    fn test_missing_symbol_only_affects_its_signal() {
        let mut data = market_data();
        data.remove(GLD);

        let outcomes = SignalOrchestrator::default().calculate_all_signals(&data);
        assert_eq!(outcomes.len(), 5);
        assert!(!outcomes[1].is_available());
        assert_eq!(outcomes.iter().filter(|o| o.is_available()).count(), 4);
    }

    #[test]
    fn test_calculator_error_is_absorbed() {
        let orchestrator = SignalOrchestrator::empty()
            .add_calculator(Box::new(UtilitiesSpyCalculator::default()))
            .add_calculator(Box::new(BrokenCalculator));

        let outcomes = orchestrator.calculate_all_signals(&market_data());
        assert!(outcomes[0].is_available());
        assert!(matches!(
            &outcomes[1],
            SignalOutcome::Unavailable(UnavailableReason::CalculatorFailed { message }) if message == "feed exploded"
        ));
    }

    #[test]
    fn test_calculator_panic_is_absorbed() {
        let orchestrator = SignalOrchestrator::empty()
            .add_calculator(Box::new(PanickingCalculator))
            .add_calculator(Box::new(UtilitiesSpyCalculator::default()));

        let outcomes = orchestrator.calculate_all_signals(&market_data());
        assert_eq!(outcomes.len(), 2);
        assert!(matches!(
            &outcomes[0],
            SignalOutcome::Unavailable(UnavailableReason::CalculatorFailed { message })
                if message == "calculator panicked: curve index out of bounds"
        ));
        assert_eq!(outcomes[1].signal().map(|s| s.signal_type), Some(SignalType::UtilitiesSpy));
    }

    #[test]
    fn test_fast_signals() {
        let outcomes = SignalOrchestrator::default().calculate_fast_signals(&market_data());
        let types: Vec<SignalType> = outcomes
            .iter()
            .filter_map(|o| o.signal().map(|s| s.signal_type))
            .collect();
        assert_eq!(types, FAST_SIGNALS.to_vec());
    }

    #[test]
    fn test_config_fills_missing_fields() {
        let config: OrchestratorConfig =
            serde_json::from_str(r#"{"vix_defensive": {"threshold": 15.0}}"#).unwrap();
        assert_eq!(config.vix_defensive.threshold, 15.0);
        assert_eq!(config.moving_average.long, 200);
        assert_eq!(config.lumber_gold.lookback, 91);
    }
}
