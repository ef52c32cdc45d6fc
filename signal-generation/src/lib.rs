// Regime Signal Generation
// Calculators, consensus aggregation and the orchestrator that runs them

pub mod consensus;
pub mod orchestrator;
pub mod signals;

pub use consensus::{calculate_consensus, consensus_from_signals};
pub use orchestrator::{OrchestratorConfig, SignalOrchestrator, FAST_SIGNALS};
pub use signals::{
    calculate_lumber_gold, calculate_moving_average, calculate_treasury_curve,
    calculate_utilities_spy, calculate_vix_defensive, LumberGoldCalculator, LumberGoldParams,
    MovingAverageCalculator, MovingAverageParams, SignalCalculator, TreasuryCurveCalculator,
    TreasuryCurveParams, UtilitiesSpyCalculator, UtilitiesSpyParams, VixDefensiveCalculator,
    VixDefensiveParams, MIN_CONFIDENCE,
};
