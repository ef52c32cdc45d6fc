//! Shared domain types for the risk regime engine.
//!
//! Price data flows in as [`MarketData`], calculators turn it into
//! [`SignalOutcome`]s and the consensus step folds the available signals
//! into a [`ConsensusSignal`].

pub mod consensus;
pub mod market;
pub mod signal;

pub use consensus::{ConsensusDirection, ConsensusSignal};
pub use market::{
    latest_valid_close, valid_closes, MarketData, MarketDataSource, PricePoint, PriceSeries,
    GLD, IEF, REQUIRED_SYMBOLS, SPY, TLT, VIX, WOOD, XLU,
};
pub use signal::{
    Crossover, LumberGoldDiagnostics, MethodologyCategory, MovingAverageDiagnostics, Signal,
    SignalDiagnostics, SignalDirection, SignalOutcome, SignalStrength, SignalType, Trend,
    TreasuryCurveDiagnostics, UnavailableReason, UtilitiesSpyDiagnostics, VixDefensiveDiagnostics,
};
