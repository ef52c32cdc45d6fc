//! The five validation layers, each a pure function returning findings

pub mod calculation;
pub mod data_integrity;
pub mod market_data;
pub mod risk_boundary;
pub mod signal_logic;
