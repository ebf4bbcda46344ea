//! Option contracts and the per-option valuation engine.

pub mod american;
pub mod vanilla;

pub use american::{AmericanOption, EngineConfig, GreeksReport};
pub use vanilla::OptionContract;
