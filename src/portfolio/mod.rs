//! Position aggregation, hedge analytics and scenario sweeps.

pub mod aggregator;
pub mod position;
pub mod scenario;

pub use aggregator::{Portfolio, PortfolioSummary};
pub use position::{
    DEFAULT_LABEL, DEFAULT_MULTIPLIER, Position, PositionRecord, PositionRow, PositionSpec,
    PositionUpdate,
};
pub use scenario::{MarketShock, ScenarioPoint};
