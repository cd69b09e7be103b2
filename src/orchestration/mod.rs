//! Stateful coordination over the lending data source: portfolio aggregation,
//! cache-first position reads and fee resolution.

pub mod aggregator;
pub mod fees;
pub mod position_cache;

pub use aggregator::{
    AggregatorError, OptimisticOutcome, PortfolioView, PositionAggregator, PORTFOLIO_LOAD_ERROR,
};
pub use fees::{FeeResolver, QuoteError};
pub use position_cache::{CacheSettings, PositionCache, POSITION_LOAD_ERROR};
