//! Data source abstraction over the lending backend: pool registry, LP balances,
//! redemption previews, early exit fees and LP price history.

use crate::domain::{Address, Decimal, Pool, PricePoint};
use async_trait::async_trait;
use std::fmt;

pub mod http;
pub mod mock;

pub use http::LendingApiDataSource;
pub use mock::MockDataSource;

/// Data source trait for the lending backend.
///
/// Implementations own their retry/backoff and timeout policy; callers treat
/// every error as final for that call.
#[async_trait]
pub trait LendingDataSource: Send + Sync + fmt::Debug {
    /// Fetch the active pools in registry order.
    async fn get_pools(&self) -> Result<Vec<Pool>, DataSourceError>;

    /// Fetch the LP share balance `wallet` holds in the pool at `pool`.
    async fn get_user_lp_balance(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError>;

    /// Quote the USD amount redeemable for `balance` LP shares of `pool`.
    async fn preview_redeem(
        &self,
        balance: Decimal,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError>;

    /// Fetch the early exit fee of `pool`, in percent.
    async fn get_pool_early_exit_fee(&self, pool: &Address) -> Result<Decimal, DataSourceError>;

    /// Fetch the LP token price series of `pool`, oldest first.
    async fn get_lp_price_history(
        &self,
        pool: &Address,
    ) -> Result<Vec<PricePoint>, DataSourceError>;
}

/// Error type for data source operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSourceError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error (e.g., 404 unknown pool, 5xx server error)
    HttpError { status: u16, message: String },
    /// Parsing error (invalid JSON or malformed response)
    ParseError(String),
    /// Rate limit exceeded
    RateLimited,
    Other(String),
}

impl fmt::Display for DataSourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            DataSourceError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            DataSourceError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            DataSourceError::RateLimited => write!(f, "Rate limited"),
            DataSourceError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for DataSourceError {}
