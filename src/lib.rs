pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod datasource;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod session;

pub use cache::{Cache, CacheStore, MemoryCacheStore, SqliteCacheStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use datasource::{DataSourceError, LendingApiDataSource, LendingDataSource, MockDataSource};
pub use db::{init_db, Repository};
pub use domain::{
    Address, Decimal, Pool, PoolId, PoolPosition, PoolStatus, PortfolioSnapshot, TimeMs, TxId,
    UserPosition, UserPositionData,
};
pub use error::AppError;
pub use orchestration::{FeeResolver, PositionAggregator, PositionCache};
pub use session::WalletSession;
