//! Domain types for the lending portfolio.
//!
//! This module provides:
//! - Lossless amount handling via the Decimal wrapper
//! - Primitives: TimeMs, Address, PoolId, TxId
//! - Pool registry entries and pool lifecycle status
//! - Per-pool positions and the aggregated portfolio snapshot

pub mod decimal;
pub mod pool;
pub mod position;
pub mod primitives;

pub use decimal::{ArithmeticError, Decimal};
pub use pool::{Pool, PoolStatus, PricePoint};
pub use position::{PoolPosition, PortfolioSnapshot, UserPosition, UserPositionData};
pub use primitives::{Address, AddressParseError, PoolId, TimeMs, TxId};
