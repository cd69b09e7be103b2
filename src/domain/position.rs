//! Wallet holdings: per-pool positions and the aggregated portfolio.

use crate::domain::{Address, ArithmeticError, Decimal, Pool, PoolId, PoolStatus};
use serde::{Deserialize, Serialize};

/// A wallet's holding in one pool, keyed by (wallet, pool contract address).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolPosition {
    pub pool_id: PoolId,
    pub pool_name: String,
    pub wallet: Address,
    pub contract_address: Address,
    /// LP share units owned by the wallet.
    pub balance: Decimal,
    /// USD value redeemable for `balance`.
    pub current_value: Decimal,
    pub status: PoolStatus,
    pub apy: Decimal,
}

impl PoolPosition {
    pub fn from_pool(pool: &Pool, wallet: &Address, balance: Decimal, current_value: Decimal) -> Self {
        Self {
            pool_id: pool.id.clone(),
            pool_name: pool.name.clone(),
            wallet: wallet.clone(),
            contract_address: pool.contract_address.clone(),
            balance,
            current_value,
            status: pool.status,
            apy: pool.apy,
        }
    }
}

/// Positions in pool-registry order plus their summed value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub positions: Vec<PoolPosition>,
    pub total_value: Decimal,
}

impl PortfolioSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a position. On overflow of `total_value` the snapshot is unchanged.
    pub fn push(&mut self, position: PoolPosition) -> Result<(), ArithmeticError> {
        self.total_value = self.total_value.checked_add(position.current_value)?;
        self.positions.push(position);
        Ok(())
    }

    pub fn has_positions(&self) -> bool {
        !self.positions.is_empty()
    }

    pub fn position(&self, pool_id: &PoolId) -> Option<&PoolPosition> {
        self.positions.iter().find(|p| &p.pool_id == pool_id)
    }

    pub(crate) fn position_mut(&mut self, pool_id: &PoolId) -> Option<&mut PoolPosition> {
        self.positions.iter_mut().find(|p| &p.pool_id == pool_id)
    }
}

/// The cacheable part of a single-pool position lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPosition {
    pub balance: Decimal,
    pub current_value: Decimal,
}

/// State of a single-pool position lookup as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<UserPosition>,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UserPositionData {
    pub fn ready(position: UserPosition) -> Self {
        Self {
            position: Some(position),
            loading: false,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            position: None,
            loading: false,
            error: Some(message.into()),
        }
    }
}
