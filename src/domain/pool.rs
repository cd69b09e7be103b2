//! Lending pool as reported by the pool registry.

use crate::domain::{Address, Decimal, PoolId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifecycle phase of a pool. Withdrawals during warm-up pay the early exit fee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PoolStatus {
    WarmUp,
    Active,
    Cooldown,
    Withdrawal,
}

impl PoolStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolStatus::WarmUp => "warm-up",
            PoolStatus::Active => "active",
            PoolStatus::Cooldown => "cooldown",
            PoolStatus::Withdrawal => "withdrawal",
        }
    }
}

impl FromStr for PoolStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warm-up" | "warmup" | "warm_up" => Ok(PoolStatus::WarmUp),
            "active" => Ok(PoolStatus::Active),
            "cooldown" | "cool-down" => Ok(PoolStatus::Cooldown),
            "withdrawal" => Ok(PoolStatus::Withdrawal),
            other => Err(format!("unknown pool status: {}", other)),
        }
    }
}

impl std::fmt::Display for PoolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A lending pool entry from the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    pub id: PoolId,
    pub name: String,
    /// Contract address; pools without one are not yet deployed and are skipped.
    pub contract_address: Address,
    pub status: PoolStatus,
    /// Annual percentage yield, in percent.
    pub apy: Decimal,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl Pool {
    pub fn is_deployed(&self) -> bool {
        !self.contract_address.as_str().trim().is_empty()
    }
}

/// One point of an LP token price series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub time_ms: crate::domain::TimeMs,
    pub price: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_status_serialization() {
        assert_eq!(
            serde_json::to_string(&PoolStatus::WarmUp).unwrap(),
            "\"warm-up\""
        );
        assert_eq!(
            serde_json::to_string(&PoolStatus::Cooldown).unwrap(),
            "\"cooldown\""
        );
        let parsed: PoolStatus = serde_json::from_str("\"withdrawal\"").unwrap();
        assert_eq!(parsed, PoolStatus::Withdrawal);
    }

    #[test]
    fn test_pool_status_from_str_is_lenient() {
        assert_eq!("Warm-Up".parse::<PoolStatus>(), Ok(PoolStatus::WarmUp));
        assert_eq!("warmup".parse::<PoolStatus>(), Ok(PoolStatus::WarmUp));
        assert_eq!(" ACTIVE ".parse::<PoolStatus>(), Ok(PoolStatus::Active));
        assert!("closed".parse::<PoolStatus>().is_err());
    }

    #[test]
    fn test_pool_is_deployed() {
        let mut pool = Pool {
            id: PoolId::new("p1".to_string()),
            name: "Pool".to_string(),
            contract_address: Address::new("0xpool".to_string()),
            status: PoolStatus::Active,
            apy: Decimal::zero(),
            metadata: serde_json::Value::Null,
        };
        assert!(pool.is_deployed());
        pool.contract_address = Address::new("  ".to_string());
        assert!(!pool.is_deployed());
    }
}
