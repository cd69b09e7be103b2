//! Domain primitives: TimeMs, Address, PoolId, TxId.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Time in milliseconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimeMs(pub i64);

impl TimeMs {
    pub fn new(ms: i64) -> Self {
        TimeMs(ms)
    }

    /// Convert a whole-seconds timestamp (as stored on chain) into a TimeMs.
    pub fn from_secs(secs: i64) -> Self {
        TimeMs(secs.saturating_mul(1000))
    }

    pub fn now() -> Self {
        TimeMs(chrono::Utc::now().timestamp_millis())
    }

    pub fn as_ms(&self) -> i64 {
        self.0
    }

    pub fn saturating_add_ms(&self, ms: i64) -> Self {
        TimeMs(self.0.saturating_add(ms))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address is empty")]
    Empty,
    #[error("address contains whitespace")]
    Whitespace,
    #[error("address contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// Wallet or pool contract address.
///
/// Addresses are compared case-sensitively as the upstream services return them.
/// Parsing trims surrounding whitespace and accepts ASCII letters and digits only.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(AddressParseError::Empty);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(AddressParseError::Whitespace);
        }
        if let Some(bad) = trimmed.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(AddressParseError::InvalidCharacter(bad));
        }
        Ok(Address(trimmed.to_string()))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pool identifier as assigned by the pool registry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PoolId(pub String);

impl PoolId {
    pub fn new(id: String) -> Self {
        PoolId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user-confirmed transaction, used to deduplicate optimistic
/// balance adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub String);

impl TxId {
    pub fn new(id: String) -> Self {
        TxId(id)
    }

    /// Generate a fresh random id for callers that have no on-chain hash yet.
    pub fn generate() -> Self {
        TxId(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timems_from_secs() {
        assert_eq!(TimeMs::from_secs(1_700_000_000).as_ms(), 1_700_000_000_000);
        assert_eq!(TimeMs::from_secs(i64::MAX).as_ms(), i64::MAX);
    }

    #[test]
    fn test_timems_ordering() {
        assert!(TimeMs::new(1000) < TimeMs::new(2000));
        assert_eq!(TimeMs::new(1000).saturating_add_ms(500), TimeMs::new(1500));
    }

    #[test]
    fn test_address_parse_trims() {
        let addr = Address::from_str("  0xAbC  ").unwrap();
        assert_eq!(addr.as_str(), "0xAbC");
        assert_eq!(addr.to_string(), "0xAbC");
    }

    #[test]
    fn test_address_parse_rejects_empty_and_whitespace() {
        assert_eq!(Address::from_str("   "), Err(AddressParseError::Empty));
        assert_eq!(Address::from_str("0x1 0x2"), Err(AddressParseError::Whitespace));
    }

    #[test]
    fn test_address_parse_rejects_path_and_query_characters() {
        assert_eq!(
            Address::from_str("0xabc/../../admin?drop=1"),
            Err(AddressParseError::InvalidCharacter('/'))
        );
        assert_eq!(
            Address::from_str("0xabc?x"),
            Err(AddressParseError::InvalidCharacter('?'))
        );
        assert_eq!(
            Address::from_str("0x%2e"),
            Err(AddressParseError::InvalidCharacter('%'))
        );
        assert!(Address::from_str("0xDeadBeef01").is_ok());
    }

    #[test]
    fn test_tx_id_generate_is_unique() {
        assert_ne!(TxId::generate(), TxId::generate());
    }
}
