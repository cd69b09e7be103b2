//! Cache key composition.
//!
//! Keys are `{purpose}_{wallet}_{pool}` for wallet-scoped data and
//! `{purpose}_{pool}` for pool-wide data.

use crate::domain::Address;

pub const USER_POSITION: &str = "user_position";
pub const LP_PRICE: &str = "lp_price";

pub fn user_position_key(wallet: &Address, pool: &Address) -> String {
    format!("{}{}", user_position_prefix(wallet), pool)
}

/// Common prefix of every position key of `wallet`.
pub fn user_position_prefix(wallet: &Address) -> String {
    format!("{}_{}_", USER_POSITION, wallet)
}

pub fn lp_price_key(pool: &Address) -> String {
    format!("{}_{}", LP_PRICE, pool)
}
