//! Early exit fee arithmetic.

use crate::domain::{ArithmeticError, Decimal, PoolStatus};
use serde::{Deserialize, Serialize};

/// Fee charged on `withdraw_amount` at `fee_rate_percent` percent.
///
/// The rate is scaled to a fraction first, so any rate in `[0, 100]` yields a
/// fee no larger than the amount and cannot overflow.
///
/// # Errors
/// Returns [`ArithmeticError::Overflow`] when the fee is not representable.
pub fn calculate_early_exit_fee(
    withdraw_amount: Decimal,
    fee_rate_percent: Decimal,
) -> Result<Decimal, ArithmeticError> {
    let fraction = fee_rate_percent.checked_div(Decimal::hundred())?;
    withdraw_amount.checked_mul(fraction)
}

/// Amount the user receives after the early exit fee is deducted.
pub fn calculate_net_amount_after_fee(
    withdraw_amount: Decimal,
    fee_rate_percent: Decimal,
) -> Result<Decimal, ArithmeticError> {
    withdraw_amount.checked_sub(calculate_early_exit_fee(withdraw_amount, fee_rate_percent)?)
}

/// Withdrawals are only penalised while a pool is warming up.
pub fn is_in_warmup(status: PoolStatus) -> bool {
    status == PoolStatus::WarmUp
}

/// A withdrawal broken down into fee and net amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    pub withdraw_amount: Decimal,
    pub fee_rate_percent: Decimal,
    pub fee_amount: Decimal,
    pub net_amount: Decimal,
}

impl FeeQuote {
    pub fn new(withdraw_amount: Decimal, fee_rate_percent: Decimal) -> Result<Self, ArithmeticError> {
        let fee_amount = calculate_early_exit_fee(withdraw_amount, fee_rate_percent)?;
        Ok(Self {
            withdraw_amount,
            fee_rate_percent,
            fee_amount,
            net_amount: withdraw_amount.checked_sub(fee_amount)?,
        })
    }

    /// Quote with no fee applied.
    pub fn free(withdraw_amount: Decimal) -> Self {
        Self {
            withdraw_amount,
            fee_rate_percent: Decimal::zero(),
            fee_amount: Decimal::zero(),
            net_amount: withdraw_amount,
        }
    }
}
