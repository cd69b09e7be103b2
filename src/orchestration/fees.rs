use crate::datasource::{DataSourceError, LendingDataSource};
use crate::domain::{Address, ArithmeticError, Decimal, Pool};
use crate::engine::{is_in_warmup, FeeQuote};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("unknown pool {0}")]
    UnknownPool(Address),
    #[error("pool registry unavailable: {0}")]
    Registry(#[from] DataSourceError),
    #[error("withdrawal amount out of range: {0}")]
    Arithmetic(#[from] ArithmeticError),
}

/// Resolves early exit fee rates and turns them into withdrawal quotes.
///
/// A fee service failure is treated as a zero rate so withdrawals are never
/// blocked on it.
#[derive(Debug, Clone)]
pub struct FeeResolver {
    datasource: Arc<dyn LendingDataSource>,
}

impl FeeResolver {
    pub fn new(datasource: Arc<dyn LendingDataSource>) -> Self {
        Self { datasource }
    }

    /// Early exit fee of `pool` in percent, clamped to `[0, 100]`.
    pub async fn early_exit_fee_rate(&self, pool: &Address) -> Decimal {
        match self.datasource.get_pool_early_exit_fee(pool).await {
            Ok(rate) => rate.clamp_to(Decimal::zero(), Decimal::hundred()),
            Err(e) => {
                warn!("Early exit fee lookup failed for {}, assuming no fee: {}", pool, e);
                Decimal::zero()
            }
        }
    }

    /// Quote a withdrawal at the service rate of `pool`, whatever its status.
    pub async fn quote(
        &self,
        pool: &Address,
        withdraw_amount: Decimal,
    ) -> Result<FeeQuote, ArithmeticError> {
        let rate = self.early_exit_fee_rate(pool).await;
        FeeQuote::new(withdraw_amount, rate)
    }

    /// Quote a withdrawal from `pool`, skipping the fee lookup outside warm-up.
    pub async fn quote_for_pool(
        &self,
        pool: &Pool,
        withdraw_amount: Decimal,
    ) -> Result<FeeQuote, ArithmeticError> {
        if !is_in_warmup(pool.status) {
            return Ok(FeeQuote::free(withdraw_amount));
        }
        self.quote(&pool.contract_address, withdraw_amount).await
    }

    /// Look up the pool deployed at `contract` in the registry and quote a
    /// withdrawal from it.
    pub async fn quote_for_contract(
        &self,
        contract: &Address,
        withdraw_amount: Decimal,
    ) -> Result<FeeQuote, QuoteError> {
        let pools = self.datasource.get_pools().await?;
        let pool = pools
            .iter()
            .find(|p| &p.contract_address == contract)
            .ok_or_else(|| QuoteError::UnknownPool(contract.clone()))?;
        Ok(self.quote_for_pool(pool, withdraw_amount).await?)
    }
}
