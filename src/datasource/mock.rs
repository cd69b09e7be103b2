//! Mock data source for testing without network calls.
//!
//! Values can be changed after construction and individual pools can be made to
//! fail, so fan-out isolation, cache refresh and stale-batch handling can be
//! exercised deterministically.

use super::{DataSourceError, LendingDataSource};
use crate::domain::{Address, Decimal, Pool, PricePoint};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MockState {
    pools: Vec<Pool>,
    fail_pools: bool,
    balances: HashMap<(Address, Address), Decimal>,
    redeem_values: HashMap<Address, Decimal>,
    fees: HashMap<Address, Decimal>,
    price_history: HashMap<Address, Vec<PricePoint>>,
    failing_balances: HashSet<Address>,
    failing_previews: HashSet<Address>,
    failing_fees: HashSet<Address>,
    balance_delays: VecDeque<Duration>,
}

/// Mock lending backend.
#[derive(Debug, Default)]
pub struct MockDataSource {
    state: RwLock<MockState>,
    balance_calls: AtomicUsize,
    preview_calls: AtomicUsize,
    price_history_calls: AtomicUsize,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.state.get_mut().pools.push(pool);
        self
    }

    pub fn with_pools(mut self, pools: Vec<Pool>) -> Self {
        self.state.get_mut().pools.extend(pools);
        self
    }

    /// Make the pool registry call fail.
    pub fn with_failing_pool_registry(mut self) -> Self {
        self.state.get_mut().fail_pools = true;
        self
    }

    pub fn with_balance(mut self, wallet: &Address, pool: &Address, balance: Decimal) -> Self {
        self.state
            .get_mut()
            .balances
            .insert((wallet.clone(), pool.clone()), balance);
        self
    }

    /// Fixed USD value returned by `preview_redeem` for any balance of `pool`.
    pub fn with_redeem_value(mut self, pool: &Address, value: Decimal) -> Self {
        self.state.get_mut().redeem_values.insert(pool.clone(), value);
        self
    }

    pub fn with_early_exit_fee(mut self, pool: &Address, fee_percent: Decimal) -> Self {
        self.state.get_mut().fees.insert(pool.clone(), fee_percent);
        self
    }

    pub fn with_price_history(mut self, pool: &Address, points: Vec<PricePoint>) -> Self {
        self.state.get_mut().price_history.insert(pool.clone(), points);
        self
    }

    pub fn with_failing_balance(mut self, pool: &Address) -> Self {
        self.state.get_mut().failing_balances.insert(pool.clone());
        self
    }

    pub fn with_failing_preview(mut self, pool: &Address) -> Self {
        self.state.get_mut().failing_previews.insert(pool.clone());
        self
    }

    pub fn with_failing_fee(mut self, pool: &Address) -> Self {
        self.state.get_mut().failing_fees.insert(pool.clone());
        self
    }

    /// Queue a delay for the next balance call. The balance is read before the
    /// delay, so a delayed call returns the value current at call time.
    pub fn with_balance_delay(mut self, delay: Duration) -> Self {
        self.state.get_mut().balance_delays.push_back(delay);
        self
    }

    pub async fn set_balance(&self, wallet: &Address, pool: &Address, balance: Decimal) {
        self.state
            .write()
            .await
            .balances
            .insert((wallet.clone(), pool.clone()), balance);
    }

    pub async fn set_redeem_value(&self, pool: &Address, value: Decimal) {
        self.state
            .write()
            .await
            .redeem_values
            .insert(pool.clone(), value);
    }

    pub async fn set_balance_failing(&self, pool: &Address, failing: bool) {
        let mut state = self.state.write().await;
        if failing {
            state.failing_balances.insert(pool.clone());
        } else {
            state.failing_balances.remove(pool);
        }
    }

    pub async fn set_pool_registry_failing(&self, failing: bool) {
        self.state.write().await.fail_pools = failing;
    }

    pub fn balance_calls(&self) -> usize {
        self.balance_calls.load(Ordering::SeqCst)
    }

    pub fn preview_calls(&self) -> usize {
        self.preview_calls.load(Ordering::SeqCst)
    }

    pub fn price_history_calls(&self) -> usize {
        self.price_history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LendingDataSource for MockDataSource {
    async fn get_pools(&self) -> Result<Vec<Pool>, DataSourceError> {
        let state = self.state.read().await;
        if state.fail_pools {
            return Err(DataSourceError::HttpError {
                status: 503,
                message: "pool registry unavailable".to_string(),
            });
        }
        Ok(state.pools.clone())
    }

    async fn get_user_lp_balance(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError> {
        self.balance_calls.fetch_add(1, Ordering::SeqCst);
        let (result, delay) = {
            let mut state = self.state.write().await;
            let result = if state.failing_balances.contains(pool) {
                Err(DataSourceError::NetworkError(format!(
                    "balance lookup failed for {}",
                    pool
                )))
            } else {
                Ok(state
                    .balances
                    .get(&(wallet.clone(), pool.clone()))
                    .copied()
                    .unwrap_or_default())
            };
            (result, state.balance_delays.pop_front())
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn preview_redeem(
        &self,
        _balance: Decimal,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError> {
        self.preview_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        if state.failing_previews.contains(pool) {
            return Err(DataSourceError::NetworkError(format!(
                "preview failed for {}",
                pool
            )));
        }
        Ok(state.redeem_values.get(pool).copied().unwrap_or_default())
    }

    async fn get_pool_early_exit_fee(&self, pool: &Address) -> Result<Decimal, DataSourceError> {
        let state = self.state.read().await;
        if state.failing_fees.contains(pool) {
            return Err(DataSourceError::HttpError {
                status: 500,
                message: "fee service unavailable".to_string(),
            });
        }
        Ok(state.fees.get(pool).copied().unwrap_or_default())
    }

    async fn get_lp_price_history(
        &self,
        pool: &Address,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        self.price_history_calls.fetch_add(1, Ordering::SeqCst);
        let state = self.state.read().await;
        state
            .price_history
            .get(pool)
            .cloned()
            .ok_or_else(|| DataSourceError::HttpError {
                status: 404,
                message: format!("no price history for {}", pool),
            })
    }
}
