//! Portfolio aggregation across lending pools.
//!
//! Every fetch batch is tagged with a generation from a monotonic counter. A batch
//! result is applied only if no newer batch has been issued since, so a slow batch
//! can never overwrite the result of a later one.
//!
//! Optimistic balance deltas are keyed by transaction id and remember the latest
//! generation issued when they were recorded. An authoritative batch issued after
//! a delta already reflects it and drops it; a batch that was in flight when the
//! delta was recorded re-applies it on top of the fresh data.

use crate::datasource::{DataSourceError, LendingDataSource};
use crate::domain::{
    Address, Decimal, Pool, PoolId, PoolPosition, PortfolioSnapshot, TxId,
};
use crate::session::WalletSession;
use futures::future::join_all;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Message shown when the portfolio cannot be assembled at all.
pub const PORTFOLIO_LOAD_ERROR: &str = "Failed to load your positions. Please try again.";

#[derive(Debug, Error)]
pub enum AggregatorError {
    #[error("pool registry unavailable: {0}")]
    PoolRegistry(#[from] DataSourceError),
}

/// Result of an optimistic balance adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum OptimisticOutcome {
    Applied,
    /// The transaction id was already applied; nothing changed.
    Duplicate,
    /// No position for the pool in the current snapshot; nothing changed.
    UnknownPool,
    /// The adjusted balance is not representable; nothing changed.
    Overflow,
}

/// Portfolio state as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioView {
    #[serde(flatten)]
    pub snapshot: PortfolioSnapshot,
    pub has_positions: bool,
    pub loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Generation of the batch the snapshot came from; 0 before the first load.
    pub generation: u64,
}

#[derive(Debug, Clone)]
struct PendingDelta {
    tx_id: TxId,
    pool_id: PoolId,
    amount_delta: Decimal,
    recorded_at: u64,
}

#[derive(Debug, Default)]
struct AggregatorState {
    /// Wallet the snapshot, pending deltas and applied tx ids belong to.
    wallet: Option<Address>,
    snapshot: PortfolioSnapshot,
    applied_generation: u64,
    loading: bool,
    error: Option<String>,
    pending: Vec<PendingDelta>,
    applied_tx: HashSet<TxId>,
}

impl AggregatorState {
    fn view(&self) -> PortfolioView {
        PortfolioView {
            snapshot: self.snapshot.clone(),
            has_positions: self.snapshot.has_positions(),
            loading: self.loading,
            error: self.error.clone(),
            generation: self.applied_generation,
        }
    }

    /// Forget deltas and tx ids recorded for another wallet, or on disconnect.
    fn switch_wallet(&mut self, wallet: Option<&Address>) {
        if self.wallet.as_ref() == wallet {
            return;
        }
        self.pending.clear();
        self.applied_tx.clear();
        self.wallet = wallet.cloned();
    }

    /// Drop deltas already reflected by batch `generation`. Their tx ids stay
    /// applied so a replayed update is still ignored.
    fn prune_reflected(&mut self, generation: u64) {
        self.pending.retain(|delta| delta.recorded_at >= generation);
    }

    /// Replace the snapshot with authoritative data from batch `generation`.
    fn apply_authoritative(&mut self, generation: u64, snapshot: PortfolioSnapshot) {
        self.snapshot = snapshot;
        self.prune_reflected(generation);
        for delta in &self.pending {
            let Some(position) = self.snapshot.position_mut(&delta.pool_id) else {
                continue;
            };
            match position.balance.checked_add(delta.amount_delta) {
                Ok(balance) => position.balance = balance,
                Err(e) => warn!("Cannot re-apply optimistic update {}: {}", delta.tx_id, e),
            }
        }
        self.applied_generation = generation;
        self.loading = false;
        self.error = None;
    }

    fn apply_failure(&mut self, generation: u64) {
        self.snapshot = PortfolioSnapshot::empty();
        self.prune_reflected(generation);
        self.applied_generation = generation;
        self.loading = false;
        self.error = Some(PORTFOLIO_LOAD_ERROR.to_string());
    }
}

/// Owns the in-memory portfolio of the connected wallet.
#[derive(Debug)]
pub struct PositionAggregator {
    datasource: Arc<dyn LendingDataSource>,
    session: WalletSession,
    issued: AtomicU64,
    refreshes: AtomicU64,
    state: RwLock<AggregatorState>,
}

impl PositionAggregator {
    pub fn new(datasource: Arc<dyn LendingDataSource>, session: WalletSession) -> Self {
        Self {
            datasource,
            session,
            issued: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            state: RwLock::new(AggregatorState::default()),
        }
    }

    pub fn session(&self) -> &WalletSession {
        &self.session
    }

    /// Current portfolio state without fetching.
    pub async fn view(&self) -> PortfolioView {
        self.state.read().await.view()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }

    /// Load the portfolio of the connected wallet.
    pub async fn load(&self) -> PortfolioView {
        let wallet = self.session.current().await;
        self.fetch_portfolio(wallet.as_ref()).await
    }

    /// Re-run a full portfolio fetch. In-flight batches are not cancelled; they are
    /// discarded when they complete.
    pub async fn refresh(&self) -> PortfolioView {
        let count = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Portfolio refresh #{}", count);
        self.load().await
    }

    /// Fetch and aggregate positions of `wallet` across all deployed pools.
    ///
    /// Per-pool failures are logged and the pool left out. Only a pool registry
    /// failure empties the portfolio and reports an error. Returns the state after
    /// this batch, which is the newer state if this batch turned out to be stale.
    pub async fn fetch_portfolio(&self, wallet: Option<&Address>) -> PortfolioView {
        let generation = self.issued.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(wallet) = wallet.filter(|w| !w.is_empty()) else {
            let mut state = self.state.write().await;
            if self.is_latest(generation) {
                state.switch_wallet(None);
                state.apply_authoritative(generation, PortfolioSnapshot::empty());
            }
            return state.view();
        };

        self.state.write().await.loading = true;
        let result = self.collect(wallet).await;

        let mut state = self.state.write().await;
        if !self.is_latest(generation) {
            debug!(
                "Discarding portfolio batch {} for {}; batch {} is newer",
                generation,
                wallet,
                self.issued.load(Ordering::SeqCst)
            );
            return state.view();
        }

        state.switch_wallet(Some(wallet));
        match result {
            Ok(snapshot) => {
                info!(
                    "Portfolio batch {} for {}: {} positions, total value {}",
                    generation,
                    wallet,
                    snapshot.positions.len(),
                    snapshot.total_value
                );
                state.apply_authoritative(generation, snapshot);
            }
            Err(e) => {
                error!("Portfolio batch {} for {} failed: {}", generation, wallet, e);
                state.apply_failure(generation);
            }
        }
        state.view()
    }

    /// Adjust the balance of `pool_id` ahead of on-chain confirmation.
    ///
    /// Only the in-memory balance changes; `current_value` and the cache are left
    /// alone. Each `tx_id` is applied at most once while the same wallet stays
    /// connected.
    pub async fn update_position_optimistically(
        &self,
        pool_id: &PoolId,
        amount_delta: Decimal,
        tx_id: TxId,
    ) -> OptimisticOutcome {
        let mut state = self.state.write().await;
        if state.applied_tx.contains(&tx_id) {
            debug!("Ignoring repeated optimistic update {}", tx_id);
            return OptimisticOutcome::Duplicate;
        }

        let Some(position) = state.snapshot.position_mut(pool_id) else {
            warn!("Optimistic update {} for unknown pool {}", tx_id, pool_id);
            return OptimisticOutcome::UnknownPool;
        };
        let balance = match position.balance.checked_add(amount_delta) {
            Ok(balance) => balance,
            Err(e) => {
                warn!("Rejecting optimistic update {} for pool {}: {}", tx_id, pool_id, e);
                return OptimisticOutcome::Overflow;
            }
        };
        position.balance = balance;

        state.pending.push(PendingDelta {
            tx_id: tx_id.clone(),
            pool_id: pool_id.clone(),
            amount_delta,
            recorded_at: self.issued.load(Ordering::SeqCst),
        });
        state.applied_tx.insert(tx_id);
        OptimisticOutcome::Applied
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == generation
    }

    async fn collect(&self, wallet: &Address) -> Result<PortfolioSnapshot, AggregatorError> {
        let pools = self.datasource.get_pools().await?;
        let deployed: Vec<&Pool> = pools.iter().filter(|p| p.is_deployed()).collect();

        let balances = join_all(deployed.iter().map(|pool| async move {
            match self
                .datasource
                .get_user_lp_balance(wallet, &pool.contract_address)
                .await
            {
                Ok(balance) => Some((*pool, balance)),
                Err(e) => {
                    warn!("Balance lookup failed for pool {}: {}", pool.id, e);
                    None
                }
            }
        }))
        .await;

        let holdings: Vec<(&Pool, Decimal)> = balances
            .into_iter()
            .flatten()
            .filter(|(_, balance)| balance.is_positive())
            .collect();

        let positions: Vec<PoolPosition> = join_all(holdings.iter().map(|(pool, balance)| async move {
            match self
                .datasource
                .preview_redeem(*balance, &pool.contract_address)
                .await
            {
                Ok(value) => Some(PoolPosition::from_pool(pool, wallet, *balance, value)),
                Err(e) => {
                    warn!("Redeem preview failed for pool {}: {}", pool.id, e);
                    None
                }
            }
        }))
        .await
        .into_iter()
        .flatten()
        .collect();

        let mut snapshot = PortfolioSnapshot::empty();
        for position in positions {
            let pool_id = position.pool_id.clone();
            if let Err(e) = snapshot.push(position) {
                warn!("Leaving pool {} out of the portfolio total: {}", pool_id, e);
            }
        }
        Ok(snapshot)
    }
}
