//! Cache-first reads of single-pool positions and LP price history.
//!
//! A cache hit is returned immediately and a fresh fetch is scheduled after a
//! short delay to replace it. A miss fetches inline. A failed background refresh
//! keeps the cached value and only records the error in the live state.

use crate::cache::keys::{lp_price_key, user_position_key, user_position_prefix};
use crate::cache::Cache;
use crate::config::Config;
use crate::datasource::{DataSourceError, LendingDataSource};
use crate::domain::{Address, Decimal, PricePoint, UserPosition, UserPositionData};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub const POSITION_LOAD_ERROR: &str = "Failed to load position data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub position_ttl_minutes: u32,
    pub lp_price_ttl_minutes: u32,
    pub refresh_delay: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            position_ttl_minutes: 5,
            lp_price_ttl_minutes: 15,
            refresh_delay: Duration::from_millis(300),
        }
    }
}

impl From<&Config> for CacheSettings {
    fn from(config: &Config) -> Self {
        Self {
            position_ttl_minutes: config.position_cache_ttl_minutes,
            lp_price_ttl_minutes: config.lp_price_cache_ttl_minutes,
            refresh_delay: Duration::from_millis(config.background_refresh_delay_ms),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionCache {
    datasource: Arc<dyn LendingDataSource>,
    cache: Cache,
    settings: CacheSettings,
    live: Arc<RwLock<HashMap<String, UserPositionData>>>,
}

impl PositionCache {
    pub fn new(datasource: Arc<dyn LendingDataSource>, cache: Cache, settings: CacheSettings) -> Self {
        Self {
            datasource,
            cache,
            settings,
            live: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Position of `wallet` in `pool`, served from cache when possible.
    ///
    /// Returns the handle of the scheduled background refresh on a cache hit.
    pub async fn get_cached_user_position(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> (UserPositionData, Option<JoinHandle<()>>) {
        let key = user_position_key(wallet, pool);

        if let Some(cached) = self.cache.get::<UserPosition>(&key).await {
            debug!("Position cache hit for {}", key);
            let data = UserPositionData::ready(cached);
            self.live.write().await.insert(key.clone(), data.clone());
            let handle = self.schedule_position_refresh(key, wallet.clone(), pool.clone());
            return (data, Some(handle));
        }

        let data = match self.fetch_position(wallet, pool).await {
            Ok(position) => {
                self.cache
                    .set(&key, &position, self.settings.position_ttl_minutes)
                    .await;
                UserPositionData::ready(position)
            }
            Err(e) => {
                warn!("Position fetch failed for {}: {}", key, e);
                UserPositionData::failed(POSITION_LOAD_ERROR)
            }
        };
        self.live.write().await.insert(key, data.clone());
        (data, None)
    }

    /// Latest known state of a position, including background refresh results.
    pub async fn current_user_position(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> Option<UserPositionData> {
        self.live
            .read()
            .await
            .get(&user_position_key(wallet, pool))
            .cloned()
    }

    /// Drop the live state and cached entries of every position of `wallet`
    /// looked up by this process. Returns how many positions were dropped.
    pub async fn forget_wallet(&self, wallet: &Address) -> usize {
        let prefix = user_position_prefix(wallet);
        let keys: Vec<String> = {
            let mut live = self.live.write().await;
            let keys: Vec<String> = live
                .keys()
                .filter(|key| key.starts_with(&prefix))
                .cloned()
                .collect();
            for key in &keys {
                live.remove(key);
            }
            keys
        };

        for key in &keys {
            self.cache.invalidate(key).await;
        }
        debug!("Forgot {} cached positions of {}", keys.len(), wallet);
        keys.len()
    }

    /// LP price history of `pool`, served from cache when possible.
    ///
    /// # Errors
    /// Returns the data source error when nothing is cached and the fetch fails.
    pub async fn get_cached_lp_price_history(
        &self,
        pool: &Address,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        let (points, _refresh) = self.lp_price_history(pool).await?;
        Ok(points)
    }

    async fn lp_price_history(
        &self,
        pool: &Address,
    ) -> Result<(Vec<PricePoint>, Option<JoinHandle<()>>), DataSourceError> {
        let key = lp_price_key(pool);

        if let Some(cached) = self.cache.get::<Vec<PricePoint>>(&key).await {
            debug!("Price history cache hit for {}", key);
            let handle = self.schedule_price_refresh(key, pool.clone());
            return Ok((cached, Some(handle)));
        }

        let points = self.datasource.get_lp_price_history(pool).await?;
        self.cache
            .set(&key, &points, self.settings.lp_price_ttl_minutes)
            .await;
        Ok((points, None))
    }

    async fn fetch_position(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> Result<UserPosition, DataSourceError> {
        let balance = self.datasource.get_user_lp_balance(wallet, pool).await?;
        let current_value = if balance.is_positive() {
            self.datasource.preview_redeem(balance, pool).await?
        } else {
            Decimal::zero()
        };
        Ok(UserPosition {
            balance,
            current_value,
        })
    }

    fn schedule_position_refresh(&self, key: String, wallet: Address, pool: Address) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.settings.refresh_delay).await;
            match this.fetch_position(&wallet, &pool).await {
                Ok(position) => {
                    this.cache
                        .set(&key, &position, this.settings.position_ttl_minutes)
                        .await;
                    this.live
                        .write()
                        .await
                        .insert(key, UserPositionData::ready(position));
                }
                Err(e) => {
                    warn!("Background position refresh failed for {}: {}", key, e);
                    let mut live = this.live.write().await;
                    let entry = live.entry(key).or_default();
                    entry.loading = false;
                    entry.error = Some(POSITION_LOAD_ERROR.to_string());
                }
            }
        })
    }

    fn schedule_price_refresh(&self, key: String, pool: Address) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.settings.refresh_delay).await;
            match this.datasource.get_lp_price_history(&pool).await {
                Ok(points) => {
                    this.cache
                        .set(&key, &points, this.settings.lp_price_ttl_minutes)
                        .await;
                }
                Err(e) => warn!("Background price history refresh failed for {}: {}", key, e),
            }
        })
    }
}
