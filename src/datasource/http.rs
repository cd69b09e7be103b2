//! REST client for the lending backend.

use super::{DataSourceError, LendingDataSource};
use crate::domain::{Address, Decimal, Pool, PoolId, PoolStatus, PricePoint, TimeMs};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, warn};

/// Lending backend data source over its public REST API.
#[derive(Debug, Clone)]
pub struct LendingApiDataSource {
    client: Client,
    base_url: String,
    max_retry: Duration,
}

impl LendingApiDataSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retry: Duration::from_secs(30),
        }
    }

    /// Bound the total time spent retrying one request.
    pub fn with_max_retry(mut self, max_retry: Duration) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// Base URL extended by `segments`, each percent-encoded as one path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, DataSourceError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| DataSourceError::Other(format!("Invalid base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| DataSourceError::Other("Base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<serde_json::Value, DataSourceError> {
        let url = self.endpoint(segments)?;
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..Default::default()
        };

        retry(backoff, || async {
            let response = self
                .client
                .get(url.clone())
                .query(query)
                .send()
                .await
                .map_err(|e| {
                    backoff::Error::transient(DataSourceError::NetworkError(e.to_string()))
                })?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(DataSourceError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(DataSourceError::HttpError {
                    status: status.as_u16(),
                    message: "Client error".to_string(),
                }));
            }

            response
                .json::<serde_json::Value>()
                .await
                .map_err(|e| backoff::Error::permanent(DataSourceError::ParseError(e.to_string())))
        })
        .await
    }
}

#[async_trait]
impl LendingDataSource for LendingApiDataSource {
    async fn get_pools(&self) -> Result<Vec<Pool>, DataSourceError> {
        debug!("Fetching pool registry");
        let response = self.get_json(&["pools"], &[]).await?;

        let pools_json = response
            .as_array()
            .or_else(|| response.get("pools").and_then(|v| v.as_array()))
            .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

        let mut pools = Vec::with_capacity(pools_json.len());
        for pool_json in pools_json {
            match parse_pool(pool_json) {
                Ok(pool) => pools.push(pool),
                Err(e) => warn!("Skipping unparseable pool: {}", e),
            }
        }
        Ok(pools)
    }

    async fn get_user_lp_balance(
        &self,
        wallet: &Address,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError> {
        debug!("Fetching LP balance for wallet={}, pool={}", wallet, pool);
        let response = self
            .get_json(&["pools", pool.as_str(), "balance", wallet.as_str()], &[])
            .await?;
        decimal_field(&response, "balance")
    }

    async fn preview_redeem(
        &self,
        balance: Decimal,
        pool: &Address,
    ) -> Result<Decimal, DataSourceError> {
        debug!("Previewing redeem of {} shares in pool={}", balance, pool);
        let response = self
            .get_json(
                &["pools", pool.as_str(), "preview-redeem"],
                &[("balance", balance.to_canonical_string())],
            )
            .await?;
        decimal_field(&response, "usdcAmount")
    }

    async fn get_pool_early_exit_fee(&self, pool: &Address) -> Result<Decimal, DataSourceError> {
        debug!("Fetching early exit fee for pool={}", pool);
        let response = self
            .get_json(&["pools", pool.as_str(), "early-exit-fee"], &[])
            .await?;
        decimal_field(&response, "earlyExitFee")
    }

    async fn get_lp_price_history(
        &self,
        pool: &Address,
    ) -> Result<Vec<PricePoint>, DataSourceError> {
        debug!("Fetching LP price history for pool={}", pool);
        let response = self
            .get_json(&["pools", pool.as_str(), "lp-price-history"], &[])
            .await?;

        let points_json = response
            .as_array()
            .ok_or_else(|| DataSourceError::ParseError("Expected array response".to_string()))?;

        let mut points = Vec::with_capacity(points_json.len());
        for point_json in points_json {
            match parse_price_point(point_json) {
                Ok(point) => points.push(point),
                Err(e) => warn!("Skipping unparseable price point: {}", e),
            }
        }
        points.sort_by_key(|p| p.time_ms);
        Ok(points)
    }
}

/// Read a decimal that the backend may send either as a JSON string or number.
fn decimal_value(value: &serde_json::Value, field: &str) -> Result<Decimal, DataSourceError> {
    match value {
        serde_json::Value::String(s) => Decimal::from_str_canonical(s)
            .map_err(|e| DataSourceError::ParseError(format!("Invalid {}: {}", field, e))),
        serde_json::Value::Number(n) => {
            let parsed = match n.as_i64() {
                Some(i) => Some(Decimal::from_i64(i)),
                None => n.as_f64().and_then(Decimal::from_f64),
            };
            parsed.ok_or_else(|| DataSourceError::ParseError(format!("Invalid {}: {}", field, n)))
        }
        _ => Err(DataSourceError::ParseError(format!(
            "Invalid {}: expected number or string",
            field
        ))),
    }
}

fn decimal_field(json: &serde_json::Value, field: &str) -> Result<Decimal, DataSourceError> {
    let value = json
        .get(field)
        .ok_or_else(|| DataSourceError::ParseError(format!("Missing {} field", field)))?;
    decimal_value(value, field)
}

fn parse_pool(pool_json: &serde_json::Value) -> Result<Pool, DataSourceError> {
    let id = match pool_json.get("id") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => return Err(DataSourceError::ParseError("Missing id field".to_string())),
    };

    let name = pool_json
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let contract_address = pool_json
        .get("contract_address")
        .or_else(|| pool_json.get("contractAddress"))
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .trim()
        .to_string();

    let status_str = pool_json
        .get("status")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DataSourceError::ParseError("Missing status field".to_string()))?;
    let status = status_str
        .parse::<PoolStatus>()
        .map_err(DataSourceError::ParseError)?;

    let apy = match pool_json.get("apy") {
        Some(serde_json::Value::Null) | None => Decimal::zero(),
        Some(v) => decimal_value(v, "apy")?,
    };

    Ok(Pool {
        id: PoolId::new(id),
        name,
        contract_address: Address::new(contract_address),
        status,
        apy,
        metadata: pool_json
            .get("metadata")
            .cloned()
            .unwrap_or(serde_json::Value::Null),
    })
}

fn parse_price_point(point_json: &serde_json::Value) -> Result<PricePoint, DataSourceError> {
    let time_ms = point_json
        .get("time")
        .or_else(|| point_json.get("timestamp"))
        .and_then(|v| v.as_i64())
        .ok_or_else(|| DataSourceError::ParseError("Missing time field".to_string()))?;
    let price = decimal_field(point_json, "price")?;
    Ok(PricePoint {
        time_ms: TimeMs::new(time_ms),
        price,
    })
}
