pub mod fees;
pub mod health;
pub mod loans;
pub mod portfolio;
pub mod positions;
pub mod session;

use crate::cache::Cache;
use crate::clock::Clock;
use crate::config::Config;
use crate::datasource::LendingDataSource;
use crate::domain::Address;
use crate::error::AppError;
use crate::orchestration::{CacheSettings, FeeResolver, PositionAggregator, PositionCache};
use crate::session::WalletSession;
use axum::{
    routing::{get, post},
    Router,
};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: WalletSession,
    pub aggregator: Arc<PositionAggregator>,
    pub positions: PositionCache,
    pub fees: FeeResolver,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        config: Config,
        datasource: Arc<dyn LendingDataSource>,
        cache: Cache,
        session: WalletSession,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let settings = CacheSettings::from(&config);
        Self {
            aggregator: Arc::new(PositionAggregator::new(datasource.clone(), session.clone())),
            positions: PositionCache::new(datasource.clone(), cache, settings),
            fees: FeeResolver::new(datasource),
            config,
            session,
            clock,
        }
    }

    /// Connected wallet, or a 400 for wallet-scoped routes.
    pub(crate) async fn require_wallet(&self) -> Result<Address, AppError> {
        self.session
            .current()
            .await
            .ok_or_else(|| AppError::BadRequest("No wallet connected".into()))
    }
}

pub(crate) fn parse_address(raw: &str, what: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|e| AppError::BadRequest(format!("Invalid {}: {}", what, e)))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/session",
            get(session::get_session)
                .post(session::connect)
                .delete(session::disconnect),
        )
        .route("/v1/portfolio", get(portfolio::get_portfolio))
        .route("/v1/portfolio/refresh", post(portfolio::refresh_portfolio))
        .route(
            "/v1/portfolio/optimistic",
            post(portfolio::update_optimistically),
        )
        .route("/v1/positions/:pool", get(positions::get_position))
        .route("/v1/positions/:pool/live", get(positions::get_live_position))
        .route(
            "/v1/pools/:pool/price-history",
            get(positions::get_price_history),
        )
        .route("/v1/loans/remaining", get(loans::get_remaining))
        .route("/v1/fees/quote", get(fees::get_quote))
        .layer(cors)
        .with_state(state)
}
