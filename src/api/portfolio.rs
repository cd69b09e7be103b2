use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{Decimal, PoolId, TxId};
use crate::error::AppError;
use crate::orchestration::{OptimisticOutcome, PortfolioView};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticRequest {
    pub pool_id: String,
    pub amount_delta: Decimal,
    /// Generated when absent, which makes the update non-idempotent.
    pub tx_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimisticResponse {
    pub outcome: OptimisticOutcome,
    pub tx_id: TxId,
    pub portfolio: PortfolioView,
}

pub async fn get_portfolio(State(state): State<AppState>) -> Json<PortfolioView> {
    Json(state.aggregator.load().await)
}

pub async fn refresh_portfolio(State(state): State<AppState>) -> Json<PortfolioView> {
    Json(state.aggregator.refresh().await)
}

pub async fn update_optimistically(
    State(state): State<AppState>,
    Json(body): Json<OptimisticRequest>,
) -> Result<Json<OptimisticResponse>, AppError> {
    state.require_wallet().await?;

    let pool_id = body.pool_id.trim();
    if pool_id.is_empty() {
        return Err(AppError::BadRequest("poolId must not be empty".into()));
    }
    let tx_id = match body.tx_id.as_deref().map(str::trim) {
        Some("") => return Err(AppError::BadRequest("txId must not be empty".into())),
        Some(id) => TxId::new(id.to_string()),
        None => TxId::generate(),
    };

    let outcome = state
        .aggregator
        .update_position_optimistically(
            &PoolId::new(pool_id.to_string()),
            body.amount_delta,
            tx_id.clone(),
        )
        .await;
    if outcome == OptimisticOutcome::Overflow {
        return Err(AppError::BadRequest("amountDelta out of range".into()));
    }

    Ok(Json(OptimisticResponse {
        outcome,
        tx_id,
        portfolio: state.aggregator.view().await,
    }))
}
