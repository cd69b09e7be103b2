use axum::extract::{Path, State};
use axum::Json;

use crate::api::{parse_address, AppState};
use crate::domain::{PricePoint, UserPositionData};
use crate::error::AppError;

/// Cached position of the connected wallet in the pool at `pool` (contract address).
pub async fn get_position(
    Path(pool): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserPositionData>, AppError> {
    let wallet = state.require_wallet().await?;
    let pool = parse_address(&pool, "pool address")?;

    // The background refresh runs detached; its result lands in the cache.
    let (data, _refresh) = state.positions.get_cached_user_position(&wallet, &pool).await;
    Ok(Json(data))
}

/// Latest state of a looked-up position, including the outcome of its
/// background refresh.
pub async fn get_live_position(
    Path(pool): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<UserPositionData>, AppError> {
    let wallet = state.require_wallet().await?;
    let pool = parse_address(&pool, "pool address")?;

    state
        .positions
        .current_user_position(&wallet, &pool)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No position lookup for pool {}", pool)))
}

pub async fn get_price_history(
    Path(pool): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<Vec<PricePoint>>, AppError> {
    let pool = parse_address(&pool, "pool address")?;
    let points = state.positions.get_cached_lp_price_history(&pool).await?;
    Ok(Json(points))
}
