use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_address, AppState};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub wallet: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}

pub async fn get_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let wallet = state.session.current().await;
    Json(SessionResponse {
        connected: wallet.is_some(),
        wallet: wallet.map(|w| w.to_string()),
    })
}

pub async fn connect(
    State(state): State<AppState>,
    Json(body): Json<ConnectRequest>,
) -> Result<Json<SessionResponse>, AppError> {
    let wallet = parse_address(&body.wallet, "wallet address")?;
    state.session.connect(wallet.clone()).await?;

    Ok(Json(SessionResponse {
        connected: true,
        wallet: Some(wallet.to_string()),
    }))
}

/// Disconnect and drop the previous wallet's portfolio and cached positions.
pub async fn disconnect(State(state): State<AppState>) -> Result<Json<SessionResponse>, AppError> {
    let previous = state.session.current().await;
    state.session.disconnect().await?;
    state.aggregator.load().await;
    if let Some(wallet) = previous {
        state.positions.forget_wallet(&wallet).await;
    }

    Ok(Json(SessionResponse {
        connected: false,
        wallet: None,
    }))
}
