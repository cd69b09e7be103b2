use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::{parse_address, AppState};
use crate::domain::Decimal;
use crate::engine::{format_usd, FeeQuote};
use crate::error::AppError;
use crate::orchestration::QuoteError;

#[derive(Debug, Deserialize)]
pub struct QuoteQuery {
    pub pool: String,
    pub amount: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResponse {
    #[serde(flatten)]
    pub quote: FeeQuote,
    pub fee_display: String,
    pub net_display: String,
}

pub async fn get_quote(
    Query(params): Query<QuoteQuery>,
    State(state): State<AppState>,
) -> Result<Json<QuoteResponse>, AppError> {
    let pool = parse_address(&params.pool, "pool address")?;
    let amount = Decimal::from_str_canonical(&params.amount)
        .map_err(|_| AppError::BadRequest("Invalid amount".into()))?;
    if amount.is_negative() {
        return Err(AppError::BadRequest("amount must be >= 0".into()));
    }

    let quote = match state.fees.quote_for_contract(&pool, amount).await {
        Ok(quote) => quote,
        Err(QuoteError::UnknownPool(pool)) => {
            return Err(AppError::NotFound(format!("Unknown pool {}", pool)))
        }
        Err(QuoteError::Registry(e)) => return Err(e.into()),
        Err(QuoteError::Arithmetic(e)) => return Err(AppError::BadRequest(e.to_string())),
    };
    Ok(Json(QuoteResponse {
        fee_display: format_usd(quote.fee_amount),
        net_display: format_usd(quote.net_amount),
        quote,
    }))
}
