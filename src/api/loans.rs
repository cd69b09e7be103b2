use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::api::AppState;
use crate::engine::{format_due_date, format_remaining_days, Loan, LoanKind};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingQuery {
    /// Unix seconds.
    pub start_time: i64,
    /// Seconds.
    pub loan_period: i64,
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemainingResponse {
    pub kind: LoanKind,
    pub days: u64,
    pub hours: u32,
    pub minutes: u32,
    pub overdue: bool,
    pub due_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub remaining_label: String,
}

pub async fn get_remaining(
    Query(params): Query<RemainingQuery>,
    State(state): State<AppState>,
) -> Result<Json<RemainingResponse>, AppError> {
    if params.start_time < 0 {
        return Err(AppError::BadRequest("startTime must be >= 0".into()));
    }
    if params.loan_period < 0 {
        return Err(AppError::BadRequest("loanPeriod must be >= 0".into()));
    }
    let kind = match params.kind.as_deref() {
        Some(raw) => LoanKind::from_str(raw).map_err(AppError::BadRequest)?,
        None => LoanKind::Standard,
    };

    let loan = Loan::new(kind, params.start_time, params.loan_period);
    let remaining = loan.remaining(state.clock.now());
    let days = i64::try_from(remaining.days).unwrap_or(i64::MAX);

    Ok(Json(RemainingResponse {
        kind,
        days: remaining.days,
        hours: remaining.hours,
        minutes: remaining.minutes,
        overdue: remaining.overdue,
        due_ms: remaining.due.as_ms(),
        due_date: format_due_date(remaining.due),
        remaining_label: format_remaining_days(days),
    }))
}
