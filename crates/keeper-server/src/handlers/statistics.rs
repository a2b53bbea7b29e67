//! Spending statistics handler

use std::sync::Arc;

use axum::{
    extract::{Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{current_user, parse_date_param, AppError, AppState};
use keeper_core::models::Statistics;

/// Query parameters for statistics
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
}

/// GET /api/statistics - Totals, category breakdown and monthly trend
pub async fn get_statistics(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatisticsQuery>,
    request: Request,
) -> Result<Json<Statistics>, AppError> {
    let current = current_user(&request)?;
    let from = parse_date_param("from", params.from.as_deref())?;
    let to = parse_date_param("to", params.to.as_deref())?;

    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::bad_request("'from' must not be after 'to'"));
        }
    }

    let stats = state.db.get_statistics(current.id, from, to)?;

    state.db.log_audit(
        Some(current.id),
        "view",
        Some("statistics"),
        None,
        Some(&format!("from={:?}, to={:?}", from, to)),
    )?;

    Ok(Json(stats))
}
