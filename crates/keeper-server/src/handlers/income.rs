//! Income source handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};

use crate::{current_user, read_json, AppError, AppState};
use keeper_core::models::{IncomeSource, IncomeUpdate, NewIncomeSource};

/// GET /api/income - List income sources, newest first
pub async fn list_income(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<IncomeSource>>, AppError> {
    let current = current_user(&request)?;

    let income = state.db.list_income(current.id)?;

    state.db.log_audit(
        Some(current.id),
        "list",
        Some("income"),
        None,
        Some(&format!("count={}", income.len())),
    )?;

    Ok(Json(income))
}

/// POST /api/income - Create an income source
pub async fn create_income(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<IncomeSource>), AppError> {
    let current = current_user(&request)?;
    let new: NewIncomeSource = read_json(request).await?;

    let income = state.db.create_income(current.id, &new)?;

    state.db.log_audit(
        Some(current.id),
        "create",
        Some("income"),
        Some(income.id),
        Some(&format!("name={}, amount={}", income.name, income.amount)),
    )?;

    Ok((StatusCode::CREATED, Json(income)))
}

/// PUT /api/income/:id - Partially update an income source
pub async fn update_income(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<IncomeSource>, AppError> {
    let current = current_user(&request)?;
    let update: IncomeUpdate = read_json(request).await?;

    let income = state.db.update_income(current.id, id, &update)?;

    state
        .db
        .log_audit(Some(current.id), "update", Some("income"), Some(id), None)?;

    Ok(Json(income))
}

/// DELETE /api/income/:id - Delete an income source
pub async fn delete_income(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let current = current_user(&request)?;

    state.db.delete_income(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "delete", Some("income"), Some(id), None)?;

    Ok(StatusCode::NO_CONTENT)
}
