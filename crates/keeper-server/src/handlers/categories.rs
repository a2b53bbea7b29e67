//! Category and allocation history handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{current_user, read_json, AppError, AppState};
use keeper_core::budget::{check_and_reset_budgets, next_reset_date};
use keeper_core::models::{Category, CategoryUpdate, HistoryEntry, NewCategory};

/// Response for GET /api/categories
#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<Category>,
    /// Allocation history of all categories, newest first
    pub history: Vec<HistoryEntry>,
    pub next_reset: DateTime<Utc>,
}

/// GET /api/categories - List categories after running the period reset check
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<CategoriesResponse>, AppError> {
    let current = current_user(&request)?;

    check_and_reset_budgets(&state.db, current.id);

    let user = state.db.require_user(current.id)?;
    let categories = state.db.list_categories(current.id)?;
    let history = state.db.list_history(current.id, None)?;

    state.db.log_audit(
        Some(current.id),
        "list",
        Some("category"),
        None,
        Some(&format!("count={}", categories.len())),
    )?;

    Ok(Json(CategoriesResponse {
        categories,
        history,
        next_reset: next_reset_date(Utc::now(), user.preferences.reset_day),
    }))
}

/// POST /api/categories - Create a category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let current = current_user(&request)?;
    let new: NewCategory = read_json(request).await?;

    let category = state.db.create_category(current.id, &new)?;

    state.db.log_audit(
        Some(current.id),
        "create",
        Some("category"),
        Some(category.id),
        Some(&format!(
            "name={}, allocated={}",
            category.name, category.allocated_amount
        )),
    )?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/:id - Manual edit (name, color, icon, allocation)
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let current = current_user(&request)?;
    let update: CategoryUpdate = read_json(request).await?;

    let category = state.db.update_category(current.id, id, &update)?;

    state.db.log_audit(
        Some(current.id),
        "update",
        Some("category"),
        Some(id),
        Some(&format!(
            "allocated={}, status={}",
            category.allocated_amount, category.status
        )),
    )?;

    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete a category without expenses
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let current = current_user(&request)?;

    state.db.delete_category(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "delete", Some("category"), Some(id), None)?;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/categories/:id/history - Allocation history of one category
pub async fn category_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<HistoryEntry>>, AppError> {
    let current = current_user(&request)?;

    state
        .db
        .get_category(current.id, id)?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    let history = state.db.list_history(current.id, Some(id))?;

    state.db.log_audit(
        Some(current.id),
        "list",
        Some("category_history"),
        Some(id),
        Some(&format!("count={}", history.len())),
    )?;

    Ok(Json(history))
}

/// POST /api/categories/:id/history/undo - Undo the most recent history entry
pub async fn undo_category_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let current = current_user(&request)?;

    let category = state.db.undo_last_history(current.id, id)?;

    state.db.log_audit(
        Some(current.id),
        "undo",
        Some("category_history"),
        Some(id),
        Some(&format!("restored={}", category.allocated_amount)),
    )?;

    Ok(Json(category))
}
