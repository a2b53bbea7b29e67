//! Savings goal handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{current_user, read_json, AppError, AppState};
use keeper_core::models::{NewSavingsGoal, SavingsGoal};

/// GET /api/savings - List goals with contributions
pub async fn list_savings(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<SavingsGoal>>, AppError> {
    let current = current_user(&request)?;

    let goals = state.db.list_savings_goals(current.id)?;

    state.db.log_audit(
        Some(current.id),
        "list",
        Some("savings_goal"),
        None,
        Some(&format!("count={}", goals.len())),
    )?;

    Ok(Json(goals))
}

/// POST /api/savings - Create a goal
pub async fn create_savings_goal(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<SavingsGoal>), AppError> {
    let current = current_user(&request)?;
    let new: NewSavingsGoal = read_json(request).await?;

    let goal = state.db.create_savings_goal(current.id, &new)?;

    state.db.log_audit(
        Some(current.id),
        "create",
        Some("savings_goal"),
        Some(goal.id),
        Some(&format!("title={}, target={}", goal.title, goal.target_amount)),
    )?;

    Ok((StatusCode::CREATED, Json(goal)))
}

/// Request body for changing a goal's target
#[derive(Debug, Deserialize)]
pub struct TargetRequest {
    pub target_amount: f64,
}

/// PUT /api/savings/:id/target - Change a goal's target
pub async fn update_savings_target(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SavingsGoal>, AppError> {
    let current = current_user(&request)?;
    let req: TargetRequest = read_json(request).await?;

    let goal = state
        .db
        .update_savings_target(current.id, id, req.target_amount)?;

    state.db.log_audit(
        Some(current.id),
        "update",
        Some("savings_goal"),
        Some(id),
        Some(&format!("target={}", goal.target_amount)),
    )?;

    Ok(Json(goal))
}

/// Request body for a contribution
#[derive(Debug, Deserialize)]
pub struct ContributionRequest {
    pub amount: f64,
}

/// POST /api/savings/:id/contributions - Add money to a goal
pub async fn add_contribution(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SavingsGoal>, AppError> {
    let current = current_user(&request)?;
    let req: ContributionRequest = read_json(request).await?;

    let goal = state.db.add_contribution(current.id, id, req.amount)?;

    state.db.log_audit(
        Some(current.id),
        "contribute",
        Some("savings_goal"),
        Some(id),
        Some(&format!("amount={}, saved={}", req.amount, goal.current_saved)),
    )?;

    Ok(Json(goal))
}

/// DELETE /api/savings/:id/contributions - Cash out a goal
pub async fn cash_out_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SavingsGoal>, AppError> {
    let current = current_user(&request)?;

    let goal = state.db.cash_out_goal(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "cash_out", Some("savings_goal"), Some(id), None)?;

    Ok(Json(goal))
}

/// DELETE /api/savings/:id/contributions/:cid - Remove one contribution
pub async fn delete_contribution(
    State(state): State<Arc<AppState>>,
    Path((id, cid)): Path<(i64, i64)>,
    request: Request,
) -> Result<Json<SavingsGoal>, AppError> {
    let current = current_user(&request)?;

    let goal = state.db.delete_contribution(current.id, id, cid)?;

    state.db.log_audit(
        Some(current.id),
        "delete",
        Some("savings_contribution"),
        Some(cid),
        Some(&format!("goal={}", id)),
    )?;

    Ok(Json(goal))
}

/// DELETE /api/savings/:id - Delete a goal and its contributions
pub async fn delete_savings_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<StatusCode, AppError> {
    let current = current_user(&request)?;

    state.db.delete_savings_goal(current.id, id)?;

    state
        .db
        .log_audit(Some(current.id), "delete", Some("savings_goal"), Some(id), None)?;

    Ok(StatusCode::NO_CONTENT)
}
