//! User profile, preferences and data reset handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::{current_user, read_json, AppError, AppState, AuthMethod, SuccessResponse};
use keeper_core::budget::next_reset_date;
use keeper_core::models::{PreferencesUpdate, User};

/// Response for the user endpoints
#[derive(Serialize)]
pub struct UserResponse {
    pub user: User,
    /// Start of the next budget period
    pub next_reset: DateTime<Utc>,
    /// How this request was authenticated
    pub auth_method: AuthMethod,
}

impl UserResponse {
    fn new(user: User, auth_method: AuthMethod) -> Self {
        let next_reset = next_reset_date(Utc::now(), user.preferences.reset_day);
        Self {
            user,
            next_reset,
            auth_method,
        }
    }
}

/// GET /api/user - The authenticated user with preferences
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UserResponse>, AppError> {
    let current = current_user(&request)?;
    let user = state.db.require_user(current.id)?;

    state
        .db
        .log_audit(Some(current.id), "view", Some("user"), Some(current.id), None)?;

    Ok(Json(UserResponse::new(user, current.method)))
}

/// PUT /api/user/preferences - Update currency, theme, auto-adjust or reset day
pub async fn update_preferences(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<UserResponse>, AppError> {
    let current = current_user(&request)?;
    let update: PreferencesUpdate = read_json(request).await?;

    let user = state.db.update_preferences(current.id, &update)?;

    state.db.log_audit(
        Some(current.id),
        "update",
        Some("preferences"),
        Some(current.id),
        Some(&format!(
            "currency={}, theme={}, auto_adjust={}, reset_day={}",
            user.preferences.currency,
            user.preferences.theme.as_str(),
            user.preferences.auto_adjust_budgets,
            user.preferences.reset_day
        )),
    )?;

    Ok(Json(UserResponse::new(user, current.method)))
}

/// POST /api/reset-data - Clear recorded activity, keep categories and goals
pub async fn reset_data(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let current = current_user(&request)?;

    state.db.reset_user_data(current.id)?;

    state
        .db
        .log_audit(Some(current.id), "reset", Some("user_data"), Some(current.id), None)?;
    info!(user_id = current.id, "User data reset");

    Ok(Json(SuccessResponse { success: true }))
}
