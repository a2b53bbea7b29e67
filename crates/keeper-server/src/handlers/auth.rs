//! Authentication-related handlers

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::session;
use crate::throttle::FailureOutcome;
use crate::{read_json, session_user, AppError, AppState, SuccessResponse};
use keeper_core::auth::{normalize_username, verify_password};
use keeper_core::models::User;

/// Response for GET /api/health
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

/// GET /api/health - Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

/// Response for a successful login
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: User,
    /// Same token as the session cookie, for bearer clients
    pub token: String,
}

fn with_session(state: &AppState, user: User) -> Result<Response, AppError> {
    let token = session::issue_token(user.id, &state.config.session_secret)?;
    let cookie = session::session_cookie(&token, state.config.secure_cookies);

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse { user, token }),
    )
        .into_response())
}

/// POST /api/auth/auto-login - Sign in as the local user
///
/// Refused once authentication is required and the user has set a password,
/// so the password login and its throttle cannot be skipped.
pub async fn auto_login(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    let user = state.db.ensure_local_user()?;

    if state.config.require_auth && state.db.get_password_hash(user.id)?.is_some() {
        warn!(user_id = user.id, "Auto-login refused, password login required");
        return Err(AppError::unauthorized("Password login required"));
    }

    state
        .db
        .log_audit(Some(user.id), "auto_login", Some("user"), Some(user.id), None)?;
    info!(user_id = user.id, "Auto-login");

    with_session(&state, user)
}

/// Request body for password login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// POST /api/auth/login - Sign in with username and password
///
/// Repeated failures lock the username (see [`crate::throttle`]).
pub async fn login(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Response, AppError> {
    let req: LoginRequest = read_json(request).await?;

    let username = normalize_username(&req.username);
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Username and password are required"));
    }

    if let Some(remaining) = state.throttle.locked_for(&username) {
        return Err(
            AppError::too_many_requests("Too many failed attempts. Please try again later.")
                .with_detail("lockout_seconds", remaining.as_secs().max(1)),
        );
    }

    let user = state.db.find_user_by_username(&username)?;
    let verified = match &user {
        Some(user) => state
            .db
            .get_password_hash(user.id)?
            .map(|hash| verify_password(&req.password, &hash))
            .unwrap_or(false),
        None => false,
    };

    match user {
        Some(user) if verified => {
            state.throttle.clear(&username);
            state
                .db
                .log_audit(Some(user.id), "login", Some("user"), Some(user.id), None)?;
            info!(user_id = user.id, "Password login");
            with_session(&state, user)
        }
        _ => {
            warn!(username = %username, "Failed login attempt");
            match state.throttle.record_failure(&username) {
                FailureOutcome::Locked(lockout) => Err(AppError::too_many_requests(&format!(
                    "Too many failed attempts. Account locked for {} seconds.",
                    lockout.as_secs()
                ))
                .with_detail("lockout_seconds", lockout.as_secs())),
                FailureOutcome::Remaining(left) => Err(AppError::unauthorized(&format!(
                    "Invalid username or password. {} attempts remaining.",
                    left
                ))
                .with_detail("attempts_remaining", left)),
            }
        }
    }
}

/// POST /api/auth/logout - Clear the session cookie
pub async fn logout(State(state): State<Arc<AppState>>) -> Response {
    let cookie = session::clear_session_cookie(state.config.secure_cookies);
    (
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(SuccessResponse { success: true }),
    )
        .into_response()
}

/// Response for GET /api/auth/status
#[derive(Serialize)]
pub struct AuthStatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// GET /api/auth/status - Report whether the request carries a valid session
pub async fn auth_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<AuthStatusResponse>, AppError> {
    let user = match session_user(&state, &headers)? {
        Some(user_id) => state.db.get_user(user_id)?,
        None => None,
    };

    Ok(Json(AuthStatusResponse {
        authenticated: user.is_some(),
        user,
    }))
}
