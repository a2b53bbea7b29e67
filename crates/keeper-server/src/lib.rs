//! Keeper Web Server
//!
//! Axum-based REST API for the Keeper finance tracker.
//!
//! Security features:
//! - Session authentication (secure by default, use --no-auth for local dev)
//! - Login throttling per username
//! - Restrictive CORS policy
//! - Input validation (pagination limits, body size limits)
//! - Audit logging for API reads and writes
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use keeper_core::db::Database;

mod handlers;
pub mod session;
pub mod throttle;

use throttle::LoginThrottle;

/// Maximum pagination limit
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Maximum accepted JSON body size (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys that authenticate as the local user
    /// Format: "Bearer <key>" in Authorization header
    pub api_keys: Vec<String>,
    /// HMAC secret for session tokens
    pub session_secret: Vec<u8>,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Failed logins before a username is locked
    pub max_login_attempts: u32,
    /// How long a locked username stays locked
    pub lockout: std::time::Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
            session_secret: keeper_core::crypto::random_bytes(32),
            secure_cookies: true,
            max_login_attempts: throttle::DEFAULT_MAX_ATTEMPTS,
            lockout: throttle::DEFAULT_LOCKOUT,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    pub config: ServerConfig,
    pub throttle: LoginThrottle,
}

/// How a request was authenticated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// Authentication is disabled; requests act as the local user
    None,
    Session,
    ApiKey,
}

/// The user a protected request acts as
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser {
    pub id: i64,
    pub method: AuthMethod,
}

/// Authentication middleware - resolves the [`CurrentUser`] for protected routes
///
/// Checked in order: auth disabled (local user), session token from the
/// cookie or a bearer header, configured API key (local user).
///
/// # Security Notes
///
/// **Sessions**: HS256 tokens signed with the server's session secret. A token
/// for a user that no longer exists is rejected.
///
/// **API keys**: Compared using constant-time comparison to prevent timing attacks.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match authenticate(&state, request.headers()) {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    if !state.config.require_auth {
        let user = state.db.ensure_local_user()?;
        return Ok(CurrentUser {
            id: user.id,
            method: AuthMethod::None,
        });
    }

    if let Some(user_id) = session_user(state, headers)? {
        return Ok(CurrentUser {
            id: user_id,
            method: AuthMethod::Session,
        });
    }

    let api_key_valid = bearer_token(headers)
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        let user = state.db.ensure_local_user()?;
        info!(user_id = user.id, "Authenticated via API key");
        return Ok(CurrentUser {
            id: user.id,
            method: AuthMethod::ApiKey,
        });
    }

    warn!("Unauthorized request - no valid auth");
    Err(AppError::unauthorized("Authentication required"))
}

/// User id carried by a valid session token, if any
///
/// The cookie wins over an `Authorization: Bearer` header.
pub(crate) fn session_user(state: &AppState, headers: &HeaderMap) -> Result<Option<i64>, AppError> {
    let token = session::token_from_cookies(headers).or_else(|| bearer_token(headers));
    let Some(user_id) =
        token.and_then(|t| session::verify_token(t, &state.config.session_secret))
    else {
        return Ok(None);
    };

    if state.db.get_user(user_id)?.is_none() {
        warn!(user_id, "Session token for unknown user");
        return Ok(None);
    }
    Ok(Some(user_id))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Validate an API key against the configured keys using constant-time comparison
/// to prevent timing attacks.
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    for key in valid_keys {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        if provided_bytes.len() == key_bytes.len() && provided_bytes.ct_eq(key_bytes).into() {
            return true;
        }
    }
    false
}

/// The user resolved by [`auth_middleware`]
pub(crate) fn current_user(request: &Request) -> Result<CurrentUser, AppError> {
    request
        .extensions()
        .get::<CurrentUser>()
        .copied()
        .ok_or_else(|| AppError::unauthorized("Authentication required"))
}

/// Read and parse a JSON request body
pub(crate) async fn read_json<T: DeserializeOwned>(request: Request) -> Result<T, AppError> {
    let bytes = axum::body::to_bytes(request.into_body(), MAX_BODY_SIZE)
        .await
        .map_err(|_| AppError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| AppError::bad_request("Invalid JSON"))
}

/// Parse an optional `YYYY-MM-DD` query parameter
pub(crate) fn parse_date_param(
    name: &str,
    value: Option<&str>,
) -> Result<Option<chrono::NaiveDate>, AppError> {
    value
        .filter(|s| !s.is_empty())
        .map(|s| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
                AppError::bad_request(&format!("Invalid {} date (expected YYYY-MM-DD)", name))
            })
        })
        .transpose()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(db: Database, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let state = Arc::new(AppState {
        db,
        throttle: LoginThrottle::new(config.max_login_attempts, config.lockout),
        config: config.clone(),
    });

    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/auto-login", post(handlers::auto_login))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/status", get(handlers::auth_status));

    let protected_routes = Router::new()
        // User
        .route("/user", get(handlers::get_user))
        .route("/user/preferences", put(handlers::update_preferences))
        .route("/reset-data", post(handlers::reset_data))
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/categories/:id",
            put(handlers::update_category).delete(handlers::delete_category),
        )
        .route("/categories/:id/history", get(handlers::category_history))
        .route(
            "/categories/:id/history/undo",
            post(handlers::undo_category_history),
        )
        // Day notes and expenses
        .route("/notes", get(handlers::list_notes).post(handlers::create_note))
        .route(
            "/notes/:id",
            put(handlers::update_note).delete(handlers::delete_note),
        )
        .route("/notes/:id/expenses", post(handlers::add_expense))
        .route(
            "/expenses/:id",
            put(handlers::update_expense).delete(handlers::delete_expense),
        )
        // Income
        .route("/income", get(handlers::list_income).post(handlers::create_income))
        .route(
            "/income/:id",
            put(handlers::update_income).delete(handlers::delete_income),
        )
        // Savings
        .route(
            "/savings",
            get(handlers::list_savings).post(handlers::create_savings_goal),
        )
        .route("/savings/:id", delete(handlers::delete_savings_goal))
        .route("/savings/:id/target", put(handlers::update_savings_target))
        .route(
            "/savings/:id/contributions",
            post(handlers::add_contribution).delete(handlers::cash_out_goal),
        )
        .route(
            "/savings/:id/contributions/:cid",
            delete(handlers::delete_contribution),
        )
        // Statistics
        .route("/statistics", get(handlers::get_statistics))
        // Export
        .route("/export/json", post(handlers::export_json))
        .route("/export/csv", post(handlers::export_csv))
        // Audit log
        .route("/audit", get(handlers::list_audit_log))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api_routes = public_routes.merge(protected_routes);

    // Build CORS layer
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::DELETE,
        Method::OPTIONS,
    ];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    // CSP: restrict scripts to same-origin, allow inline styles, allow data: images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'",
    );

    let security_headers = ServiceBuilder::new()
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(security_headers);

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(
    db: Database,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }

    let app = create_router(db, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    details: serde_json::Map<String, serde_json::Value>,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn new(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            details: serde_json::Map::new(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, msg)
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::new(StatusCode::CONFLICT, msg)
    }

    pub fn too_many_requests(msg: &str) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    /// Add an extra field to the JSON error body
    pub fn with_detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let mut body = self.details;
        body.insert("error".to_string(), self.message.into());

        (self.status, Json(serde_json::Value::Object(body))).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        // Domain errors carry a message that is safe to show
        if let Some(core) = err.downcast_ref::<keeper_core::Error>() {
            match core {
                keeper_core::Error::NotFound(msg) => {
                    return Self::not_found(&format!("Not found: {}", msg))
                }
                keeper_core::Error::InvalidData(msg) => return Self::bad_request(msg),
                keeper_core::Error::Conflict(msg) => return Self::conflict(msg),
                keeper_core::Error::Auth(msg) => return Self::unauthorized(msg),
                _ => {}
            }
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            details: serde_json::Map::new(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
