//! Server API tests

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{NaiveDate, TimeZone, Utc};
use http_body_util::BodyExt;
use keeper_core::auth::hash_password;
use keeper_core::models::{NewCategory, NewDayNote, NewExpense};
use serde_json::{json, Value};
use tower::ServiceExt;

fn setup_test_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: false,
        allowed_origins: vec![],
        ..Default::default()
    };
    (create_router(db.clone(), None, config), db)
}

fn setup_auth_app() -> (Router, Database) {
    let db = Database::in_memory().unwrap();
    let config = ServerConfig {
        require_auth: true,
        api_keys: vec!["test-api-key-123".to_string()],
        ..Default::default()
    };
    (create_router(db.clone(), None, config), db)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn send_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn delete_req(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn get_body_json(response: axum::response::Response) -> Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn session_cookie_from(response: &axum::response::Response) -> String {
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn category_body(name: &str, allocated: f64) -> Value {
    json!({
        "name": name,
        "color": "#FF8A65",
        "icon": "icon-categories",
        "allocated_amount": allocated
    })
}

async fn create_category(app: &Router, name: &str, allocated: f64) -> i64 {
    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/categories", category_body(name, allocated)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    get_body_json(response).await["id"].as_i64().unwrap()
}

async fn create_note(app: &Router, date: &str) -> i64 {
    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/notes", json!({ "date": date })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    get_body_json(response).await["id"].as_i64().unwrap()
}

async fn add_expense(app: &Router, note_id: i64, category_id: i64, amount: f64) -> Value {
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/notes/{}/expenses", note_id),
            json!({ "category_id": category_id, "label": "Item", "amount": amount }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    get_body_json(response).await
}

async fn category_json(app: &Router, id: i64) -> Value {
    let response = app.clone().oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    json["categories"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["id"] == id)
        .cloned()
        .unwrap()
}

// ========== Health and Security Tests ==========

#[tokio::test]
async fn test_health_is_public() {
    let (app, _db) = setup_auth_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_security_headers() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/health")).await.unwrap();

    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers
        .get("content-security-policy")
        .unwrap()
        .to_str()
        .unwrap()
        .contains("frame-ancestors 'none'"));
}

// ========== Authentication Tests ==========

#[tokio::test]
async fn test_auth_required() {
    let (app, _db) = setup_auth_app();

    let response = app.oneshot(get("/api/categories")).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Authentication required");
}

#[tokio::test]
async fn test_auth_with_api_key() {
    let (app, _db) = setup_auth_app();

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header("authorization", "Bearer test-api-key-123")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["auth_method"], "api_key");
    assert_eq!(json["user"]["auth_provider"], "local");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header("authorization", "Bearer wrong-api-key-12")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auto_login_session_cookie() {
    let (app, _db) = setup_auth_app();

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/auth/auto-login", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let cookie = session_cookie_from(&response);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["preferences"]["currency"], "USD");
    assert!(json["token"].as_str().is_some());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header("cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["auth_method"], "session");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/status")
                .header("cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["authenticated"], true);
}

#[tokio::test]
async fn test_auto_login_refused_once_password_set() {
    let (app, db) = setup_auth_app();
    let user = db.ensure_local_user().unwrap();
    db.set_credentials(user.id, "owner", &hash_password("correct horse").unwrap())
        .unwrap();

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/auth/auto-login", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Password login required");

    let response = app.oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_auto_login_allowed_with_password_when_auth_disabled() {
    let (app, db) = setup_test_app();
    let user = db.ensure_local_user().unwrap();
    db.set_credentials(user.id, "owner", &hash_password("correct horse").unwrap())
        .unwrap();

    let response = app
        .oneshot(send_json("POST", "/api/auth/auto-login", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_some());
}

#[tokio::test]
async fn test_bearer_session_token() {
    let (app, _db) = setup_auth_app();

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/auth/auto-login", json!({})))
        .await
        .unwrap();
    let token = get_body_json(response).await["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/categories")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forged_session_rejected() {
    let (app, _db) = setup_auth_app();

    let forged = session::issue_token(1, b"some-other-secret").unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header("cookie", format!("keeper_session={}", forged))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(get("/api/auth/status")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["authenticated"], false);
    assert!(json.get("user").is_none());
}

#[tokio::test]
async fn test_password_login() {
    let (app, db) = setup_auth_app();
    let user = db.ensure_local_user().unwrap();
    db.set_credentials(user.id, "alice", &hash_password("correct horse").unwrap())
        .unwrap();

    // Username is matched case-insensitively
    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            json!({ "username": " Alice ", "password": "correct horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = session_cookie_from(&response);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["username"], "alice");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/user")
                .header("cookie", &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let (app, _db) = setup_auth_app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            json!({ "username": "alice" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_lockout() {
    let (app, db) = setup_auth_app();
    let user = db.ensure_local_user().unwrap();
    db.set_credentials(user.id, "alice", &hash_password("correct horse").unwrap())
        .unwrap();

    let wrong = json!({ "username": "alice", "password": "wrong password" });

    for remaining in (1..5).rev() {
        let response = app
            .clone()
            .oneshot(send_json("POST", "/api/auth/login", wrong.clone()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = get_body_json(response).await;
        assert_eq!(json["attempts_remaining"], remaining);
    }

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/auth/login", wrong))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = get_body_json(response).await;
    assert_eq!(json["lockout_seconds"], 60);

    // Even the right password is refused while locked
    let response = app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            json!({ "username": "alice", "password": "correct horse" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_unknown_user_login_counts_attempts() {
    let (app, _db) = setup_auth_app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/auth/login",
            json!({ "username": "nobody", "password": "whatever1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = get_body_json(response).await;
    assert_eq!(json["attempts_remaining"], 4);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (app, _db) = setup_auth_app();

    let response = app
        .oneshot(send_json("POST", "/api/auth/logout", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response.headers().get(header::SET_COOKIE).unwrap();
    assert!(set_cookie.to_str().unwrap().contains("Max-Age=0"));
}

// ========== User Tests ==========

#[tokio::test]
async fn test_get_user() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/user")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["display_name"], "Local User");
    assert_eq!(json["user"]["preferences"]["reset_day"], 1);
    assert_eq!(json["auth_method"], "none");
    assert!(json["next_reset"].is_string());
}

#[tokio::test]
async fn test_update_preferences() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/user/preferences",
            json!({ "currency": "eur", "theme": "dark", "reset_day": 15 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["user"]["preferences"]["currency"], "EUR");
    assert_eq!(json["user"]["preferences"]["theme"], "dark");
    assert_eq!(json["user"]["preferences"]["reset_day"], 15);

    // Reset day outside 1..=29 is rejected
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/user/preferences",
            json!({ "reset_day": 31 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(send_json(
            "PUT",
            "/api/user/preferences",
            json!({ "currency": "EURO" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Category Tests ==========

#[tokio::test]
async fn test_category_crud() {
    let (app, _db) = setup_test_app();

    let id = create_category(&app, "Food", 150.0).await;

    let response = app.clone().oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["categories"].as_array().unwrap().len(), 1);
    assert_eq!(json["categories"][0]["status"], "healthy");
    assert!(json["history"].as_array().unwrap().is_empty());
    assert!(json["next_reset"].is_string());

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/categories/{}", id),
            category_body("Groceries", 200.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["name"], "Groceries");
    assert_eq!(json["allocated_amount"], 200.0);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/categories/{}/history", id)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["reason"], "manual-adjust");
    assert_eq!(json[0]["old_amount"], 150.0);

    let response = app
        .clone()
        .oneshot(delete_req(&format!("/api/categories/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(get(&format!("/api/categories/{}/history", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_category_validation() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/categories",
            category_body("", 10.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/categories",
            category_body("Food", -5.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_json() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/categories")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert_eq!(json["error"], "Invalid JSON");
}

#[tokio::test]
async fn test_delete_category_with_expenses_conflicts() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;
    add_expense(&app, note, category, 20.0).await;

    let response = app
        .oneshot(delete_req(&format!("/api/categories/{}", category)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_undo_without_history_not_found() {
    let (app, _db) = setup_test_app();
    let id = create_category(&app, "Food", 100.0).await;

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/categories/{}/history/undo", id),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Budget Engine over HTTP ==========

#[tokio::test]
async fn test_overspend_auto_adjusts_and_undo_restores() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;

    add_expense(&app, note, category, 80.0).await;
    add_expense(&app, note, category, 30.0).await;

    let food = category_json(&app, category).await;
    assert_eq!(food["status"], "adjusted");
    assert_eq!(food["allocated_amount"], 110.0);
    assert_eq!(food["spent_total"], 110.0);

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/categories/{}/history/undo", category),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["allocated_amount"], 100.0);
    assert_eq!(json["spent_total"], 100.0);
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn test_overspend_without_auto_adjust_overdraws() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            "/api/user/preferences",
            json!({ "auto_adjust_budgets": false }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let category = create_category(&app, "Fun", 50.0).await;
    let note = create_note(&app, "2025-06-02").await;
    let expense = add_expense(&app, note, category, 65.0).await;

    let fun = category_json(&app, category).await;
    assert_eq!(fun["status"], "overdrawn");
    assert_eq!(fun["overdrawn_amount"], 15.0);
    assert_eq!(fun["allocated_amount"], 50.0);

    // Shrinking the expense brings the category back within budget
    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/expenses/{}", expense["id"]),
            json!({ "amount": 40.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let fun = category_json(&app, category).await;
    assert_eq!(fun["status"], "healthy");
    assert_eq!(fun["spent_total"], 40.0);
    assert_eq!(fun["overdrawn_amount"], 0.0);
}

#[tokio::test]
async fn test_manual_edit_below_spending_overdraws() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;
    add_expense(&app, note, category, 60.0).await;

    let response = app
        .oneshot(send_json(
            "PUT",
            &format!("/api/categories/{}", category),
            category_body("Food", 40.0),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["allocated_amount"], 40.0);
    assert_eq!(json["status"], "overdrawn");
    assert_eq!(json["overdrawn_amount"], 20.0);
}

#[tokio::test]
async fn test_categories_read_runs_due_reset() {
    let (app, db) = setup_test_app();
    let user = db.ensure_local_user().unwrap();

    let category = db
        .create_category(
            user.id,
            &NewCategory {
                name: "Food".to_string(),
                color: "#FF8A65".to_string(),
                icon: "icon-categories".to_string(),
                allocated_amount: 100.0,
            },
        )
        .unwrap();
    let note = db
        .create_note(
            user.id,
            &NewDayNote {
                date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                pinned: false,
            },
        )
        .unwrap();
    db.add_expense(
        user.id,
        note.id,
        &NewExpense {
            category_id: category.id,
            label: "Old".to_string(),
            amount: 25.0,
            currency: None,
            tags: Vec::new(),
        },
    )
    .unwrap();

    // Last reset long ago: the next read starts a new period
    let long_ago = Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap();
    db.mark_period_started(user.id, long_ago).unwrap();

    let response = app.oneshot(get("/api/categories")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["categories"][0]["spent_total"], 0.0);
    assert_eq!(json["history"][0]["reason"], "monthly-reset");
    assert_eq!(json["history"][0]["old_amount"], 25.0);
}

#[tokio::test]
async fn test_expense_unknown_category_not_found() {
    let (app, _db) = setup_test_app();
    let note = create_note(&app, "2025-06-01").await;

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            &format!("/api/notes/{}/expenses", note),
            json!({ "category_id": 9999, "label": "Ghost", "amount": 5.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // Nothing was recorded on the note
    let response = app.oneshot(get("/api/notes")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["total"], 0.0);
    assert!(json[0]["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_expense_after_due_reset_counts_in_new_period() {
    let (app, db) = setup_test_app();
    let user = db.ensure_local_user().unwrap();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;

    let long_ago = Utc.with_ymd_and_hms(2020, 3, 10, 12, 0, 0).unwrap();
    db.mark_period_started(user.id, long_ago).unwrap();

    // First request after the reset day is a write, not a read
    add_expense(&app, note, category, 40.0).await;

    let food = category_json(&app, category).await;
    assert_eq!(food["spent_total"], 40.0);

    // The period was started before the write, with nothing to zero yet
    assert!(db.list_history(user.id, Some(category)).unwrap().is_empty());
    let user = db.require_user(user.id).unwrap();
    assert!(user.last_reset_date.unwrap() > long_ago);
}

// ========== Notes Tests ==========

#[tokio::test]
async fn test_notes_flow() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let june = create_note(&app, "2025-06-01").await;
    let july = create_note(&app, "2025-07-01").await;

    let expense = add_expense(&app, june, category, 12.5).await;
    assert_eq!(expense["currency"], "USD");
    add_expense(&app, july, category, 7.5).await;

    let response = app
        .clone()
        .oneshot(get("/api/notes?from=2025-06-15&to=2025-07-31"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let notes = json.as_array().unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0]["date"], "2025-07-01");
    assert_eq!(notes[0]["total"], 7.5);

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/notes/{}", june),
            json!({ "pinned": true }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["pinned"], true);

    // Deleting a note reverses its spending
    let response = app
        .clone()
        .oneshot(delete_req(&format!("/api/notes/{}", june)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let food = category_json(&app, category).await;
    assert_eq!(food["spent_total"], 7.5);
}

#[tokio::test]
async fn test_notes_bad_date_param() {
    let (app, _db) = setup_test_app();

    let response = app.oneshot(get("/api/notes?from=June")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_delete_expense() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;
    let expense = add_expense(&app, note, category, 30.0).await;

    let response = app
        .clone()
        .oneshot(delete_req(&format!("/api/expenses/{}", expense["id"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let food = category_json(&app, category).await;
    assert_eq!(food["spent_total"], 0.0);

    let response = app
        .oneshot(delete_req(&format!("/api/expenses/{}", expense["id"])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Income Tests ==========

#[tokio::test]
async fn test_income_crud() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json(
            "POST",
            "/api/income",
            json!({ "name": "Salary", "amount": 3000.0, "frequency": "monthly", "payday": "1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let id = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/income/{}", id),
            json!({ "amount": 3200.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["amount"], 3200.0);
    assert_eq!(json["name"], "Salary");

    let response = app.clone().oneshot(get("/api/income")).await.unwrap();
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);

    let response = app
        .clone()
        .oneshot(delete_req(&format!("/api/income/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .oneshot(delete_req(&format!("/api/income/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ========== Savings Tests ==========

#[tokio::test]
async fn test_savings_flow() {
    let (app, _db) = setup_test_app();

    // Listing creates the default goal
    let response = app.clone().oneshot(get("/api/savings")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json.as_array().unwrap().len(), 1);
    assert_eq!(json[0]["title"], "Savings Funds");
    let goal = json[0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(send_json(
            "PUT",
            &format!("/api/savings/{}/target", goal),
            json!({ "target_amount": 500.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(get_body_json(response).await["target_amount"], 500.0);

    for amount in [100.0, 50.25] {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                &format!("/api/savings/{}/contributions", goal),
                json!({ "amount": amount }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(get("/api/savings")).await.unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json[0]["current_saved"], 150.25);
    let first = json[0]["contributions"][0]["id"].as_i64().unwrap();

    let response = app
        .clone()
        .oneshot(delete_req(&format!(
            "/api/savings/{}/contributions/{}",
            goal, first
        )))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        get_body_json(response).await["contributions"]
            .as_array()
            .unwrap()
            .len(),
        1
    );

    let response = app
        .clone()
        .oneshot(delete_req(&format!("/api/savings/{}/contributions", goal)))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["current_saved"], 0.0);

    let response = app
        .oneshot(delete_req(&format!("/api/savings/{}", goal)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_negative_contribution_rejected() {
    let (app, _db) = setup_test_app();

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/savings", json!({ "title": "Trip" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let goal = get_body_json(response).await["id"].as_i64().unwrap();

    let response = app
        .oneshot(send_json(
            "POST",
            &format!("/api/savings/{}/contributions", goal),
            json!({ "amount": -10.0 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Statistics Tests ==========

#[tokio::test]
async fn test_statistics() {
    let (app, _db) = setup_test_app();
    let food = create_category(&app, "Food", 500.0).await;
    let fun = create_category(&app, "Fun", 500.0).await;
    let june = create_note(&app, "2025-06-01").await;
    let july = create_note(&app, "2025-07-01").await;
    add_expense(&app, june, food, 30.0).await;
    add_expense(&app, july, fun, 10.0).await;

    let response = app.clone().oneshot(get("/api/statistics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["total_expenses"], 40.0);
    assert_eq!(json["transaction_count"], 2);
    assert_eq!(json["category_breakdown"][0]["name"], "Food");
    assert_eq!(json["category_breakdown"][0]["percentage"], 75.0);
    assert_eq!(json["monthly"][0]["month"], "2025-06");
    assert_eq!(json["monthly"][1]["month"], "2025-07");

    let response = app
        .clone()
        .oneshot(get("/api/statistics?from=2025-07-01&to=2025-07-31"))
        .await
        .unwrap();
    let json = get_body_json(response).await;
    assert_eq!(json["total_expenses"], 10.0);

    let response = app
        .oneshot(get("/api/statistics?from=2025-08-01&to=2025-07-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Export Tests ==========

#[tokio::test]
async fn test_export_json_and_csv() {
    let (app, _db) = setup_test_app();
    create_category(&app, "Food", 100.0).await;

    for (uri, format) in [("/api/export/json", "json"), ("/api/export/csv", "csv")] {
        let response = app
            .clone()
            .oneshot(send_json(
                "POST",
                uri,
                json!({ "passphrase": "long enough passphrase" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = get_body_json(response).await;
        assert_eq!(json["format"], format);
        assert!(json["ciphertext"].is_string());
        assert!(json["salt"].is_string());
        assert!(json["nonce"].is_string());

        let export: keeper_core::EncryptedExport = serde_json::from_value(json).unwrap();
        keeper_core::export::decrypt_export(&export, "long enough passphrase").unwrap();
    }
}

#[tokio::test]
async fn test_export_short_passphrase() {
    let (app, _db) = setup_test_app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/api/export/json",
            json!({ "passphrase": "short" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Reset and Audit Tests ==========

#[tokio::test]
async fn test_reset_data() {
    let (app, _db) = setup_test_app();
    let category = create_category(&app, "Food", 100.0).await;
    let note = create_note(&app, "2025-06-01").await;
    add_expense(&app, note, category, 40.0).await;

    let response = app
        .clone()
        .oneshot(send_json("POST", "/api/reset-data", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await["success"], true);

    let food = category_json(&app, category).await;
    assert_eq!(food["spent_total"], 0.0);
    assert_eq!(food["allocated_amount"], 100.0);

    let response = app.oneshot(get("/api/notes")).await.unwrap();
    assert!(get_body_json(response).await.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_audit_log() {
    let (app, _db) = setup_test_app();
    create_category(&app, "Food", 100.0).await;

    let response = app.clone().oneshot(get("/api/audit?limit=1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "create");
    assert_eq!(entries[0]["entity_type"], "category");

    // Out-of-range limits are clamped
    let response = app.oneshot(get("/api/audit?limit=0")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(get_body_json(response).await.as_array().unwrap().len(), 1);
}
