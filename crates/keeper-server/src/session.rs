//! Session tokens
//!
//! A session is an HS256 JWT whose subject is the user id. It travels in the
//! `keeper_session` cookie, or as a bearer token for non-browser clients.

use axum::http::{header, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "keeper_session";

/// Session lifetime in seconds (10 days)
pub const SESSION_TTL_SECS: i64 = 10 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

/// Sign a session token for a user
pub fn issue_token(user_id: i64, secret: &[u8]) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        iat: now,
        exp: now + SESSION_TTL_SECS,
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?;
    Ok(token)
}

/// Verify a session token and return the user id it was issued for
///
/// Returns `None` for bad signatures, expired tokens and malformed subjects.
pub fn verify_token(token: &str, secret: &[u8]) -> Option<i64> {
    let validation = Validation::new(Algorithm::HS256);
    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret), &validation).ok()?;
    data.claims.sub.parse().ok()
}

/// Pull the session token out of the cookie header
pub fn token_from_cookies(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
}

/// `Set-Cookie` value carrying a fresh session
pub fn session_cookie(token: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that removes the session
pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", SESSION_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &[u8] = b"test-session-secret";

    #[test]
    fn test_issue_and_verify() {
        let token = issue_token(42, SECRET).unwrap();
        assert_eq!(verify_token(&token, SECRET), Some(42));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = issue_token(42, SECRET).unwrap();
        assert_eq!(verify_token(&token, b"another-secret"), None);
    }

    #[test]
    fn test_expired_token_rejected() {
        let past = Utc::now().timestamp() - 2 * SESSION_TTL_SECS;
        let claims = Claims {
            sub: "1".to_string(),
            iat: past,
            exp: past + 60,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();
        assert_eq!(verify_token(&token, SECRET), None);
    }

    #[test]
    fn test_garbage_rejected() {
        assert_eq!(verify_token("not.a.token", SECRET), None);
        assert_eq!(verify_token("", SECRET), None);
    }

    #[test]
    fn test_token_from_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; keeper_session=abc.def.ghi; other=1"),
        );
        assert_eq!(token_from_cookies(&headers), Some("abc.def.ghi"));

        let mut empty = HeaderMap::new();
        empty.insert(header::COOKIE, HeaderValue::from_static("keeper_session="));
        assert_eq!(token_from_cookies(&empty), None);
        assert_eq!(token_from_cookies(&HeaderMap::new()), None);
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("tok", true);
        assert!(cookie.starts_with("keeper_session=tok;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.ends_with("; Secure"));

        assert!(!session_cookie("tok", false).contains("Secure"));
        assert!(clear_session_cookie(false).contains("Max-Age=0"));
    }
}
