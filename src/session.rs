//! Per-browser session kept in a signed cookie
//!
//! The cookie holds the whole session record. Nothing is stored on the
//! server, so a restart with the same signing secret keeps people signed in.
//! Every request that arrives with a live session pushes its expiry forward;
//! a session idle for longer than the configured window is dropped.

use std::time::Duration;

use axum::{
    Json,
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, SameSite, SignedCookieJar};
use serde::{Deserialize, Serialize};

use crate::app::AppState;
use crate::roster::Verified;

pub const SESSION_COOKIE: &str = "session";

/// Session record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Set once the email was found in the roster
    pub verified: bool,

    pub user_email: String,

    pub user_full_name: String,

    /// Unix seconds of the last request carrying this session
    pub last_seen: i64,
}

impl SessionData {
    pub fn for_verified(user: &Verified, now: i64) -> Self {
        SessionData {
            verified: true,
            user_email: user.email.clone(),
            user_full_name: user.full_name.clone(),
            last_seen: now,
        }
    }

    /// Still inside the inactivity window
    pub fn is_live(&self, ttl: Duration, now: i64) -> bool {
        now.saturating_sub(self.last_seen) <= ttl.as_secs() as i64
    }
}

/// Current time in Unix seconds
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Session from the cookie jar, if present, intact and not expired
pub fn load(jar: &SignedCookieJar, ttl: Duration, now: i64) -> Option<SessionData> {
    let cookie = jar.get(SESSION_COOKIE)?;
    let json = urlencoding::decode(cookie.value()).ok()?;
    let data: SessionData = serde_json::from_str(&json).ok()?;
    data.is_live(ttl, now).then_some(data)
}

/// Put a session into the jar
pub fn store(jar: SignedCookieJar, data: &SessionData, ttl: Duration) -> SignedCookieJar {
    let json = match serde_json::to_string(data) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Session could not be serialized: {}", e);
            return jar;
        }
    };
    let cookie = Cookie::build((SESSION_COOKIE, urlencoding::encode(&json).into_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(ttl.as_secs() as i64));
    jar.add(cookie)
}

/// Drop the session unconditionally
pub fn clear(jar: SignedCookieJar) -> SignedCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

fn response_sets_session(response: &Response) -> bool {
    let prefix = format!("{}=", SESSION_COOKIE);
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .any(|v| v.to_str().is_ok_and(|s| s.starts_with(&prefix)))
}

/// Sliding expiry for every route
///
/// A live session is made available to handlers as a request extension and
/// re-issued with a fresh `last_seen`; an expired or tampered cookie is
/// removed. Responses that already set or clear the session are left alone.
pub async fn slide_session(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let ttl = state.config.session_ttl;
    let now = now();
    let session = load(&jar, ttl, now);
    let had_cookie = jar.get(SESSION_COOKIE).is_some();

    if let Some(data) = &session {
        request.extensions_mut().insert(data.clone());
    }

    let response = next.run(request).await;
    if response_sets_session(&response) {
        return response;
    }

    match session {
        Some(mut data) => {
            data.last_seen = now;
            (store(jar, &data, ttl), response).into_response()
        }
        None if had_cookie => {
            log::debug!("Dropping expired or invalid session cookie");
            (clear(jar), response).into_response()
        }
        None => response,
    }
}

fn is_verified(request: &Request) -> bool {
    request
        .extensions()
        .get::<SessionData>()
        .is_some_and(|s| s.verified)
}

/// Gate for page routes: unverified visitors go back to the landing page
pub async fn require_verified(request: Request, next: Next) -> Response {
    if is_verified(&request) {
        next.run(request).await
    } else {
        Redirect::to("/").into_response()
    }
}

/// Gate for JSON routes: unverified callers get 401
pub async fn require_verified_api(request: Request, next: Next) -> Response {
    if is_verified(&request) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response()
    }
}
