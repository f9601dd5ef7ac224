//! Basic-auth middleware.

use crate::error::ErrorResponse;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Request, State};
use axum::http::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use sha2::{Digest, Sha256};

/// The credentials the platform registered the broker with.
#[derive(Clone)]
pub struct BrokerCredentials {
    username: String,
    password: String,
}

impl BrokerCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Compare supplied credentials against the configured ones. Digests
    /// are compared instead of the raw strings so a length mismatch does
    /// not short-circuit.
    fn matches(&self, username: &str, password: &str) -> bool {
        let username_ok = digest(username) == digest(&self.username);
        let password_ok = digest(password) == digest(&self.password);
        username_ok && password_ok
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

/// Reject any request that does not carry the configured basic-auth
/// credentials.
pub async fn basic_auth_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    if authorized(&state.credentials, req.headers()) {
        return next.run(req).await;
    }

    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ErrorResponse {
            description: "unauthorized".to_string(),
        }),
    )
        .into_response();
    response.headers_mut().insert(
        WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"broker\""),
    );
    response
}

fn authorized(credentials: &BrokerCredentials, headers: &HeaderMap) -> bool {
    let Some(value) = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    // The authorization scheme is case-insensitive. Compare bytes so a
    // multi-byte character straddling the scheme boundary cannot panic a
    // str slice.
    let bytes = value.as_bytes();
    if bytes.len() < 6 || !bytes[..6].eq_ignore_ascii_case(b"basic ") {
        return false;
    }
    let Ok(decoded) = BASE64.decode(value[6..].trim()) else {
        return false;
    };
    let Ok(decoded) = String::from_utf8(decoded) else {
        return false;
    };
    let Some((username, password)) = decoded.split_once(':') else {
        return false;
    };
    credentials.matches(username, password)
}
