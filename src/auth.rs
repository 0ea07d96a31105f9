//! Request authentication for the gateway
//!
//! Supports:
//! - Trusted identity header injected by an upstream reverse proxy,
//!   optionally checked against an allow-list of values
//! - HTTP Basic credentials against a single configured username/password
//! - Open mode: with neither strategy configured, every request passes
//!
//! The trusted header is attempted before Basic when both are configured;
//! the first strategy to succeed short-circuits, and a failed strategy falls
//! through to the next rather than rejecting. Malformed credentials
//! (undecodable Base64, missing colon, missing header) are indistinguishable
//! from wrong ones: the caller always sees the same 401.

use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use crate::config::AuthSettings;

/// Resolved caller identity
///
/// Attached to the request extensions for the lifetime of that request and
/// never written back into transport-level headers or persisted anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity(String);

impl Identity {
    /// Wrap a resolved user name
    pub fn new(user: impl Into<String>) -> Self {
        Self(user.into())
    }

    /// The user name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the authentication decision procedure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No strategy is configured; the request is forwarded without an identity
    Anonymous,
    /// A strategy admitted the request and resolved this identity
    User(Identity),
    /// No strategy admitted the request
    Denied,
}

/// Run the authentication decision procedure against a request's headers
///
/// Pure apart from reading the immutable settings; safe to call from any
/// number of concurrent request tasks.
#[must_use]
pub fn authenticate(auth: &AuthSettings, headers: &HeaderMap) -> AuthOutcome {
    if auth.is_open() {
        return AuthOutcome::Anonymous;
    }

    if auth.has_header() {
        if let Some(identity) = check_trusted_header(auth, headers) {
            return AuthOutcome::User(identity);
        }
    }

    if auth.has_basic() {
        if let Some(identity) = check_basic(auth, headers) {
            return AuthOutcome::User(identity);
        }
    }

    AuthOutcome::Denied
}

/// Validate the trusted identity header, if present with a non-empty value
fn check_trusted_header(auth: &AuthSettings, headers: &HeaderMap) -> Option<Identity> {
    let value = headers.get(auth.header.name.as_str())?.to_str().ok()?;
    if value.is_empty() {
        return None;
    }

    if !auth.header.values.is_empty() && !auth.header.values.iter().any(|v| v == value) {
        return None;
    }

    Some(Identity::new(value))
}

/// Validate `Authorization: Basic` credentials against the configured pair
fn check_basic(auth: &AuthSettings, headers: &HeaderMap) -> Option<Identity> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;

    (user == auth.basic.username && pass == auth.basic.password)
        .then(|| Identity::new(auth.basic.username.clone()))
}

/// Authentication middleware wrapping every downstream handler
pub async fn auth_middleware(
    State(auth): State<Arc<AuthSettings>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    match authenticate(&auth, request.headers()) {
        AuthOutcome::Anonymous => next.run(request).await,
        AuthOutcome::User(identity) => {
            debug!(user = %identity, path = %request.uri().path(), "Authenticated request");
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        AuthOutcome::Denied => {
            // Expected outcome, never logged as an error
            debug!(path = %request.uri().path(), "No strategy admitted the request");
            unauthorized_response(&auth)
        }
    }
}

/// Build the 401 response, with a Basic challenge when Basic auth is configured
fn unauthorized_response(auth: &AuthSettings) -> Response {
    if auth.has_basic() {
        (
            StatusCode::UNAUTHORIZED,
            [(
                header::WWW_AUTHENTICATE,
                format!("Basic realm=\"{}\"", auth.basic.realm),
            )],
            "401 Unauthorized",
        )
            .into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "401 Unauthorized").into_response()
    }
}
