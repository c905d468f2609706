//! HTTP surface: a single JSON endpoint in front of the relay
//!
//! ```text
//!   POST /fetch     BatchRequest -> { success, messages, count }
//!   GET  /healthz   "ok"
//! ```
//!
//! Access is gated by a shared secret in the `x-api-key` header. The
//! secret is fixed at startup; without one the endpoint stays open and
//! a warning is logged once.

use crate::error::Error;
use crate::normalize::MessageRecord;
use crate::relay::{BatchRequest, ImapRelay};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared-secret check for incoming requests.
#[derive(Debug, Clone)]
pub struct Authenticator {
    secret: Option<String>,
}

impl Authenticator {
    #[must_use]
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            warn!("No API key configured; the relay endpoint accepts unauthenticated requests");
        }
        Self { secret }
    }

    /// Accept the request if no secret is configured or the
    /// `x-api-key` header matches it.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), ApiError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };
        let presented = headers
            .get(API_KEY_HEADER)
            .map(axum::http::HeaderValue::as_bytes);
        match presented {
            Some(key) if constant_time_eq(key, secret.as_bytes()) => Ok(()),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

/// Byte comparison whose running time depends only on the lengths.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Immutable per-process state shared by all requests.
#[derive(Clone)]
pub struct AppState {
    relay: Arc<ImapRelay>,
    auth: Arc<Authenticator>,
}

impl AppState {
    #[must_use]
    pub fn new(relay: ImapRelay, auth: Authenticator) -> Self {
        Self {
            relay: Arc::new(relay),
            auth: Arc::new(auth),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub success: bool,
    pub messages: Vec<MessageRecord>,
    pub count: usize,
}

/// Request failures visible to the caller.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized,
    BadRequest(String),
    Relay(Error),
}

impl ApiError {
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::Relay(Error::Config(_)) => StatusCode::BAD_REQUEST,
            Self::Relay(e) if e.is_transport() => StatusCode::BAD_GATEWAY,
            Self::Relay(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn kind(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::BadRequest(_) => "bad_request",
            Self::Relay(Error::Config(_)) => "config",
            Self::Relay(e) if e.is_transport() => "transport",
            Self::Relay(_) => "internal",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Unauthorized => "Missing or invalid API key".to_string(),
            Self::BadRequest(msg) => msg.clone(),
            Self::Relay(e) => e.to_string(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self::Relay(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "success": false,
            "error": {
                "kind": self.kind(),
                "message": self.message(),
            },
        });
        (self.status(), Json(body)).into_response()
    }
}

#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/fetch", post(fetch_messages))
        .with_state(state)
}

/// `POST /fetch`
pub async fn fetch_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Result<Json<BatchResponse>, ApiError> {
    state.auth.check(&headers)?;
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    info!(
        host = %request.imap.host,
        mailbox = %request.mailbox,
        "Relay request"
    );

    match state.relay.fetch(&request).await {
        Ok(messages) => Ok(Json(BatchResponse {
            success: true,
            count: messages.len(),
            messages,
        })),
        Err(e) => {
            error!(host = %request.imap.host, "Relay request failed: {}", e);
            Err(e.into())
        }
    }
}
