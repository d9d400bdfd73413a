//! HTTP surface
//!
//! - `GET /ip/{token}`: 307 redirect to the token's endpoint
//! - `GET /register/{token}/{ip}`: point the token at `ip`
//! - `GET /register/{token}`: point the token at the caller's address
//! - `GET /health`: liveness
//!
//! The secret for protected tokens is taken from `?secret=` or, failing
//! that, the `X-Token-Secret` header.

use axum::{
    Json, Router,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokendns_core::{Directory, Error};
use tower_http::trace::TraceLayer;

/// Header carrying the token secret
pub const SECRET_HEADER: &str = "x-token-secret";

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<Directory>,
}

/// Build the router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/ip/:token", get(resolve))
        .route("/register/:token", get(register_from_origin))
        .route("/register/:token/:ip", get(register_explicit))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterQuery {
    secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub token: String,
    pub ip: String,
}

/// GET /ip/{token}
async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Redirect, AppError> {
    let endpoint = state.directory.lookup(&token)?;
    Ok(Redirect::temporary(&endpoint.redirect_url()))
}

/// GET /register/{token}/{ip}
async fn register_explicit(
    State(state): State<AppState>,
    Path((token, ip)): Path<(String, String)>,
    Query(query): Query<RegisterQuery>,
    headers: HeaderMap,
    origin: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<RegisterResponse>, AppError> {
    register(&state, &token, Some(&ip), query, &headers, origin).await
}

/// GET /register/{token}
async fn register_from_origin(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Query(query): Query<RegisterQuery>,
    headers: HeaderMap,
    origin: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<RegisterResponse>, AppError> {
    register(&state, &token, None, query, &headers, origin).await
}

async fn register(
    state: &AppState,
    token: &str,
    ip: Option<&str>,
    query: RegisterQuery,
    headers: &HeaderMap,
    origin: Option<ConnectInfo<SocketAddr>>,
) -> Result<Json<RegisterResponse>, AppError> {
    let secret = query.secret.or_else(|| {
        headers
            .get(SECRET_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    });
    let origin = origin.map(|ConnectInfo(addr)| addr.ip().to_canonical().to_string());

    let registration = state
        .directory
        .register(token, secret.as_deref(), ip, origin.as_deref())
        .await?;

    Ok(Json(RegisterResponse {
        token: registration.token,
        ip: registration.endpoint.to_string(),
    }))
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

/// Axum error response wrapper for directory errors
pub struct AppError(Error);

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self.0 {
            Error::InvalidToken | Error::MissingEndpoint | Error::InvalidEndpoint(_) => {
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            Error::Forbidden => (StatusCode::FORBIDDEN, self.0.to_string()),
            Error::Persistence(_) | Error::Store(_) | Error::Config(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to persist registration".to_string(),
            ),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}
