//! Login, logout, chef-centre login, and the session-token middleware
//!
//! Tokens travel in the `X-Auth-Token` header. Credentials and full
//! tokens are never written to the log.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use shield_common::db::Verificateur;
use shield_common::Error;
use tracing::info;

use crate::api::{ApiError, ApiResult};
use crate::db::verificateurs;
use crate::sessions::{new_token, ChefSession, LoginSession};
use crate::AppState;

const TOKEN_HEADER: &str = "x-auth-token";

/// SHA-256 hex digest of a password
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn token_from(request: &Request) -> Option<String> {
    request
        .headers()
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

/// Require a live login or chef-centre session on protected routes
pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let authorized = token_from(&request)
        .map(|t| state.sessions.get(&t).is_some() || state.chef_sessions.get(&t).is_some())
        .unwrap_or(false);

    if authorized {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "missing or invalid session token" })),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub telephone: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub verificateur: Verificateur,
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    if req.telephone.is_empty() || req.password.is_empty() {
        return Err(ApiError(Error::InvalidRequest(
            "telephone and password are required".to_string(),
        )));
    }

    let verificateur = verificateurs::find_by_telephone(&state.db, &req.telephone)
        .await?
        .ok_or_else(|| Error::InvalidRequest("invalid credentials".to_string()))?;

    if verificateur.password != sha256_hex(&req.password) {
        return Err(ApiError(Error::InvalidRequest(
            "invalid credentials".to_string(),
        )));
    }

    let token = new_token();
    state.sessions.put(
        token.clone(),
        LoginSession { verificateur_id: verificateur.id },
    );
    info!("Login: verificateur {}", verificateur.id);

    Ok(Json(LoginResponse { token, verificateur }))
}

#[derive(Debug, Deserialize)]
pub struct LogoutRequest {
    pub token: String,
}

/// Remove a session; removing an unknown token is a no-op
pub async fn logout(
    State(state): State<AppState>,
    Json(req): Json<LogoutRequest>,
) -> Json<serde_json::Value> {
    state.sessions.remove(&req.token);
    state.chef_sessions.remove(&req.token);
    Json(json!({ "status": "ok" }))
}

#[derive(Debug, Deserialize)]
pub struct ChefLoginRequest {
    pub code_centre: String,
}

/// Open a chef-centre supervisory session (one per center: a new login
/// replaces any existing session for the same center)
pub async fn chef_login(
    State(state): State<AppState>,
    Json(req): Json<ChefLoginRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.code_centre.is_empty() {
        return Err(ApiError(Error::InvalidRequest(
            "code_centre is required".to_string(),
        )));
    }

    if !verificateurs::center_exists(&state.db, &req.code_centre).await? {
        return Err(ApiError(Error::NotFound(format!(
            "center {}",
            req.code_centre
        ))));
    }

    state
        .chef_sessions
        .retain(&|_, s: &ChefSession| s.code_centre != req.code_centre);

    let token = new_token();
    state.chef_sessions.put(
        token.clone(),
        ChefSession { code_centre: req.code_centre.clone() },
    );
    info!("Chef-centre session opened for {}", req.code_centre);

    Ok(Json(json!({ "token": token, "code_centre": req.code_centre })))
}
