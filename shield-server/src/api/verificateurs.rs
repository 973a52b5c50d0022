//! Verificateur registration and configuration updates

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shield_common::db::Verificateur;
use shield_common::Error;
use tracing::info;

use crate::api::auth::sha256_hex;
use crate::api::{ApiError, ApiResult};
use crate::db::verificateurs::{self, LocationProfile};
use crate::sessions::ChefSession;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub nom: String,
    pub telephone: String,
    pub password: String,
    #[serde(flatten)]
    pub profile: LocationProfile,
}

/// Register a field agent with their location profile
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Verificateur>)> {
    if req.nom.is_empty() || req.telephone.is_empty() || req.password.is_empty() {
        return Err(ApiError(Error::InvalidRequest(
            "nom, telephone and password are required".to_string(),
        )));
    }

    if verificateurs::find_by_telephone(&state.db, &req.telephone)
        .await?
        .is_some()
    {
        return Err(ApiError(Error::InvalidRequest(
            "telephone already registered".to_string(),
        )));
    }

    let id = verificateurs::create(
        &state.db,
        &req.nom,
        &req.telephone,
        &sha256_hex(&req.password),
        &req.profile,
    )
    .await?;
    info!("Registered verificateur {} for {}", id, req.profile.code_centre);

    let created = verificateurs::find(&state.db, id).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Replace an agent's location profile
///
/// When the center code changes, any chef-centre session bound to the old
/// center is dropped. That side effect is best-effort and never rolls back
/// the committed profile update.
pub async fn update_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(profile): Json<LocationProfile>,
) -> ApiResult<Json<Verificateur>> {
    if profile.code_centre.is_empty() {
        return Err(ApiError(Error::InvalidRequest(
            "code_centre is required".to_string(),
        )));
    }
    if profile.cols < 0 || profile.rows < 0 {
        return Err(ApiError(Error::InvalidRequest(
            "cols and rows must be non-negative".to_string(),
        )));
    }

    let old = verificateurs::find(&state.db, id).await?;
    let updated = verificateurs::update_profile(&state.db, id, &profile).await?;

    if old.code_centre != updated.code_centre && !old.code_centre.is_empty() {
        state
            .chef_sessions
            .retain(&|_, s: &ChefSession| s.code_centre != old.code_centre);
        info!(
            "Dropped chef-centre sessions for {} after profile update",
            old.code_centre
        );
    }

    Ok(Json(updated))
}
