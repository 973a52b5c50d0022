//! Geographic hierarchy lookup endpoints
//!
//! Read-only and unauthenticated, like the rest of the public surface the
//! map views load before login. `region` is an aref code.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use shield_common::db::{Aref, Lycee, Province, Ville};

use crate::api::ApiResult;
use crate::db::geography;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GeoQuery {
    pub region: Option<String>,
}

pub async fn arefs(
    State(state): State<AppState>,
    Query(query): Query<GeoQuery>,
) -> ApiResult<Json<Vec<Aref>>> {
    Ok(Json(geography::arefs(&state.db, query.region.as_deref()).await?))
}

pub async fn provinces(
    State(state): State<AppState>,
    Query(query): Query<GeoQuery>,
) -> ApiResult<Json<Vec<Province>>> {
    Ok(Json(geography::provinces(&state.db, query.region.as_deref()).await?))
}

pub async fn villes(
    State(state): State<AppState>,
    Query(query): Query<GeoQuery>,
) -> ApiResult<Json<Vec<Ville>>> {
    Ok(Json(geography::villes(&state.db, query.region.as_deref()).await?))
}

pub async fn lycees(
    State(state): State<AppState>,
    Query(query): Query<GeoQuery>,
) -> ApiResult<Json<Vec<Lycee>>> {
    Ok(Json(geography::lycees(&state.db, query.region.as_deref()).await?))
}
