//! Verification decisions and batch-filtered listings

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use shield_common::db::{GeneralAnalysis, MobilityAnalysis};
use shield_common::events::ShieldEvent;
use shield_common::{time, Error};

use crate::api::stats::{resolve_window, WindowQuery};
use crate::api::{ApiError, ApiResult};
use crate::db::verifications::VerifiedDetection;
use crate::db::{analyses, verifications};
use crate::AppState;

const ACTIONS: [&str; 2] = ["confirm", "deny"];

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub analyse_id: i64,
    pub action: String,
}

/// Record a confirm/deny decision against a mobility reading
///
/// Upsert semantics: a second decision for the same reading replaces the
/// first. Validation happens before any persistence.
pub async fn decide(
    State(state): State<AppState>,
    Json(req): Json<DecisionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if !ACTIONS.contains(&req.action.as_str()) {
        return Err(ApiError(Error::InvalidRequest(format!(
            "action must be one of {:?}",
            ACTIONS
        ))));
    }

    let reading = analyses::find_mobility(&state.db, req.analyse_id).await?;

    let decision =
        verifications::upsert_decision(&state.db, req.analyse_id, &req.action, &time::now_str())
            .await?;

    // Broadcast only after the decision is persisted
    state.events.emit_lossy(ShieldEvent::Verification {
        analyse_id: reading.id,
        action: decision.action.clone(),
        id_etudiant: reading.id_etudiant.clone(),
        code_centre: reading.code_centre.clone(),
        salle: reading.salle.clone(),
        matiere: reading.matiere.clone(),
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(json!({
        "status": "ok",
        "analyse_id": decision.analyse_id,
        "action": decision.action,
    })))
}

/// Current (highest-batch) general analyses in a window; superseded
/// batches are filtered out, not deleted
pub async fn list_general(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<GeneralAnalysis>>> {
    let (start, end) = resolve_window(&query);
    let rows =
        analyses::current_general(&state.db, &start, &end, query.region.as_deref()).await?;
    Ok(Json(rows))
}

/// Unresolved highest-batch readings in a window
pub async fn pending_detections(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<MobilityAnalysis>>> {
    let (start, end) = resolve_window(&query);
    let rows = verifications::pending(&state.db, &start, &end, query.region.as_deref()).await?;
    Ok(Json(rows))
}

/// Decided readings in a window, with their decision
pub async fn verified_detections(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<VerifiedDetection>>> {
    let (start, end) = resolve_window(&query);
    let rows = verifications::verified(&state.db, &start, &end, query.region.as_deref()).await?;
    Ok(Json(rows))
}

#[derive(Debug, Deserialize)]
pub struct ChefQuery {
    pub code_centre: String,
    pub day: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChefListing {
    pub verified: Vec<VerifiedDetection>,
    pub pending: Vec<MobilityAnalysis>,
}

/// Per-center supervisor view: all decided readings plus the still-open
/// highest batches
pub async fn chef_detections(
    State(state): State<AppState>,
    Query(query): Query<ChefQuery>,
) -> ApiResult<Json<ChefListing>> {
    if query.code_centre.is_empty() {
        return Err(ApiError(Error::InvalidRequest(
            "code_centre is required".to_string(),
        )));
    }

    let day = query.day.unwrap_or_else(time::today_str);
    let (verified, pending) =
        verifications::chef_listing(&state.db, &query.code_centre, &day).await?;

    Ok(Json(ChefListing { verified, pending }))
}
