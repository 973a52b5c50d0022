//! Analysis ingestion endpoints
//!
//! General submissions share one batch resolved once per call. Mobility
//! final submissions resolve a batch per flagged student. An empty general
//! submission is a clean-session signal: it appends a zero-detection
//! cheat-rate sample without touching the batch counter.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use shield_common::events::ShieldEvent;
use shield_common::{time, vocab};
use tracing::warn;

use crate::api::ApiResult;
use crate::db::{analyses, batch, cheat_rates, verificateurs};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct GeneralItem {
    pub timestamp: String,
    pub operateur: String,
    pub type_communication: String,
}

#[derive(Debug, Deserialize)]
pub struct GeneralSubmission {
    pub verificateur_id: i64,
    pub analyses: Vec<GeneralItem>,
}

#[derive(Debug, Serialize)]
pub struct GeneralResponse {
    /// Batch shared by every persisted item; absent for clean sessions
    pub batch: Option<i64>,
    pub count: usize,
    pub clean_session: bool,
}

pub async fn submit_general(
    State(state): State<AppState>,
    Json(req): Json<GeneralSubmission>,
) -> ApiResult<Json<GeneralResponse>> {
    let verificateur = verificateurs::find(&state.db, req.verificateur_id).await?;

    if req.analyses.is_empty() {
        // Clean session: the room reported no anomalies. The sample append
        // is best-effort; the signal itself still succeeds.
        let students = verificateur.seat_count();
        if let Err(e) = cheat_rates::append_sample(
            &state.db,
            &verificateur.code_centre,
            &verificateur.salle,
            &verificateur.matiere,
            &verificateur.examen,
            &time::now_str(),
            students,
            0,
        )
        .await
        {
            warn!("Clean-session sample append failed: {}", e);
        }

        state.events.emit_lossy(ShieldEvent::CleanSession {
            verificateur: verificateur.nom.clone(),
            code_centre: verificateur.code_centre.clone(),
            salle: verificateur.salle.clone(),
            matiere: verificateur.matiere.clone(),
            students,
            timestamp: chrono::Utc::now(),
        });

        return Ok(Json(GeneralResponse { batch: None, count: 0, clean_session: true }));
    }

    // One batch per call, shared by every item of the submission
    let day = time::day_of(&req.analyses[0].timestamp)?;
    let batch = batch::next_general_batch(&state.db, &verificateur, &day).await?;

    let mut count = 0;
    for item in &req.analyses {
        let normalized = analyses::NewGeneralItem {
            timestamp: item.timestamp.clone(),
            operateur: vocab::normalize_operator(&item.operateur),
            type_communication: vocab::normalize_comm_type(&item.type_communication),
        };
        // One item's failure does not abort the rest of the submission
        match analyses::insert_general(&state.db, &verificateur, &normalized, batch).await {
            Ok(()) => count += 1,
            Err(e) => warn!("General item insert failed (batch {}): {}", batch, e),
        }
    }

    if count > 0 {
        state.events.emit_lossy(ShieldEvent::GeneralAnalysis {
            verificateur: verificateur.nom.clone(),
            region: verificateur.region.clone(),
            province: verificateur.province.clone(),
            ville: verificateur.ville.clone(),
            code_centre: verificateur.code_centre.clone(),
            salle: verificateur.salle.clone(),
            matiere: verificateur.matiere.clone(),
            batch,
            count: count as i64,
            timestamp: chrono::Utc::now(),
        });
    }

    Ok(Json(GeneralResponse { batch: Some(batch), count, clean_session: false }))
}

#[derive(Debug, Deserialize)]
pub struct InitialReading {
    pub id_etudiant: String,
    pub risk_score: f64,
    pub power: f64,
    pub timestamp: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InitialSubmission {
    pub verificateur_id: i64,
    pub readings: Vec<InitialReading>,
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: usize,
}

/// Raw per-student telemetry; write-only, no batch, no broadcast
pub async fn submit_mobility_initial(
    State(state): State<AppState>,
    Json(req): Json<InitialSubmission>,
) -> ApiResult<Json<CountResponse>> {
    let verificateur = verificateurs::find(&state.db, req.verificateur_id).await?;

    let mut count = 0;
    for reading in &req.readings {
        let timestamp = reading.timestamp.clone().unwrap_or_else(time::now_str);
        match analyses::insert_mobility_initial(
            &state.db,
            verificateur.id,
            &reading.id_etudiant,
            reading.risk_score,
            reading.power,
            &timestamp,
        )
        .await
        {
            Ok(()) => count += 1,
            Err(e) => warn!("Initial reading insert failed: {}", e),
        }
    }

    Ok(Json(CountResponse { count }))
}

#[derive(Debug, Deserialize)]
pub struct FinalResult {
    pub id_etudiant: String,
    pub risk_level: i64,
    #[serde(default)]
    pub risk_status: String,
    pub power: f64,
}

#[derive(Debug, Deserialize)]
pub struct FinalSubmission {
    pub verificateur_id: i64,
    pub results: Vec<FinalResult>,
}

pub async fn submit_mobility_final(
    State(state): State<AppState>,
    Json(req): Json<FinalSubmission>,
) -> ApiResult<Json<CountResponse>> {
    let verificateur = verificateurs::find(&state.db, req.verificateur_id).await?;

    let now = time::now_str();
    let day = time::today_str();

    let flagged: Vec<&FinalResult> =
        req.results.iter().filter(|r| r.risk_level == 1).collect();

    let mut count = 0;
    for result in &flagged {
        // Each flagged student gets its own candidate next-batch
        let batch = batch::next_mobility_batch(
            &state.db,
            &verificateur,
            &result.id_etudiant,
            &day,
        )
        .await?;

        match analyses::insert_mobility_final(
            &state.db,
            &verificateur,
            &result.id_etudiant,
            &result.risk_status,
            result.power,
            &now,
            batch,
        )
        .await
        {
            Ok(()) => count += 1,
            Err(e) => warn!(
                "Mobility final insert failed for student (batch {}): {}",
                batch, e
            ),
        }
    }

    // Exactly one sample per call, even when nothing was flagged: the
    // historical series stays complete
    cheat_rates::append_sample(
        &state.db,
        &verificateur.code_centre,
        &verificateur.salle,
        &verificateur.matiere,
        &verificateur.examen,
        &now,
        verificateur.seat_count(),
        flagged.len() as i64,
    )
    .await?;

    state.events.emit_lossy(ShieldEvent::MobilityDetection {
        verificateur: verificateur.nom.clone(),
        region: verificateur.region.clone(),
        province: verificateur.province.clone(),
        ville: verificateur.ville.clone(),
        code_centre: verificateur.code_centre.clone(),
        salle: verificateur.salle.clone(),
        matiere: verificateur.matiere.clone(),
        detections: flagged.len() as i64,
        timestamp: chrono::Utc::now(),
    });

    Ok(Json(CountResponse { count }))
}
