//! Database row models

use serde::{Deserialize, Serialize};

/// Field agent and their exam-location profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Verificateur {
    pub id: i64,
    pub nom: String,
    pub telephone: String,
    /// SHA-256 hex digest, never serialized out
    #[serde(skip_serializing)]
    pub password: String,
    pub region: String,
    pub province: String,
    pub ville: String,
    pub code_centre: String,
    pub salle: String,
    pub matiere: String,
    pub cols: i64,
    pub rows: i64,
    pub examen: String,
}

impl Verificateur {
    /// Seats monitored by this agent's room layout
    pub fn seat_count(&self) -> i64 {
        self.cols * self.rows
    }
}

/// One communication-anomaly event, batch-tagged, append-only
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GeneralAnalysis {
    pub id: i64,
    pub verificateur_id: i64,
    pub nom: String,
    pub region: String,
    pub province: String,
    pub ville: String,
    pub code_centre: String,
    pub salle: String,
    pub matiere: String,
    pub operateur: String,
    pub type_communication: String,
    pub timestamp: String,
    pub batch: i64,
}

/// One flagged student at final mobility classification, batch-tagged
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MobilityAnalysis {
    pub id: i64,
    pub verificateur_id: i64,
    pub nom: String,
    pub region: String,
    pub province: String,
    pub ville: String,
    pub code_centre: String,
    pub salle: String,
    pub matiere: String,
    pub id_etudiant: String,
    pub risk_status: String,
    pub power: f64,
    pub timestamp: String,
    pub batch: i64,
}

/// Confirm/deny decision against a mobility reading
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Verification {
    pub id: i64,
    pub analyse_id: i64,
    pub action: String,
    pub timestamp: String,
}

/// Regional education authority, the top of the geographic hierarchy
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Aref {
    pub code: String,
    pub nom: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Province {
    pub code: String,
    pub nom: String,
    pub aref_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Ville {
    pub code: String,
    pub nom: String,
    pub province_code: String,
}

/// Exam center; `code` matches the `code_centre` carried on readings
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lycee {
    pub code: String,
    pub nom: String,
    pub ville_code: String,
}

/// Append-only (location, time, students, detections) observation
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CheatRateSample {
    pub id: i64,
    pub code_centre: String,
    pub salle: String,
    pub matiere: String,
    pub examen: String,
    pub timestamp: String,
    pub nbr_etudiant: i64,
    pub nbr_detection: i64,
}
