//! Batch resolution
//!
//! Batch numbers version repeated submissions for one location key within
//! one calendar day: `MAX(batch) + 1`, starting at 1, restarting each day.
//! The day is part of the key, so a key with prior-day data still starts
//! at 1 on a new day. Resolution and the subsequent insert are separate
//! round-trips; concurrent submissions to the same key+day can race and
//! produce a duplicate batch number (tolerated at current request volumes).

use shield_common::db::Verificateur;
use shield_common::Result;
use sqlx::SqlitePool;

/// Next batch for a general submission: key = full location profile + day
pub async fn next_general_batch(
    pool: &SqlitePool,
    v: &Verificateur,
    day: &str,
) -> Result<i64> {
    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(batch) FROM general_analyses
        WHERE region = ?1 AND province = ?2 AND ville = ?3
          AND code_centre = ?4 AND salle = ?5 AND matiere = ?6
          AND DATE(timestamp) = ?7
        "#,
    )
    .bind(&v.region)
    .bind(&v.province)
    .bind(&v.ville)
    .bind(&v.code_centre)
    .bind(&v.salle)
    .bind(&v.matiere)
    .bind(day)
    .fetch_one(pool)
    .await?;

    Ok(max.unwrap_or(0) + 1)
}

/// Next batch for a mobility record: key additionally includes the student
pub async fn next_mobility_batch(
    pool: &SqlitePool,
    v: &Verificateur,
    id_etudiant: &str,
    day: &str,
) -> Result<i64> {
    let max: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT MAX(batch) FROM mobility_analyses
        WHERE region = ?1 AND province = ?2 AND ville = ?3
          AND code_centre = ?4 AND salle = ?5 AND matiere = ?6
          AND id_etudiant = ?7 AND DATE(timestamp) = ?8
        "#,
    )
    .bind(&v.region)
    .bind(&v.province)
    .bind(&v.ville)
    .bind(&v.code_centre)
    .bind(&v.salle)
    .bind(&v.matiere)
    .bind(id_etudiant)
    .bind(day)
    .fetch_one(pool)
    .await?;

    Ok(max.unwrap_or(0) + 1)
}
