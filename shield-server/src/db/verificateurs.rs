//! Verificateur lookup and configuration

use serde::{Deserialize, Serialize};
use shield_common::db::Verificateur;
use shield_common::{Error, Result};
use sqlx::SqlitePool;

/// Exam-location profile, the join key grouping an agent's readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationProfile {
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

pub async fn find(pool: &SqlitePool, id: i64) -> Result<Verificateur> {
    sqlx::query_as::<_, Verificateur>("SELECT * FROM verificateurs WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("verificateur {}", id)))
}

pub async fn find_by_telephone(pool: &SqlitePool, telephone: &str) -> Result<Option<Verificateur>> {
    Ok(
        sqlx::query_as::<_, Verificateur>("SELECT * FROM verificateurs WHERE telephone = ?1")
            .bind(telephone)
            .fetch_optional(pool)
            .await?,
    )
}

/// Register a verificateur; `password` is a SHA-256 hex digest
pub async fn create(
    pool: &SqlitePool,
    nom: &str,
    telephone: &str,
    password: &str,
    profile: &LocationProfile,
) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO verificateurs
            (nom, telephone, password, region, province, ville, code_centre,
             salle, matiere, cols, rows, examen)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(nom)
    .bind(telephone)
    .bind(password)
    .bind(&profile.region)
    .bind(&profile.province)
    .bind(&profile.ville)
    .bind(&profile.code_centre)
    .bind(&profile.salle)
    .bind(&profile.matiere)
    .bind(profile.cols)
    .bind(profile.rows)
    .bind(&profile.examen)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Replace the location profile; existing analysis rows keep their
/// snapshots from submission time
pub async fn update_profile(
    pool: &SqlitePool,
    id: i64,
    profile: &LocationProfile,
) -> Result<Verificateur> {
    let result = sqlx::query(
        r#"
        UPDATE verificateurs SET
            region = ?1, province = ?2, ville = ?3, code_centre = ?4,
            salle = ?5, matiere = ?6, cols = ?7, rows = ?8, examen = ?9
        WHERE id = ?10
        "#,
    )
    .bind(&profile.region)
    .bind(&profile.province)
    .bind(&profile.ville)
    .bind(&profile.code_centre)
    .bind(&profile.salle)
    .bind(&profile.matiere)
    .bind(profile.cols)
    .bind(profile.rows)
    .bind(&profile.examen)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("verificateur {}", id)));
    }

    find(pool, id).await
}

/// Whether any verificateur is bound to a center code
pub async fn center_exists(pool: &SqlitePool, code_centre: &str) -> Result<bool> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM verificateurs WHERE code_centre = ?1")
            .bind(code_centre)
            .fetch_one(pool)
            .await?;

    Ok(count > 0)
}
