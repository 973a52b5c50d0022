//! Analysis record persistence
//!
//! Every inserted row carries a snapshot of the submitter's location
//! profile, copied at submission time. Later profile edits must not
//! rewrite history, so the duplication is intentional.

use shield_common::db::{GeneralAnalysis, MobilityAnalysis, Verificateur};
use shield_common::{Error, Result};
use sqlx::SqlitePool;

/// One normalized general-analysis item ready for insertion
#[derive(Debug, Clone)]
pub struct NewGeneralItem {
    pub timestamp: String,
    pub operateur: String,
    pub type_communication: String,
}

pub async fn insert_general(
    pool: &SqlitePool,
    v: &Verificateur,
    item: &NewGeneralItem,
    batch: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO general_analyses
            (verificateur_id, nom, region, province, ville, code_centre,
             salle, matiere, operateur, type_communication, timestamp, batch)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(v.id)
    .bind(&v.nom)
    .bind(&v.region)
    .bind(&v.province)
    .bind(&v.ville)
    .bind(&v.code_centre)
    .bind(&v.salle)
    .bind(&v.matiere)
    .bind(&item.operateur)
    .bind(&item.type_communication)
    .bind(&item.timestamp)
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_mobility_initial(
    pool: &SqlitePool,
    verificateur_id: i64,
    id_etudiant: &str,
    risk_score: f64,
    power: f64,
    timestamp: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO mobility_initial (verificateur_id, id_etudiant, risk_score, power, timestamp)
        VALUES (?1, ?2, ?3, ?4, ?5)
        "#,
    )
    .bind(verificateur_id)
    .bind(id_etudiant)
    .bind(risk_score)
    .bind(power)
    .bind(timestamp)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert_mobility_final(
    pool: &SqlitePool,
    v: &Verificateur,
    id_etudiant: &str,
    risk_status: &str,
    power: f64,
    timestamp: &str,
    batch: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO mobility_analyses
            (verificateur_id, nom, region, province, ville, code_centre,
             salle, matiere, id_etudiant, risk_status, power, timestamp, batch)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
        "#,
    )
    .bind(v.id)
    .bind(&v.nom)
    .bind(&v.region)
    .bind(&v.province)
    .bind(&v.ville)
    .bind(&v.code_centre)
    .bind(&v.salle)
    .bind(&v.matiere)
    .bind(id_etudiant)
    .bind(risk_status)
    .bind(power)
    .bind(timestamp)
    .bind(batch)
    .execute(pool)
    .await?;

    Ok(())
}

// Supersession is a query-time filter on batch numbers, never a deletion:
// only the highest batch of each (location snapshot, day) group is current.
const CURRENT_GENERAL_SQL: &str = r#"
    SELECT a.* FROM general_analyses a
    WHERE a.timestamp BETWEEN ?1 AND ?2
      AND a.batch = (
          SELECT MAX(g.batch) FROM general_analyses g
          WHERE g.region = a.region AND g.province = a.province
            AND g.ville = a.ville AND g.code_centre = a.code_centre
            AND g.salle = a.salle AND g.matiere = a.matiere
            AND DATE(g.timestamp) = DATE(a.timestamp)
      )
"#;

/// Current (highest-batch) general analyses per group in a window
pub async fn current_general(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<GeneralAnalysis>> {
    let sql = match region {
        Some(_) => format!("{} AND a.region = ?3 ORDER BY a.timestamp DESC", CURRENT_GENERAL_SQL),
        None => format!("{} ORDER BY a.timestamp DESC", CURRENT_GENERAL_SQL),
    };

    let mut query = sqlx::query_as::<_, GeneralAnalysis>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Load one mobility reading by id
pub async fn find_mobility(pool: &SqlitePool, id: i64) -> Result<MobilityAnalysis> {
    sqlx::query_as::<_, MobilityAnalysis>("SELECT * FROM mobility_analyses WHERE id = ?1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::NotFound(format!("mobility reading {}", id)))
}
