//! Verification decisions and the batch-filtered read side
//!
//! A mobility reading is "pending" only while it is the highest batch of
//! its (location, student, day) group and no decision targets a batch of
//! that group at or above it. A resubmission at a strictly higher batch
//! re-surfaces the group as pending.

use serde::Serialize;
use shield_common::db::{MobilityAnalysis, Verification};
use shield_common::{Error, Result};
use sqlx::SqlitePool;

/// A decided reading: snapshot fields plus the decision
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VerifiedDetection {
    pub verification_id: i64,
    pub analyse_id: i64,
    pub action: String,
    pub decided_at: String,
    pub id_etudiant: String,
    pub nom: String,
    pub region: String,
    pub province: String,
    pub ville: String,
    pub code_centre: String,
    pub salle: String,
    pub matiere: String,
    pub risk_status: String,
    pub power: f64,
    pub timestamp: String,
    pub batch: i64,
}

/// Record a confirm/deny decision, replacing any earlier decision for the
/// same reading
pub async fn upsert_decision(
    pool: &SqlitePool,
    analyse_id: i64,
    action: &str,
    timestamp: &str,
) -> Result<Verification> {
    sqlx::query(
        r#"
        INSERT INTO verifications (analyse_id, action, timestamp)
        VALUES (?1, ?2, ?3)
        ON CONFLICT(analyse_id) DO UPDATE SET
            action = excluded.action,
            timestamp = excluded.timestamp
        "#,
    )
    .bind(analyse_id)
    .bind(action)
    .bind(timestamp)
    .execute(pool)
    .await?;

    sqlx::query_as::<_, Verification>("SELECT * FROM verifications WHERE analyse_id = ?1")
        .bind(analyse_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| Error::Internal(format!("decision for reading {} vanished", analyse_id)))
}

// Grouping uses the same key the batch resolver uses (the full location
// snapshot plus student and day), so a profile edit that changes one
// snapshot field opens a new group instead of colliding with the old one.
const PENDING_SQL: &str = r#"
    SELECT m.* FROM mobility_analyses m
    WHERE m.timestamp BETWEEN ?1 AND ?2
      AND m.batch = (
          SELECT MAX(g.batch) FROM mobility_analyses g
          WHERE g.region = m.region AND g.province = m.province
            AND g.ville = m.ville AND g.code_centre = m.code_centre
            AND g.salle = m.salle AND g.matiere = m.matiere
            AND g.id_etudiant = m.id_etudiant
            AND DATE(g.timestamp) = DATE(m.timestamp)
      )
      AND NOT EXISTS (
          SELECT 1 FROM verifications v
          JOIN mobility_analyses d ON d.id = v.analyse_id
          WHERE d.region = m.region AND d.province = m.province
            AND d.ville = m.ville AND d.code_centre = m.code_centre
            AND d.salle = m.salle AND d.matiere = m.matiere
            AND d.id_etudiant = m.id_etudiant
            AND DATE(d.timestamp) = DATE(m.timestamp)
            AND d.batch >= m.batch
      )
"#;

/// Pending (unresolved, highest-batch) readings in a window
pub async fn pending(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<MobilityAnalysis>> {
    let sql = match region {
        Some(_) => format!("{} AND m.region = ?3 ORDER BY m.timestamp DESC", PENDING_SQL),
        None => format!("{} ORDER BY m.timestamp DESC", PENDING_SQL),
    };

    let mut query = sqlx::query_as::<_, MobilityAnalysis>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

const VERIFIED_SQL: &str = r#"
    SELECT v.id AS verification_id, v.analyse_id, v.action, v.timestamp AS decided_at,
           m.id_etudiant, m.nom, m.region, m.province, m.ville,
           m.code_centre, m.salle, m.matiere, m.risk_status, m.power,
           m.timestamp, m.batch
    FROM verifications v
    JOIN mobility_analyses m ON m.id = v.analyse_id
    WHERE v.timestamp BETWEEN ?1 AND ?2
"#;

/// Decided readings in a window, keyed by the (unique) current decision
pub async fn verified(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<VerifiedDetection>> {
    let sql = match region {
        Some(_) => format!("{} AND m.region = ?3 ORDER BY v.timestamp DESC", VERIFIED_SQL),
        None => format!("{} ORDER BY v.timestamp DESC", VERIFIED_SQL),
    };

    let mut query = sqlx::query_as::<_, VerifiedDetection>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Chef-centre view for one center and day: every decided reading, plus
/// the highest unverified batch per group only where it strictly exceeds
/// the group's highest verified batch
pub async fn chef_listing(
    pool: &SqlitePool,
    code_centre: &str,
    day: &str,
) -> Result<(Vec<VerifiedDetection>, Vec<MobilityAnalysis>)> {
    let verified = sqlx::query_as::<_, VerifiedDetection>(
        r#"
        SELECT v.id AS verification_id, v.analyse_id, v.action, v.timestamp AS decided_at,
               m.id_etudiant, m.nom, m.region, m.province, m.ville,
               m.code_centre, m.salle, m.matiere, m.risk_status, m.power,
               m.timestamp, m.batch
        FROM verifications v
        JOIN mobility_analyses m ON m.id = v.analyse_id
        WHERE m.code_centre = ?1 AND DATE(m.timestamp) = ?2
        ORDER BY v.timestamp DESC
        "#,
    )
    .bind(code_centre)
    .bind(day)
    .fetch_all(pool)
    .await?;

    let pending = sqlx::query_as::<_, MobilityAnalysis>(
        r#"
        SELECT m.* FROM mobility_analyses m
        WHERE m.code_centre = ?1 AND DATE(m.timestamp) = ?2
          AND m.batch = (
              SELECT MAX(g.batch) FROM mobility_analyses g
              WHERE g.region = m.region AND g.province = m.province
                AND g.ville = m.ville AND g.code_centre = m.code_centre
                AND g.salle = m.salle AND g.matiere = m.matiere
                AND g.id_etudiant = m.id_etudiant
                AND DATE(g.timestamp) = DATE(m.timestamp)
          )
          AND m.batch > COALESCE((
              SELECT MAX(d.batch) FROM verifications v
              JOIN mobility_analyses d ON d.id = v.analyse_id
              WHERE d.region = m.region AND d.province = m.province
                AND d.ville = m.ville AND d.code_centre = m.code_centre
                AND d.salle = m.salle AND d.matiere = m.matiere
                AND d.id_etudiant = m.id_etudiant
                AND DATE(d.timestamp) = DATE(m.timestamp)
          ), 0)
        ORDER BY m.timestamp DESC
        "#,
    )
    .bind(code_centre)
    .bind(day)
    .fetch_all(pool)
    .await?;

    Ok((verified, pending))
}

const DECISIONS_BY_HOUR_SQL: &str = r#"
    SELECT CAST(strftime('%H', v.timestamp) AS INTEGER) AS hour, COUNT(*)
    FROM verifications v
    JOIN mobility_analyses m ON m.id = v.analyse_id
    WHERE v.timestamp BETWEEN ?1 AND ?2
"#;

/// Decision counts per hour-of-day within a window, for the cumulative
/// subtract pass on dashboard counts. Region-scoped series only subtract
/// decisions against readings of that region.
pub async fn decisions_by_hour(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<(i64, i64)>> {
    let sql = match region {
        Some(_) => format!(
            "{} AND m.region = ?3 GROUP BY hour ORDER BY hour",
            DECISIONS_BY_HOUR_SQL
        ),
        None => format!("{} GROUP BY hour ORDER BY hour", DECISIONS_BY_HOUR_SQL),
    };

    let mut query = sqlx::query_as::<_, (i64, i64)>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}
