//! Cheat-rate sample series and windowed aggregations
//!
//! Samples are append-only. A window's rate is always
//! sum(detections) / sum(students) over the samples in the window, never
//! an average of per-sample rates, and 0 when no students were counted.

use shield_common::Result;
use sqlx::SqlitePool;

/// Detection rate as a percentage, rounded to 2 decimals; 0 when no students
pub fn rate(detections: i64, students: i64) -> f64 {
    if students <= 0 {
        return 0.0;
    }
    let pct = detections as f64 / students as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

pub async fn append_sample(
    pool: &SqlitePool,
    code_centre: &str,
    salle: &str,
    matiere: &str,
    examen: &str,
    timestamp: &str,
    nbr_etudiant: i64,
    nbr_detection: i64,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO cheat_rates
            (code_centre, salle, matiere, examen, timestamp, nbr_etudiant, nbr_detection)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(code_centre)
    .bind(salle)
    .bind(matiere)
    .bind(examen)
    .bind(timestamp)
    .bind(nbr_etudiant)
    .bind(nbr_detection)
    .execute(pool)
    .await?;

    Ok(())
}

/// Join clause resolving a sample's center to its region (aref) code
const REGION_JOIN: &str = r#"
    JOIN lycees l ON l.code = c.code_centre
    JOIN villes vi ON vi.code = l.ville_code
    JOIN provinces p ON p.code = vi.province_code
"#;

/// Window totals: (detections, students, sample count)
pub async fn window_totals(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<(i64, i64, i64)> {
    let sql = match region {
        Some(_) => format!(
            "SELECT COALESCE(SUM(c.nbr_detection), 0), COALESCE(SUM(c.nbr_etudiant), 0), COUNT(*)
             FROM cheat_rates c {} WHERE c.timestamp BETWEEN ?1 AND ?2 AND p.aref_code = ?3",
            REGION_JOIN
        ),
        None => "SELECT COALESCE(SUM(c.nbr_detection), 0), COALESCE(SUM(c.nbr_etudiant), 0), COUNT(*)
                 FROM cheat_rates c WHERE c.timestamp BETWEEN ?1 AND ?2"
            .to_string(),
    };

    let mut query = sqlx::query_as::<_, (i64, i64, i64)>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_one(pool).await?)
}

/// Per hour-of-day totals within a window: (hour, detections, students)
pub async fn totals_by_hour(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<(i64, i64, i64)>> {
    let sql = match region {
        Some(_) => format!(
            "SELECT CAST(strftime('%H', c.timestamp) AS INTEGER) AS hour,
                    SUM(c.nbr_detection), SUM(c.nbr_etudiant)
             FROM cheat_rates c {} WHERE c.timestamp BETWEEN ?1 AND ?2 AND p.aref_code = ?3
             GROUP BY hour ORDER BY hour",
            REGION_JOIN
        ),
        None => "SELECT CAST(strftime('%H', c.timestamp) AS INTEGER) AS hour,
                        SUM(c.nbr_detection), SUM(c.nbr_etudiant)
                 FROM cheat_rates c WHERE c.timestamp BETWEEN ?1 AND ?2
                 GROUP BY hour ORDER BY hour"
            .to_string(),
    };

    let mut query = sqlx::query_as::<_, (i64, i64, i64)>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Exact per-(day, hour) totals, for multi-day windows
pub async fn totals_by_day_hour(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<(String, i64, i64, i64)>> {
    let sql = match region {
        Some(_) => format!(
            "SELECT DATE(c.timestamp) AS day, CAST(strftime('%H', c.timestamp) AS INTEGER) AS hour,
                    SUM(c.nbr_detection), SUM(c.nbr_etudiant)
             FROM cheat_rates c {} WHERE c.timestamp BETWEEN ?1 AND ?2 AND p.aref_code = ?3
             GROUP BY day, hour ORDER BY day, hour",
            REGION_JOIN
        ),
        None => "SELECT DATE(c.timestamp) AS day, CAST(strftime('%H', c.timestamp) AS INTEGER) AS hour,
                        SUM(c.nbr_detection), SUM(c.nbr_etudiant)
                 FROM cheat_rates c WHERE c.timestamp BETWEEN ?1 AND ?2
                 GROUP BY day, hour ORDER BY day, hour"
            .to_string(),
    };

    let mut query = sqlx::query_as::<_, (String, i64, i64, i64)>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Totals grouped by region: (code, name, detections, students)
pub async fn totals_by_region(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<(String, String, i64, i64)>> {
    let sql = format!(
        "SELECT a.code, a.nom, SUM(c.nbr_detection), SUM(c.nbr_etudiant)
         FROM cheat_rates c {} JOIN arefs a ON a.code = p.aref_code
         WHERE c.timestamp BETWEEN ?1 AND ?2
         GROUP BY a.code, a.nom ORDER BY a.nom",
        REGION_JOIN
    );

    Ok(sqlx::query_as::<_, (String, String, i64, i64)>(&sql)
        .bind(start)
        .bind(end)
        .fetch_all(pool)
        .await?)
}

/// Totals grouped by province, optionally restricted to one region
pub async fn totals_by_province(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    region: Option<&str>,
) -> Result<Vec<(String, String, i64, i64)>> {
    let sql = match region {
        Some(_) => format!(
            "SELECT p.code, p.nom, SUM(c.nbr_detection), SUM(c.nbr_etudiant)
             FROM cheat_rates c {} WHERE c.timestamp BETWEEN ?1 AND ?2 AND p.aref_code = ?3
             GROUP BY p.code, p.nom ORDER BY p.nom",
            REGION_JOIN
        ),
        None => format!(
            "SELECT p.code, p.nom, SUM(c.nbr_detection), SUM(c.nbr_etudiant)
             FROM cheat_rates c {} WHERE c.timestamp BETWEEN ?1 AND ?2
             GROUP BY p.code, p.nom ORDER BY p.nom",
            REGION_JOIN
        ),
    };

    let mut query = sqlx::query_as::<_, (String, String, i64, i64)>(&sql).bind(start).bind(end);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Top exam centers by detection rate, worst first, capped at 20
pub async fn totals_by_center(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<(String, String, i64, i64)>> {
    // LEFT JOIN keeps centers missing from the hierarchy tables visible
    Ok(sqlx::query_as::<_, (String, String, i64, i64)>(
        r#"
        SELECT c.code_centre, COALESCE(l.nom, c.code_centre),
               SUM(c.nbr_detection), SUM(c.nbr_etudiant)
        FROM cheat_rates c
        LEFT JOIN lycees l ON l.code = c.code_centre
        WHERE c.timestamp BETWEEN ?1 AND ?2
        GROUP BY c.code_centre
        ORDER BY CAST(SUM(c.nbr_detection) AS REAL) / MAX(SUM(c.nbr_etudiant), 1) DESC
        LIMIT 20
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?)
}

/// Totals grouped by subject: (matiere, detections, students)
pub async fn totals_by_subject(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<(String, i64, i64)>> {
    Ok(sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT matiere, SUM(nbr_detection), SUM(nbr_etudiant)
         FROM cheat_rates WHERE timestamp BETWEEN ?1 AND ?2
         GROUP BY matiere ORDER BY matiere",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?)
}

/// Totals grouped by exam session: (examen, detections, students)
pub async fn totals_by_session(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<(String, i64, i64)>> {
    Ok(sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT examen, SUM(nbr_detection), SUM(nbr_etudiant)
         FROM cheat_rates WHERE timestamp BETWEEN ?1 AND ?2
         GROUP BY examen ORDER BY examen",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?)
}

/// National per-day series: (day, detections, students)
pub async fn totals_by_day(
    pool: &SqlitePool,
    start: &str,
    end: &str,
) -> Result<Vec<(String, i64, i64)>> {
    Ok(sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT DATE(timestamp) AS day, SUM(nbr_detection), SUM(nbr_etudiant)
         FROM cheat_rates WHERE timestamp BETWEEN ?1 AND ?2
         GROUP BY day ORDER BY day",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_rounds_to_two_decimals() {
        assert_eq!(rate(1, 3), 33.33);
        assert_eq!(rate(2, 3), 66.67);
        assert_eq!(rate(1, 1), 100.0);
    }

    #[test]
    fn test_rate_zero_students_is_zero_not_nan() {
        assert_eq!(rate(0, 0), 0.0);
        assert_eq!(rate(5, 0), 0.0);
    }

    #[test]
    fn test_rate_zero_detections() {
        assert_eq!(rate(0, 40), 0.0);
    }
}
