//! Geographic hierarchy lookups: lycee -> ville -> province -> aref
//!
//! Rows are loaded by the deployment's import task and read here for
//! dashboard filtering and labeling. Every lookup takes an optional aref
//! code restricting results to one region.

use shield_common::db::{Aref, Lycee, Province, Ville};
use shield_common::Result;
use sqlx::SqlitePool;

pub async fn arefs(pool: &SqlitePool, region: Option<&str>) -> Result<Vec<Aref>> {
    let sql = match region {
        Some(_) => "SELECT * FROM arefs WHERE code = ?1 ORDER BY nom",
        None => "SELECT * FROM arefs ORDER BY nom",
    };

    let mut query = sqlx::query_as::<_, Aref>(sql);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn provinces(pool: &SqlitePool, region: Option<&str>) -> Result<Vec<Province>> {
    let sql = match region {
        Some(_) => "SELECT * FROM provinces WHERE aref_code = ?1 ORDER BY nom",
        None => "SELECT * FROM provinces ORDER BY nom",
    };

    let mut query = sqlx::query_as::<_, Province>(sql);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn villes(pool: &SqlitePool, region: Option<&str>) -> Result<Vec<Ville>> {
    let sql = match region {
        Some(_) => {
            "SELECT v.* FROM villes v
             JOIN provinces p ON p.code = v.province_code
             WHERE p.aref_code = ?1 ORDER BY v.nom"
        }
        None => "SELECT * FROM villes ORDER BY nom",
    };

    let mut query = sqlx::query_as::<_, Ville>(sql);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn lycees(pool: &SqlitePool, region: Option<&str>) -> Result<Vec<Lycee>> {
    let sql = match region {
        Some(_) => {
            "SELECT l.* FROM lycees l
             JOIN villes v ON v.code = l.ville_code
             JOIN provinces p ON p.code = v.province_code
             WHERE p.aref_code = ?1 ORDER BY l.nom"
        }
        None => "SELECT * FROM lycees ORDER BY nom",
    };

    let mut query = sqlx::query_as::<_, Lycee>(sql);
    if let Some(region) = region {
        query = query.bind(region);
    }

    Ok(query.fetch_all(pool).await?)
}

pub async fn upsert_aref(pool: &SqlitePool, code: &str, nom: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO arefs (code, nom) VALUES (?1, ?2)")
        .bind(code)
        .bind(nom)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn upsert_province(
    pool: &SqlitePool,
    code: &str,
    nom: &str,
    aref_code: &str,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO provinces (code, nom, aref_code) VALUES (?1, ?2, ?3)")
        .bind(code)
        .bind(nom)
        .bind(aref_code)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn upsert_ville(
    pool: &SqlitePool,
    code: &str,
    nom: &str,
    province_code: &str,
) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO villes (code, nom, province_code) VALUES (?1, ?2, ?3)")
        .bind(code)
        .bind(nom)
        .bind(province_code)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn upsert_lycee(pool: &SqlitePool, code: &str, nom: &str, ville_code: &str) -> Result<()> {
    sqlx::query("INSERT OR REPLACE INTO lycees (code, nom, ville_code) VALUES (?1, ?2, ?3)")
        .bind(code)
        .bind(nom)
        .bind(ville_code)
        .execute(pool)
        .await?;
    Ok(())
}
