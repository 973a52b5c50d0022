//! Database initialization
//!
//! Creates the schema idempotently on startup. Analysis and cheat-rate
//! tables are append-only; supersession of repeated submissions is a
//! query-time filter on batch numbers, never an UPDATE or DELETE.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while one ingestion writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    // Bounded wait on lock contention instead of an immediate busy error
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_verificateurs_table(&pool).await?;
    create_general_analyses_table(&pool).await?;
    create_mobility_initial_table(&pool).await?;
    create_mobility_analyses_table(&pool).await?;
    create_verifications_table(&pool).await?;
    create_cheat_rates_table(&pool).await?;
    create_geography_tables(&pool).await?;

    Ok(pool)
}

async fn create_verificateurs_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verificateurs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nom TEXT NOT NULL,
            telephone TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            region TEXT NOT NULL DEFAULT '',
            province TEXT NOT NULL DEFAULT '',
            ville TEXT NOT NULL DEFAULT '',
            code_centre TEXT NOT NULL DEFAULT '',
            salle TEXT NOT NULL DEFAULT '',
            matiere TEXT NOT NULL DEFAULT '',
            cols INTEGER NOT NULL DEFAULT 0,
            rows INTEGER NOT NULL DEFAULT 0,
            examen TEXT NOT NULL DEFAULT ''
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_general_analyses_table(pool: &SqlitePool) -> Result<()> {
    // Location columns are a snapshot of the submitter's profile at
    // submission time, kept for historical accuracy across profile edits.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS general_analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verificateur_id INTEGER NOT NULL,
            nom TEXT NOT NULL DEFAULT '',
            region TEXT NOT NULL DEFAULT '',
            province TEXT NOT NULL DEFAULT '',
            ville TEXT NOT NULL DEFAULT '',
            code_centre TEXT NOT NULL DEFAULT '',
            salle TEXT NOT NULL DEFAULT '',
            matiere TEXT NOT NULL DEFAULT '',
            operateur TEXT NOT NULL DEFAULT '',
            type_communication TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            batch INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_general_key
         ON general_analyses(code_centre, salle, matiere, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mobility_initial_table(pool: &SqlitePool) -> Result<()> {
    // Write-only telemetry; final classification happens on the device
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mobility_initial (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verificateur_id INTEGER NOT NULL,
            id_etudiant TEXT NOT NULL,
            risk_score REAL NOT NULL DEFAULT 0,
            power REAL NOT NULL DEFAULT 0,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_mobility_analyses_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS mobility_analyses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            verificateur_id INTEGER NOT NULL,
            nom TEXT NOT NULL DEFAULT '',
            region TEXT NOT NULL DEFAULT '',
            province TEXT NOT NULL DEFAULT '',
            ville TEXT NOT NULL DEFAULT '',
            code_centre TEXT NOT NULL DEFAULT '',
            salle TEXT NOT NULL DEFAULT '',
            matiere TEXT NOT NULL DEFAULT '',
            id_etudiant TEXT NOT NULL,
            risk_status TEXT NOT NULL DEFAULT '',
            power REAL NOT NULL DEFAULT 0,
            timestamp TEXT NOT NULL,
            batch INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_mobility_key
         ON mobility_analyses(code_centre, salle, matiere, id_etudiant, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_verifications_table(pool: &SqlitePool) -> Result<()> {
    // One current decision per reading: resubmissions replace via upsert
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS verifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            analyse_id INTEGER NOT NULL UNIQUE,
            action TEXT NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_cheat_rates_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cheat_rates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code_centre TEXT NOT NULL DEFAULT '',
            salle TEXT NOT NULL DEFAULT '',
            matiere TEXT NOT NULL DEFAULT '',
            examen TEXT NOT NULL DEFAULT '',
            timestamp TEXT NOT NULL,
            nbr_etudiant INTEGER NOT NULL DEFAULT 0,
            nbr_detection INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_cheat_rates_ts ON cheat_rates(timestamp)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_geography_tables(pool: &SqlitePool) -> Result<()> {
    // Hierarchy used for filtering and labeling only: lycee -> ville ->
    // province -> aref (region)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS arefs (
            code TEXT PRIMARY KEY,
            nom TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS provinces (
            code TEXT PRIMARY KEY,
            nom TEXT NOT NULL,
            aref_code TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS villes (
            code TEXT PRIMARY KEY,
            nom TEXT NOT NULL,
            province_code TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lycees (
            code TEXT PRIMARY KEY,
            nom TEXT NOT NULL,
            ville_code TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
