//! shield-server - exam-center fraud-detection monitoring backend
//!
//! Receives general/mobility readings from field agents, records
//! confirm/deny decisions from chef-centre supervisors, and serves
//! batch-filtered listings, cheat-rate statistics, and a realtime
//! event stream to dashboards.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use shield_common::config::Settings;
use shield_common::db::init_database;
use shield_server::{build_router, AppState};

#[derive(Parser, Debug)]
#[command(name = "shield-server", about = "Exam-center monitoring backend")]
struct Args {
    /// SQLite database file path
    #[arg(long, env = "SHIELD_DB_PATH")]
    database: Option<PathBuf>,

    /// Bind host
    #[arg(long, env = "SHIELD_HOST")]
    host: Option<String>,

    /// Bind port
    #[arg(long, env = "SHIELD_PORT")]
    port: Option<u16>,

    /// TOML config file path
    #[arg(long, env = "SHIELD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("Starting shield-server v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref(), args.database, args.host, args.port)
        .context("Failed to resolve settings")?;

    let pool = match init_database(&settings.database_path).await {
        Ok(pool) => {
            info!("✓ Database ready at {}", settings.database_path.display());
            pool
        }
        Err(e) => {
            error!("Failed to initialize database: {}", e);
            return Err(e.into());
        }
    };

    let state = AppState::new(pool, settings.chef_session_ttl_hours);
    let app = build_router(state);

    let bind = format!("{}:{}", settings.host, settings.port);
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    info!("shield-server listening on http://{}", bind);
    info!("Health check: http://{}/health", bind);

    axum::serve(listener, app).await?;

    Ok(())
}
