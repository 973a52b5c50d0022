//! shield-server library - exam-center monitoring HTTP service
//!
//! Ingestion of general/mobility readings, verification decisions,
//! cheat-rate statistics, and realtime fan-out over SSE.

use axum::Router;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use shield_common::events::EventBus;

pub mod api;
pub mod db;
pub mod sessions;

use sessions::{ChefSession, LoginSession, MemorySessionStore, SessionStore};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// In-process broadcast bus for ingestion/verification events
    pub events: EventBus,
    /// Active login sessions, keyed by opaque token
    pub sessions: Arc<dyn SessionStore<LoginSession>>,
    /// Active chef-centre sessions, keyed by opaque token (fixed TTL)
    pub chef_sessions: Arc<dyn SessionStore<ChefSession>>,
}

impl AppState {
    /// Create application state with in-memory session stores
    pub fn new(db: SqlitePool, chef_session_ttl_hours: i64) -> Self {
        let ttl = Duration::from_secs(chef_session_ttl_hours.max(0) as u64 * 3600);
        Self {
            db,
            events: EventBus::new(1000),
            sessions: Arc::new(MemorySessionStore::new(None)),
            chef_sessions: Arc::new(MemorySessionStore::new(Some(ttl))),
        }
    }
}

/// Build application router
///
/// Login, chef login, health, and the event stream are public; everything
/// else requires a session token.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{get, post, put};

    let protected = Router::new()
        .route("/api/logout", post(api::logout))
        .route("/api/analyses/general", post(api::submit_general).get(api::list_general))
        .route("/api/analyses/mobility/initial", post(api::submit_mobility_initial))
        .route("/api/analyses/mobility/final", post(api::submit_mobility_final))
        .route("/api/verifications", post(api::decide))
        .route("/api/detections/pending", get(api::pending_detections))
        .route("/api/detections/verified", get(api::verified_detections))
        .route("/api/chef/detections", get(api::chef_detections))
        .route("/api/verificateurs/:id/config", put(api::update_config))
        .route("/api/stats/rate", get(api::rate))
        .route("/api/stats/hourly", get(api::hourly))
        .route("/api/stats/by-region", get(api::by_region))
        .route("/api/stats/by-province", get(api::by_province))
        .route("/api/stats/by-center", get(api::by_center))
        .route("/api/stats/by-subject", get(api::by_subject))
        .route("/api/stats/by-session", get(api::by_session))
        .route("/api/stats/national", get(api::national))
        .layer(middleware::from_fn_with_state(state.clone(), api::auth_middleware));

    let public = Router::new()
        .route("/api/login", post(api::login))
        .route("/api/chef/login", post(api::chef_login))
        .route("/api/verificateurs", post(api::register))
        .route("/api/geo/arefs", get(api::arefs))
        .route("/api/geo/provinces", get(api::provinces))
        .route("/api/geo/villes", get(api::villes))
        .route("/api/geo/lycees", get(api::lycees))
        .route("/api/events", get(api::event_stream))
        .route("/health", get(api::health));

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}
