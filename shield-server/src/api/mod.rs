//! HTTP API handlers for shield-server

pub mod auth;
pub mod error;
pub mod geography;
pub mod health;
pub mod ingest;
pub mod sse;
pub mod stats;
pub mod verificateurs;
pub mod verification;

pub use auth::{auth_middleware, chef_login, login, logout};
pub use error::{ApiError, ApiResult};
pub use health::health;
pub use ingest::{submit_general, submit_mobility_final, submit_mobility_initial};
pub use sse::event_stream;
pub use stats::{by_center, by_province, by_region, by_session, by_subject, hourly, national, rate};
pub use geography::{arefs, lycees, provinces, villes};
pub use verificateurs::{register, update_config};
pub use verification::{
    chef_detections, decide, list_general, pending_detections, verified_detections,
};
