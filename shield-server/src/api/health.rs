//! Health endpoint (no auth required)

use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::AppState;

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "module": "shield-server",
        "version": env!("CARGO_PKG_VERSION"),
        "db": {
            "connections": state.db.size(),
            "idle": state.db.num_idle(),
        },
        "sse_subscribers": state.events.subscriber_count(),
    }))
}
