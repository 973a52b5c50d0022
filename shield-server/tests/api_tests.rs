//! Integration tests for shield-server API endpoints
//!
//! Covers batch sequencing, clean sessions, mobility final classification,
//! verification decisions and their effect on pending listings, cheat-rate
//! aggregation, sessions, and the health endpoint.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use tower::util::ServiceExt; // for `oneshot`

use shield_common::db::{init_database, Verificateur};
use shield_server::api::auth::sha256_hex;
use shield_server::db::verificateurs::{self, LocationProfile};
use shield_server::db::{analyses, batch, cheat_rates, geography, verifications};
use shield_server::{build_router, AppState};

const TEL: &str = "0600000000";
const PASSWORD: &str = "s3cret";

/// Window wide enough to cover any server-clock timestamp
const WIDE: &str = "start=2000-01-01%2000:00:00&end=2100-01-01%2000:00:00";

fn profile() -> LocationProfile {
    LocationProfile {
        region: "R01".to_string(),
        province: "P01".to_string(),
        ville: "V01".to_string(),
        code_centre: "C001".to_string(),
        salle: "S1".to_string(),
        matiere: "Maths".to_string(),
        cols: 5,
        rows: 4,
        examen: "2026-NORMALE".to_string(),
    }
}

/// Test helper: fresh database with one seeded verificateur
async fn setup() -> (axum::Router, AppState, i64, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = init_database(&dir.path().join("test.db"))
        .await
        .expect("init database");

    let id = verificateurs::create(&pool, "A. Alami", TEL, &sha256_hex(PASSWORD), &profile())
        .await
        .expect("seed verificateur");

    let state = AppState::new(pool, 8);
    (build_router(state.clone()), state, id, dir)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn put_json(uri: &str, token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(uri)
        .header("content-type", "application/json")
        .header("x-auth-token", token)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("x-auth-token", token);
    }
    builder.body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse JSON")
}

async fn login(app: &axum::Router) -> String {
    let request = post_json(
        "/api/login",
        None,
        json!({ "telephone": TEL, "password": PASSWORD }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    body["token"].as_str().expect("token").to_string()
}

async fn submit_general(
    app: &axum::Router,
    token: &str,
    id: i64,
    items: Vec<Value>,
) -> Value {
    let request = post_json(
        "/api/analyses/general",
        Some(token),
        json!({ "verificateur_id": id, "analyses": items }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

fn general_item(ts: &str) -> Value {
    json!({ "timestamp": ts, "operateur": "OperateurM", "type_communication": "Protocole900" })
}

async fn submit_final(app: &axum::Router, token: &str, id: i64, results: Vec<Value>) -> Value {
    let request = post_json(
        "/api/analyses/mobility/final",
        Some(token),
        json!({ "verificateur_id": id, "results": results }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body()).await
}

fn risky(student: &str) -> Value {
    json!({ "id_etudiant": student, "risk_level": 1, "risk_status": "high", "power": -48.5 })
}

fn harmless(student: &str) -> Value {
    json!({ "id_etudiant": student, "risk_level": 0, "risk_status": "low", "power": -80.0 })
}

async fn pending(app: &axum::Router, token: &str) -> Vec<Value> {
    let uri = format!("/api/detections/pending?{}", WIDE);
    let response = app.clone().oneshot(get(&uri, Some(token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    extract_json(response.into_body())
        .await
        .as_array()
        .expect("array")
        .clone()
}

async fn decide(app: &axum::Router, token: &str, analyse_id: i64, action: &str) -> StatusCode {
    let request = post_json(
        "/api/verifications",
        Some(token),
        json!({ "analyse_id": analyse_id, "action": action }),
    );
    app.clone().oneshot(request).await.unwrap().status()
}

async fn count_rows(pool: &SqlitePool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

/// Agent snapshot for direct db-level seeding
fn agent(region: &str) -> Verificateur {
    Verificateur {
        id: 1,
        nom: "A. Alami".to_string(),
        telephone: TEL.to_string(),
        password: String::new(),
        region: region.to_string(),
        province: "P01".to_string(),
        ville: "V01".to_string(),
        code_centre: "C001".to_string(),
        salle: "S1".to_string(),
        matiere: "Maths".to_string(),
        cols: 5,
        rows: 4,
        examen: "2026-NORMALE".to_string(),
    }
}

/// Seed one region's hierarchy: R01 -> P01 -> V01 -> C001
async fn seed_geography(pool: &SqlitePool) {
    geography::upsert_aref(pool, "R01", "Rabat-Salé-Kénitra").await.unwrap();
    geography::upsert_province(pool, "P01", "Rabat", "R01").await.unwrap();
    geography::upsert_ville(pool, "V01", "Rabat", "P01").await.unwrap();
    geography::upsert_lycee(pool, "C001", "Lycée Moulay Youssef", "V01").await.unwrap();
}

// =============================================================================
// Health and authentication
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let (app, _state, _id, _dir) = setup().await;

    let response = app.oneshot(get("/health", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "shield-server");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_protected_route_requires_token() {
    let (app, _state, _id, _dir) = setup().await;

    let response = app
        .oneshot(get("/api/stats/rate", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let (app, _state, _id, _dir) = setup().await;

    let request = post_json(
        "/api/login",
        None,
        json!({ "telephone": TEL, "password": "wrong" }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let request = post_json(
        "/api/login",
        None,
        json!({ "telephone": "0999999999", "password": PASSWORD }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_invalidates_token_and_is_idempotent() {
    let (app, _state, _id, _dir) = setup().await;
    let token = login(&app).await;

    for _ in 0..2 {
        let request = post_json("/api/logout", Some(&token), json!({ "token": token }));
        let response = app.clone().oneshot(request).await.unwrap();
        // First call removes the session; repeating is a no-op but the
        // route itself then requires a live token
        let status = response.status();
        assert!(status == StatusCode::OK || status == StatusCode::UNAUTHORIZED);
    }

    let response = app
        .oneshot(get("/api/stats/rate", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// General ingestion and batch sequencing
// =============================================================================

#[tokio::test]
async fn test_general_batches_increment_per_submission() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    let body = submit_general(
        &app,
        &token,
        id,
        vec![
            general_item("2026-06-15 09:00:00"),
            general_item("2026-06-15 09:01:00"),
        ],
    )
    .await;
    assert_eq!(body["batch"], 1);
    assert_eq!(body["count"], 2);

    let body = submit_general(
        &app,
        &token,
        id,
        vec![
            general_item("2026-06-15 09:05:00"),
            general_item("2026-06-15 09:06:00"),
            general_item("2026-06-15 09:07:00"),
        ],
    )
    .await;
    assert_eq!(body["batch"], 2);
    assert_eq!(body["count"], 3);

    let batch2: i64 = count_rows(
        &state.db,
        "SELECT COUNT(*) FROM general_analyses WHERE batch = 2",
    )
    .await;
    assert_eq!(batch2, 3);

    // Operator vocabulary normalized at the boundary
    let normalized: i64 = count_rows(
        &state.db,
        "SELECT COUNT(*) FROM general_analyses WHERE operateur = 'IAM' AND type_communication = 'GSM'",
    )
    .await;
    assert_eq!(normalized, 5);
}

#[tokio::test]
async fn test_empty_general_submission_is_clean_session() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_general(&app, &token, id, vec![general_item("2026-06-15 09:00:00")]).await;

    let body = submit_general(&app, &token, id, vec![]).await;
    assert_eq!(body["clean_session"], true);
    assert!(body["batch"].is_null());
    assert_eq!(body["count"], 0);

    // Exactly one zero-detection sample with students = cols x rows
    let samples: i64 = count_rows(
        &state.db,
        "SELECT COUNT(*) FROM cheat_rates WHERE nbr_detection = 0 AND nbr_etudiant = 20",
    )
    .await;
    assert_eq!(samples, 1);

    // The batch counter was not touched
    let body = submit_general(&app, &token, id, vec![general_item("2026-06-15 10:00:00")]).await;
    assert_eq!(body["batch"], 2);
}

#[tokio::test]
async fn test_unknown_verificateur_is_not_found() {
    let (app, _state, _id, _dir) = setup().await;
    let token = login(&app).await;

    let request = post_json(
        "/api/analyses/general",
        Some(&token),
        json!({ "verificateur_id": 9999, "analyses": [] }),
    );
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// =============================================================================
// Mobility final classification and verification overlay
// =============================================================================

#[tokio::test]
async fn test_mobility_final_persists_risk_positive_only() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    let body = submit_final(
        &app,
        &token,
        id,
        vec![
            risky("E-1001"),
            harmless("E-1002"),
            risky("E-1003"),
            harmless("E-1004"),
            harmless("E-1005"),
        ],
    )
    .await;
    assert_eq!(body["count"], 2);

    // One sample per call: students = cols x rows, detections = flagged
    let samples: i64 = count_rows(
        &state.db,
        "SELECT COUNT(*) FROM cheat_rates WHERE nbr_etudiant = 20 AND nbr_detection = 2",
    )
    .await;
    assert_eq!(samples, 1);

    let listed = pending(&app, &token).await;
    assert_eq!(listed.len(), 2);

    // Confirm one of the two; the other stays pending
    let analyse_id = listed[0]["id"].as_i64().unwrap();
    assert_eq!(decide(&app, &token, analyse_id, "confirm").await, StatusCode::OK);
    assert_eq!(pending(&app, &token).await.len(), 1);
}

#[tokio::test]
async fn test_zero_detection_final_still_appends_sample() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    let body = submit_final(&app, &token, id, vec![harmless("E-1001")]).await;
    assert_eq!(body["count"], 0);

    let samples: i64 = count_rows(&state.db, "SELECT COUNT(*) FROM cheat_rates").await;
    assert_eq!(samples, 1);
}

#[tokio::test]
async fn test_decide_validates_before_persistence() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_final(&app, &token, id, vec![risky("E-1001")]).await;
    let listed = pending(&app, &token).await;
    let analyse_id = listed[0]["id"].as_i64().unwrap();

    assert_eq!(
        decide(&app, &token, analyse_id, "escalate").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(decide(&app, &token, 9999, "confirm").await, StatusCode::NOT_FOUND);

    let decisions: i64 = count_rows(&state.db, "SELECT COUNT(*) FROM verifications").await;
    assert_eq!(decisions, 0);
}

#[tokio::test]
async fn test_decide_is_idempotent_upsert() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_final(&app, &token, id, vec![risky("E-1001")]).await;
    let analyse_id = pending(&app, &token).await[0]["id"].as_i64().unwrap();

    assert_eq!(decide(&app, &token, analyse_id, "confirm").await, StatusCode::OK);
    assert_eq!(decide(&app, &token, analyse_id, "confirm").await, StatusCode::OK);

    let decisions: i64 = count_rows(&state.db, "SELECT COUNT(*) FROM verifications").await;
    assert_eq!(decisions, 1);

    // A deny replaces the confirm rather than appending
    assert_eq!(decide(&app, &token, analyse_id, "deny").await, StatusCode::OK);
    let denies: i64 = count_rows(
        &state.db,
        "SELECT COUNT(*) FROM verifications WHERE action = 'deny'",
    )
    .await;
    assert_eq!(denies, 1);

    let uri = format!("/api/detections/verified?{}", WIDE);
    let response = app.clone().oneshot(get(&uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["action"], "deny");
}

#[tokio::test]
async fn test_resubmission_after_decision_reappears_as_pending() {
    let (app, _state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_final(&app, &token, id, vec![risky("E-1001")]).await;
    let first = pending(&app, &token).await;
    assert_eq!(first.len(), 1);
    assert_eq!(first[0]["batch"], 1);

    let analyse_id = first[0]["id"].as_i64().unwrap();
    decide(&app, &token, analyse_id, "confirm").await;
    assert!(pending(&app, &token).await.is_empty());

    // Re-submission gets the next batch and surfaces again
    submit_final(&app, &token, id, vec![risky("E-1001")]).await;
    let again = pending(&app, &token).await;
    assert_eq!(again.len(), 1);
    assert_eq!(again[0]["batch"], 2);
}

// =============================================================================
// Cheat-rate aggregation
// =============================================================================

#[tokio::test]
async fn test_rate_with_no_samples_is_zero() {
    let (app, _state, _id, _dir) = setup().await;
    let token = login(&app).await;

    let uri = format!("/api/stats/rate?{}", WIDE);
    let response = app.oneshot(get(&uri, Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["rate"], 0.0);
    assert_eq!(body["samples"], 0);
}

#[tokio::test]
async fn test_rate_sums_samples_before_dividing() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;

    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 09:00:00", 20, 1,
    )
    .await
    .unwrap();
    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 10:00:00", 20, 2,
    )
    .await
    .unwrap();

    let uri = format!("/api/stats/rate?{}", WIDE);
    let response = app.oneshot(get(&uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;

    // 3 detections / 40 students = 7.5%, not the 7.5% average coincidence:
    // (5% + 10%) / 2 would also be 7.5 here, so check the sums directly
    assert_eq!(body["detections"], 3);
    assert_eq!(body["students"], 40);
    assert_eq!(body["rate"], 7.5);
    assert_eq!(body["samples"], 2);
}

#[tokio::test]
async fn test_hourly_series_accumulates_within_one_day() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;

    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 09:10:00", 20, 2,
    )
    .await
    .unwrap();
    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 11:10:00", 20, 3,
    )
    .await
    .unwrap();

    let uri = "/api/stats/hourly?start=2026-06-15%2008:00:00&end=2026-06-15%2012:00:00";
    let response = app.oneshot(get(uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["mode"], "cumulative");
    let points = body["hourly"].as_array().unwrap();
    assert_eq!(points.len(), 5); // hours 08..=12

    assert_eq!(points[0]["detections"], 0); // 08:00
    assert_eq!(points[1]["detections"], 2); // 09:00
    assert_eq!(points[2]["detections"], 2); // 10:00, carried forward
    assert_eq!(points[3]["detections"], 5); // 11:00
    assert_eq!(points[4]["detections"], 5); // 12:00
}

#[tokio::test]
async fn test_hourly_multi_day_window_is_not_cumulative() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;

    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 09:10:00", 20, 2,
    )
    .await
    .unwrap();
    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-16 09:10:00", 20, 3,
    )
    .await
    .unwrap();

    let uri = "/api/stats/hourly?start=2026-06-15%2008:00:00&end=2026-06-16%2018:00:00";
    let response = app.oneshot(get(uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;

    assert_eq!(body["mode"], "per_day");
    let points = body["daily"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["day"], "2026-06-15");
    assert_eq!(points[0]["detections"], 2);
    assert_eq!(points[1]["day"], "2026-06-16");
    assert_eq!(points[1]["detections"], 3);
}

#[tokio::test]
async fn test_grouped_stats_by_subject() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;

    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 09:00:00", 20, 2,
    )
    .await
    .unwrap();
    shield_server::db::cheat_rates::append_sample(
        &state.db, "C001", "S2", "Physique", "2026-NORMALE", "2026-06-15 09:00:00", 40, 1,
    )
    .await
    .unwrap();

    let uri = format!("/api/stats/by-subject?{}", WIDE);
    let response = app.oneshot(get(&uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;

    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["label"], "Maths");
    assert_eq!(rows[0]["rate"], 10.0);
    assert_eq!(rows[1]["label"], "Physique");
    assert_eq!(rows[1]["rate"], 2.5);
}

// =============================================================================
// Chef-centre sessions and configuration updates
// =============================================================================

#[tokio::test]
async fn test_chef_login_requires_known_center() {
    let (app, _state, _id, _dir) = setup().await;

    let request = post_json("/api/chef/login", None, json!({ "code_centre": "C999" }));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = post_json("/api/chef/login", None, json!({ "code_centre": "C001" }));
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let chef_token = body["token"].as_str().unwrap();

    // The chef token is accepted on protected routes
    let uri = format!("/api/detections/pending?{}", WIDE);
    let response = app.oneshot(get(&uri, Some(chef_token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_chef_listing_splits_verified_and_pending() {
    let (app, _state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_final(&app, &token, id, vec![risky("E-1001"), risky("E-1002")]).await;
    let listed = pending(&app, &token).await;
    let analyse_id = listed[0]["id"].as_i64().unwrap();
    decide(&app, &token, analyse_id, "confirm").await;

    let response = app
        .clone()
        .oneshot(get("/api/chef/detections?code_centre=C001", Some(&token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["verified"].as_array().unwrap().len(), 1);
    assert_eq!(body["pending"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_config_update_drops_old_center_chef_session() {
    let (app, _state, id, _dir) = setup().await;

    let request = post_json("/api/chef/login", None, json!({ "code_centre": "C001" }));
    let response = app.clone().oneshot(request).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let chef_token = body["token"].as_str().unwrap().to_string();

    let mut updated = profile();
    updated.code_centre = "C002".to_string();
    let uri = format!("/api/verificateurs/{}/config", id);
    let response = app
        .clone()
        .oneshot(put_json(&uri, &chef_token, serde_json::to_value(&updated).unwrap()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    assert_eq!(body["code_centre"], "C002");

    // The supervisory session bound to C001 is gone
    let response = app
        .oneshot(get("/api/stats/rate", Some(&chef_token)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Broadcast events
// =============================================================================

#[tokio::test]
async fn test_ingestion_broadcasts_events() {
    let (app, state, id, _dir) = setup().await;
    let token = login(&app).await;
    let mut rx = state.events.subscribe();

    submit_general(&app, &token, id, vec![general_item("2026-06-15 09:00:00")]).await;
    assert_eq!(rx.try_recv().unwrap().event_type(), "GeneralAnalysis");

    submit_general(&app, &token, id, vec![]).await;
    assert_eq!(rx.try_recv().unwrap().event_type(), "CleanSession");

    submit_final(&app, &token, id, vec![risky("E-1001")]).await;
    assert_eq!(rx.try_recv().unwrap().event_type(), "MobilityDetection");

    let analyse_id = pending(&app, &token).await[0]["id"].as_i64().unwrap();
    decide(&app, &token, analyse_id, "confirm").await;
    assert_eq!(rx.try_recv().unwrap().event_type(), "Verification");
}

// =============================================================================
// Registration and geography lookups
// =============================================================================

#[tokio::test]
async fn test_register_then_login() {
    let (app, _state, _id, _dir) = setup().await;

    let body = json!({
        "nom": "B. Bennani",
        "telephone": "0611111111",
        "password": "pw123",
        "region": "R01",
        "province": "P01",
        "ville": "V01",
        "code_centre": "C002",
        "salle": "S3",
        "matiere": "Physique",
        "cols": 6,
        "rows": 5,
        "examen": "2026-NORMALE"
    });
    let response = app
        .clone()
        .oneshot(post_json("/api/verificateurs", None, body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let created = extract_json(response.into_body()).await;
    assert_eq!(created["code_centre"], "C002");
    // The password digest never appears in responses
    assert!(created.get("password").is_none());

    let request = post_json(
        "/api/login",
        None,
        json!({ "telephone": "0611111111", "password": "pw123" }),
    );
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same telephone again is rejected before persistence
    let response = app
        .oneshot(post_json("/api/verificateurs", None, body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_geography_lookups_scope_by_region() {
    let (app, state, _id, _dir) = setup().await;
    seed_geography(&state.db).await;
    geography::upsert_aref(&state.db, "R02", "Fès-Meknès").await.unwrap();
    geography::upsert_province(&state.db, "P02", "Fès", "R02").await.unwrap();
    geography::upsert_ville(&state.db, "V02", "Fès", "P02").await.unwrap();
    geography::upsert_lycee(&state.db, "C002", "Lycée Ibn Khaldoun", "V02").await.unwrap();

    // No auth header: the map views load these before login
    let response = app.clone().oneshot(get("/api/geo/arefs", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(extract_json(response.into_body()).await.as_array().unwrap().len(), 2);

    let response = app
        .clone()
        .oneshot(get("/api/geo/lycees?region=R01", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["code"], "C001");

    let response = app
        .oneshot(get("/api/geo/provinces?region=R02", None))
        .await
        .unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body[0]["nom"], "Fès");
}

// =============================================================================
// General supersession and region-scoped series
// =============================================================================

#[tokio::test]
async fn test_general_listing_returns_only_current_batch() {
    let (app, _state, id, _dir) = setup().await;
    let token = login(&app).await;

    submit_general(
        &app,
        &token,
        id,
        vec![
            general_item("2026-06-15 09:00:00"),
            general_item("2026-06-15 09:01:00"),
        ],
    )
    .await;
    submit_general(
        &app,
        &token,
        id,
        vec![
            general_item("2026-06-15 09:05:00"),
            general_item("2026-06-15 09:06:00"),
            general_item("2026-06-15 09:07:00"),
        ],
    )
    .await;

    let uri = format!("/api/analyses/general?{}", WIDE);
    let response = app.oneshot(get(&uri, Some(&token))).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = extract_json(response.into_body()).await;
    let rows = body.as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r["batch"] == 2));
}

#[tokio::test]
async fn test_region_scoped_hourly_subtracts_only_that_regions_decisions() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;
    seed_geography(&state.db).await;

    // Sample in region R01 (via the C001 hierarchy)
    cheat_rates::append_sample(
        &state.db, "C001", "S1", "Maths", "2026-NORMALE", "2026-06-15 09:10:00", 20, 2,
    )
    .await
    .unwrap();

    // Decision against a reading whose snapshot is region R02
    let other = agent("R02");
    analyses::insert_mobility_final(
        &state.db, &other, "E-9001", "high", -50.0, "2026-06-15 09:20:00", 1,
    )
    .await
    .unwrap();
    let reading_id: i64 =
        sqlx::query_scalar("SELECT id FROM mobility_analyses WHERE id_etudiant = 'E-9001'")
            .fetch_one(&state.db)
            .await
            .unwrap();
    verifications::upsert_decision(&state.db, reading_id, "confirm", "2026-06-15 09:30:00")
        .await
        .unwrap();

    let uri = "/api/stats/hourly?start=2026-06-15%2008:00:00&end=2026-06-15%2010:00:00&region=R01";
    let response = app.clone().oneshot(get(uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;
    let points = body["hourly"].as_array().unwrap();

    // The R02 decision must not decrement the R01 pending count
    assert_eq!(points[2]["detections"], 2);
    assert_eq!(points[2]["pending"], 2);

    // Unscoped, the same decision does subtract
    let uri = "/api/stats/hourly?start=2026-06-15%2008:00:00&end=2026-06-15%2010:00:00";
    let response = app.oneshot(get(uri, Some(&token))).await.unwrap();
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["hourly"][2]["pending"], 1);
}

#[tokio::test]
async fn test_pending_groups_by_full_location_snapshot() {
    let (app, state, _id, _dir) = setup().await;
    let token = login(&app).await;

    // Reading under the old profile, then a decision on it
    let before = agent("R01");
    analyses::insert_mobility_final(
        &state.db, &before, "E-1001", "high", -50.0, "2026-06-15 09:00:00", 1,
    )
    .await
    .unwrap();
    let old_id: i64 =
        sqlx::query_scalar("SELECT id FROM mobility_analyses WHERE region = 'R01'")
            .fetch_one(&state.db)
            .await
            .unwrap();
    verifications::upsert_decision(&state.db, old_id, "confirm", "2026-06-15 09:30:00")
        .await
        .unwrap();

    // After a profile edit changing the region, the resolver opens a new
    // group at batch 1; the listing must use the same key
    let after = agent("R02");
    let next = batch::next_mobility_batch(&state.db, &after, "E-1001", "2026-06-15")
        .await
        .unwrap();
    assert_eq!(next, 1);
    analyses::insert_mobility_final(
        &state.db, &after, "E-1001", "high", -50.0, "2026-06-15 10:00:00", next,
    )
    .await
    .unwrap();

    let listed = pending(&app, &token).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["region"], "R02");
}
