//! Cheat-rate statistics endpoints
//!
//! All read-only derivations over the cheat-rate sample series. The
//! window defaults to today's exam hours (08:00 to 18:00) when the caller
//! supplies no bounds; `region` is an aref code.

use axum::extract::{Query, State};
use axum::Json;
use chrono::Timelike;
use serde::{Deserialize, Serialize};
use shield_common::time;

use crate::api::ApiResult;
use crate::db::cheat_rates::{self, rate as pct};
use crate::db::verifications;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub region: Option<String>,
}

/// Resolve caller bounds, falling back to today's exam hours
pub(crate) fn resolve_window(query: &WindowQuery) -> (String, String) {
    let (default_start, default_end) = time::default_window();
    (
        query.start.clone().unwrap_or(default_start),
        query.end.clone().unwrap_or(default_end),
    )
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub rate: f64,
    pub detections: i64,
    pub students: i64,
    pub samples: i64,
}

/// Simple rate over a window
pub async fn rate(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<RateResponse>> {
    let (start, end) = resolve_window(&query);
    let (detections, students, samples) =
        cheat_rates::window_totals(&state.db, &start, &end, query.region.as_deref()).await?;

    Ok(Json(RateResponse {
        rate: pct(detections, students),
        detections,
        students,
        samples,
    }))
}

#[derive(Debug, Serialize)]
pub struct CumulativePoint {
    pub hour: i64,
    /// Detections accumulated up to and including this hour
    pub detections: i64,
    pub students: i64,
    pub rate: f64,
    /// Detections minus decisions accumulated so far, floored at 0.
    /// Decisions never alter the rate itself.
    pub pending: i64,
}

#[derive(Debug, Serialize)]
pub struct DayHourPoint {
    pub day: String,
    pub hour: i64,
    pub detections: i64,
    pub students: i64,
    pub rate: f64,
}

#[derive(Debug, Serialize)]
pub struct HourlyResponse {
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hourly: Vec<CumulativePoint>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub daily: Vec<DayHourPoint>,
}

/// Hourly series: cumulative within a single day, exact per-(day, hour)
/// buckets when the window spans multiple days
pub async fn hourly(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<HourlyResponse>> {
    let (start, end) = resolve_window(&query);
    let start_ts = time::parse_timestamp(&start)?;
    let end_ts = time::parse_timestamp(&end)?;

    if start_ts.date() != end_ts.date() {
        let rows =
            cheat_rates::totals_by_day_hour(&state.db, &start, &end, query.region.as_deref())
                .await?;
        let daily = rows
            .into_iter()
            .map(|(day, hour, detections, students)| DayHourPoint {
                day,
                hour,
                detections,
                students,
                rate: pct(detections, students),
            })
            .collect();

        return Ok(Json(HourlyResponse { mode: "per_day", hourly: Vec::new(), daily }));
    }

    let per_hour =
        cheat_rates::totals_by_hour(&state.db, &start, &end, query.region.as_deref()).await?;
    let decided =
        verifications::decisions_by_hour(&state.db, &start, &end, query.region.as_deref()).await?;

    let mut points = Vec::new();
    let mut cum_detections = 0i64;
    let mut cum_students = 0i64;
    let mut cum_decided = 0i64;

    for hour in (start_ts.hour() as i64)..=(end_ts.hour() as i64) {
        if let Some((_, d, s)) = per_hour.iter().find(|(h, _, _)| *h == hour) {
            cum_detections += d;
            cum_students += s;
        }
        if let Some((_, n)) = decided.iter().find(|(h, _)| *h == hour) {
            cum_decided += n;
        }

        points.push(CumulativePoint {
            hour,
            detections: cum_detections,
            students: cum_students,
            rate: pct(cum_detections, cum_students),
            pending: (cum_detections - cum_decided).max(0),
        });
    }

    Ok(Json(HourlyResponse { mode: "cumulative", hourly: points, daily: Vec::new() }))
}

#[derive(Debug, Serialize)]
pub struct GroupRate {
    pub code: String,
    pub nom: String,
    pub detections: i64,
    pub students: i64,
    pub rate: f64,
}

fn group_rates(rows: Vec<(String, String, i64, i64)>) -> Vec<GroupRate> {
    rows.into_iter()
        .map(|(code, nom, detections, students)| GroupRate {
            code,
            nom,
            detections,
            students,
            rate: pct(detections, students),
        })
        .collect()
}

pub async fn by_region(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<GroupRate>>> {
    let (start, end) = resolve_window(&query);
    let rows = cheat_rates::totals_by_region(&state.db, &start, &end).await?;
    Ok(Json(group_rates(rows)))
}

pub async fn by_province(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<GroupRate>>> {
    let (start, end) = resolve_window(&query);
    let rows =
        cheat_rates::totals_by_province(&state.db, &start, &end, query.region.as_deref()).await?;
    Ok(Json(group_rates(rows)))
}

/// Worst 20 centers by rate over the window
pub async fn by_center(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<GroupRate>>> {
    let (start, end) = resolve_window(&query);
    let rows = cheat_rates::totals_by_center(&state.db, &start, &end).await?;
    Ok(Json(group_rates(rows)))
}

#[derive(Debug, Serialize)]
pub struct LabelRate {
    pub label: String,
    pub detections: i64,
    pub students: i64,
    pub rate: f64,
}

fn label_rates(rows: Vec<(String, i64, i64)>) -> Vec<LabelRate> {
    rows.into_iter()
        .map(|(label, detections, students)| LabelRate {
            label,
            detections,
            students,
            rate: pct(detections, students),
        })
        .collect()
}

pub async fn by_subject(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<LabelRate>>> {
    let (start, end) = resolve_window(&query);
    let rows = cheat_rates::totals_by_subject(&state.db, &start, &end).await?;
    Ok(Json(label_rates(rows)))
}

pub async fn by_session(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<LabelRate>>> {
    let (start, end) = resolve_window(&query);
    let rows = cheat_rates::totals_by_session(&state.db, &start, &end).await?;
    Ok(Json(label_rates(rows)))
}

#[derive(Debug, Serialize)]
pub struct DayRate {
    pub day: String,
    pub detections: i64,
    pub students: i64,
    pub rate: f64,
}

/// National per-day series over the window
pub async fn national(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> ApiResult<Json<Vec<DayRate>>> {
    let (start, end) = resolve_window(&query);
    let rows = cheat_rates::totals_by_day(&state.db, &start, &end).await?;

    Ok(Json(
        rows.into_iter()
            .map(|(day, detections, students)| DayRate {
                day,
                detections,
                students,
                rate: pct(detections, students),
            })
            .collect(),
    ))
}
