//! Attendance handlers: check-in, check-out, records and metrics.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::{AttendanceQuery, CheckInRequest, CheckOutRequest, MetricsQuery};
use crate::app_state::AppState;
use crate::domain::AttendanceRecord;
use crate::error::{ErrorResponse, LogisticsError};
use crate::service::MetricsReport;

/// `POST /attendance/check-in` — Open today's session.
///
/// # Errors
///
/// Returns [`LogisticsError::DuplicateCheckIn`] if the user already has a
/// record for the date, [`LogisticsError::InvalidRequest`] for a missing
/// or impossible fix.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-in",
    tag = "Attendance",
    summary = "Check in",
    description = "Opens the acting user's session for the date (default today, UTC). A GPS fix is required.",
    request_body = CheckInRequest,
    responses(
        (status = 201, description = "Session opened", body = AttendanceRecord),
        (status = 400, description = "Missing or invalid GPS fix", body = ErrorResponse),
        (status = 401, description = "Missing actor", body = ErrorResponse),
        (status = 409, description = "Already checked in", body = ErrorResponse),
    )
)]
pub async fn check_in(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CheckInRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let record = state
        .attendance_service
        .check_in(actor, req.into_evidence()?)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// `POST /attendance/check-out` — Close the open session.
///
/// # Errors
///
/// Returns [`LogisticsError::NoOpenSession`] if there is nothing to close.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/check-out",
    tag = "Attendance",
    summary = "Check out",
    description = "Closes the acting user's open session for the date, optionally with a work report.",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Session closed", body = AttendanceRecord),
        (status = 400, description = "Missing or invalid GPS fix", body = ErrorResponse),
        (status = 401, description = "Missing actor", body = ErrorResponse),
        (status = 409, description = "No open session", body = ErrorResponse),
    )
)]
pub async fn check_out(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CheckOutRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let (evidence, work) = req.into_parts()?;
    let record = state
        .attendance_service
        .check_out(actor, evidence, work)
        .await?;
    Ok(Json(record))
}

/// `GET /attendance` — A user's records.
///
/// # Errors
///
/// Returns [`LogisticsError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    tag = "Attendance",
    summary = "List attendance records",
    description = "Records of `user_id` (default: the acting user), for one date or all dates, most recent first.",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Attendance records", body = Vec<AttendanceRecord>),
        (status = 401, description = "Missing actor", body = ErrorResponse),
    )
)]
pub async fn list_records(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<AttendanceQuery>,
) -> Result<impl IntoResponse, LogisticsError> {
    let user_id = query.user_id.unwrap_or(actor);
    Ok(Json(
        state.attendance_service.records(user_id, query.date).await?,
    ))
}

/// `GET /attendance/metrics` — Aggregates for a day or a range.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidRequest`] for a malformed or over-long
/// range.
#[utoipa::path(
    get,
    path = "/api/v1/attendance/metrics",
    tag = "Attendance",
    summary = "Attendance metrics",
    description = "Present, checked-in and checked-out counts, average hours and work totals over an inclusive date range.",
    params(MetricsQuery),
    responses(
        (status = 200, description = "Metrics", body = MetricsReport),
        (status = 400, description = "Invalid range", body = ErrorResponse),
    )
)]
pub async fn metrics(
    State(state): State<AppState>,
    Query(query): Query<MetricsQuery>,
) -> Result<impl IntoResponse, LogisticsError> {
    let (from, to) = query.range()?;
    Ok(Json(state.attendance_service.metrics(from, to).await?))
}

/// Attendance routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/attendance", get(list_records))
        .route("/attendance/check-in", post(check_in))
        .route("/attendance/check-out", post(check_out))
        .route("/attendance/metrics", get(metrics))
}
