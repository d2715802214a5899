//! Timeline handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::{ShipmentId, Timeline};
use crate::error::{ErrorResponse, LogisticsError};

/// `GET /shipments/{id}/timeline` — Merged shipment history.
///
/// # Errors
///
/// Returns [`LogisticsError::ShipmentNotFound`] if the shipment does not
/// exist, [`LogisticsError::IntegrityViolation`] if its status log is
/// inconsistent with its current status.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}/timeline",
    tag = "Timeline",
    summary = "Get the shipment timeline",
    description = "Status updates and checkpoints merged into one list, most recent first, with counts and the current status.",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "The timeline", body = Timeline),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
        (status = 500, description = "Status log inconsistent", body = ErrorResponse),
    )
)]
pub async fn get_timeline(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.timeline_service.build(id).await?))
}

/// Timeline routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/shipments/{id}/timeline", get(get_timeline))
}
