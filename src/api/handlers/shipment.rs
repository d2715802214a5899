//! Shipment handlers: creation, queries, status changes and checkpoints.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::{
    AdvanceStatusRequest, CreateShipmentRequest, RecordCheckpointRequest,
    RecordCheckpointResponse, SearchQuery, ShipmentListQuery, UpdateShipmentRequest,
};
use crate::app_state::AppState;
use crate::domain::{
    CheckpointEvent, PodPayload, Shipment, ShipmentDashboard, ShipmentFilter, ShipmentId,
    StatusUpdateEvent,
};
use crate::error::{ErrorResponse, LogisticsError};

/// `POST /shipments` — Register a shipment.
///
/// # Errors
///
/// Returns [`LogisticsError`] on invalid input or a reused consignment number.
#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    tag = "Shipments",
    summary = "Create a shipment",
    description = "Registers a shipment in status `created`. Consignment numbers are unique.",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created", body = Shipment),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 401, description = "Missing actor", body = ErrorResponse),
        (status = 409, description = "Consignment number already in use", body = ErrorResponse),
    )
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(req): Json<CreateShipmentRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let shipment = state
        .shipment_service
        .create(req.into_new_shipment()?, actor)
        .await?;
    Ok((StatusCode::CREATED, Json(shipment)))
}

/// `GET /shipments` — List shipments.
///
/// # Errors
///
/// Returns [`LogisticsError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    tag = "Shipments",
    summary = "List shipments",
    description = "Lists shipments, newest first, optionally filtered by status, client or vendor.",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Matching shipments", body = Vec<Shipment>),
    )
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> Result<impl IntoResponse, LogisticsError> {
    let filter = ShipmentFilter::from(query);
    Ok(Json(state.shipment_service.list(&filter).await?))
}

/// `GET /shipments/active` — Shipments not yet closed.
///
/// # Errors
///
/// Returns [`LogisticsError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/active",
    tag = "Shipments",
    summary = "List active shipments",
    responses(
        (status = 200, description = "Shipments not yet closed", body = Vec<Shipment>),
    )
)]
pub async fn active_shipments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.active().await?))
}

/// `GET /shipments/overdue` — Shipments past their expected delivery date.
///
/// # Errors
///
/// Returns [`LogisticsError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/overdue",
    tag = "Shipments",
    summary = "List overdue shipments",
    description = "Shipments whose expected delivery date has passed and that are neither delivered nor closed.",
    responses(
        (status = 200, description = "Overdue shipments", body = Vec<Shipment>),
    )
)]
pub async fn overdue_shipments(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.overdue().await?))
}

/// `GET /shipments/dashboard` — Shipment counts.
///
/// # Errors
///
/// Returns [`LogisticsError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/dashboard",
    tag = "Shipments",
    summary = "Shipment dashboard",
    description = "Total, active and overdue counts plus one count per status in lifecycle order.",
    responses(
        (status = 200, description = "Shipment counts", body = ShipmentDashboard),
    )
)]
pub async fn shipment_dashboard(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.dashboard().await?))
}

/// `GET /shipments/search` — Free-text search.
///
/// # Errors
///
/// Returns [`LogisticsError`] for an empty query.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/search",
    tag = "Shipments",
    summary = "Search shipments",
    description = "Case-insensitive substring match on consignment number, source and destination.",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching shipments", body = Vec<Shipment>),
        (status = 400, description = "Empty query", body = ErrorResponse),
    )
)]
pub async fn search_shipments(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.search(&query.q).await?))
}

/// `GET /shipments/{id}` — Get one shipment.
///
/// # Errors
///
/// Returns [`LogisticsError::ShipmentNotFound`] if it does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}",
    tag = "Shipments",
    summary = "Get a shipment",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "The shipment", body = Shipment),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    )
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.get(id).await?))
}

/// `PUT /shipments/{id}` — Edit descriptive fields.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidRequest`] if the edit is refused,
/// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist.
#[utoipa::path(
    put,
    path = "/api/v1/shipments/{id}",
    tag = "Shipments",
    summary = "Update a shipment",
    description = "Edits route, counterparty, planned dates, notes and weight. Status and proof of delivery are never changed here; closed shipments are read-only.",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    request_body = UpdateShipmentRequest,
    responses(
        (status = 200, description = "Updated shipment", body = Shipment),
        (status = 400, description = "Invalid edit", body = ErrorResponse),
        (status = 401, description = "Missing actor", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    )
)]
pub async fn update_shipment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ShipmentId>,
    Json(req): Json<UpdateShipmentRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let shipment = state
        .shipment_service
        .update(id, req.into_update()?, actor)
        .await?;
    Ok(Json(shipment))
}

/// `POST /shipments/{id}/status` — Advance to the next status.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidTransition`] unless the requested
/// status immediately follows the current one.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/status",
    tag = "Shipments",
    summary = "Advance shipment status",
    description = "Moves the shipment exactly one step forward and appends a status event. Closing goes through `/close`.",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    request_body = AdvanceStatusRequest,
    responses(
        (status = 200, description = "Updated shipment", body = Shipment),
        (status = 400, description = "Closing without proof of delivery", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
        (status = 409, description = "Transition not allowed", body = ErrorResponse),
    )
)]
pub async fn advance_status(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ShipmentId>,
    Json(req): Json<AdvanceStatusRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let shipment = state
        .shipment_service
        .advance(id, req.into(), actor)
        .await?;
    Ok(Json(shipment))
}

/// `POST /shipments/{id}/close` — Close with proof of delivery.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidTransition`] unless the shipment is
/// delivered, then [`LogisticsError::InvalidRequest`] if the receiver is
/// missing or the object path was not uploaded for this shipment.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/close",
    tag = "Shipments",
    summary = "Close a delivered shipment",
    description = "Records the proof of delivery and closes the shipment. `delivered_to` is required; `object_path` must be a path returned by this shipment's `/pod` upload.",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    request_body = PodPayload,
    responses(
        (status = 200, description = "Closed shipment", body = Shipment),
        (status = 400, description = "Receiver missing or unknown object path", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
        (status = 409, description = "Shipment is not delivered", body = ErrorResponse),
    )
)]
pub async fn close_shipment(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ShipmentId>,
    Json(payload): Json<PodPayload>,
) -> Result<impl IntoResponse, LogisticsError> {
    let shipment = state.shipment_service.close(id, payload, actor).await?;
    Ok(Json(shipment))
}

/// `GET /shipments/{id}/status-updates` — The status log.
///
/// # Errors
///
/// Returns [`LogisticsError::ShipmentNotFound`] if it does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}/status-updates",
    tag = "Shipments",
    summary = "List status updates",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Status events in append order", body = Vec<StatusUpdateEvent>),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    )
)]
pub async fn list_status_updates(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.status_updates(id).await?))
}

/// `POST /shipments/{id}/checkpoints` — Record a checkpoint.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidRequest`] for a missing location or an
/// impossible fix.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/checkpoints",
    tag = "Shipments",
    summary = "Record a checkpoint",
    description = "Appends a location observation. Implausible movement is reported in `gps` but never blocks recording.",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    request_body = RecordCheckpointRequest,
    responses(
        (status = 201, description = "Checkpoint recorded", body = RecordCheckpointResponse),
        (status = 400, description = "Invalid location or coordinates", body = ErrorResponse),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    )
)]
pub async fn record_checkpoint(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ShipmentId>,
    Json(req): Json<RecordCheckpointRequest>,
) -> Result<impl IntoResponse, LogisticsError> {
    let recorded = state
        .shipment_service
        .record_checkpoint(id, req.into(), actor)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(RecordCheckpointResponse::from(recorded)),
    ))
}

/// `GET /shipments/{id}/checkpoints` — The checkpoint log.
///
/// # Errors
///
/// Returns [`LogisticsError::ShipmentNotFound`] if it does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/shipments/{id}/checkpoints",
    tag = "Shipments",
    summary = "List checkpoints",
    params(("id" = ShipmentId, Path, description = "Shipment id")),
    responses(
        (status = 200, description = "Checkpoints in append order", body = Vec<CheckpointEvent>),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
    )
)]
pub async fn list_checkpoints(
    State(state): State<AppState>,
    Path(id): Path<ShipmentId>,
) -> Result<impl IntoResponse, LogisticsError> {
    Ok(Json(state.shipment_service.checkpoints(id).await?))
}

/// Shipment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/shipments", post(create_shipment).get(list_shipments))
        .route("/shipments/active", get(active_shipments))
        .route("/shipments/overdue", get(overdue_shipments))
        .route("/shipments/search", get(search_shipments))
        .route("/shipments/dashboard", get(shipment_dashboard))
        .route("/shipments/{id}", get(get_shipment).put(update_shipment))
        .route("/shipments/{id}/status", post(advance_status))
        .route("/shipments/{id}/close", post(close_shipment))
        .route("/shipments/{id}/status-updates", get(list_status_updates))
        .route(
            "/shipments/{id}/checkpoints",
            post(record_checkpoint).get(list_checkpoints),
        )
}
