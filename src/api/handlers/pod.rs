//! Proof-of-delivery upload handler.
//!
//! The file travels as the raw request body with its `Content-Type`
//! header. Oversized bodies are answered with `FileTooLarge`, never with
//! the framework's body-limit rejection.

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::PodUploadQuery;
use crate::app_state::AppState;
use crate::domain::{MAX_POD_BYTES, PodContentType, PodReference, ShipmentId, admit_file};
use crate::error::{ErrorResponse, LogisticsError};

/// `POST /shipments/{id}/pod` — Upload a proof-of-delivery file.
///
/// # Errors
///
/// Returns [`LogisticsError::UnsupportedFile`] or
/// [`LogisticsError::FileTooLarge`] before the object store is contacted,
/// [`LogisticsError::UploadSlot`] for an unknown shipment or unreachable
/// store, [`LogisticsError::UploadTransfer`] if the transfer fails.
#[utoipa::path(
    post,
    path = "/api/v1/shipments/{id}/pod",
    tag = "Proof of delivery",
    summary = "Upload a proof-of-delivery file",
    description = "Accepts JPEG, PNG, WebP or PDF up to 10 MiB as the raw body. Returns the permanent object path to pass as `object_path` when closing the shipment.",
    params(
        ("id" = ShipmentId, Path, description = "Shipment id"),
        PodUploadQuery,
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "File stored", body = PodReference),
        (status = 404, description = "Shipment not found", body = ErrorResponse),
        (status = 413, description = "File too large", body = ErrorResponse),
        (status = 415, description = "Unsupported file type", body = ErrorResponse),
        (status = 502, description = "Transfer to the object store failed", body = ErrorResponse),
        (status = 503, description = "Object store unavailable", body = ErrorResponse),
    )
)]
pub async fn upload_pod(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<ShipmentId>,
    Query(query): Query<PodUploadQuery>,
    headers: HeaderMap,
    body: Body,
) -> Result<impl IntoResponse, LogisticsError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| LogisticsError::UnsupportedFile("missing Content-Type".to_string()))?;

    let declared = headers
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());
    match declared {
        Some(size) => {
            admit_file(content_type, size)?;
        }
        None => {
            content_type.parse::<PodContentType>()?;
        }
    }

    // Read one byte past the limit so admission sees the overflow.
    let read_limit = MAX_POD_BYTES.saturating_add(1);
    let bytes = axum::body::to_bytes(body, usize::try_from(read_limit).unwrap_or(usize::MAX))
        .await
        .map_err(|e| {
            tracing::debug!(shipment_id = %id, error = %e, "proof-of-delivery body rejected");
            LogisticsError::FileTooLarge {
                size: read_limit,
                max: MAX_POD_BYTES,
            }
        })?;

    let reference = state
        .pod_uploader
        .upload(id, &query.file_name, content_type, bytes)
        .await?;
    tracing::debug!(shipment_id = %id, %actor, "proof-of-delivery upload accepted");
    Ok((StatusCode::CREATED, Json(reference)))
}

/// Proof-of-delivery routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/shipments/{id}/pod", post(upload_pod))
}
