//! HTTP object-store client.
//!
//! `POST {base}/v1/upload-slots` issues a slot; the returned write URL is
//! then used for a single `PUT` of the file bytes.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};

use super::{ObjectStore, sanitize_file_name};
use crate::domain::{PodContentType, ShipmentId, UploadSlot};
use crate::error::{LogisticsError, UploadSlotFailure};

#[derive(Debug, Serialize)]
struct SlotRequest<'a> {
    owner_id: ShipmentId,
    file_name: &'a str,
    content_type: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlotResponse {
    #[serde(alias = "uploadURL", alias = "uploadUrl")]
    upload_url: String,
    #[serde(alias = "objectPath")]
    object_path: String,
}

/// Object store reached over HTTP with `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpObjectStore {
    /// Creates a client for the store at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::Internal`] if the HTTP client cannot be
    /// built.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LogisticsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LogisticsError::Internal(format!("object store client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn request_upload_slot(
        &self,
        owner: ShipmentId,
        file_name: &str,
        content_type: PodContentType,
    ) -> Result<UploadSlot, LogisticsError> {
        let file_name = sanitize_file_name(file_name);
        let unavailable =
            |msg: String| LogisticsError::UploadSlot(UploadSlotFailure::StoreUnavailable(msg));

        let response = self
            .client
            .post(format!("{}/v1/upload-slots", self.base_url))
            .json(&SlotRequest {
                owner_id: owner,
                file_name: &file_name,
                content_type: content_type.mime(),
            })
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(LogisticsError::UploadSlot(UploadSlotFailure::UnknownShipment(
                    owner,
                )));
            }
            status => return Err(unavailable(format!("slot request returned {status}"))),
        }

        let body: SlotResponse = response
            .json()
            .await
            .map_err(|e| unavailable(format!("malformed slot response: {e}")))?;

        tracing::debug!(shipment_id = %owner, object_path = %body.object_path, "upload slot issued");
        Ok(UploadSlot {
            write_url: body.upload_url,
            object_path: body.object_path,
        })
    }

    async fn upload(
        &self,
        slot: &UploadSlot,
        bytes: Bytes,
        content_type: PodContentType,
    ) -> Result<(), LogisticsError> {
        let response = self
            .client
            .put(&slot.write_url)
            .header(CONTENT_TYPE, content_type.mime())
            .body(bytes)
            .send()
            .await
            // Strip the URL: it carries the signature.
            .map_err(|e| LogisticsError::UploadTransfer(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LogisticsError::UploadTransfer(format!(
                "store returned {status} for {}",
                slot.object_path
            )));
        }
        Ok(())
    }
}
