//! Proof-of-delivery uploads through the object-store collaborator.

use std::sync::Arc;

use axum::body::Bytes;

use crate::domain::{PodReference, ShipmentId, admit_file};
use crate::error::{LogisticsError, UploadSlotFailure};
use crate::object_store::ObjectStore;
use crate::persistence::ShipmentRepository;

/// Runs the admission check and the two-phase upload.
///
/// A completed transfer is recorded against the shipment. The shipment row
/// itself is untouched until it is closed with the returned object path,
/// and close accepts only recorded paths.
#[derive(Debug, Clone)]
pub struct PodUploader {
    shipments: Arc<dyn ShipmentRepository>,
    store: Arc<dyn ObjectStore>,
}

impl PodUploader {
    /// Creates a new `PodUploader`.
    #[must_use]
    pub fn new(shipments: Arc<dyn ShipmentRepository>, store: Arc<dyn ObjectStore>) -> Self {
        Self { shipments, store }
    }

    /// Admits, then uploads a proof-of-delivery file for a shipment.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::UnsupportedFile`] or [`LogisticsError::FileTooLarge`]
    /// before any collaborator is contacted; [`LogisticsError::UploadSlot`]
    /// if the shipment is unknown or the store unreachable;
    /// [`LogisticsError::UploadTransfer`] if the transfer fails.
    pub async fn upload(
        &self,
        shipment_id: ShipmentId,
        file_name: &str,
        content_type: &str,
        bytes: Bytes,
    ) -> Result<PodReference, LogisticsError> {
        let size = u64::try_from(bytes.len()).unwrap_or(u64::MAX);
        let kind = admit_file(content_type, size)?;

        if self.shipments.get_shipment(shipment_id).await?.is_none() {
            return Err(LogisticsError::UploadSlot(UploadSlotFailure::UnknownShipment(
                shipment_id,
            )));
        }

        let slot = self
            .store
            .request_upload_slot(shipment_id, file_name, kind)
            .await
            .inspect_err(|e| tracing::error!(%shipment_id, error = %e, "upload slot request failed"))?;

        self.store
            .upload(&slot, bytes, kind)
            .await
            .inspect_err(|e| tracing::error!(%shipment_id, error = %e, "upload transfer failed"))?;

        let reference = PodReference {
            shipment_id,
            object_path: slot.object_path,
            content_type: kind,
            size,
        };
        self.shipments
            .record_pod_upload(&reference)
            .await
            .inspect_err(|e| tracing::error!(%shipment_id, error = %e, "upload record failed"))?;

        tracing::info!(%shipment_id, object_path = %reference.object_path, size, "proof of delivery uploaded");
        Ok(reference)
    }
}
