//! Timeline service: reads both event logs and merges them on demand.

use std::sync::Arc;

use crate::domain::{ShipmentId, Timeline, merge_timeline, replay};
use crate::error::LogisticsError;
use crate::persistence::{CheckpointLog, ShipmentRepository, Stores};

/// A concurrent transition can land between reading the shipment and
/// reading its log; re-read this many times before calling it corruption.
const SNAPSHOT_ATTEMPTS: usize = 3;

/// Builds shipment timelines. Holds no state of its own.
#[derive(Debug, Clone)]
pub struct TimelineService {
    shipments: Arc<dyn ShipmentRepository>,
    checkpoints: Arc<dyn CheckpointLog>,
}

impl TimelineService {
    /// Creates a new `TimelineService`.
    #[must_use]
    pub fn new(stores: &Stores) -> Self {
        Self {
            shipments: Arc::clone(&stores.shipments),
            checkpoints: Arc::clone(&stores.checkpoints),
        }
    }

    /// Returns the merged, most-recent-first history of a shipment.
    ///
    /// The status log is replayed through the transition validator and must
    /// end at the shipment's current status.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist,
    /// [`LogisticsError::IntegrityViolation`] if the status log does not
    /// explain the current status.
    pub async fn build(&self, id: ShipmentId) -> Result<Timeline, LogisticsError> {
        for _ in 0..SNAPSHOT_ATTEMPTS {
            let shipment = self
                .shipments
                .get_shipment(id)
                .await?
                .ok_or(LogisticsError::ShipmentNotFound(id))?;

            let (statuses, checkpoints) = tokio::join!(
                self.shipments.status_updates(id),
                self.checkpoints.checkpoints(id)
            );
            let (statuses, checkpoints) = (statuses?, checkpoints?);

            let replayed = replay(statuses.iter().map(|e| e.status)).map_err(|e| {
                tracing::error!(target: "integrity", shipment_id = %id, error = %e, "status log breaks the lifecycle");
                LogisticsError::IntegrityViolation(format!("shipment {id}: {e}"))
            })?;

            if replayed == shipment.current_status {
                return Ok(merge_timeline(
                    id,
                    shipment.current_status,
                    &statuses,
                    &checkpoints,
                ));
            }
            tracing::debug!(shipment_id = %id, %replayed, current = %shipment.current_status, "timeline snapshot raced a transition");
        }

        tracing::error!(target: "integrity", shipment_id = %id, "status log does not end at the current status");
        Err(LogisticsError::IntegrityViolation(format!(
            "shipment {id}: status log and current status disagree"
        )))
    }
}
