//! Shipment service: creation, queries, the lifecycle controller and
//! checkpoint capture.

use std::sync::Arc;

use chrono::Utc;

use crate::domain::{
    CheckpointEvent, FixAssessment, GeoFix, GeoPoint, GpsPolicy, NewCheckpoint, NewShipment,
    PodPayload, ProofOfDelivery, Shipment, ShipmentDashboard, ShipmentFilter, ShipmentId,
    ShipmentStatus, ShipmentUpdate, StatusUpdateEvent, UserId, validate_transition,
};
use crate::error::LogisticsError;
use crate::persistence::{
    CheckpointLog, ShipmentRepository, Stores, TransitionCommit, TransitionOutcome,
};

/// A requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvanceCommand {
    /// Status to enter.
    pub to: ShipmentStatus,
    /// Operator note.
    pub note: Option<String>,
    /// Location label.
    pub location: Option<String>,
}

/// Checkpoint capture input.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointCommand {
    /// Location label.
    pub location: String,
    /// Latitude, paired with `longitude`.
    pub latitude: Option<f64>,
    /// Longitude, paired with `latitude`.
    pub longitude: Option<f64>,
    /// Reported accuracy in meters.
    pub accuracy_m: Option<f64>,
    /// Free-text note.
    pub note: Option<String>,
}

/// A recorded checkpoint with the plausibility warnings it raised.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCheckpoint {
    /// The appended event.
    pub checkpoint: CheckpointEvent,
    /// Fix and movement warnings. Never blocks recording.
    pub assessment: FixAssessment,
}

/// Orchestrates shipment reads and writes.
///
/// Every transition follows the same path: load the shipment, run the
/// validator against its current status, then ask the store to commit the
/// event and the status update as one unit conditioned on that status.
#[derive(Debug, Clone)]
pub struct ShipmentService {
    shipments: Arc<dyn ShipmentRepository>,
    checkpoints: Arc<dyn CheckpointLog>,
    gps_policy: GpsPolicy,
}

impl ShipmentService {
    /// Creates a new `ShipmentService`.
    #[must_use]
    pub fn new(stores: &Stores, gps_policy: GpsPolicy) -> Self {
        Self {
            shipments: Arc::clone(&stores.shipments),
            checkpoints: Arc::clone(&stores.checkpoints),
            gps_policy,
        }
    }

    /// Registers a shipment in status `created`. No status event is
    /// recorded for creation.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for bad input,
    /// [`LogisticsError::DuplicateConsignment`] if the number is taken.
    pub async fn create(
        &self,
        input: NewShipment,
        actor: UserId,
    ) -> Result<Shipment, LogisticsError> {
        let shipment = Shipment::create(input, actor, Utc::now())?;
        self.shipments.insert_shipment(&shipment).await?;
        tracing::info!(
            shipment_id = %shipment.id,
            consignment = %shipment.consignment_number,
            %actor,
            "shipment created"
        );
        Ok(shipment)
    }

    /// Loads a shipment.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if it does not exist.
    pub async fn get(&self, id: ShipmentId) -> Result<Shipment, LogisticsError> {
        self.shipments
            .get_shipment(id)
            .await?
            .ok_or(LogisticsError::ShipmentNotFound(id))
    }

    /// Lists shipments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    pub async fn list(&self, filter: &ShipmentFilter) -> Result<Vec<Shipment>, LogisticsError> {
        self.shipments.list_shipments(filter).await
    }

    /// Shipments not yet closed.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    pub async fn active(&self) -> Result<Vec<Shipment>, LogisticsError> {
        self.list(&ShipmentFilter {
            active_only: true,
            ..ShipmentFilter::default()
        })
        .await
    }

    /// Shipments past their expected delivery date and not yet delivered.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    pub async fn overdue(&self) -> Result<Vec<Shipment>, LogisticsError> {
        self.list(&ShipmentFilter {
            overdue_as_of: Some(Utc::now()),
            ..ShipmentFilter::default()
        })
        .await
    }

    /// Case-insensitive search over consignment number, source and
    /// destination.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for an empty query.
    pub async fn search(&self, query: &str) -> Result<Vec<Shipment>, LogisticsError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LogisticsError::InvalidRequest(
                "search query must not be empty".to_string(),
            ));
        }
        self.list(&ShipmentFilter {
            search: Some(query.to_string()),
            ..ShipmentFilter::default()
        })
        .await
    }

    /// Edits a shipment's descriptive fields. Never changes its status or
    /// proof of delivery.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if it does not exist,
    /// [`LogisticsError::InvalidRequest`] if the edit is refused.
    pub async fn update(
        &self,
        id: ShipmentId,
        update: ShipmentUpdate,
        actor: UserId,
    ) -> Result<Shipment, LogisticsError> {
        let shipment = self
            .shipments
            .update_shipment(id, update, Utc::now())
            .await
            .inspect_err(|e| tracing::warn!(shipment_id = %id, error = %e, "shipment update rejected"))?;
        tracing::info!(shipment_id = %id, %actor, "shipment updated");
        Ok(shipment)
    }

    /// Counts shipments per status, plus active and overdue totals.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    pub async fn dashboard(&self) -> Result<ShipmentDashboard, LogisticsError> {
        let shipments = self.list(&ShipmentFilter::default()).await?;
        Ok(ShipmentDashboard::tally(&shipments, Utc::now()))
    }

    /// Moves a shipment to the next status.
    ///
    /// Entering `closed` this way is refused: closure needs a proof of
    /// delivery and goes through [`ShipmentService::close`].
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidTransition`] if `to` is not the next status,
    /// [`LogisticsError::InvalidRequest`] for `delivered -> closed`,
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist.
    pub async fn advance(
        &self,
        id: ShipmentId,
        command: AdvanceCommand,
        actor: UserId,
    ) -> Result<Shipment, LogisticsError> {
        let shipment = self.get(id).await?;
        let from = shipment.current_status;
        self.check_transition(id, from, command.to)?;

        if command.to == ShipmentStatus::Closed {
            return Err(LogisticsError::InvalidRequest(
                "closing a shipment requires proof of delivery".to_string(),
            ));
        }

        self.commit(TransitionCommit {
            shipment_id: id,
            expected_from: from,
            to: command.to,
            note: command.note,
            location: command.location,
            actor,
            requested_at: Utc::now(),
            pod: None,
        })
        .await
    }

    /// Closes a delivered shipment, recording its proof of delivery.
    ///
    /// The status is checked before the payload is looked at.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidTransition`] unless the shipment is
    /// `delivered`, then [`LogisticsError::InvalidRequest`] if the payload
    /// does not name a receiver or its `object_path` is not a recorded
    /// upload of this shipment.
    pub async fn close(
        &self,
        id: ShipmentId,
        payload: PodPayload,
        actor: UserId,
    ) -> Result<Shipment, LogisticsError> {
        let shipment = self.get(id).await?;
        let from = shipment.current_status;
        self.check_transition(id, from, ShipmentStatus::Closed)?;

        let payload = payload.validated()?;
        if let Some(path) = payload.object_path.as_deref()
            && !self.shipments.has_pod_upload(id, path).await?
        {
            tracing::warn!(shipment_id = %id, object_path = %path, "close refused unknown proof-of-delivery path");
            return Err(LogisticsError::InvalidRequest(format!(
                "object_path {path} is not a proof-of-delivery upload of shipment {id}"
            )));
        }
        let now = Utc::now();
        let note = payload.notes.clone();
        let pod = ProofOfDelivery::from_payload(payload, actor, now);

        self.commit(TransitionCommit {
            shipment_id: id,
            expected_from: from,
            to: ShipmentStatus::Closed,
            note,
            location: None,
            actor,
            requested_at: now,
            pod: Some(pod),
        })
        .await
    }

    /// The shipment's status log in append order.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist.
    pub async fn status_updates(
        &self,
        id: ShipmentId,
    ) -> Result<Vec<StatusUpdateEvent>, LogisticsError> {
        self.get(id).await?;
        self.shipments.status_updates(id).await
    }

    /// Records a checkpoint. Coordinates are validated; implausible
    /// movement since the previous geotagged checkpoint is reported but
    /// does not block recording.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::InvalidRequest`] for a missing location or an
    /// impossible fix, [`LogisticsError::ShipmentNotFound`] if the shipment
    /// does not exist.
    pub async fn record_checkpoint(
        &self,
        id: ShipmentId,
        command: CheckpointCommand,
        actor: UserId,
    ) -> Result<RecordedCheckpoint, LogisticsError> {
        self.get(id).await?;

        let coordinates = GeoPoint::from_pair(command.latitude, command.longitude)?;
        let mut assessment = match coordinates {
            Some(point) => self.gps_policy.assess_fix(&GeoFix {
                point,
                accuracy_m: command.accuracy_m,
            })?,
            None => FixAssessment::default(),
        };

        let input = NewCheckpoint {
            shipment_id: id,
            location: command.location,
            coordinates,
            note: command.note,
            actor,
        }
        .validated()?;

        let previous = match coordinates {
            Some(_) => self.checkpoints.latest_geotagged(id).await?,
            None => None,
        };
        let checkpoint = self.checkpoints.append_checkpoint(input, Utc::now()).await?;

        if let (Some(prev), Some(point)) = (previous, checkpoint.coordinates)
            && let Some(prev_point) = prev.coordinates
        {
            let movement = self.gps_policy.assess_movement(
                (&prev_point, prev.created_at),
                (&point, checkpoint.created_at),
            );
            assessment.merge(movement);
        }

        if assessment.is_clean() {
            tracing::info!(shipment_id = %id, checkpoint_id = checkpoint.id, "checkpoint recorded");
        } else {
            tracing::warn!(
                shipment_id = %id,
                checkpoint_id = checkpoint.id,
                risk = ?assessment.risk,
                warnings = ?assessment.warnings,
                "checkpoint recorded with GPS warnings"
            );
        }
        Ok(RecordedCheckpoint {
            checkpoint,
            assessment,
        })
    }

    /// The shipment's checkpoints in append order.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist.
    pub async fn checkpoints(&self, id: ShipmentId) -> Result<Vec<CheckpointEvent>, LogisticsError> {
        self.get(id).await?;
        self.checkpoints.checkpoints(id).await
    }

    fn check_transition(
        &self,
        id: ShipmentId,
        from: ShipmentStatus,
        to: ShipmentStatus,
    ) -> Result<(), LogisticsError> {
        validate_transition(from, to).map(|_| ()).inspect_err(|_| {
            tracing::warn!(shipment_id = %id, %from, %to, "transition rejected");
        })
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<Shipment, LogisticsError> {
        let id = commit.shipment_id;
        let from = commit.expected_from;
        let to = commit.to;
        let actor = commit.actor;

        match self.shipments.commit_transition(commit).await? {
            TransitionOutcome::Committed { shipment, event } => {
                if shipment.current_status != event.status {
                    tracing::error!(
                        target: "integrity",
                        shipment_id = %id,
                        status = %shipment.current_status,
                        event_status = %event.status,
                        "status field diverged from appended event"
                    );
                    return Err(LogisticsError::IntegrityViolation(format!(
                        "shipment {id}: status {} after appending {} event",
                        shipment.current_status, event.status
                    )));
                }
                tracing::info!(shipment_id = %id, %from, %to, %actor, event_id = event.id, "shipment advanced");
                Ok(shipment)
            }
            TransitionOutcome::StatusChanged(actual) => {
                tracing::warn!(
                    shipment_id = %id,
                    expected = %from,
                    actual = %actual,
                    %to,
                    "transition lost a race"
                );
                Err(LogisticsError::InvalidTransition { from: actual, to })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{PodContentType, PodReference, RiskLevel};
    use crate::persistence::memory::InMemoryStore;

    fn make_service() -> ShipmentService {
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
        ShipmentService::new(&stores, GpsPolicy::default())
    }

    fn new_shipment(consignment: &str) -> NewShipment {
        NewShipment {
            consignment_number: consignment.to_string(),
            source: "Delhi".to_string(),
            destination: "Noida".to_string(),
            ..NewShipment::default()
        }
    }

    fn to(status: ShipmentStatus) -> AdvanceCommand {
        AdvanceCommand {
            to: status,
            note: None,
            location: None,
        }
    }

    async fn delivered(service: &ShipmentService, actor: UserId) -> ShipmentId {
        let Ok(shipment) = service.create(new_shipment("CN-D"), actor).await else {
            panic!("create should succeed");
        };
        for status in [
            ShipmentStatus::Packed,
            ShipmentStatus::Dispatched,
            ShipmentStatus::InTransit,
            ShipmentStatus::OutForDelivery,
            ShipmentStatus::Delivered,
        ] {
            let Ok(_) = service.advance(shipment.id, to(status), actor).await else {
                panic!("advance to {status} should succeed");
            };
        }
        shipment.id
    }

    #[tokio::test]
    async fn full_lifecycle_records_six_events() {
        let service = make_service();
        let actor = UserId::new();
        let Ok(shipment) = service.create(new_shipment("CN-100"), actor).await else {
            panic!("create should succeed");
        };
        let id = shipment.id;

        assert!(service.advance(id, to(ShipmentStatus::Packed), actor).await.is_ok());
        let skipped = service.advance(id, to(ShipmentStatus::InTransit), actor).await;
        assert!(matches!(
            skipped,
            Err(LogisticsError::InvalidTransition {
                from: ShipmentStatus::Packed,
                to: ShipmentStatus::InTransit
            })
        ));
        for status in [
            ShipmentStatus::Dispatched,
            ShipmentStatus::InTransit,
            ShipmentStatus::OutForDelivery,
            ShipmentStatus::Delivered,
        ] {
            assert!(service.advance(id, to(status), actor).await.is_ok());
        }

        let payload = PodPayload {
            delivered_to: "Jane Doe".to_string(),
            ..PodPayload::default()
        };
        let Ok(closed) = service.close(id, payload, actor).await else {
            panic!("close should succeed");
        };
        assert_eq!(closed.current_status, ShipmentStatus::Closed);
        assert_eq!(
            closed.proof_of_delivery.map(|p| p.delivered_to),
            Some("Jane Doe".to_string())
        );

        let Ok(log) = service.status_updates(id).await else {
            panic!("log readable");
        };
        assert_eq!(log.len(), 6);
        assert_eq!(log.last().map(|e| e.status), Some(ShipmentStatus::Closed));
    }

    #[tokio::test]
    async fn close_checks_status_before_payload() {
        let service = make_service();
        let actor = UserId::new();
        let Ok(shipment) = service.create(new_shipment("CN-200"), actor).await else {
            panic!("create should succeed");
        };

        // Empty payload, wrong status: the status wins.
        let result = service.close(shipment.id, PodPayload::default(), actor).await;
        assert!(matches!(
            result,
            Err(LogisticsError::InvalidTransition {
                from: ShipmentStatus::Created,
                to: ShipmentStatus::Closed
            })
        ));
    }

    #[tokio::test]
    async fn close_requires_receiver() {
        let service = make_service();
        let actor = UserId::new();
        let id = delivered(&service, actor).await;

        let blank = PodPayload {
            delivered_to: "   ".to_string(),
            ..PodPayload::default()
        };
        assert!(matches!(
            service.close(id, blank, actor).await,
            Err(LogisticsError::InvalidRequest(_))
        ));
        let Ok(shipment) = service.get(id).await else {
            panic!("shipment exists");
        };
        assert_eq!(shipment.current_status, ShipmentStatus::Delivered);
        assert_eq!(service.status_updates(id).await.map(|l| l.len()).ok(), Some(5));
    }

    async fn record_upload(store: &InMemoryStore, id: ShipmentId, path: &str) {
        let reference = PodReference {
            shipment_id: id,
            object_path: path.to_string(),
            content_type: PodContentType::Jpeg,
            size: 4,
        };
        let Ok(()) = store.record_pod_upload(&reference).await else {
            panic!("upload record should succeed");
        };
    }

    #[tokio::test]
    async fn close_accepts_only_recorded_uploads_of_the_shipment() {
        let backend = Arc::new(InMemoryStore::new());
        let stores = Stores::from_backend(Arc::clone(&backend));
        let service = ShipmentService::new(&stores, GpsPolicy::default());
        let actor = UserId::new();
        let id = delivered(&service, actor).await;
        let Ok(other) = service.create(new_shipment("CN-OTHER"), actor).await else {
            panic!("create should succeed");
        };
        record_upload(&backend, other.id, "/objects/shipments/other/pod.jpg").await;
        record_upload(&backend, id, "/objects/shipments/own/pod.jpg").await;

        for path in ["/objects/never/uploaded.jpg", "/objects/shipments/other/pod.jpg"] {
            let payload = PodPayload {
                delivered_to: "Jane Doe".to_string(),
                object_path: Some(path.to_string()),
                ..PodPayload::default()
            };
            assert!(matches!(
                service.close(id, payload, actor).await,
                Err(LogisticsError::InvalidRequest(_))
            ));
        }
        let Ok(still_delivered) = service.get(id).await else {
            panic!("shipment exists");
        };
        assert_eq!(still_delivered.current_status, ShipmentStatus::Delivered);
        assert!(still_delivered.proof_of_delivery.is_none());

        let payload = PodPayload {
            delivered_to: "Jane Doe".to_string(),
            object_path: Some("/objects/shipments/own/pod.jpg".to_string()),
            ..PodPayload::default()
        };
        let Ok(closed) = service.close(id, payload, actor).await else {
            panic!("close with own upload should succeed");
        };
        assert_eq!(
            closed.proof_of_delivery.and_then(|p| p.object_path).as_deref(),
            Some("/objects/shipments/own/pod.jpg")
        );
    }

    #[tokio::test]
    async fn update_never_moves_status() {
        let service = make_service();
        let actor = UserId::new();
        let Ok(shipment) = service.create(new_shipment("CN-UPD"), actor).await else {
            panic!("create should succeed");
        };
        let _ = service.advance(shipment.id, to(ShipmentStatus::Packed), actor).await;

        let due = Utc::now() + chrono::Duration::days(4);
        let update = ShipmentUpdate {
            expected_delivery_date: Some(due),
            source: Some("Gurgaon".to_string()),
            ..ShipmentUpdate::default()
        };
        let Ok(updated) = service.update(shipment.id, update, actor).await else {
            panic!("update should succeed");
        };
        assert_eq!(updated.current_status, ShipmentStatus::Packed);
        assert_eq!(updated.source, "Gurgaon");
        assert_eq!(updated.expected_delivery_date, Some(due));
        assert_eq!(service.status_updates(shipment.id).await.map(|l| l.len()).ok(), Some(1));

        assert!(matches!(
            service
                .update(ShipmentId::new(), ShipmentUpdate::default(), actor)
                .await,
            Err(LogisticsError::ShipmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn dashboard_reflects_lifecycle() {
        let service = make_service();
        let actor = UserId::new();
        let id = delivered(&service, actor).await;
        let _ = service.create(new_shipment("CN-NEW"), actor).await;
        let _ = service
            .close(
                id,
                PodPayload {
                    delivered_to: "Dock 4".to_string(),
                    ..PodPayload::default()
                },
                actor,
            )
            .await;

        let Ok(dashboard) = service.dashboard().await else {
            panic!("dashboard readable");
        };
        assert_eq!(dashboard.total, 2);
        assert_eq!(dashboard.active, 1);
        assert_eq!(dashboard.overdue, 0);
        let closed = dashboard
            .by_status
            .iter()
            .find(|entry| entry.status == ShipmentStatus::Closed)
            .map(|entry| entry.count);
        assert_eq!(closed, Some(1));
    }

    #[tokio::test]
    async fn advance_cannot_close() {
        let service = make_service();
        let actor = UserId::new();
        let id = delivered(&service, actor).await;
        assert!(matches!(
            service.advance(id, to(ShipmentStatus::Closed), actor).await,
            Err(LogisticsError::InvalidRequest(_))
        ));
    }

    #[tokio::test]
    async fn closed_is_terminal() {
        let service = make_service();
        let actor = UserId::new();
        let id = delivered(&service, actor).await;
        let payload = PodPayload {
            delivered_to: "Front desk".to_string(),
            ..PodPayload::default()
        };
        assert!(service.close(id, payload.clone(), actor).await.is_ok());
        assert!(matches!(
            service.close(id, payload, actor).await,
            Err(LogisticsError::InvalidTransition { .. })
        ));
    }

    #[tokio::test]
    async fn unknown_shipment_is_not_found() {
        let service = make_service();
        let result = service
            .advance(ShipmentId::new(), to(ShipmentStatus::Packed), UserId::new())
            .await;
        assert!(matches!(result, Err(LogisticsError::ShipmentNotFound(_))));
    }

    #[tokio::test]
    async fn queries_filter_shipments() {
        let service = make_service();
        let actor = UserId::new();
        let mut late = new_shipment("CN-LATE");
        late.expected_delivery_date = Some(Utc::now() - chrono::Duration::days(2));
        late.destination = "Chennai".to_string();
        let _ = service.create(late, actor).await;
        let _ = service.create(new_shipment("CN-ONTIME"), actor).await;

        assert_eq!(service.overdue().await.map(|s| s.len()).ok(), Some(1));
        assert_eq!(service.active().await.map(|s| s.len()).ok(), Some(2));
        assert_eq!(service.search("chen").await.map(|s| s.len()).ok(), Some(1));
        assert!(service.search("  ").await.is_err());
    }

    #[tokio::test]
    async fn checkpoint_speed_is_a_warning_only() {
        let service = make_service();
        let actor = UserId::new();
        let Ok(shipment) = service.create(new_shipment("CN-GPS"), actor).await else {
            panic!("create should succeed");
        };
        let delhi = CheckpointCommand {
            location: "Delhi hub".to_string(),
            latitude: Some(28.6139),
            longitude: Some(77.2090),
            accuracy_m: Some(10.0),
            note: None,
        };
        let mumbai = CheckpointCommand {
            location: "Mumbai hub".to_string(),
            latitude: Some(19.0760),
            longitude: Some(72.8777),
            accuracy_m: Some(10.0),
            note: None,
        };

        let Ok(first) = service.record_checkpoint(shipment.id, delhi, actor).await else {
            panic!("first checkpoint");
        };
        assert!(first.assessment.is_clean());

        let Ok(second) = service.record_checkpoint(shipment.id, mumbai, actor).await else {
            panic!("second checkpoint is recorded despite the jump");
        };
        assert_eq!(second.assessment.risk, RiskLevel::High);
        assert_eq!(service.checkpoints(shipment.id).await.map(|c| c.len()).ok(), Some(2));
    }

    #[tokio::test]
    async fn checkpoint_rejects_half_coordinates() {
        let service = make_service();
        let actor = UserId::new();
        let Ok(shipment) = service.create(new_shipment("CN-HALF"), actor).await else {
            panic!("create should succeed");
        };
        let command = CheckpointCommand {
            location: "Somewhere".to_string(),
            latitude: Some(12.0),
            longitude: None,
            accuracy_m: None,
            note: None,
        };
        assert!(matches!(
            service.record_checkpoint(shipment.id, command, actor).await,
            Err(LogisticsError::InvalidRequest(_))
        ));
    }
}
