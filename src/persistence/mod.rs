//! Persistence layer: shipments, the two event logs and attendance records.
//!
//! Three narrow traits describe what the services need from storage.
//! [`postgres::PostgresStore`] implements them on `sqlx::PgPool`;
//! [`memory::InMemoryStore`] implements them in process for local runs and
//! tests. Both provide the same guarantees:
//!
//! - a transition is a single atomic unit: the status check, the event
//!   append and the shipment update either all happen or none do, and two
//!   concurrent transitions from the same status cannot both commit;
//! - event `created_at` values are strictly increasing per shipment;
//! - descriptive edits never write the status or the proof of delivery;
//! - at most one attendance record exists per (user, date).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    AttendanceRecord, CheckpointEvent, NewCheckpoint, PodReference, ProofOfDelivery,
    SessionStamp, Shipment, ShipmentFilter, ShipmentId, ShipmentStatus, ShipmentUpdate,
    StatusUpdateEvent, UserId, WorkReport,
};
use crate::error::LogisticsError;

pub mod memory;
pub mod models;
pub mod postgres;

/// A validated transition ready to be committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionCommit {
    /// Target shipment.
    pub shipment_id: ShipmentId,
    /// Status the caller validated against. The commit is refused if the
    /// stored status differs.
    pub expected_from: ShipmentStatus,
    /// Status being entered.
    pub to: ShipmentStatus,
    /// Operator note.
    pub note: Option<String>,
    /// Location label.
    pub location: Option<String>,
    /// Acting user.
    pub actor: UserId,
    /// Requested transition time; the store may move it forward to keep the
    /// log strictly increasing.
    pub requested_at: DateTime<Utc>,
    /// Proof of delivery, required when entering `closed`.
    pub pod: Option<ProofOfDelivery>,
}

/// Result of [`ShipmentRepository::commit_transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// Event appended and shipment updated.
    Committed {
        /// The shipment after the update.
        shipment: Shipment,
        /// The appended event.
        event: StatusUpdateEvent,
    },
    /// Another writer moved the shipment first; nothing was written.
    StatusChanged(ShipmentStatus),
}

/// Shipment rows and the status-update log.
#[async_trait]
pub trait ShipmentRepository: Send + Sync + fmt::Debug {
    /// Stores a new shipment.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::DuplicateConsignment`] if the consignment number is
    /// taken, [`LogisticsError::Persistence`] on storage failure.
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LogisticsError>;

    /// Loads a shipment.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, LogisticsError>;

    /// Lists shipments matching `filter`, newest first.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn list_shipments(&self, filter: &ShipmentFilter)
    -> Result<Vec<Shipment>, LogisticsError>;

    /// Atomically checks the stored status, appends the event and updates
    /// the shipment.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist,
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<TransitionOutcome, LogisticsError>;

    /// All status events of a shipment in append order.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn status_updates(
        &self,
        id: ShipmentId,
    ) -> Result<Vec<StatusUpdateEvent>, LogisticsError>;

    /// Applies [`Shipment::apply_update`] to the stored row while holding
    /// the same lock transitions take.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist,
    /// [`LogisticsError::InvalidRequest`] if the edit is refused,
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn update_shipment(
        &self,
        id: ShipmentId,
        update: ShipmentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Shipment, LogisticsError>;

    /// Records a proof-of-delivery file that reached the object store.
    /// Append-only.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist,
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn record_pod_upload(&self, reference: &PodReference) -> Result<(), LogisticsError>;

    /// Returns `true` if `object_path` was recorded as an upload for `id`.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn has_pod_upload(&self, id: ShipmentId, object_path: &str)
    -> Result<bool, LogisticsError>;
}

/// The checkpoint log.
#[async_trait]
pub trait CheckpointLog: Send + Sync + fmt::Debug {
    /// Appends a checkpoint.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::ShipmentNotFound`] if the shipment does not exist,
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn append_checkpoint(
        &self,
        checkpoint: NewCheckpoint,
        requested_at: DateTime<Utc>,
    ) -> Result<CheckpointEvent, LogisticsError>;

    /// All checkpoints of a shipment in append order.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn checkpoints(&self, id: ShipmentId) -> Result<Vec<CheckpointEvent>, LogisticsError>;

    /// The most recent checkpoint carrying coordinates.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn latest_geotagged(
        &self,
        id: ShipmentId,
    ) -> Result<Option<CheckpointEvent>, LogisticsError>;
}

/// Attendance records keyed by (user, date).
#[async_trait]
pub trait AttendanceRepository: Send + Sync + fmt::Debug {
    /// Stores a freshly opened session.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::DuplicateCheckIn`] if a record exists for the same
    /// user and date, [`LogisticsError::Persistence`] on storage failure.
    async fn open_session(&self, record: AttendanceRecord)
    -> Result<AttendanceRecord, LogisticsError>;

    /// Closes the open session for (user, date).
    ///
    /// # Errors
    ///
    /// [`LogisticsError::NoOpenSession`] if no record exists or it is already
    /// closed, [`LogisticsError::InvalidRequest`] if check-out does not
    /// follow check-in, [`LogisticsError::Persistence`] on storage failure.
    async fn close_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        check_out: SessionStamp,
        work: Option<WorkReport>,
    ) -> Result<AttendanceRecord, LogisticsError>;

    /// The record for (user, date).
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn find_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, LogisticsError>;

    /// Records with `from <= work_date <= to`.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn sessions_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError>;

    /// All records of a user, most recent date first.
    ///
    /// # Errors
    ///
    /// [`LogisticsError::Persistence`] on storage failure.
    async fn sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError>;
}

/// The three repositories behind one handle, as wired at startup.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Shipments and status log.
    pub shipments: Arc<dyn ShipmentRepository>,
    /// Checkpoint log.
    pub checkpoints: Arc<dyn CheckpointLog>,
    /// Attendance records.
    pub attendance: Arc<dyn AttendanceRepository>,
}

impl Stores {
    /// Uses one backend for all three repositories.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: ShipmentRepository + CheckpointLog + AttendanceRepository + 'static,
    {
        Self {
            shipments: Arc::clone(&backend) as Arc<dyn ShipmentRepository>,
            checkpoints: Arc::clone(&backend) as Arc<dyn CheckpointLog>,
            attendance: backend,
        }
    }
}

/// Returns the smallest timestamp that is not earlier than `requested` and
/// strictly later than `last`.
pub(crate) fn next_log_timestamp(
    requested: DateTime<Utc>,
    last: Option<DateTime<Utc>>,
) -> DateTime<Utc> {
    match last {
        Some(last) if requested <= last => last + chrono::Duration::microseconds(1),
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_timestamp_is_strictly_increasing() {
        let t = Utc::now();
        assert_eq!(next_log_timestamp(t, None), t);
        assert_eq!(
            next_log_timestamp(t, Some(t)),
            t + chrono::Duration::microseconds(1)
        );
        let earlier = t - chrono::Duration::seconds(1);
        assert!(next_log_timestamp(earlier, Some(t)) > t);
        let later = t + chrono::Duration::seconds(1);
        assert_eq!(next_log_timestamp(later, Some(t)), later);
    }
}
