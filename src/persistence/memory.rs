//! In-process store with per-shipment locking.
//!
//! Each shipment lives in its own `Arc<RwLock<ShipmentSlot>>` together with
//! both of its event logs, so a transition holds exactly one write lock
//! while it checks the status, appends the event and updates the row.
//! Writes to different shipments proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{
    AttendanceRepository, CheckpointLog, ShipmentRepository, TransitionCommit, TransitionOutcome,
    next_log_timestamp,
};
use crate::domain::{
    AttendanceRecord, CheckpointEvent, NewCheckpoint, PodReference, SessionStamp, Shipment,
    ShipmentFilter, ShipmentId, ShipmentUpdate, StatusUpdateEvent, UserId, WorkReport,
};
use crate::error::LogisticsError;

#[derive(Debug)]
struct ShipmentSlot {
    shipment: Shipment,
    status_log: Vec<StatusUpdateEvent>,
    checkpoint_log: Vec<CheckpointEvent>,
    pod_uploads: Vec<PodReference>,
}

/// Store keeping everything in memory. Contents are lost on restart.
#[derive(Debug)]
pub struct InMemoryStore {
    shipments: RwLock<HashMap<ShipmentId, Arc<RwLock<ShipmentSlot>>>>,
    attendance: Mutex<HashMap<(UserId, NaiveDate), AttendanceRecord>>,
    status_seq: AtomicI64,
    checkpoint_seq: AtomicI64,
}

impl InMemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            shipments: RwLock::new(HashMap::new()),
            attendance: Mutex::new(HashMap::new()),
            status_seq: AtomicI64::new(0),
            checkpoint_seq: AtomicI64::new(0),
        }
    }

    async fn slot(&self, id: ShipmentId) -> Option<Arc<RwLock<ShipmentSlot>>> {
        self.shipments.read().await.get(&id).cloned()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ShipmentRepository for InMemoryStore {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LogisticsError> {
        let mut map = self.shipments.write().await;
        for slot in map.values() {
            if slot.read().await.shipment.consignment_number == shipment.consignment_number {
                return Err(LogisticsError::DuplicateConsignment(
                    shipment.consignment_number.clone(),
                ));
            }
        }
        if map.contains_key(&shipment.id) {
            return Err(LogisticsError::Internal(format!(
                "shipment {} already exists",
                shipment.id
            )));
        }
        map.insert(
            shipment.id,
            Arc::new(RwLock::new(ShipmentSlot {
                shipment: shipment.clone(),
                status_log: Vec::new(),
                checkpoint_log: Vec::new(),
                pod_uploads: Vec::new(),
            })),
        );
        Ok(())
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, LogisticsError> {
        match self.slot(id).await {
            Some(slot) => Ok(Some(slot.read().await.shipment.clone())),
            None => Ok(None),
        }
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
    ) -> Result<Vec<Shipment>, LogisticsError> {
        let map = self.shipments.read().await;
        let mut shipments = Vec::with_capacity(map.len());
        for slot in map.values() {
            let slot = slot.read().await;
            if filter.matches(&slot.shipment) {
                shipments.push(slot.shipment.clone());
            }
        }
        shipments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(shipments)
    }

    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<TransitionOutcome, LogisticsError> {
        let slot = self
            .slot(commit.shipment_id)
            .await
            .ok_or(LogisticsError::ShipmentNotFound(commit.shipment_id))?;
        let mut slot = slot.write().await;

        let actual = slot.shipment.current_status;
        if actual != commit.expected_from {
            return Ok(TransitionOutcome::StatusChanged(actual));
        }

        let at = next_log_timestamp(
            commit.requested_at,
            slot.status_log.last().map(|e| e.created_at),
        );
        let event = StatusUpdateEvent {
            id: self.status_seq.fetch_add(1, Ordering::SeqCst) + 1,
            shipment_id: commit.shipment_id,
            status: commit.to,
            note: commit.note,
            location: commit.location,
            actor: commit.actor,
            created_at: at,
        };
        slot.shipment.apply_transition(commit.to, at, commit.pod);
        slot.status_log.push(event.clone());

        Ok(TransitionOutcome::Committed {
            shipment: slot.shipment.clone(),
            event,
        })
    }

    async fn status_updates(
        &self,
        id: ShipmentId,
    ) -> Result<Vec<StatusUpdateEvent>, LogisticsError> {
        match self.slot(id).await {
            Some(slot) => Ok(slot.read().await.status_log.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn update_shipment(
        &self,
        id: ShipmentId,
        update: ShipmentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Shipment, LogisticsError> {
        let slot = self
            .slot(id)
            .await
            .ok_or(LogisticsError::ShipmentNotFound(id))?;
        let mut slot = slot.write().await;
        slot.shipment.apply_update(update, at)?;
        Ok(slot.shipment.clone())
    }

    async fn record_pod_upload(&self, reference: &PodReference) -> Result<(), LogisticsError> {
        let slot = self
            .slot(reference.shipment_id)
            .await
            .ok_or(LogisticsError::ShipmentNotFound(reference.shipment_id))?;
        slot.write().await.pod_uploads.push(reference.clone());
        Ok(())
    }

    async fn has_pod_upload(
        &self,
        id: ShipmentId,
        object_path: &str,
    ) -> Result<bool, LogisticsError> {
        match self.slot(id).await {
            Some(slot) => Ok(slot
                .read()
                .await
                .pod_uploads
                .iter()
                .any(|upload| upload.object_path == object_path)),
            None => Ok(false),
        }
    }
}

#[async_trait]
impl CheckpointLog for InMemoryStore {
    async fn append_checkpoint(
        &self,
        checkpoint: NewCheckpoint,
        requested_at: DateTime<Utc>,
    ) -> Result<CheckpointEvent, LogisticsError> {
        let slot = self
            .slot(checkpoint.shipment_id)
            .await
            .ok_or(LogisticsError::ShipmentNotFound(checkpoint.shipment_id))?;
        let mut slot = slot.write().await;

        let at = next_log_timestamp(
            requested_at,
            slot.checkpoint_log.last().map(|e| e.created_at),
        );
        let event = CheckpointEvent {
            id: self.checkpoint_seq.fetch_add(1, Ordering::SeqCst) + 1,
            shipment_id: checkpoint.shipment_id,
            location: checkpoint.location,
            coordinates: checkpoint.coordinates,
            note: checkpoint.note,
            actor: checkpoint.actor,
            created_at: at,
        };
        slot.checkpoint_log.push(event.clone());
        Ok(event)
    }

    async fn checkpoints(&self, id: ShipmentId) -> Result<Vec<CheckpointEvent>, LogisticsError> {
        match self.slot(id).await {
            Some(slot) => Ok(slot.read().await.checkpoint_log.clone()),
            None => Ok(Vec::new()),
        }
    }

    async fn latest_geotagged(
        &self,
        id: ShipmentId,
    ) -> Result<Option<CheckpointEvent>, LogisticsError> {
        match self.slot(id).await {
            Some(slot) => Ok(slot
                .read()
                .await
                .checkpoint_log
                .iter()
                .rev()
                .find(|c| c.coordinates.is_some())
                .cloned()),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl AttendanceRepository for InMemoryStore {
    async fn open_session(
        &self,
        record: AttendanceRecord,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let mut map = self.attendance.lock().await;
        let key = (record.user_id, record.work_date);
        if map.contains_key(&key) {
            return Err(LogisticsError::DuplicateCheckIn {
                user_id: record.user_id,
                date: record.work_date,
            });
        }
        map.insert(key, record.clone());
        Ok(record)
    }

    async fn close_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        check_out: SessionStamp,
        work: Option<WorkReport>,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let mut map = self.attendance.lock().await;
        let record = map
            .get_mut(&(user_id, date))
            .ok_or(LogisticsError::NoOpenSession { user_id, date })?;
        record.close(check_out, work)?;
        Ok(record.clone())
    }

    async fn find_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, LogisticsError> {
        Ok(self.attendance.lock().await.get(&(user_id, date)).cloned())
    }

    async fn sessions_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError> {
        let map = self.attendance.lock().await;
        let mut records: Vec<_> = map
            .values()
            .filter(|r| (from..=to).contains(&r.work_date))
            .cloned()
            .collect();
        records.sort_by(|a, b| {
            a.work_date
                .cmp(&b.work_date)
                .then_with(|| a.check_in.at.cmp(&b.check_in.at))
        });
        Ok(records)
    }

    async fn sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError> {
        let map = self.attendance.lock().await;
        let mut records: Vec<_> = map
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.work_date.cmp(&a.work_date));
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{GeoFix, NewShipment, ShipmentStatus};

    fn shipment(consignment: &str) -> Shipment {
        let input = NewShipment {
            consignment_number: consignment.to_string(),
            source: "Pune".to_string(),
            destination: "Nagpur".to_string(),
            ..NewShipment::default()
        };
        let Ok(shipment) = Shipment::create(input, UserId::new(), Utc::now()) else {
            panic!("valid shipment");
        };
        shipment
    }

    fn commit(id: ShipmentId, from: ShipmentStatus, to: ShipmentStatus) -> TransitionCommit {
        TransitionCommit {
            shipment_id: id,
            expected_from: from,
            to,
            note: None,
            location: None,
            actor: UserId::new(),
            requested_at: Utc::now(),
            pod: None,
        }
    }

    #[tokio::test]
    async fn consignment_numbers_are_unique() {
        let store = InMemoryStore::new();
        assert!(store.insert_shipment(&shipment("CN-1")).await.is_ok());
        assert!(matches!(
            store.insert_shipment(&shipment("CN-1")).await,
            Err(LogisticsError::DuplicateConsignment(_))
        ));
    }

    #[tokio::test]
    async fn commit_refuses_stale_status() {
        let store = InMemoryStore::new();
        let s = shipment("CN-2");
        let id = s.id;
        let _ = store.insert_shipment(&s).await;

        let first = store
            .commit_transition(commit(id, ShipmentStatus::Created, ShipmentStatus::Packed))
            .await;
        assert!(matches!(first, Ok(TransitionOutcome::Committed { .. })));

        let second = store
            .commit_transition(commit(id, ShipmentStatus::Created, ShipmentStatus::Packed))
            .await;
        let Ok(TransitionOutcome::StatusChanged(actual)) = second else {
            panic!("expected StatusChanged");
        };
        assert_eq!(actual, ShipmentStatus::Packed);
        assert_eq!(store.status_updates(id).await.map(|l| l.len()).ok(), Some(1));
    }

    #[tokio::test]
    async fn concurrent_transitions_from_same_status_commit_once() {
        let store = Arc::new(InMemoryStore::new());
        let s = shipment("CN-3");
        let id = s.id;
        let _ = store.insert_shipment(&s).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .commit_transition(commit(id, ShipmentStatus::Created, ShipmentStatus::Packed))
                        .await
                })
            })
            .collect();

        let mut committed = 0;
        for handle in handles {
            if let Ok(Ok(TransitionOutcome::Committed { .. })) = handle.await {
                committed += 1;
            }
        }
        assert_eq!(committed, 1);
    }

    #[tokio::test]
    async fn log_timestamps_strictly_increase() {
        let store = InMemoryStore::new();
        let s = shipment("CN-4");
        let id = s.id;
        let _ = store.insert_shipment(&s).await;

        let at = Utc::now();
        let mut from = ShipmentStatus::Created;
        for to in [ShipmentStatus::Packed, ShipmentStatus::Dispatched] {
            let mut c = commit(id, from, to);
            c.requested_at = at;
            let _ = store.commit_transition(c).await;
            from = to;
        }
        let Ok(log) = store.status_updates(id).await else {
            panic!("log readable");
        };
        assert_eq!(log.len(), 2);
        assert!(log.windows(2).all(|w| matches!(w, [a, b] if a.created_at < b.created_at)));
    }

    #[tokio::test]
    async fn update_waits_for_the_slot_and_keeps_status() {
        let store = InMemoryStore::new();
        let s = shipment("CN-5");
        let id = s.id;
        let _ = store.insert_shipment(&s).await;
        let _ = store
            .commit_transition(commit(id, ShipmentStatus::Created, ShipmentStatus::Packed))
            .await;

        let update = ShipmentUpdate {
            notes: Some("call before delivery".to_string()),
            ..ShipmentUpdate::default()
        };
        let Ok(updated) = store.update_shipment(id, update, Utc::now()).await else {
            panic!("update should succeed");
        };
        assert_eq!(updated.current_status, ShipmentStatus::Packed);
        assert_eq!(updated.notes.as_deref(), Some("call before delivery"));

        assert!(matches!(
            store
                .update_shipment(ShipmentId::new(), ShipmentUpdate::default(), Utc::now())
                .await,
            Err(LogisticsError::ShipmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn pod_uploads_are_scoped_to_their_shipment() {
        let store = InMemoryStore::new();
        let first = shipment("CN-6");
        let second = shipment("CN-7");
        let _ = store.insert_shipment(&first).await;
        let _ = store.insert_shipment(&second).await;

        let reference = PodReference {
            shipment_id: first.id,
            object_path: "/objects/shipments/a/1-pod.jpg".to_string(),
            content_type: crate::domain::PodContentType::Jpeg,
            size: 3,
        };
        assert!(store.record_pod_upload(&reference).await.is_ok());
        assert_eq!(
            store.has_pod_upload(first.id, &reference.object_path).await.ok(),
            Some(true)
        );
        assert_eq!(
            store.has_pod_upload(second.id, &reference.object_path).await.ok(),
            Some(false)
        );
        assert_eq!(
            store.has_pod_upload(first.id, "/objects/other.jpg").await.ok(),
            Some(false)
        );

        let orphan = PodReference {
            shipment_id: ShipmentId::new(),
            ..reference
        };
        assert!(matches!(
            store.record_pod_upload(&orphan).await,
            Err(LogisticsError::ShipmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn checkpoint_requires_known_shipment() {
        let store = InMemoryStore::new();
        let checkpoint = NewCheckpoint {
            shipment_id: ShipmentId::new(),
            location: "Hub".to_string(),
            coordinates: None,
            note: None,
            actor: UserId::new(),
        };
        assert!(matches!(
            store.append_checkpoint(checkpoint, Utc::now()).await,
            Err(LogisticsError::ShipmentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn attendance_one_record_per_user_and_day() {
        let store = InMemoryStore::new();
        let user = UserId::new();
        let date = Utc::now().date_naive();
        let t0 = Utc::now();
        let stamp = |at| SessionStamp::new(at, GeoFix::new(19.0760, 72.8777), None, None);

        assert!(
            store
                .open_session(AttendanceRecord::open(user, date, stamp(t0)))
                .await
                .is_ok()
        );
        assert!(matches!(
            store
                .open_session(AttendanceRecord::open(user, date, stamp(t0)))
                .await,
            Err(LogisticsError::DuplicateCheckIn { .. })
        ));

        let later = t0 + chrono::Duration::hours(9);
        assert!(
            store
                .close_session(user, date, stamp(later), None)
                .await
                .is_ok()
        );
        assert!(matches!(
            store.close_session(user, date, stamp(later), None).await,
            Err(LogisticsError::NoOpenSession { .. })
        ));
        assert!(matches!(
            store
                .close_session(UserId::new(), date, stamp(later), None)
                .await,
            Err(LogisticsError::NoOpenSession { .. })
        ));
    }
}
