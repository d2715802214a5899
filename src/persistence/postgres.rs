//! PostgreSQL implementation of the persistence layer.
//!
//! Transitions lock the shipment row with `SELECT ... FOR UPDATE` inside a
//! transaction, so the status check, the event insert and the row update
//! commit together. Attendance uniqueness is enforced by the
//! `(user_id, work_date)` unique constraint.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::models::{
    AttendanceRow, CheckpointRow, ShipmentRow, StatusUpdateRow, counter_to_db,
};
use super::{
    AttendanceRepository, CheckpointLog, ShipmentRepository, TransitionCommit, TransitionOutcome,
    next_log_timestamp,
};
use crate::domain::{
    AttendanceRecord, CheckpointEvent, NewCheckpoint, PodReference, SessionStamp, Shipment,
    ShipmentFilter, ShipmentId, ShipmentStatus, ShipmentUpdate, StatusUpdateEvent, UserId,
    WorkReport,
};
use crate::error::LogisticsError;

const SHIPMENT_COLUMNS: &str = "id, consignment_number, source, destination, client_id, vendor_id, \
     dispatch_date, expected_delivery_date, delivered_at, closed_at, current_status, notes, \
     weight_kg, pod_delivered_to, pod_customer_signature, pod_notes, pod_object_path, \
     pod_recorded_by, pod_recorded_at, created_by, created_at, updated_at";

const ATTENDANCE_COLUMNS: &str = "id, user_id, work_date, check_in_at, check_in_location, \
     check_in_latitude, check_in_longitude, check_in_accuracy_m, check_in_photo_path, \
     check_out_at, check_out_location, check_out_latitude, check_out_longitude, \
     check_out_accuracy_m, check_out_photo_path, work_description, task_count, \
     deliveries_completed";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> LogisticsError {
    LogisticsError::Persistence(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db| db.is_unique_violation())
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

impl PostgresStore {
    /// Creates a store over an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::Persistence`] if the database cannot be
    /// reached within `connect_timeout`.
    pub async fn connect(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        connect_timeout: Duration,
    ) -> Result<Self, LogisticsError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(connect_timeout)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        Ok(Self::new(pool))
    }

    /// Applies pending migrations from `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), LogisticsError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| LogisticsError::Persistence(e.to_string()))
    }
}

#[async_trait]
impl ShipmentRepository for PostgresStore {
    async fn insert_shipment(&self, shipment: &Shipment) -> Result<(), LogisticsError> {
        sqlx::query(
            "INSERT INTO shipments (id, consignment_number, source, destination, client_id, \
             vendor_id, dispatch_date, expected_delivery_date, current_status, notes, weight_kg, \
             created_by, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(shipment.id.as_uuid())
        .bind(&shipment.consignment_number)
        .bind(&shipment.source)
        .bind(&shipment.destination)
        .bind(shipment.counterparty.client_id().map(uuid::Uuid::from))
        .bind(shipment.counterparty.vendor_id().map(uuid::Uuid::from))
        .bind(shipment.dispatch_date)
        .bind(shipment.expected_delivery_date)
        .bind(shipment.current_status.as_str())
        .bind(&shipment.notes)
        .bind(shipment.weight_kg)
        .bind(shipment.created_by.as_uuid())
        .bind(shipment.created_at)
        .bind(shipment.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LogisticsError::DuplicateConsignment(shipment.consignment_number.clone())
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn get_shipment(&self, id: ShipmentId) -> Result<Option<Shipment>, LogisticsError> {
        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(Shipment::try_from).transpose()
    }

    async fn list_shipments(
        &self,
        filter: &ShipmentFilter,
    ) -> Result<Vec<Shipment>, LogisticsError> {
        let rows = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments \
             WHERE ($1::text IS NULL OR current_status = $1) \
               AND ($2::uuid IS NULL OR client_id = $2) \
               AND ($3::uuid IS NULL OR vendor_id = $3) \
               AND (NOT $4 OR current_status <> 'closed') \
               AND ($5::timestamptz IS NULL OR (expected_delivery_date < $5 \
                    AND current_status NOT IN ('delivered', 'closed'))) \
               AND ($6::text IS NULL OR consignment_number ILIKE $6 \
                    OR source ILIKE $6 OR destination ILIKE $6) \
             ORDER BY created_at DESC"
        ))
        .bind(filter.status.map(ShipmentStatus::as_str))
        .bind(filter.client_id.map(uuid::Uuid::from))
        .bind(filter.vendor_id.map(uuid::Uuid::from))
        .bind(filter.active_only)
        .bind(filter.overdue_as_of)
        .bind(filter.search.as_deref().map(like_pattern))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(Shipment::try_from).collect()
    }

    async fn commit_transition(
        &self,
        commit: TransitionCommit,
    ) -> Result<TransitionOutcome, LogisticsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1 FOR UPDATE"
        ))
        .bind(commit.shipment_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(LogisticsError::ShipmentNotFound(commit.shipment_id))?;
        let mut shipment = Shipment::try_from(row)?;

        if shipment.current_status != commit.expected_from {
            // Dropping the transaction rolls it back and releases the lock.
            return Ok(TransitionOutcome::StatusChanged(shipment.current_status));
        }

        let last: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(created_at) FROM shipment_status_updates WHERE shipment_id = $1",
        )
        .bind(commit.shipment_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let at = next_log_timestamp(commit.requested_at.trunc_subsecs(6), last);

        let event_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO shipment_status_updates (shipment_id, status, note, location, actor_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
        )
        .bind(commit.shipment_id.as_uuid())
        .bind(commit.to.as_str())
        .bind(&commit.note)
        .bind(&commit.location)
        .bind(commit.actor.as_uuid())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        shipment.apply_transition(commit.to, at, commit.pod);
        let pod = shipment.proof_of_delivery.as_ref();

        sqlx::query(
            "UPDATE shipments SET current_status = $2, dispatch_date = $3, delivered_at = $4, \
             closed_at = $5, pod_delivered_to = $6, pod_customer_signature = $7, pod_notes = $8, \
             pod_object_path = $9, pod_recorded_by = $10, pod_recorded_at = $11, updated_at = $12 \
             WHERE id = $1",
        )
        .bind(shipment.id.as_uuid())
        .bind(shipment.current_status.as_str())
        .bind(shipment.dispatch_date)
        .bind(shipment.delivered_at)
        .bind(shipment.closed_at)
        .bind(pod.map(|p| p.delivered_to.clone()))
        .bind(pod.and_then(|p| p.customer_signature.clone()))
        .bind(pod.and_then(|p| p.notes.clone()))
        .bind(pod.and_then(|p| p.object_path.clone()))
        .bind(pod.map(|p| uuid::Uuid::from(p.recorded_by)))
        .bind(pod.map(|p| p.recorded_at))
        .bind(shipment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        let event = StatusUpdateEvent {
            id: event_id,
            shipment_id: commit.shipment_id,
            status: commit.to,
            note: commit.note,
            location: commit.location,
            actor: commit.actor,
            created_at: at,
        };
        Ok(TransitionOutcome::Committed { shipment, event })
    }

    async fn status_updates(
        &self,
        id: ShipmentId,
    ) -> Result<Vec<StatusUpdateEvent>, LogisticsError> {
        let rows = sqlx::query_as::<_, StatusUpdateRow>(
            "SELECT id, shipment_id, status, note, location, actor_id, created_at \
             FROM shipment_status_updates WHERE shipment_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(StatusUpdateEvent::try_from).collect()
    }

    async fn update_shipment(
        &self,
        id: ShipmentId,
        update: ShipmentUpdate,
        at: DateTime<Utc>,
    ) -> Result<Shipment, LogisticsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, ShipmentRow>(&format!(
            "SELECT {SHIPMENT_COLUMNS} FROM shipments WHERE id = $1 FOR UPDATE"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(LogisticsError::ShipmentNotFound(id))?;
        let mut shipment = Shipment::try_from(row)?;
        shipment.apply_update(update, at.trunc_subsecs(6))?;

        // Status and proof-of-delivery columns are left alone.
        sqlx::query(
            "UPDATE shipments SET source = $2, destination = $3, client_id = $4, vendor_id = $5, \
             dispatch_date = $6, expected_delivery_date = $7, notes = $8, weight_kg = $9, \
             updated_at = $10 WHERE id = $1",
        )
        .bind(shipment.id.as_uuid())
        .bind(&shipment.source)
        .bind(&shipment.destination)
        .bind(shipment.counterparty.client_id().map(uuid::Uuid::from))
        .bind(shipment.counterparty.vendor_id().map(uuid::Uuid::from))
        .bind(shipment.dispatch_date)
        .bind(shipment.expected_delivery_date)
        .bind(&shipment.notes)
        .bind(shipment.weight_kg)
        .bind(shipment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(shipment)
    }

    async fn record_pod_upload(&self, reference: &PodReference) -> Result<(), LogisticsError> {
        let size = i64::try_from(reference.size).map_err(|_| {
            LogisticsError::InvalidRequest(format!("file size {} out of range", reference.size))
        })?;
        sqlx::query(
            "INSERT INTO shipment_pod_uploads (shipment_id, object_path, content_type, size_bytes) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(reference.shipment_id.as_uuid())
        .bind(&reference.object_path)
        .bind(reference.content_type.mime())
        .bind(size)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.as_database_error()
                .is_some_and(|db| db.is_foreign_key_violation())
            {
                LogisticsError::ShipmentNotFound(reference.shipment_id)
            } else {
                db_err(e)
            }
        })?;
        Ok(())
    }

    async fn has_pod_upload(
        &self,
        id: ShipmentId,
        object_path: &str,
    ) -> Result<bool, LogisticsError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM shipment_pod_uploads \
             WHERE shipment_id = $1 AND object_path = $2)",
        )
        .bind(id.as_uuid())
        .bind(object_path)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }
}

#[async_trait]
impl CheckpointLog for PostgresStore {
    async fn append_checkpoint(
        &self,
        checkpoint: NewCheckpoint,
        requested_at: DateTime<Utc>,
    ) -> Result<CheckpointEvent, LogisticsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Serializes appends per shipment.
        let exists = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM shipments WHERE id = $1 FOR UPDATE",
        )
        .bind(checkpoint.shipment_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;
        if exists.is_none() {
            return Err(LogisticsError::ShipmentNotFound(checkpoint.shipment_id));
        }
        let last: Option<DateTime<Utc>> = sqlx::query_scalar(
            "SELECT MAX(created_at) FROM shipment_checkpoints WHERE shipment_id = $1",
        )
        .bind(checkpoint.shipment_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;
        let at = next_log_timestamp(requested_at.trunc_subsecs(6), last);

        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO shipment_checkpoints (shipment_id, location, latitude, longitude, note, actor_id, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING id",
        )
        .bind(checkpoint.shipment_id.as_uuid())
        .bind(&checkpoint.location)
        .bind(checkpoint.coordinates.map(|p| p.latitude))
        .bind(checkpoint.coordinates.map(|p| p.longitude))
        .bind(&checkpoint.note)
        .bind(checkpoint.actor.as_uuid())
        .bind(at)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(CheckpointEvent {
            id,
            shipment_id: checkpoint.shipment_id,
            location: checkpoint.location,
            coordinates: checkpoint.coordinates,
            note: checkpoint.note,
            actor: checkpoint.actor,
            created_at: at,
        })
    }

    async fn checkpoints(&self, id: ShipmentId) -> Result<Vec<CheckpointEvent>, LogisticsError> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            "SELECT id, shipment_id, location, latitude, longitude, note, actor_id, created_at \
             FROM shipment_checkpoints WHERE shipment_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(CheckpointEvent::try_from).collect()
    }

    async fn latest_geotagged(
        &self,
        id: ShipmentId,
    ) -> Result<Option<CheckpointEvent>, LogisticsError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            "SELECT id, shipment_id, location, latitude, longitude, note, actor_id, created_at \
             FROM shipment_checkpoints WHERE shipment_id = $1 AND latitude IS NOT NULL \
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(CheckpointEvent::try_from).transpose()
    }
}

#[async_trait]
impl AttendanceRepository for PostgresStore {
    async fn open_session(
        &self,
        record: AttendanceRecord,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let stamp = &record.check_in;
        let inserted = sqlx::query_scalar::<_, uuid::Uuid>(
            "INSERT INTO attendance_records (id, user_id, work_date, check_in_at, check_in_location, \
             check_in_latitude, check_in_longitude, check_in_accuracy_m, check_in_photo_path) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             ON CONFLICT (user_id, work_date) DO NOTHING RETURNING id",
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.as_uuid())
        .bind(record.work_date)
        .bind(stamp.at)
        .bind(&stamp.location)
        .bind(stamp.fix.point.latitude)
        .bind(stamp.fix.point.longitude)
        .bind(stamp.fix.accuracy_m)
        .bind(&stamp.photo_path)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        match inserted {
            Some(_) => Ok(record),
            None => Err(LogisticsError::DuplicateCheckIn {
                user_id: record.user_id,
                date: record.work_date,
            }),
        }
    }

    async fn close_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
        check_out: SessionStamp,
        work: Option<WorkReport>,
    ) -> Result<AttendanceRecord, LogisticsError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE user_id = $1 AND work_date = $2 FOR UPDATE"
        ))
        .bind(user_id.as_uuid())
        .bind(date)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .ok_or(LogisticsError::NoOpenSession { user_id, date })?;

        let mut record = AttendanceRecord::try_from(row)?;
        record.close(check_out, work)?;

        let (out, report) = match (&record.check_out, &record.work) {
            (Some(out), report) => (out, report.clone().unwrap_or_default()),
            (None, _) => {
                return Err(LogisticsError::Internal(
                    "closed session has no check-out".to_string(),
                ));
            }
        };

        sqlx::query(
            "UPDATE attendance_records SET check_out_at = $2, check_out_location = $3, \
             check_out_latitude = $4, check_out_longitude = $5, check_out_accuracy_m = $6, \
             check_out_photo_path = $7, work_description = $8, task_count = $9, \
             deliveries_completed = $10 WHERE id = $1",
        )
        .bind(record.id.as_uuid())
        .bind(out.at)
        .bind(&out.location)
        .bind(out.fix.point.latitude)
        .bind(out.fix.point.longitude)
        .bind(out.fix.accuracy_m)
        .bind(&out.photo_path)
        .bind(&report.description)
        .bind(counter_to_db(report.task_count))
        .bind(counter_to_db(report.deliveries_completed))
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(record)
    }

    async fn find_session(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, LogisticsError> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records WHERE user_id = $1 AND work_date = $2"
        ))
        .bind(user_id.as_uuid())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn sessions_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE work_date BETWEEN $1 AND $2 ORDER BY work_date ASC, check_in_at ASC"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn sessions_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<AttendanceRecord>, LogisticsError> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance_records \
             WHERE user_id = $1 ORDER BY work_date DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }
}
