//! Database row models and their conversion into domain types.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    AttendanceRecord, CheckpointEvent, Counterparty, GeoFix, GeoPoint, ProofOfDelivery,
    SessionStamp, Shipment, ShipmentStatus, StatusUpdateEvent, WorkReport,
};
use crate::error::LogisticsError;

/// A row of the `shipments` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ShipmentRow {
    /// Primary key.
    pub id: Uuid,
    /// Unique consignment number.
    pub consignment_number: String,
    /// Origin.
    pub source: String,
    /// Destination.
    pub destination: String,
    /// Client counterparty.
    pub client_id: Option<Uuid>,
    /// Vendor counterparty.
    pub vendor_id: Option<Uuid>,
    /// Dispatch date.
    pub dispatch_date: Option<DateTime<Utc>>,
    /// Promised delivery date.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// Delivery time.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Closure time.
    pub closed_at: Option<DateTime<Utc>>,
    /// Status in wire form.
    pub current_status: String,
    /// Notes.
    pub notes: Option<String>,
    /// Weight in kilograms.
    pub weight_kg: Option<f64>,
    /// POD receiver.
    pub pod_delivered_to: Option<String>,
    /// POD signature token.
    pub pod_customer_signature: Option<String>,
    /// POD notes.
    pub pod_notes: Option<String>,
    /// POD object path.
    pub pod_object_path: Option<String>,
    /// POD recording actor.
    pub pod_recorded_by: Option<Uuid>,
    /// POD recording time.
    pub pod_recorded_at: Option<DateTime<Utc>>,
    /// Creating actor.
    pub created_by: Uuid,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ShipmentRow> for Shipment {
    type Error = LogisticsError;

    fn try_from(row: ShipmentRow) -> Result<Self, Self::Error> {
        let counterparty = Counterparty::from_parts(
            row.client_id.map(Into::into),
            row.vendor_id.map(Into::into),
        )
        .map_err(|e| LogisticsError::IntegrityViolation(format!("shipment {}: {e}", row.id)))?;

        let proof_of_delivery = match (row.pod_delivered_to, row.pod_recorded_by, row.pod_recorded_at) {
            (Some(delivered_to), Some(recorded_by), Some(recorded_at)) => Some(ProofOfDelivery {
                delivered_to,
                customer_signature: row.pod_customer_signature,
                notes: row.pod_notes,
                object_path: row.pod_object_path,
                recorded_by: recorded_by.into(),
                recorded_at,
            }),
            _ => None,
        };

        Ok(Self {
            id: row.id.into(),
            consignment_number: row.consignment_number,
            source: row.source,
            destination: row.destination,
            counterparty,
            dispatch_date: row.dispatch_date,
            expected_delivery_date: row.expected_delivery_date,
            delivered_at: row.delivered_at,
            closed_at: row.closed_at,
            current_status: parse_status(&row.current_status)?,
            notes: row.notes,
            weight_kg: row.weight_kg,
            proof_of_delivery,
            created_by: row.created_by.into(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `shipment_status_updates` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StatusUpdateRow {
    /// Log sequence.
    pub id: i64,
    /// Owning shipment.
    pub shipment_id: Uuid,
    /// Entered status in wire form.
    pub status: String,
    /// Note.
    pub note: Option<String>,
    /// Location label.
    pub location: Option<String>,
    /// Acting user.
    pub actor_id: Uuid,
    /// Append time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<StatusUpdateRow> for StatusUpdateEvent {
    type Error = LogisticsError;

    fn try_from(row: StatusUpdateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            shipment_id: row.shipment_id.into(),
            status: parse_status(&row.status)?,
            note: row.note,
            location: row.location,
            actor: row.actor_id.into(),
            created_at: row.created_at,
        })
    }
}

/// A row of the `shipment_checkpoints` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckpointRow {
    /// Log sequence.
    pub id: i64,
    /// Owning shipment.
    pub shipment_id: Uuid,
    /// Location label.
    pub location: String,
    /// Latitude.
    pub latitude: Option<f64>,
    /// Longitude.
    pub longitude: Option<f64>,
    /// Note.
    pub note: Option<String>,
    /// Capturing user.
    pub actor_id: Uuid,
    /// Append time.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<CheckpointRow> for CheckpointEvent {
    type Error = LogisticsError;

    fn try_from(row: CheckpointRow) -> Result<Self, Self::Error> {
        let coordinates = GeoPoint::from_pair(row.latitude, row.longitude)
            .map_err(|e| LogisticsError::IntegrityViolation(format!("checkpoint {}: {e}", row.id)))?;
        Ok(Self {
            id: row.id,
            shipment_id: row.shipment_id.into(),
            location: row.location,
            coordinates,
            note: row.note,
            actor: row.actor_id.into(),
            created_at: row.created_at,
        })
    }
}

/// A row of the `attendance_records` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AttendanceRow {
    /// Primary key.
    pub id: Uuid,
    /// The user.
    pub user_id: Uuid,
    /// Calendar date.
    pub work_date: NaiveDate,
    /// Check-in time.
    pub check_in_at: DateTime<Utc>,
    /// Check-in location label.
    pub check_in_location: Option<String>,
    /// Check-in latitude.
    pub check_in_latitude: f64,
    /// Check-in longitude.
    pub check_in_longitude: f64,
    /// Check-in accuracy in meters.
    pub check_in_accuracy_m: Option<f64>,
    /// Check-in photo path.
    pub check_in_photo_path: Option<String>,
    /// Check-out time.
    pub check_out_at: Option<DateTime<Utc>>,
    /// Check-out location label.
    pub check_out_location: Option<String>,
    /// Check-out latitude.
    pub check_out_latitude: Option<f64>,
    /// Check-out longitude.
    pub check_out_longitude: Option<f64>,
    /// Check-out accuracy in meters.
    pub check_out_accuracy_m: Option<f64>,
    /// Check-out photo path.
    pub check_out_photo_path: Option<String>,
    /// Work description.
    pub work_description: Option<String>,
    /// Tasks completed.
    pub task_count: Option<i32>,
    /// Deliveries completed.
    pub deliveries_completed: Option<i32>,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = LogisticsError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        let check_in = SessionStamp {
            at: row.check_in_at,
            location: row.check_in_location,
            fix: fix(row.check_in_latitude, row.check_in_longitude, row.check_in_accuracy_m),
            photo_path: row.check_in_photo_path,
        };

        let check_out = match (row.check_out_at, row.check_out_latitude, row.check_out_longitude) {
            (Some(at), Some(lat), Some(lon)) => Some(SessionStamp {
                at,
                location: row.check_out_location,
                fix: fix(lat, lon, row.check_out_accuracy_m),
                photo_path: row.check_out_photo_path,
            }),
            (None, None, None) => None,
            _ => {
                return Err(LogisticsError::IntegrityViolation(format!(
                    "attendance {}: partial check-out",
                    row.id
                )));
            }
        };

        let work = if row.work_description.is_some()
            || row.task_count.is_some()
            || row.deliveries_completed.is_some()
        {
            Some(WorkReport {
                description: row.work_description,
                task_count: counter(row.task_count)?,
                deliveries_completed: counter(row.deliveries_completed)?,
            })
        } else {
            None
        };

        Ok(Self {
            id: row.id.into(),
            user_id: row.user_id.into(),
            work_date: row.work_date,
            check_in,
            check_out,
            work,
        })
    }
}

fn parse_status(raw: &str) -> Result<ShipmentStatus, LogisticsError> {
    raw.parse()
        .map_err(|_| LogisticsError::IntegrityViolation(format!("unknown stored status {raw:?}")))
}

fn fix(latitude: f64, longitude: f64, accuracy_m: Option<f64>) -> GeoFix {
    GeoFix {
        point: GeoPoint {
            latitude,
            longitude,
        },
        accuracy_m,
    }
}

fn counter(value: Option<i32>) -> Result<Option<u32>, LogisticsError> {
    value
        .map(u32::try_from)
        .transpose()
        .map_err(|e| LogisticsError::IntegrityViolation(format!("negative counter: {e}")))
}

/// Converts a work counter for storage.
pub(crate) fn counter_to_db(value: Option<u32>) -> Option<i32> {
    value.map(|v| i32::try_from(v).unwrap_or(i32::MAX))
}
