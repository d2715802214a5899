//! Append-only shipment event logs.
//!
//! Status changes and GPS checkpoints are written by different actors and
//! are stored as two independent logs. Neither record is ever mutated after
//! it has been appended. Each log assigns its own sequence number, and
//! `created_at` is strictly increasing per shipment within a log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{GeoPoint, ShipmentId, ShipmentStatus, UserId};
use super::shipment::non_blank;
use crate::error::LogisticsError;

/// One accepted status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StatusUpdateEvent {
    /// Log sequence number.
    pub id: i64,
    /// Owning shipment.
    pub shipment_id: ShipmentId,
    /// Status that was entered.
    pub status: ShipmentStatus,
    /// Operator note.
    pub note: Option<String>,
    /// Where the transition was recorded.
    pub location: Option<String>,
    /// Actor who made the transition.
    pub actor: UserId,
    /// Server-assigned append time.
    pub created_at: DateTime<Utc>,
}

/// One GPS checkpoint. Does not imply a status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CheckpointEvent {
    /// Log sequence number.
    pub id: i64,
    /// Owning shipment.
    pub shipment_id: ShipmentId,
    /// Location label.
    pub location: String,
    /// Device coordinate, when captured.
    pub coordinates: Option<GeoPoint>,
    /// Free-text note.
    pub note: Option<String>,
    /// Actor who captured the checkpoint.
    pub actor: UserId,
    /// Server-assigned append time.
    pub created_at: DateTime<Utc>,
}

/// Checkpoint input before the log assigns an id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCheckpoint {
    /// Owning shipment.
    pub shipment_id: ShipmentId,
    /// Location label.
    pub location: String,
    /// Device coordinate.
    pub coordinates: Option<GeoPoint>,
    /// Free-text note.
    pub note: Option<String>,
    /// Capturing actor.
    pub actor: UserId,
}

impl NewCheckpoint {
    /// Trims text fields and requires a location label.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if `location` is blank.
    pub fn validated(self) -> Result<Self, LogisticsError> {
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(LogisticsError::InvalidRequest(
                "checkpoint location is required".to_string(),
            ));
        }
        Ok(Self {
            location,
            note: non_blank(self.note),
            ..self
        })
    }
}
