//! Read-time merge of the status and checkpoint logs.
//!
//! [`merge_timeline`] is pure: given the two logs and the shipment's current
//! status it yields the same [`Timeline`] every time. Entries are ordered by
//! timestamp descending. On equal timestamps a status entry precedes a
//! checkpoint entry, and within one kind the higher log sequence comes first.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{CheckpointEvent, ShipmentId, ShipmentStatus, StatusUpdateEvent, UserId};

/// One projected entry of a shipment timeline.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimelineEntry {
    /// A status transition.
    Status {
        /// Status log sequence number.
        id: i64,
        /// When the transition was recorded.
        timestamp: DateTime<Utc>,
        /// Entered status.
        status: ShipmentStatus,
        /// Location label.
        #[serde(skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        /// Operator note.
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        /// Actor.
        actor: UserId,
    },
    /// A GPS checkpoint.
    Checkpoint {
        /// Checkpoint log sequence number.
        id: i64,
        /// When the checkpoint was captured.
        timestamp: DateTime<Utc>,
        /// Location label.
        location: String,
        /// Free-text note.
        #[serde(skip_serializing_if = "Option::is_none")]
        note: Option<String>,
        /// Actor.
        actor: UserId,
        /// Latitude, when captured.
        #[serde(skip_serializing_if = "Option::is_none")]
        latitude: Option<f64>,
        /// Longitude, when captured.
        #[serde(skip_serializing_if = "Option::is_none")]
        longitude: Option<f64>,
    },
}

impl TimelineEntry {
    /// The entry's timestamp.
    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Status { timestamp, .. } | Self::Checkpoint { timestamp, .. } => *timestamp,
        }
    }

    const fn kind_rank(&self) -> u8 {
        match self {
            Self::Status { .. } => 0,
            Self::Checkpoint { .. } => 1,
        }
    }

    const fn seq(&self) -> i64 {
        match self {
            Self::Status { id, .. } | Self::Checkpoint { id, .. } => *id,
        }
    }

    fn display_order(&self, other: &Self) -> Ordering {
        other
            .timestamp()
            .cmp(&self.timestamp())
            .then_with(|| self.kind_rank().cmp(&other.kind_rank()))
            .then_with(|| other.seq().cmp(&self.seq()))
    }
}

impl From<&StatusUpdateEvent> for TimelineEntry {
    fn from(event: &StatusUpdateEvent) -> Self {
        Self::Status {
            id: event.id,
            timestamp: event.created_at,
            status: event.status,
            location: event.location.clone(),
            note: event.note.clone(),
            actor: event.actor,
        }
    }
}

impl From<&CheckpointEvent> for TimelineEntry {
    fn from(event: &CheckpointEvent) -> Self {
        Self::Checkpoint {
            id: event.id,
            timestamp: event.created_at,
            location: event.location.clone(),
            note: event.note.clone(),
            actor: event.actor,
            latitude: event.coordinates.map(|p| p.latitude),
            longitude: event.coordinates.map(|p| p.longitude),
        }
    }
}

/// Derived counts over a timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TimelineSummary {
    /// Number of entries.
    pub total: usize,
    /// Number of status entries.
    pub status_count: usize,
    /// Number of checkpoint entries.
    pub checkpoint_count: usize,
    /// Shipment's current status.
    pub current_status: ShipmentStatus,
    /// Human-readable label of the current status.
    pub current_status_label: String,
}

/// A shipment's merged history, most recent first.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Timeline {
    /// Shipment the timeline belongs to.
    pub shipment_id: ShipmentId,
    /// Merged entries.
    pub entries: Vec<TimelineEntry>,
    /// Derived counts.
    pub summary: TimelineSummary,
}

/// Merges both logs into a single ordered timeline.
#[must_use]
pub fn merge_timeline(
    shipment_id: ShipmentId,
    current_status: ShipmentStatus,
    status_events: &[StatusUpdateEvent],
    checkpoints: &[CheckpointEvent],
) -> Timeline {
    let mut entries: Vec<TimelineEntry> = status_events
        .iter()
        .map(TimelineEntry::from)
        .chain(checkpoints.iter().map(TimelineEntry::from))
        .collect();
    entries.sort_by(TimelineEntry::display_order);

    let summary = TimelineSummary {
        total: entries.len(),
        status_count: status_events.len(),
        checkpoint_count: checkpoints.len(),
        current_status,
        current_status_label: current_status.label().to_string(),
    };

    Timeline {
        shipment_id,
        entries,
        summary,
    }
}
