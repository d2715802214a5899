//! Canonical shipment statuses and the transition validator.
//!
//! Shipments move along a strict singly-linked sequence:
//!
//! ```text
//! created → packed → dispatched → in_transit → out_for_delivery → delivered → closed
//! ```
//!
//! There is no branching and no shortcut. Proof-of-delivery gating relies on
//! every intermediate step having been witnessed, so skipping, moving
//! backward and repeating the current status are all rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::LogisticsError;

/// One of the seven canonical shipment statuses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Registered, nothing physical has happened yet.
    Created,
    /// Goods packed and ready for pickup.
    Packed,
    /// Handed over to the carrier.
    Dispatched,
    /// Moving between hubs.
    InTransit,
    /// On the final delivery vehicle.
    OutForDelivery,
    /// Handed to the receiver.
    Delivered,
    /// Proof of delivery filed. Terminal.
    Closed,
}

impl ShipmentStatus {
    /// Every status in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Created,
        Self::Packed,
        Self::Dispatched,
        Self::InTransit,
        Self::OutForDelivery,
        Self::Delivered,
        Self::Closed,
    ];

    /// Returns the status immediately following `self`, or `None` for
    /// [`ShipmentStatus::Closed`].
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Packed),
            Self::Packed => Some(Self::Dispatched),
            Self::Dispatched => Some(Self::InTransit),
            Self::InTransit => Some(Self::OutForDelivery),
            Self::OutForDelivery => Some(Self::Delivered),
            Self::Delivered => Some(Self::Closed),
            Self::Closed => None,
        }
    }

    /// Returns `true` if no transition leaves this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.next().is_none()
    }

    /// Wire and storage representation (`"in_transit"`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Packed => "packed",
            Self::Dispatched => "dispatched",
            Self::InTransit => "in_transit",
            Self::OutForDelivery => "out_for_delivery",
            Self::Delivered => "delivered",
            Self::Closed => "closed",
        }
    }

    /// Human-readable label (`"In Transit"`).
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Packed => "Packed",
            Self::Dispatched => "Dispatched",
            Self::InTransit => "In Transit",
            Self::OutForDelivery => "Out for Delivery",
            Self::Delivered => "Delivered",
            Self::Closed => "Closed",
        }
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShipmentStatus {
    type Err = LogisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| LogisticsError::InvalidRequest(format!("unknown shipment status: {s}")))
    }
}

/// Returns the status that follows `current`, or `None` when `current` is
/// terminal.
#[must_use]
pub const fn next_status(current: ShipmentStatus) -> Option<ShipmentStatus> {
    current.next()
}

/// Returns `true` only if `to` is exactly the status following `from`.
#[must_use]
pub fn is_valid_transition(from: ShipmentStatus, to: ShipmentStatus) -> bool {
    next_status(from) == Some(to)
}

/// Validates a requested transition and returns the accepted target.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidTransition`] carrying the rejected pair
/// when `to` is not the canonical next status of `from`.
pub fn validate_transition(
    from: ShipmentStatus,
    to: ShipmentStatus,
) -> Result<ShipmentStatus, LogisticsError> {
    if is_valid_transition(from, to) {
        Ok(to)
    } else {
        Err(LogisticsError::InvalidTransition { from, to })
    }
}

/// Checks that a sequence of statuses, starting from
/// [`ShipmentStatus::Created`], only ever takes canonical steps.
///
/// Used to audit a shipment's status log against the current status.
///
/// # Errors
///
/// Returns [`LogisticsError::InvalidTransition`] for the first offending
/// step.
pub fn replay<I>(statuses: I) -> Result<ShipmentStatus, LogisticsError>
where
    I: IntoIterator<Item = ShipmentStatus>,
{
    statuses
        .into_iter()
        .try_fold(ShipmentStatus::Created, validate_transition)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn next_walks_the_sequence() {
        let mut current = ShipmentStatus::Created;
        let mut visited = vec![current];
        while let Some(next) = current.next() {
            visited.push(next);
            current = next;
        }
        assert_eq!(visited, ShipmentStatus::ALL.to_vec());
        assert!(ShipmentStatus::Closed.is_terminal());
    }

    #[test]
    fn valid_iff_next_for_all_pairs() {
        for from in ShipmentStatus::ALL {
            for to in ShipmentStatus::ALL {
                assert_eq!(
                    is_valid_transition(from, to),
                    next_status(from) == Some(to),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn examples_from_the_lifecycle() {
        assert!(is_valid_transition(
            ShipmentStatus::Created,
            ShipmentStatus::Packed
        ));
        assert!(!is_valid_transition(
            ShipmentStatus::Created,
            ShipmentStatus::Dispatched
        ));
        assert!(!is_valid_transition(
            ShipmentStatus::Packed,
            ShipmentStatus::Packed
        ));
        assert!(!is_valid_transition(
            ShipmentStatus::Delivered,
            ShipmentStatus::InTransit
        ));
        for to in ShipmentStatus::ALL {
            assert!(!is_valid_transition(ShipmentStatus::Closed, to));
        }
    }

    #[test]
    fn validate_reports_rejected_pair() {
        let err = validate_transition(ShipmentStatus::InTransit, ShipmentStatus::Closed);
        let Err(LogisticsError::InvalidTransition { from, to }) = err else {
            panic!("expected InvalidTransition");
        };
        assert_eq!(from, ShipmentStatus::InTransit);
        assert_eq!(to, ShipmentStatus::Closed);
    }

    #[test]
    fn parses_wire_names() {
        for status in ShipmentStatus::ALL {
            let parsed: Result<ShipmentStatus, _> = status.as_str().parse();
            assert_eq!(parsed.ok(), Some(status));
        }
        assert!("lost".parse::<ShipmentStatus>().is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&ShipmentStatus::OutForDelivery).unwrap_or_default();
        assert_eq!(json, "\"out_for_delivery\"");
    }

    #[test]
    fn replay_accepts_canonical_log() {
        let log = [
            ShipmentStatus::Packed,
            ShipmentStatus::Dispatched,
            ShipmentStatus::InTransit,
        ];
        assert_eq!(replay(log).ok(), Some(ShipmentStatus::InTransit));
        assert_eq!(replay([]).ok(), Some(ShipmentStatus::Created));
        assert!(replay([ShipmentStatus::Packed, ShipmentStatus::InTransit]).is_err());
    }
}
