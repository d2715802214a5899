//! The shipment aggregate and its proof-of-delivery record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{ClientId, ShipmentId, ShipmentStatus, UserId, VendorId};
use crate::error::LogisticsError;

/// Optional commercial counterparty of a shipment.
///
/// At most one of client and vendor may be set. A shipment with neither is a
/// direct shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Counterparty {
    /// Outbound to a customer.
    Client(ClientId),
    /// Inbound from (or outbound to) a supplier.
    Vendor(VendorId),
    /// No counterparty.
    #[default]
    Direct,
}

impl Counterparty {
    /// Builds a counterparty from the two optional foreign keys.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if both are present.
    pub fn from_parts(
        client_id: Option<ClientId>,
        vendor_id: Option<VendorId>,
    ) -> Result<Self, LogisticsError> {
        match (client_id, vendor_id) {
            (Some(_), Some(_)) => Err(LogisticsError::InvalidRequest(
                "a shipment may reference a client or a vendor, not both".to_string(),
            )),
            (Some(client), None) => Ok(Self::Client(client)),
            (None, Some(vendor)) => Ok(Self::Vendor(vendor)),
            (None, None) => Ok(Self::Direct),
        }
    }

    /// The client id, if this is a client shipment.
    #[must_use]
    pub const fn client_id(&self) -> Option<ClientId> {
        match self {
            Self::Client(id) => Some(*id),
            _ => None,
        }
    }

    /// The vendor id, if this is a vendor shipment.
    #[must_use]
    pub const fn vendor_id(&self) -> Option<VendorId> {
        match self {
            Self::Vendor(id) => Some(*id),
            _ => None,
        }
    }
}

/// Delivery evidence supplied when closing a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
pub struct PodPayload {
    /// Name of the person who received the goods. Required.
    #[serde(default)]
    pub delivered_to: String,
    /// Signature token or confirmation code.
    #[serde(default)]
    pub customer_signature: Option<String>,
    /// Free-text delivery notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Permanent object path of an uploaded POD image or PDF.
    #[serde(default)]
    pub object_path: Option<String>,
}

impl PodPayload {
    /// Checks that the payload identifies a receiver and normalizes blank
    /// optional fields to `None`.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if `delivered_to` is empty
    /// or whitespace.
    pub fn validated(self) -> Result<Self, LogisticsError> {
        let delivered_to = self.delivered_to.trim().to_string();
        if delivered_to.is_empty() {
            return Err(LogisticsError::InvalidRequest(
                "proof of delivery must name the receiver (delivered_to)".to_string(),
            ));
        }
        Ok(Self {
            delivered_to,
            customer_signature: non_blank(self.customer_signature),
            notes: non_blank(self.notes),
            object_path: non_blank(self.object_path),
        })
    }
}

/// Proof of delivery as recorded on a closed shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProofOfDelivery {
    /// Receiver name.
    pub delivered_to: String,
    /// Signature token or confirmation code.
    pub customer_signature: Option<String>,
    /// Delivery notes.
    pub notes: Option<String>,
    /// Permanent object path of the uploaded evidence.
    pub object_path: Option<String>,
    /// Actor who closed the shipment.
    pub recorded_by: UserId,
    /// Closure time.
    pub recorded_at: DateTime<Utc>,
}

impl ProofOfDelivery {
    /// Builds the stored record from a validated payload.
    #[must_use]
    pub fn from_payload(payload: PodPayload, recorded_by: UserId, recorded_at: DateTime<Utc>) -> Self {
        Self {
            delivered_to: payload.delivered_to,
            customer_signature: payload.customer_signature,
            notes: payload.notes,
            object_path: payload.object_path,
            recorded_by,
            recorded_at,
        }
    }
}

/// Input for creating a shipment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewShipment {
    /// Human-assigned unique label.
    pub consignment_number: String,
    /// Origin, free text.
    pub source: String,
    /// Destination, free text.
    pub destination: String,
    /// Optional counterparty.
    pub counterparty: Counterparty,
    /// Planned dispatch date.
    pub dispatch_date: Option<DateTime<Utc>>,
    /// Promised delivery date.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Gross weight in kilograms.
    pub weight_kg: Option<f64>,
}

/// Edits to a shipment's descriptive fields. `None` leaves a field as it is.
///
/// The consignment number, status, lifecycle timestamps and proof of
/// delivery are not editable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShipmentUpdate {
    /// New origin.
    pub source: Option<String>,
    /// New destination.
    pub destination: Option<String>,
    /// New counterparty, replacing the current one.
    pub counterparty: Option<Counterparty>,
    /// New planned dispatch date. Only before dispatch.
    pub dispatch_date: Option<DateTime<Utc>>,
    /// New promised delivery date.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// New notes; an empty string clears them.
    pub notes: Option<String>,
    /// New gross weight.
    pub weight_kg: Option<f64>,
}

/// A tracked shipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Shipment {
    /// Internal identity.
    pub id: ShipmentId,
    /// Unique human-assigned label.
    pub consignment_number: String,
    /// Origin.
    pub source: String,
    /// Destination.
    pub destination: String,
    /// Optional counterparty.
    pub counterparty: Counterparty,
    /// When the goods left (or are planned to leave).
    pub dispatch_date: Option<DateTime<Utc>>,
    /// Promised delivery date.
    pub expected_delivery_date: Option<DateTime<Utc>>,
    /// When the shipment entered `delivered`.
    pub delivered_at: Option<DateTime<Utc>>,
    /// When the shipment was closed.
    pub closed_at: Option<DateTime<Utc>>,
    /// Current lifecycle status.
    pub current_status: ShipmentStatus,
    /// Free-text notes.
    pub notes: Option<String>,
    /// Gross weight in kilograms.
    pub weight_kg: Option<f64>,
    /// Delivery evidence, present once closed.
    pub proof_of_delivery: Option<ProofOfDelivery>,
    /// Actor who registered the shipment.
    pub created_by: UserId,
    /// Registration time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl Shipment {
    /// Creates a shipment in status [`ShipmentStatus::Created`].
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if a required text field
    /// is blank, the weight is negative or the expected delivery date
    /// precedes the dispatch date.
    pub fn create(
        input: NewShipment,
        created_by: UserId,
        now: DateTime<Utc>,
    ) -> Result<Self, LogisticsError> {
        let consignment_number = required("consignment_number", &input.consignment_number)?;
        let source = required("source", &input.source)?;
        let destination = required("destination", &input.destination)?;
        check_weight(input.weight_kg)?;
        check_dates(input.dispatch_date, input.expected_delivery_date)?;

        Ok(Self {
            id: ShipmentId::new(),
            consignment_number,
            source,
            destination,
            counterparty: input.counterparty,
            dispatch_date: input.dispatch_date,
            expected_delivery_date: input.expected_delivery_date,
            delivered_at: None,
            closed_at: None,
            current_status: ShipmentStatus::Created,
            notes: non_blank(input.notes),
            weight_kg: input.weight_kg,
            proof_of_delivery: None,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies an accepted transition to the row: sets the status and
    /// stamps the lifecycle date tied to the entered status.
    ///
    /// Dates stay monotonic: a planned dispatch date later than the actual
    /// dispatch is pulled back to the transition time.
    pub fn apply_transition(
        &mut self,
        to: ShipmentStatus,
        at: DateTime<Utc>,
        pod: Option<ProofOfDelivery>,
    ) {
        match to {
            ShipmentStatus::Dispatched => {
                self.dispatch_date = Some(self.dispatch_date.map_or(at, |planned| planned.min(at)));
            }
            ShipmentStatus::Delivered => self.delivered_at = Some(at),
            ShipmentStatus::Closed => {
                self.closed_at = Some(at);
                self.proof_of_delivery = pod;
            }
            _ => {}
        }
        self.current_status = to;
        self.updated_at = at;
    }

    /// Applies edits to the descriptive fields. Either every edit is applied
    /// or none is.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if the shipment is closed,
    /// a text field is blanked, the weight is invalid, the dispatch date is
    /// edited after dispatch, or the resulting expected delivery date
    /// precedes the dispatch date.
    pub fn apply_update(
        &mut self,
        update: ShipmentUpdate,
        at: DateTime<Utc>,
    ) -> Result<(), LogisticsError> {
        if self.current_status == ShipmentStatus::Closed {
            return Err(LogisticsError::InvalidRequest(format!(
                "shipment {} is closed and can no longer be edited",
                self.id
            )));
        }
        let source = update
            .source
            .map(|v| required("source", &v))
            .transpose()?;
        let destination = update
            .destination
            .map(|v| required("destination", &v))
            .transpose()?;
        check_weight(update.weight_kg)?;

        // The actual dispatch time is stamped by the transition.
        if update.dispatch_date.is_some() && self.current_status >= ShipmentStatus::Dispatched {
            return Err(LogisticsError::InvalidRequest(format!(
                "dispatch date of shipment {} is fixed once {} is reached",
                self.id,
                ShipmentStatus::Dispatched
            )));
        }
        let dispatch_date = update.dispatch_date.or(self.dispatch_date);
        let expected_delivery_date = update
            .expected_delivery_date
            .or(self.expected_delivery_date);
        check_dates(dispatch_date, expected_delivery_date)?;

        if let Some(source) = source {
            self.source = source;
        }
        if let Some(destination) = destination {
            self.destination = destination;
        }
        if let Some(counterparty) = update.counterparty {
            self.counterparty = counterparty;
        }
        if let Some(notes) = update.notes {
            self.notes = non_blank(Some(notes));
        }
        if update.weight_kg.is_some() {
            self.weight_kg = update.weight_kg;
        }
        self.dispatch_date = dispatch_date;
        self.expected_delivery_date = expected_delivery_date;
        self.updated_at = at;
        Ok(())
    }

    /// Returns `true` if the shipment is past its promised date and not yet
    /// handed over.
    #[must_use]
    pub fn is_overdue(&self, as_of: DateTime<Utc>) -> bool {
        !matches!(
            self.current_status,
            ShipmentStatus::Delivered | ShipmentStatus::Closed
        ) && self.expected_delivery_date.is_some_and(|due| due < as_of)
    }

    /// Returns `true` until the shipment is closed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.current_status != ShipmentStatus::Closed
    }

    /// Case-insensitive substring match over consignment number, source and
    /// destination.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        [&self.consignment_number, &self.source, &self.destination]
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Query filter over shipments. All set fields must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShipmentFilter {
    /// Exact status.
    pub status: Option<ShipmentStatus>,
    /// Client counterparty.
    pub client_id: Option<ClientId>,
    /// Vendor counterparty.
    pub vendor_id: Option<VendorId>,
    /// Exclude closed shipments.
    pub active_only: bool,
    /// Only shipments overdue at this instant.
    pub overdue_as_of: Option<DateTime<Utc>>,
    /// Substring search.
    pub search: Option<String>,
}

impl ShipmentFilter {
    /// Returns `true` if `shipment` satisfies every set criterion.
    #[must_use]
    pub fn matches(&self, shipment: &Shipment) -> bool {
        self.status.is_none_or(|s| shipment.current_status == s)
            && self
                .client_id
                .is_none_or(|c| shipment.counterparty.client_id() == Some(c))
            && self
                .vendor_id
                .is_none_or(|v| shipment.counterparty.vendor_id() == Some(v))
            && (!self.active_only || shipment.is_active())
            && self.overdue_as_of.is_none_or(|t| shipment.is_overdue(t))
            && self
                .search
                .as_deref()
                .is_none_or(|q| shipment.matches_search(q))
    }
}

/// Number of shipments in one status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct StatusCount {
    /// The status.
    pub status: ShipmentStatus,
    /// Shipments currently in it.
    pub count: usize,
}

/// Shipment counts for the logistics dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ShipmentDashboard {
    /// All shipments.
    pub total: usize,
    /// Shipments not yet closed.
    pub active: usize,
    /// Shipments past their expected delivery date and not yet delivered.
    pub overdue: usize,
    /// One entry per status in lifecycle order, zeros included.
    pub by_status: Vec<StatusCount>,
}

impl ShipmentDashboard {
    /// Counts `shipments` as of `as_of`.
    #[must_use]
    pub fn tally<'a, I>(shipments: I, as_of: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a Shipment>,
    {
        let mut by_status = ShipmentStatus::ALL.map(|status| StatusCount { status, count: 0 });
        let (mut total, mut active, mut overdue) = (0, 0, 0);
        for shipment in shipments {
            total += 1;
            active += usize::from(shipment.is_active());
            overdue += usize::from(shipment.is_overdue(as_of));
            if let Some(entry) = by_status
                .iter_mut()
                .find(|entry| entry.status == shipment.current_status)
            {
                entry.count += 1;
            }
        }
        Self {
            total,
            active,
            overdue,
            by_status: by_status.to_vec(),
        }
    }
}

fn check_weight(weight_kg: Option<f64>) -> Result<(), LogisticsError> {
    match weight_kg {
        Some(weight) if !weight.is_finite() || weight < 0.0 => Err(
            LogisticsError::InvalidRequest(format!("invalid weight: {weight}")),
        ),
        _ => Ok(()),
    }
}

fn check_dates(
    dispatch: Option<DateTime<Utc>>,
    due: Option<DateTime<Utc>>,
) -> Result<(), LogisticsError> {
    match (dispatch, due) {
        (Some(dispatch), Some(due)) if due < dispatch => Err(LogisticsError::InvalidRequest(
            "expected delivery date precedes dispatch date".to_string(),
        )),
        _ => Ok(()),
    }
}

fn required(field: &str, value: &str) -> Result<String, LogisticsError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(LogisticsError::InvalidRequest(format!(
            "{field} is required"
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
