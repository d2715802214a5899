//! Shipment request and response DTOs.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{
    CheckpointEvent, ClientId, Counterparty, FixAssessment, NewShipment, ShipmentFilter,
    ShipmentStatus, ShipmentUpdate, VendorId,
};
use crate::error::LogisticsError;
use crate::service::{AdvanceCommand, CheckpointCommand, RecordedCheckpoint};

/// Request body for `POST /shipments`.
///
/// At most one of `client_id` / `vendor_id` may be set; with neither the
/// shipment is a direct one.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateShipmentRequest {
    /// Unique consignment number.
    pub consignment_number: String,
    /// Origin.
    pub source: String,
    /// Destination.
    pub destination: String,
    /// Owning client.
    #[serde(default)]
    pub client_id: Option<ClientId>,
    /// Owning vendor.
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// Planned dispatch date.
    #[serde(default)]
    pub dispatch_date: Option<NaiveDate>,
    /// Expected delivery date.
    #[serde(default)]
    pub expected_delivery_date: Option<NaiveDate>,
    /// Free-text notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// Declared weight in kilograms.
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

impl CreateShipmentRequest {
    /// Converts the body into a [`NewShipment`].
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if both a client and a
    /// vendor are named.
    pub fn into_new_shipment(self) -> Result<NewShipment, LogisticsError> {
        Ok(NewShipment {
            counterparty: Counterparty::from_parts(self.client_id, self.vendor_id)?,
            consignment_number: self.consignment_number,
            source: self.source,
            destination: self.destination,
            dispatch_date: self.dispatch_date.map(start_of_day),
            expected_delivery_date: self.expected_delivery_date.and_then(end_of_day),
            notes: self.notes,
            weight_kg: self.weight_kg,
        })
    }
}

/// Request body for `PUT /shipments/{id}`. Absent fields keep their value.
///
/// Naming a client or a vendor replaces the current counterparty; naming
/// both is refused. Status and proof of delivery cannot be set here.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateShipmentRequest {
    /// New origin.
    #[serde(default)]
    pub source: Option<String>,
    /// New destination.
    #[serde(default)]
    pub destination: Option<String>,
    /// New owning client.
    #[serde(default)]
    pub client_id: Option<ClientId>,
    /// New owning vendor.
    #[serde(default)]
    pub vendor_id: Option<VendorId>,
    /// New planned dispatch date; only before dispatch.
    #[serde(default)]
    pub dispatch_date: Option<NaiveDate>,
    /// New expected delivery date.
    #[serde(default)]
    pub expected_delivery_date: Option<NaiveDate>,
    /// New notes; an empty string clears them.
    #[serde(default)]
    pub notes: Option<String>,
    /// New declared weight in kilograms.
    #[serde(default)]
    pub weight_kg: Option<f64>,
}

impl UpdateShipmentRequest {
    /// Converts the body into a [`ShipmentUpdate`].
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::InvalidRequest`] if both a client and a
    /// vendor are named.
    pub fn into_update(self) -> Result<ShipmentUpdate, LogisticsError> {
        let counterparty = match (self.client_id, self.vendor_id) {
            (None, None) => None,
            (client, vendor) => Some(Counterparty::from_parts(client, vendor)?),
        };
        Ok(ShipmentUpdate {
            source: self.source,
            destination: self.destination,
            counterparty,
            dispatch_date: self.dispatch_date.map(start_of_day),
            expected_delivery_date: self.expected_delivery_date.and_then(end_of_day),
            notes: self.notes,
            weight_kg: self.weight_kg,
        })
    }
}

/// Dispatch dates count from midnight UTC.
fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// A due date covers the whole day, so a shipment is not overdue before
/// 23:59:59 UTC on it.
fn end_of_day(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(23, 59, 59).map(|at| at.and_utc())
}

/// Filters for `GET /shipments`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    /// Only shipments in this status.
    pub status: Option<ShipmentStatus>,
    /// Only shipments of this client.
    pub client_id: Option<ClientId>,
    /// Only shipments of this vendor.
    pub vendor_id: Option<VendorId>,
}

impl From<ShipmentListQuery> for ShipmentFilter {
    fn from(query: ShipmentListQuery) -> Self {
        Self {
            status: query.status,
            client_id: query.client_id,
            vendor_id: query.vendor_id,
            ..Self::default()
        }
    }
}

/// Query for `GET /shipments/search`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    /// Case-insensitive substring of consignment number, source or
    /// destination.
    #[serde(default)]
    pub q: String,
}

/// Request body for `POST /shipments/{id}/status`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct AdvanceStatusRequest {
    /// Status to enter.
    pub status: ShipmentStatus,
    /// Operator note.
    #[serde(default)]
    pub note: Option<String>,
    /// Where the change happened.
    #[serde(default)]
    pub location: Option<String>,
}

impl From<AdvanceStatusRequest> for AdvanceCommand {
    fn from(req: AdvanceStatusRequest) -> Self {
        Self {
            to: req.status,
            note: req.note,
            location: req.location,
        }
    }
}

/// Request body for `POST /shipments/{id}/checkpoints`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecordCheckpointRequest {
    /// Location label.
    pub location: String,
    /// Latitude; must be given together with `longitude`.
    #[serde(default)]
    pub latitude: Option<f64>,
    /// Longitude; must be given together with `latitude`.
    #[serde(default)]
    pub longitude: Option<f64>,
    /// Reported fix accuracy in meters.
    #[serde(default)]
    pub accuracy_m: Option<f64>,
    /// Free-text note.
    #[serde(default)]
    pub note: Option<String>,
}

impl From<RecordCheckpointRequest> for CheckpointCommand {
    fn from(req: RecordCheckpointRequest) -> Self {
        Self {
            location: req.location,
            latitude: req.latitude,
            longitude: req.longitude,
            accuracy_m: req.accuracy_m,
            note: req.note,
        }
    }
}

/// Response for `POST /shipments/{id}/checkpoints`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RecordCheckpointResponse {
    /// The recorded checkpoint.
    pub checkpoint: CheckpointEvent,
    /// GPS plausibility warnings raised while recording.
    pub gps: FixAssessment,
}

impl From<RecordedCheckpoint> for RecordCheckpointResponse {
    fn from(recorded: RecordedCheckpoint) -> Self {
        Self {
            checkpoint: recorded.checkpoint,
            gps: recorded.assessment,
        }
    }
}

/// Query for `POST /shipments/{id}/pod`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PodUploadQuery {
    /// Original file name, used to derive the object name.
    pub file_name: String,
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{Shipment, UserId};

    fn request(client: Option<ClientId>, vendor: Option<VendorId>) -> CreateShipmentRequest {
        CreateShipmentRequest {
            consignment_number: "CN-1".to_string(),
            source: "Pune".to_string(),
            destination: "Nashik".to_string(),
            client_id: client,
            vendor_id: vendor,
            dispatch_date: None,
            expected_delivery_date: None,
            notes: None,
            weight_kg: None,
        }
    }

    #[test]
    fn counterparty_is_exclusive() {
        let both = request(Some(ClientId::new()), Some(VendorId::new()));
        assert!(matches!(
            both.into_new_shipment(),
            Err(LogisticsError::InvalidRequest(_))
        ));

        let vendor = VendorId::new();
        let shipment = request(None, Some(vendor)).into_new_shipment();
        assert_eq!(
            shipment.map(|s| s.counterparty).ok(),
            Some(Counterparty::Vendor(vendor))
        );
    }

    #[test]
    fn calendar_dates_cover_the_whole_day() {
        let mut body = request(None, None);
        body.dispatch_date = NaiveDate::from_ymd_opt(2026, 5, 28);
        body.expected_delivery_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        let Ok(input) = body.into_new_shipment() else {
            panic!("valid body");
        };

        let Some(dispatch) = input.dispatch_date else {
            panic!("dispatch date kept");
        };
        let Some(due) = input.expected_delivery_date else {
            panic!("due date kept");
        };
        assert_eq!(dispatch.to_rfc3339(), "2026-05-28T00:00:00+00:00");
        assert_eq!(due.to_rfc3339(), "2026-06-01T23:59:59+00:00");

        let Ok(shipment) = Shipment::create(input, UserId::new(), dispatch) else {
            panic!("valid shipment");
        };
        let Some(morning) = NaiveDate::from_ymd_opt(2026, 6, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc())
        else {
            panic!("valid instant");
        };
        assert!(!shipment.is_overdue(morning));
        assert!(shipment.is_overdue(due + chrono::Duration::seconds(1)));
    }

    #[test]
    fn same_day_dispatch_and_delivery_is_accepted() {
        let mut body = request(None, None);
        body.dispatch_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        body.expected_delivery_date = NaiveDate::from_ymd_opt(2026, 6, 1);
        let Ok(input) = body.into_new_shipment() else {
            panic!("valid body");
        };
        assert!(Shipment::create(input, UserId::new(), Utc::now()).is_ok());
    }

    #[test]
    fn update_body_keeps_absent_fields_unset() {
        let body = r#"{"expected_delivery_date":"2026-07-10","current_status":"closed"}"#;
        let Ok(req) = serde_json::from_str::<UpdateShipmentRequest>(body) else {
            panic!("valid body");
        };
        let Ok(update) = req.into_update() else {
            panic!("valid update");
        };
        assert!(update.counterparty.is_none());
        assert!(update.source.is_none());
        assert_eq!(
            update.expected_delivery_date.map(|d| d.to_rfc3339()),
            Some("2026-07-10T23:59:59+00:00".to_string())
        );

        let both = UpdateShipmentRequest {
            client_id: Some(ClientId::new()),
            vendor_id: Some(VendorId::new()),
            ..UpdateShipmentRequest::default()
        };
        assert!(matches!(
            both.into_update(),
            Err(LogisticsError::InvalidRequest(_))
        ));
    }

    #[test]
    fn advance_body_uses_snake_case_status() {
        let body = r#"{"status":"in_transit","note":"left hub"}"#;
        let Ok(req) = serde_json::from_str::<AdvanceStatusRequest>(body) else {
            panic!("valid body");
        };
        let command = AdvanceCommand::from(req);
        assert_eq!(command.to, ShipmentStatus::InTransit);
        assert_eq!(command.note.as_deref(), Some("left hub"));
    }
}
