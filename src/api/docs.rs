//! OpenAPI document for the REST surface.

use utoipa::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};

use crate::api::actor::ACTOR_HEADER;
use crate::api::{dto, handlers};
use crate::{domain, error, service};

/// The generated OpenAPI description of every endpoint.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "logistics-gateway",
        description = "Shipment lifecycle, proof-of-delivery gating, timelines and field attendance."
    ),
    paths(
        // --- System ---
        handlers::system::health_handler,

        // --- Shipments ---
        handlers::shipment::create_shipment,
        handlers::shipment::list_shipments,
        handlers::shipment::active_shipments,
        handlers::shipment::overdue_shipments,
        handlers::shipment::search_shipments,
        handlers::shipment::shipment_dashboard,
        handlers::shipment::get_shipment,
        handlers::shipment::update_shipment,
        handlers::shipment::advance_status,
        handlers::shipment::close_shipment,
        handlers::shipment::list_status_updates,
        handlers::shipment::record_checkpoint,
        handlers::shipment::list_checkpoints,

        // --- Timeline ---
        handlers::timeline::get_timeline,

        // --- Proof of delivery ---
        handlers::pod::upload_pod,

        // --- Attendance ---
        handlers::attendance::check_in,
        handlers::attendance::check_out,
        handlers::attendance::list_records,
        handlers::attendance::metrics,
    ),
    components(
        schemas(
            error::ErrorResponse,
            error::ErrorBody,
            domain::ShipmentStatus,
            domain::Counterparty,
            domain::Shipment,
            domain::ShipmentDashboard,
            domain::StatusCount,
            domain::ProofOfDelivery,
            domain::PodPayload,
            domain::StatusUpdateEvent,
            domain::CheckpointEvent,
            domain::TimelineEntry,
            domain::Timeline,
            domain::PodReference,
            domain::AttendanceRecord,
            domain::FixAssessment,
            service::MetricsReport,
            dto::CreateShipmentRequest,
            dto::UpdateShipmentRequest,
            dto::AdvanceStatusRequest,
            dto::RecordCheckpointRequest,
            dto::RecordCheckpointResponse,
            dto::CheckInRequest,
            dto::CheckOutRequest,
        )
    ),
    tags(
        (name = "System", description = "Health"),
        (name = "Shipments", description = "Shipment registry, lifecycle and checkpoints"),
        (name = "Timeline", description = "Merged shipment history"),
        (name = "Proof of delivery", description = "Proof-of-delivery file uploads"),
        (name = "Attendance", description = "Field staff check-in, check-out and metrics"),
    ),
    modifiers(&ActorHeaderAddon)
)]
pub struct ApiDoc;

struct ActorHeaderAddon;

impl utoipa::Modify for ActorHeaderAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "actor_header",
            SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ACTOR_HEADER))),
        );
    }
}
