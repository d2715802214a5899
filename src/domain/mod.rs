//! Domain layer: shipment lifecycle, event logs, timeline merge and
//! attendance sessions.
//!
//! Everything here is pure. Persistence and the object store sit behind the
//! traits in [`crate::persistence`] and [`crate::object_store`], so the
//! decision logic can be tested without any I/O.

pub mod attendance;
pub mod events;
pub mod geo;
pub mod ids;
pub mod pod;
pub mod shipment;
pub mod shipment_status;
pub mod timeline;

pub use attendance::{
    AttendanceMetrics, AttendanceRecord, AttendanceStatus, SessionStamp, WorkReport,
    compute_metrics,
};
pub use events::{CheckpointEvent, NewCheckpoint, StatusUpdateEvent};
pub use geo::{FixAssessment, GeoFix, GeoPoint, GpsPolicy, RiskLevel};
pub use ids::{AttendanceId, ClientId, ShipmentId, UserId, VendorId};
pub use pod::{MAX_POD_BYTES, PodContentType, PodReference, UploadSlot, admit_file};
pub use shipment::{
    Counterparty, NewShipment, PodPayload, ProofOfDelivery, Shipment, ShipmentDashboard,
    ShipmentFilter, ShipmentUpdate, StatusCount,
};
pub use shipment_status::{
    ShipmentStatus, is_valid_transition, next_status, replay, validate_transition,
};
pub use timeline::{Timeline, TimelineEntry, TimelineSummary, merge_timeline};
