//! Service layer: business logic orchestration.
//!
//! [`ShipmentService`] is the lifecycle controller, [`TimelineService`]
//! merges the event logs, [`PodUploader`] drives proof-of-delivery uploads
//! and [`AttendanceService`] manages attendance sessions. Each depends only
//! on the storage and object-store traits.

pub mod attendance_service;
pub mod pod_uploader;
pub mod shipment_service;
pub mod timeline_service;

pub use attendance_service::{AttendanceService, MetricsReport, SessionEvidence};
pub use pod_uploader::PodUploader;
pub use shipment_service::{
    AdvanceCommand, CheckpointCommand, RecordedCheckpoint, ShipmentService,
};
pub use timeline_service::TimelineService;
