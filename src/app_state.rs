//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::GpsPolicy;
use crate::object_store::{InMemoryObjectStore, ObjectStore};
use crate::persistence::Stores;
use crate::persistence::memory::InMemoryStore;
use crate::service::{AttendanceService, PodUploader, ShipmentService, TimelineService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Shipment lifecycle, queries and checkpoints.
    pub shipment_service: Arc<ShipmentService>,
    /// Timeline reconstruction.
    pub timeline_service: Arc<TimelineService>,
    /// Attendance sessions and metrics.
    pub attendance_service: Arc<AttendanceService>,
    /// Proof-of-delivery uploads.
    pub pod_uploader: Arc<PodUploader>,
}

impl AppState {
    /// Wires every service over the given stores and object store.
    #[must_use]
    pub fn new(stores: &Stores, object_store: Arc<dyn ObjectStore>, gps_policy: GpsPolicy) -> Self {
        Self {
            shipment_service: Arc::new(ShipmentService::new(stores, gps_policy)),
            timeline_service: Arc::new(TimelineService::new(stores)),
            attendance_service: Arc::new(AttendanceService::new(stores, gps_policy)),
            pod_uploader: Arc::new(PodUploader::new(
                Arc::clone(&stores.shipments),
                object_store,
            )),
        }
    }

    /// State backed entirely by process memory.
    #[must_use]
    pub fn in_memory(gps_policy: GpsPolicy) -> Self {
        let stores = Stores::from_backend(Arc::new(InMemoryStore::new()));
        Self::new(&stores, Arc::new(InMemoryObjectStore::new()), gps_policy)
    }
}
