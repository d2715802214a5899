//! # logistics-gateway
//!
//! REST service for a logistics operation: shipment lifecycle with
//! proof-of-delivery gating, status and checkpoint event logs merged into
//! timelines, proof-of-delivery uploads through an external object store,
//! and field-staff attendance with GPS evidence.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── ShipmentService / TimelineService / PodUploader /
//!     │   AttendanceService (service/)
//!     │
//!     ├── Lifecycle, timeline merge, GPS policy (domain/)
//!     │
//!     ├── Stores: PostgreSQL or in-memory (persistence/)
//!     └── Object store: HTTP signed-URL or in-memory (object_store/)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod object_store;
pub mod persistence;
pub mod service;
