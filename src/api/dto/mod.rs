//! Data Transfer Objects for REST request/response serialization.
//!
//! Responses reuse the domain types directly where their JSON shape is
//! already the wire shape; the types here cover request bodies, query
//! strings and the few composite responses.

pub mod attendance_dto;
pub mod shipment_dto;

pub use attendance_dto::*;
pub use shipment_dto::*;
