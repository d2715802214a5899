//! REST endpoint handlers organized by resource.

pub mod attendance;
pub mod pod;
pub mod shipment;
pub mod system;
pub mod timeline;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(shipment::routes())
        .merge(timeline::routes())
        .merge(pod::routes())
        .merge(attendance::routes())
}
