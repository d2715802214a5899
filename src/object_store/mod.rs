//! Object-store collaborator for proof-of-delivery files.
//!
//! Uploads follow a two-phase signed-URL protocol: ask the store for a
//! short-lived write URL plus a permanent object path, then `PUT` the bytes
//! to the write URL. Only the object path is ever persisted.

use async_trait::async_trait;
use axum::body::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::domain::{PodContentType, ShipmentId, UploadSlot};
use crate::error::LogisticsError;

pub mod http;
pub mod memory;

pub use http::HttpObjectStore;
pub use memory::InMemoryObjectStore;

/// The two capabilities used from the object store.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug {
    /// Requests a write URL and permanent path for a new object owned by
    /// `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::UploadSlot`] if the owner is unknown to the
    /// store or the store cannot be reached.
    async fn request_upload_slot(
        &self,
        owner: ShipmentId,
        file_name: &str,
        content_type: PodContentType,
    ) -> Result<UploadSlot, LogisticsError>;

    /// Transfers `bytes` to the slot's write URL.
    ///
    /// # Errors
    ///
    /// Returns [`LogisticsError::UploadTransfer`] on a transport failure or
    /// a non-success response.
    async fn upload(
        &self,
        slot: &UploadSlot,
        bytes: Bytes,
        content_type: PodContentType,
    ) -> Result<(), LogisticsError>;
}

/// Reduces a client-supplied file name to a safe object-key segment.
pub(crate) fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
