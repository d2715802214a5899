//! In-process object store used when no `OBJECT_STORE_URL` is configured.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{ObjectStore, sanitize_file_name};
use crate::domain::{PodContentType, ShipmentId, UploadSlot};
use crate::error::LogisticsError;

/// A stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Content type given at upload.
    pub content_type: PodContentType,
    /// Object bytes.
    pub bytes: Bytes,
}

/// How long an issued write URL stays usable.
pub const DEFAULT_SLOT_TTL: Duration = Duration::from_secs(15 * 60);

#[derive(Debug)]
struct PendingSlot {
    object_path: String,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct Inner {
    // keyed by write URL, removed once used or expired
    pending: HashMap<String, PendingSlot>,
    objects: HashMap<String, StoredObject>,
}

/// Object store keeping slots and objects in memory.
///
/// Slots that are never used expire after the slot TTL and are swept the
/// next time a slot is requested.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    inner: Mutex<Inner>,
    slot_ttl: Duration,
}

impl InMemoryObjectStore {
    /// Creates an empty store with [`DEFAULT_SLOT_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_slot_ttl(DEFAULT_SLOT_TTL)
    }

    /// Creates an empty store whose write URLs expire after `slot_ttl`.
    #[must_use]
    pub fn with_slot_ttl(slot_ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            slot_ttl,
        }
    }

    /// Returns the object stored at `object_path`.
    pub async fn get(&self, object_path: &str) -> Option<StoredObject> {
        self.inner.lock().await.objects.get(object_path).cloned()
    }

    /// Number of issued write URLs not yet used or swept.
    pub async fn pending_slots(&self) -> usize {
        self.inner.lock().await.pending.len()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn request_upload_slot(
        &self,
        owner: ShipmentId,
        file_name: &str,
        _content_type: PodContentType,
    ) -> Result<UploadSlot, LogisticsError> {
        let token = Uuid::new_v4();
        let slot = UploadSlot {
            write_url: format!("memory://upload/{token}"),
            object_path: format!(
                "/objects/shipments/{owner}/{token}-{}",
                sanitize_file_name(file_name)
            ),
        };
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let before = inner.pending.len();
        inner.pending.retain(|_, pending| pending.expires_at > now);
        let swept = before - inner.pending.len();
        if swept > 0 {
            tracing::debug!(swept, "expired upload slots swept");
        }
        inner.pending.insert(
            slot.write_url.clone(),
            PendingSlot {
                object_path: slot.object_path.clone(),
                expires_at: now + self.slot_ttl,
            },
        );
        Ok(slot)
    }

    async fn upload(
        &self,
        slot: &UploadSlot,
        bytes: Bytes,
        content_type: PodContentType,
    ) -> Result<(), LogisticsError> {
        let mut inner = self.inner.lock().await;
        let pending = inner
            .pending
            .remove(&slot.write_url)
            .filter(|pending| pending.expires_at > Instant::now())
            .ok_or_else(|| {
                LogisticsError::UploadTransfer("write URL expired or unknown".to_string())
            })?;
        inner.objects.insert(
            pending.object_path,
            StoredObject {
                content_type,
                bytes,
            },
        );
        Ok(())
    }
}
