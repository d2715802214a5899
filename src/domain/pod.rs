//! Proof-of-delivery file admission and upload slot types.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use utoipa::ToSchema;

use super::ShipmentId;
use crate::error::LogisticsError;

/// Size ceiling for a proof-of-delivery file (10 MiB).
pub const MAX_POD_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted proof-of-delivery formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum PodContentType {
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/webp`
    Webp,
    /// `application/pdf`
    Pdf,
}

impl PodContentType {
    /// MIME type string.
    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for PodContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for PodContentType {
    type Err = LogisticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Ignore parameters such as "; charset=binary".
        let essence = s.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Ok(Self::Jpeg),
            "image/png" => Ok(Self::Png),
            "image/webp" => Ok(Self::Webp),
            "application/pdf" => Ok(Self::Pdf),
            _ => Err(LogisticsError::UnsupportedFile(format!(
                "{s} (accepted: JPEG, PNG, WebP, PDF)"
            ))),
        }
    }
}

/// Checks a file's declared type and size before any collaborator is
/// contacted.
///
/// # Errors
///
/// Returns [`LogisticsError::UnsupportedFile`] for a type outside
/// JPEG/PNG/WebP/PDF, or [`LogisticsError::FileTooLarge`] above
/// [`MAX_POD_BYTES`].
pub fn admit_file(content_type: &str, size: u64) -> Result<PodContentType, LogisticsError> {
    let kind = content_type.parse::<PodContentType>()?;
    if size > MAX_POD_BYTES {
        return Err(LogisticsError::FileTooLarge {
            size,
            max: MAX_POD_BYTES,
        });
    }
    if size == 0 {
        return Err(LogisticsError::InvalidRequest("file is empty".to_string()));
    }
    Ok(kind)
}

/// A short-lived write capability issued by the object store.
///
/// The write URL is never persisted and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct UploadSlot {
    /// Pre-signed URL accepting a single `PUT`.
    pub write_url: String,
    /// Permanent path of the object once written.
    pub object_path: String,
}

impl fmt::Debug for UploadSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSlot")
            .field("write_url", &"<redacted>")
            .field("object_path", &self.object_path)
            .finish()
    }
}

/// Result of a successful proof-of-delivery upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct PodReference {
    /// Shipment the file belongs to.
    pub shipment_id: ShipmentId,
    /// Permanent object path to pass to close.
    pub object_path: String,
    /// Stored content type.
    pub content_type: PodContentType,
    /// Stored size in bytes.
    pub size: u64,
}
