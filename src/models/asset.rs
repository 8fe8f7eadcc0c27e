//! Represents an asset (file) registered with the media backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse classification of an asset, derived by the backend from its mime type.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    Video,
    File,
}

impl AssetKind {
    /// Classify a mime type the same way the backend does.
    pub fn from_mime(mime: &str) -> Self {
        let top = mime.split('/').next().unwrap_or_default();
        match top.to_ascii_lowercase().as_str() {
            "image" => AssetKind::Image,
            "video" => AssetKind::Video,
            _ => AssetKind::File,
        }
    }
}

/// Optional descriptive metadata attached at registration time.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct AssetMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// A single stored object as the backend describes it.
///
/// The storage key and distribution URL are only valid for the asset's
/// current visibility. Making an asset private or public moves the object,
/// so both change; never hold on to a URL derived from an older snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    /// Opaque backend identifier.
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning user.
    pub owner_id: String,

    /// Original file name.
    pub name: String,

    #[serde(rename = "type")]
    pub kind: AssetKind,

    /// Declared content type, when the backend reports one.
    #[serde(default)]
    pub mime_type: Option<String>,

    pub size_bytes: u64,

    /// Bucket holding the object.
    pub s3_bucket: String,

    /// Object key within the bucket (includes the folder prefix).
    pub s3_key: String,

    /// CDN-facing URL for the object at its current location.
    pub cloudfront_url: String,

    #[serde(default)]
    pub is_private: bool,

    /// Soft-delete marker. Deleted assets are hidden, never purged.
    #[serde(default)]
    pub is_deleted: bool,

    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,

    /// Logical folder, if the asset was uploaded into one.
    #[serde(default)]
    pub folder: Option<String>,

    /// Folder the asset lived in before being made private.
    #[serde(default)]
    pub original_folder: Option<String>,

    #[serde(default)]
    pub metadata: Option<AssetMetadata>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Folder the asset is organised under, falling back to the key prefix.
    pub fn folder(&self) -> Option<&str> {
        self.folder
            .as_deref()
            .or_else(|| self.s3_key.rsplit_once('/').map(|(prefix, _)| prefix))
    }
}
