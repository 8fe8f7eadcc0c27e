//! Data models exchanged with the media backend.
//!
//! Field names follow the backend's camelCase JSON; everything here is a
//! plain `serde` value type with no behaviour beyond small helpers.

pub mod asset;
pub mod responses;
pub mod signed_url;
pub mod upload;

pub use asset::{Asset, AssetKind, AssetMetadata};
pub use responses::{AssetPage, AssetStats, CacheInvalidation, PrivacyUpdate, StatusMessage};
pub use signed_url::{ImageFormat, SignedUrlGrant, SignedUrlRequest, TransformParams};
pub use upload::{
    RegisterAssetRequest, StorageLocation, UploadBody, UploadGrant, UploadGrantRequest,
    UploadPhase, UploadSource, UploadTask,
};
