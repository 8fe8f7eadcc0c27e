//! Upload grants, registration payloads, and the per-file upload state machine.

use super::asset::AssetMetadata;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::{
    fmt, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

/// Body of `POST /api/assets/upload-url`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrantRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Object name to store under instead of `file_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_file_name: Option<String>,
}

/// One-time permission to write a single object straight to storage.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UploadGrant {
    pub upload_url: String,
    pub s3_key: String,
    pub s3_bucket: String,
}

impl UploadGrant {
    pub fn location(&self) -> StorageLocation {
        StorageLocation {
            bucket: self.s3_bucket.clone(),
            key: self.s3_key.clone(),
        }
    }
}

/// Where an object lives in storage, independent of any asset record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageLocation {
    pub bucket: String,
    pub key: String,
}

impl fmt::Display for StorageLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// Body of `POST /api/assets`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAssetRequest {
    pub file_name: String,
    pub file_type: String,
    pub file_size: u64,
    pub s3_key: String,
    pub s3_bucket: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AssetMetadata>,
}

/// Raw bytes to transfer, either already in memory or read lazily from disk.
#[derive(Clone, Debug)]
pub enum UploadBody {
    Bytes(Bytes),
    File(PathBuf),
}

/// A local file queued for upload.
#[derive(Clone, Debug)]
pub struct UploadSource {
    pub file_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub body: UploadBody,
    pub metadata: Option<AssetMetadata>,
    /// Name to store the object under; the asset keeps `file_name`.
    pub custom_file_name: Option<String>,
}

impl UploadSource {
    pub fn from_bytes(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            size_bytes: bytes.len() as u64,
            body: UploadBody::Bytes(bytes),
            metadata: None,
            custom_file_name: None,
        }
    }

    /// Describe a file on disk without reading it.
    ///
    /// The mime type is guessed from the extension and defaults to
    /// `application/octet-stream`.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let meta = fs::metadata(path).await?;
        if !meta.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a regular file", path.display()),
            ));
        }
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} has no usable file name", path.display()),
                )
            })?;
        let mime_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(Self {
            file_name,
            mime_type,
            size_bytes: meta.len(),
            body: UploadBody::File(path.to_path_buf()),
            metadata: None,
            custom_file_name: None,
        })
    }

    pub fn with_metadata(mut self, metadata: AssetMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Store the object as `name`. Blank names are ignored.
    pub fn with_custom_file_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.custom_file_name = Some(name.trim().to_string()).filter(|n| !n.is_empty());
        self
    }

    pub fn grant_request(&self, folder: Option<&str>) -> UploadGrantRequest {
        UploadGrantRequest {
            file_name: self.file_name.clone(),
            file_type: self.mime_type.clone(),
            file_size: self.size_bytes,
            folder: folder.map(str::to_string),
            custom_file_name: self.custom_file_name.clone(),
        }
    }

    pub fn register_request(&self, grant: &UploadGrant) -> RegisterAssetRequest {
        RegisterAssetRequest {
            file_name: self.file_name.clone(),
            file_type: self.mime_type.clone(),
            file_size: self.size_bytes,
            s3_key: grant.s3_key.clone(),
            s3_bucket: grant.s3_bucket.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Where one file is in the grant → transfer → register pipeline.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadPhase {
    Pending,
    GrantRequested,
    Transferring,
    Registering,
    Complete,
    Failed,
}

impl UploadPhase {
    /// The only forward step allowed from this phase.
    pub fn next(self) -> Option<Self> {
        match self {
            UploadPhase::Pending => Some(UploadPhase::GrantRequested),
            UploadPhase::GrantRequested => Some(UploadPhase::Transferring),
            UploadPhase::Transferring => Some(UploadPhase::Registering),
            UploadPhase::Registering => Some(UploadPhase::Complete),
            UploadPhase::Complete | UploadPhase::Failed => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UploadPhase::Complete | UploadPhase::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            UploadPhase::Pending => "pending",
            UploadPhase::GrantRequested => "grant",
            UploadPhase::Transferring => "transfer",
            UploadPhase::Registering => "register",
            UploadPhase::Complete => "complete",
            UploadPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("upload task {task} cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub task: Uuid,
    pub from: UploadPhase,
    pub to: UploadPhase,
}

/// One file's journey through the upload pipeline.
///
/// Phases only move forward one step at a time, or to `Failed` from any
/// non-terminal phase. Nothing leaves a terminal phase.
#[derive(Clone, Debug)]
pub struct UploadTask {
    pub id: Uuid,
    pub file_name: String,
    pub folder: Option<String>,
    phase: UploadPhase,
    /// Phase that was running when the task failed.
    failed_during: Option<UploadPhase>,
    asset_id: Option<String>,
    error: Option<String>,
}

impl UploadTask {
    pub fn new(file_name: impl Into<String>, folder: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            file_name: file_name.into(),
            folder,
            phase: UploadPhase::Pending,
            failed_during: None,
            asset_id: None,
            error: None,
        }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn failed_during(&self) -> Option<UploadPhase> {
        self.failed_during
    }

    pub fn asset_id(&self) -> Option<&str> {
        self.asset_id.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Step to the next phase. `Complete` must go through [`UploadTask::complete`].
    pub fn advance(&mut self, to: UploadPhase) -> Result<(), InvalidTransition> {
        if to == UploadPhase::Complete || self.phase.next() != Some(to) {
            return Err(self.invalid(to));
        }
        self.phase = to;
        Ok(())
    }

    pub fn complete(&mut self, asset_id: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.phase != UploadPhase::Registering {
            return Err(self.invalid(UploadPhase::Complete));
        }
        self.phase = UploadPhase::Complete;
        self.asset_id = Some(asset_id.into());
        Ok(())
    }

    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), InvalidTransition> {
        if self.phase.is_terminal() {
            return Err(self.invalid(UploadPhase::Failed));
        }
        self.failed_during = Some(self.phase);
        self.phase = UploadPhase::Failed;
        self.error = Some(error.into());
        Ok(())
    }

    fn invalid(&self, to: UploadPhase) -> InvalidTransition {
        InvalidTransition {
            task: self.id,
            from: self.phase,
            to,
        }
    }
}
