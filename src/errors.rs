//! Error taxonomy for talking to the media backend.
//!
//! `ApiError` covers a single request. Upload and resolution failures wrap it
//! with the context a caller needs to explain what went wrong: which file,
//! which phase, which asset.

use crate::models::{Asset, StorageLocation, UploadPhase, UploadTask, upload::InvalidTransition};
use std::{fmt, io, path::PathBuf};
use thiserror::Error;

/// Failure of a single backend or storage request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer token is held, so the request was never sent.
    #[error("not authenticated")]
    MissingToken,

    /// The backend answered 401; the session has been cleared.
    #[error("{endpoint}: session is no longer valid")]
    Unauthorized { endpoint: String },

    /// Any other non-2xx answer.
    #[error("{endpoint} failed with status {status}: {message}")]
    Request {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("{endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: unexpected response body: {reason}")]
    Decode { endpoint: String, reason: String },

    #[error("invalid url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("could not read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ApiError {
    /// True for the authentication class of failures (missing or rejected token).
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::MissingToken | ApiError::Unauthorized { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized { .. } => Some(401),
            ApiError::Request { status, .. } => Some(*status),
            ApiError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Failure of one file in the upload pipeline.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("upload grant for `{file_name}` was rejected: {source}")]
    Grant {
        file_name: String,
        #[source]
        source: ApiError,
    },

    #[error("transfer of `{file_name}` to storage failed: {source}")]
    Transfer {
        file_name: String,
        #[source]
        source: ApiError,
    },

    /// The bytes reached storage but no asset record exists for them.
    #[error("registration of `{file_name}` failed (object left at {orphan}): {source}")]
    Registration {
        file_name: String,
        orphan: StorageLocation,
        #[source]
        source: ApiError,
    },

    #[error("upload of `{file_name}` was cancelled during {phase}")]
    Cancelled {
        file_name: String,
        phase: UploadPhase,
    },

    #[error(transparent)]
    State(#[from] InvalidTransition),
}

impl UploadError {
    pub fn file_name(&self) -> Option<&str> {
        match self {
            UploadError::Grant { file_name, .. }
            | UploadError::Transfer { file_name, .. }
            | UploadError::Registration { file_name, .. }
            | UploadError::Cancelled { file_name, .. } => Some(file_name),
            UploadError::State(_) => None,
        }
    }

    /// Pipeline phase the failure belongs to.
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadError::Grant { .. } => UploadPhase::GrantRequested,
            UploadError::Transfer { .. } => UploadPhase::Transferring,
            UploadError::Registration { .. } => UploadPhase::Registering,
            UploadError::Cancelled { phase, .. } => *phase,
            UploadError::State(err) => err.from,
        }
    }

    /// Underlying request failure, if the error came from the network.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            UploadError::Grant { source, .. }
            | UploadError::Transfer { source, .. }
            | UploadError::Registration { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// A batch that stopped at its first failing file.
///
/// Files before `position` are registered and stay registered; files after it
/// were never started.
#[derive(Debug, Error)]
#[error("upload stopped at file {position} of {total}: {error}")]
pub struct BatchError {
    /// 1-based index of the failing file, which is also the number attempted.
    pub position: usize,
    pub total: usize,
    pub completed: Vec<Asset>,
    /// Tasks for every attempted file; the last one is the failed task.
    pub tasks: Vec<UploadTask>,
    #[source]
    pub error: UploadError,
}

impl BatchError {
    /// The task of the file that stopped the batch.
    pub fn failed_task(&self) -> Option<&UploadTask> {
        self.tasks.last().filter(|t| t.phase() == UploadPhase::Failed)
    }
}

/// Why a private asset fell back to its distribution URL.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub struct ResolutionError {
    pub asset_id: String,
    pub message: String,
}

impl ResolutionError {
    pub fn new(asset_id: impl Into<String>, source: &ApiError) -> Self {
        Self {
            asset_id: asset_id.into(),
            message: source.to_string(),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "could not sign url for asset {}: {}",
            self.asset_id, self.message
        )
    }
}
