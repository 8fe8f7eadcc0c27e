//! Client for a media asset backend: three-phase uploads into object storage,
//! access URL resolution for public and private assets, and the management
//! calls around them.

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;

pub use errors::{ApiError, ApiResult, BatchError, ResolutionError, UploadError};
pub use services::{
    access_resolver::{AccessResolver, Resolution, ResolvedUrl, UrlSource},
    asset_service::{AssetBackend, AssetService, Visibility},
    gateway::HttpGateway,
    upload_orchestrator::{BatchProgress, BatchReport, UploadEvent, UploadOrchestrator},
};
pub use session::Session;
