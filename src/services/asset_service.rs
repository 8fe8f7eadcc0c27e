//! AssetService: typed wrappers over the backend's `/api/assets` endpoints.
//!
//! The upload pipeline and the access resolver only need four operations;
//! those form the [`AssetBackend`] trait so both can run against an in-memory
//! backend in tests. The remaining management calls (visibility, cache,
//! delete/restore, lookups, stats) are plain methods on [`AssetService`].

use crate::{
    errors::ApiResult,
    models::{
        Asset, AssetPage, AssetStats, CacheInvalidation, PrivacyUpdate, RegisterAssetRequest,
        SignedUrlGrant, SignedUrlRequest, StatusMessage, UploadGrant, UploadGrantRequest,
        UploadSource, responses::StatsReply,
    },
    services::gateway::HttpGateway,
    session::Session,
};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use tracing::instrument;

/// Backend operations the upload and access-resolution core depends on.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    /// Phase 1: ask for a one-time storage write target.
    async fn request_upload_grant(&self, request: &UploadGrantRequest) -> ApiResult<UploadGrant>;

    /// Phase 2: write the file's bytes to the granted target.
    async fn transfer(&self, grant: &UploadGrant, source: &UploadSource) -> ApiResult<()>;

    /// Phase 3: record the stored object as an asset.
    async fn register_asset(&self, request: &RegisterAssetRequest) -> ApiResult<Asset>;

    /// Negotiate a fresh signed URL for a private asset.
    async fn signed_url(
        &self,
        asset_id: &str,
        request: SignedUrlRequest,
    ) -> ApiResult<SignedUrlGrant>;
}

/// Target visibility for [`AssetService::set_visibility`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    Private,
    Public,
}

impl Visibility {
    fn action(self) -> &'static str {
        match self {
            Visibility::Private => "make-private",
            Visibility::Public => "make-public",
        }
    }
}

#[derive(Clone, Debug)]
pub struct AssetService {
    gateway: HttpGateway,
}

impl AssetService {
    pub fn new(gateway: HttpGateway) -> Self {
        Self { gateway }
    }

    pub fn session(&self) -> &Arc<Session> {
        self.gateway.session()
    }

    #[instrument(skip(self))]
    pub async fn get_asset(&self, asset_id: &str) -> ApiResult<Asset> {
        self.gateway.get(&["api", "assets", asset_id], &[]).await
    }

    /// Request, bandwidth and cache statistics for one asset.
    #[instrument(skip(self))]
    pub async fn asset_stats(&self, asset_id: &str) -> ApiResult<AssetStats> {
        self.gateway
            .get::<StatsReply>(&["api", "assets", asset_id, "stats"], &[])
            .await
            .map(StatsReply::into_stats)
    }

    /// One page of the caller's assets, newest first as the backend orders them.
    #[instrument(skip(self))]
    pub async fn list_assets(&self, page: u32, limit: u32) -> ApiResult<AssetPage> {
        self.gateway
            .get(
                &["api", "assets"],
                &[("page", page.max(1).to_string()), ("limit", limit.to_string())],
            )
            .await
    }

    /// Move an asset between the public and private areas.
    ///
    /// The object is relocated, so the returned key and URL replace the old
    /// ones; any URL resolved before this call is stale.
    #[instrument(skip(self))]
    pub async fn set_visibility(
        &self,
        asset_id: &str,
        visibility: Visibility,
        folder: Option<&str>,
    ) -> ApiResult<PrivacyUpdate> {
        let query: Vec<(&str, String)> = folder
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(|f| vec![("folder", f.to_string())])
            .unwrap_or_default();
        self.gateway
            .send::<(), _>(
                Method::PUT,
                &["api", "assets", asset_id, visibility.action()],
                &query,
                None,
            )
            .await
    }

    #[instrument(skip(self))]
    pub async fn invalidate_cache(&self, asset_id: &str) -> ApiResult<CacheInvalidation> {
        self.gateway
            .send::<(), _>(
                Method::POST,
                &["api", "assets", asset_id, "invalidate-cache"],
                &[],
                None,
            )
            .await
    }

    /// Soft-delete. The asset stays restorable.
    #[instrument(skip(self))]
    pub async fn delete_asset(&self, asset_id: &str) -> ApiResult<StatusMessage> {
        self.gateway
            .send::<(), _>(Method::DELETE, &["api", "assets", asset_id], &[], None)
            .await
    }

    #[instrument(skip(self))]
    pub async fn restore_asset(&self, asset_id: &str) -> ApiResult<StatusMessage> {
        self.gateway
            .send::<(), _>(
                Method::PUT,
                &["api", "assets", asset_id, "restore"],
                &[],
                None,
            )
            .await
    }
}

#[async_trait]
impl AssetBackend for AssetService {
    #[instrument(skip(self, request), fields(file = %request.file_name))]
    async fn request_upload_grant(&self, request: &UploadGrantRequest) -> ApiResult<UploadGrant> {
        self.gateway
            .send(
                Method::POST,
                &["api", "assets", "upload-url"],
                &[],
                Some(request),
            )
            .await
    }

    #[instrument(skip(self, grant, source), fields(file = %source.file_name))]
    async fn transfer(&self, grant: &UploadGrant, source: &UploadSource) -> ApiResult<()> {
        self.gateway
            .put_object(
                &grant.upload_url,
                &source.mime_type,
                source.size_bytes,
                &source.body,
            )
            .await
    }

    #[instrument(skip(self, request), fields(file = %request.file_name))]
    async fn register_asset(&self, request: &RegisterAssetRequest) -> ApiResult<Asset> {
        self.gateway
            .send(Method::POST, &["api", "assets"], &[], Some(request))
            .await
    }

    #[instrument(skip(self))]
    async fn signed_url(
        &self,
        asset_id: &str,
        request: SignedUrlRequest,
    ) -> ApiResult<SignedUrlGrant> {
        self.gateway
            .get(
                &["api", "assets", asset_id, "signed-url"],
                &request.query_pairs(),
            )
            .await
    }
}
