//! In-memory `AssetBackend` for exercising the resolver and the upload pipeline.

use crate::{
    errors::{ApiError, ApiResult},
    models::{
        Asset, AssetKind, RegisterAssetRequest, SignedUrlGrant, SignedUrlRequest, UploadGrant,
        UploadGrantRequest, UploadSource,
    },
    services::asset_service::AssetBackend,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::Notify;

/// Holds a signed URL request open until the test releases it.
#[derive(Clone, Default)]
pub(crate) struct Gate {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, u16>>,
    registered: Mutex<Vec<Asset>>,
    gates: Mutex<HashMap<String, Gate>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` ("grant", "transfer", "register", "sign") fail for `target`
    /// (a file name, or an asset id for "sign") with the given status.
    pub fn fail_with(self, op: &str, target: &str, status: u16) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(format!("{}:{}", op, target), status);
        self
    }

    pub fn gate(&self, asset_id: &str) -> Gate {
        self.gates
            .lock()
            .unwrap()
            .entry(asset_id.to_string())
            .or_default()
            .clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn registered(&self) -> Vec<Asset> {
        self.registered.lock().unwrap().clone()
    }

    fn record(&self, op: &str, target: &str) -> ApiResult<()> {
        let key = format!("{}:{}", op, target);
        self.calls.lock().unwrap().push(key.clone());
        match self.failures.lock().unwrap().get(&key) {
            Some(401) => Err(ApiError::Unauthorized { endpoint: key }),
            Some(status) => Err(ApiError::Request {
                endpoint: key,
                status: *status,
                message: "rejected by fake backend".into(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AssetBackend for FakeBackend {
    async fn request_upload_grant(&self, request: &UploadGrantRequest) -> ApiResult<UploadGrant> {
        self.record("grant", &request.file_name)?;
        let object_name = request
            .custom_file_name
            .as_deref()
            .unwrap_or(&request.file_name);
        let s3_key = match &request.folder {
            Some(folder) => format!("{}/{}", folder, object_name),
            None => object_name.to_string(),
        };
        Ok(UploadGrant {
            upload_url: format!("https://storage.test/{}?X-Amz-Signature=fake", s3_key),
            s3_key,
            s3_bucket: "media-test".into(),
        })
    }

    async fn transfer(&self, _grant: &UploadGrant, source: &UploadSource) -> ApiResult<()> {
        self.record("transfer", &source.file_name)
    }

    async fn register_asset(&self, request: &RegisterAssetRequest) -> ApiResult<Asset> {
        self.record("register", &request.file_name)?;
        let mut registered = self.registered.lock().unwrap();
        let mut asset = asset(&format!("asset-{}", registered.len() + 1), false);
        asset.name = request.file_name.clone();
        asset.kind = AssetKind::from_mime(&request.file_type);
        asset.mime_type = Some(request.file_type.clone());
        asset.size_bytes = request.file_size;
        asset.s3_bucket = request.s3_bucket.clone();
        asset.s3_key = request.s3_key.clone();
        asset.cloudfront_url = format!("https://cdn.test/{}", request.s3_key);
        asset.folder = None;
        registered.push(asset.clone());
        Ok(asset)
    }

    async fn signed_url(
        &self,
        asset_id: &str,
        request: SignedUrlRequest,
    ) -> ApiResult<SignedUrlGrant> {
        self.record("sign", asset_id)?;
        let gate = self.gates.lock().unwrap().get(asset_id).cloned();
        if let Some(gate) = gate {
            gate.started.notify_one();
            gate.release.notified().await;
        }
        let nonce = self.calls.lock().unwrap().len();
        Ok(SignedUrlGrant {
            signed_url: format!("https://cdn.test/private/{}?sig={}", asset_id, nonce),
            expires_at: Utc::now() + Duration::seconds(request.expires_in as i64),
            expires_in_seconds: request.expires_in,
            transformations: None,
        })
    }
}

/// A minimal asset snapshot as the backend would return it.
pub(crate) fn asset(id: &str, is_private: bool) -> Asset {
    let area = if is_private { "private/" } else { "" };
    Asset {
        id: id.to_string(),
        owner_id: "owner-1".into(),
        name: format!("{}.png", id),
        kind: AssetKind::Image,
        mime_type: Some("image/png".into()),
        size_bytes: 1024,
        s3_bucket: "media-test".into(),
        s3_key: format!("{}{}.png", area, id),
        cloudfront_url: format!("https://cdn.test/{}{}.png", area, id),
        is_private,
        is_deleted: false,
        deleted_at: None,
        folder: None,
        original_folder: None,
        metadata: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
