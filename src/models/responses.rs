//! Response payloads for the asset management endpoints.

use super::asset::Asset;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The backend usually wraps payloads as `{ "success": .., "data": .. }`,
/// but some management endpoints answer with a bare object.
///
/// The bare shape is tried first so top-level fields are never dropped in
/// favour of `data`. Payload types with no required fields would match any
/// object as bare, so they read the nested shape themselves (see
/// [`StatusMessage`]).
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum Envelope<T> {
    Bare(T),
    Wrapped { data: T },
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Bare(inner) => inner,
            Envelope::Wrapped { data } => data,
        }
    }
}

/// Error body shape; `message` wins over `error` when both are set.
#[derive(Deserialize, Debug, Default)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> String {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error.filter(|e| !e.is_empty()))
            .unwrap_or_else(|| "Request failed".to_string())
    }
}

/// Plain acknowledgement returned by delete and restore.
///
/// Top-level `success`/`message` win; fields inside `data` fill the gaps.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(from = "StatusBody")]
pub struct StatusMessage {
    pub success: Option<bool>,
    pub message: Option<String>,
}

#[derive(Deserialize)]
struct StatusBody {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl From<StatusBody> for StatusMessage {
    fn from(body: StatusBody) -> Self {
        let nested = body.data.unwrap_or(Value::Null);
        Self {
            success: body.success.or_else(|| nested["success"].as_bool()),
            message: body
                .message
                .or_else(|| nested["message"].as_str().map(str::to_string)),
        }
    }
}

/// Delivery statistics for one asset.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AssetStats {
    pub asset_id: String,
    #[serde(default)]
    pub asset_name: Option<String>,
    #[serde(default)]
    pub total_requests: u64,
    #[serde(default)]
    pub total_bytes: u64,
    #[serde(default, rename = "totalGB")]
    pub total_gb: f64,
    #[serde(default)]
    pub cache_hits: u64,
    #[serde(default)]
    pub cache_misses: u64,
    /// Preformatted by the backend, e.g. `"87.5%"`.
    #[serde(default)]
    pub cache_hit_ratio: Option<String>,
    #[serde(default, rename = "estimatedCostUSD")]
    pub estimated_cost_usd: f64,
}

/// The stats endpoint answers either `{ stats: {..} }` or the stats object itself.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum StatsReply {
    Nested { stats: AssetStats },
    Flat(AssetStats),
}

impl StatsReply {
    pub fn into_stats(self) -> AssetStats {
        match self {
            StatsReply::Nested { stats } => stats,
            StatsReply::Flat(stats) => stats,
        }
    }
}

/// One page of assets.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct AssetPage {
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// New location of an asset after a visibility change.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RelocatedAsset {
    pub id: String,
    pub name: String,
    pub is_private: bool,
    pub new_s3_key: String,
    pub cloudfront_url: String,
    #[serde(default)]
    pub folder: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PrivacyUpdate {
    #[serde(default)]
    pub message: Option<String>,
    pub asset: RelocatedAsset,
}

impl PrivacyUpdate {
    /// Apply the relocation to a local snapshot of the asset.
    pub fn apply_to(&self, asset: &mut Asset) {
        asset.is_private = self.asset.is_private;
        asset.s3_key = self.asset.new_s3_key.clone();
        asset.cloudfront_url = self.asset.cloudfront_url.clone();
        if self.asset.folder.is_some() {
            asset.folder = self.asset.folder.clone();
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct InvalidationStatus {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct CacheInvalidation {
    #[serde(default)]
    pub message: Option<String>,
    pub invalidation: InvalidationStatus,
}
