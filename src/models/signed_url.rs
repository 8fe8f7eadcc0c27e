//! Signed URL grants and the image transformations they can carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, str::FromStr};

/// Output formats the image pipeline can transcode to.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Avif,
}

impl ImageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Webp => "webp",
            ImageFormat::Avif => "avif",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "png" => Ok(ImageFormat::Png),
            "webp" => Ok(ImageFormat::Webp),
            "avif" => Ok(ImageFormat::Avif),
            other => Err(format!("unsupported image format `{}`", other)),
        }
    }
}

/// Transformations applied by the CDN when serving a signed URL.
///
/// Validation is the backend's job; locally these are only turned into
/// query parameters.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransformParams {
    pub format: Option<ImageFormat>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub quality: Option<u8>,
}

impl TransformParams {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Query pairs in the order the backend documents them. Unset values are omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(format) = self.format {
            pairs.push(("format", format.to_string()));
        }
        if let Some(width) = self.width {
            pairs.push(("width", width.to_string()));
        }
        if let Some(height) = self.height {
            pairs.push(("height", height.to_string()));
        }
        if let Some(quality) = self.quality {
            pairs.push(("quality", quality.to_string()));
        }
        pairs
    }
}

/// Parameters for one signed URL request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignedUrlRequest {
    pub expires_in: u64,
    pub transform: TransformParams,
}

impl SignedUrlRequest {
    pub fn new(expires_in: u64) -> Self {
        Self {
            expires_in,
            transform: TransformParams::default(),
        }
    }

    pub fn with_transform(mut self, transform: TransformParams) -> Self {
        self.transform = transform;
        self
    }

    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("expiresIn", self.expires_in.to_string())];
        pairs.extend(self.transform.query_pairs());
        pairs
    }
}

/// A short-lived credential for reading a private asset.
///
/// Lives in memory for one viewing session. Never persisted, never reused
/// once `expires_at` has passed.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlGrant {
    pub signed_url: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in_seconds: u64,
    /// Transformations the backend actually applied, echoed back.
    #[serde(default)]
    pub transformations: Option<BTreeMap<String, String>>,
}

impl SignedUrlGrant {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
