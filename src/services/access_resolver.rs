//! AccessResolver: turns an asset into a URL that can actually be fetched.
//!
//! Public assets resolve to their distribution URL without touching the
//! network. Private assets get a freshly signed URL on every new input; if
//! signing fails the distribution URL is used as a best-effort fallback and
//! the failure is recorded next to it.
//!
//! Inputs are tracked by identity. Each new input bumps a generation counter
//! and a response is only published if its generation is still current, so a
//! slow request for an old asset can never overwrite the result for a newer
//! one.

use crate::{
    errors::ResolutionError,
    models::{Asset, SignedUrlGrant, SignedUrlRequest},
    services::asset_service::AssetBackend,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::watch;
use tracing::{debug, warn};

/// Signed URL lifetime used when the caller has no preference.
pub const DEFAULT_EXPIRY_SECS: u64 = 3600;

/// The URL to render for a public asset; `None` for private ones.
pub fn distribution_url(asset: &Asset) -> Option<&str> {
    (!asset.is_private).then_some(asset.cloudfront_url.as_str())
}

/// Where the current URL came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UrlSource {
    /// No asset, so no URL.
    #[default]
    None,
    /// Public asset, served straight from the CDN.
    Distribution,
    /// Private asset with a freshly signed URL.
    Signed,
    /// Private asset whose signing failed; the distribution URL may not be servable.
    Fallback,
}

/// Snapshot of the resolver's output.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResolvedUrl {
    pub url: Option<String>,
    pub source: UrlSource,
    pub loading: bool,
    pub error: Option<ResolutionError>,
    /// Present when `source` is `Signed`; expiry fields are the backend's, untouched.
    pub grant: Option<SignedUrlGrant>,
}

impl ResolvedUrl {
    fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    fn distribution(asset: &Asset) -> Self {
        Self {
            url: Some(asset.cloudfront_url.clone()),
            source: UrlSource::Distribution,
            ..Self::default()
        }
    }

    fn is_expired(&self) -> bool {
        self.grant
            .as_ref()
            .is_some_and(|grant| grant.is_expired_at(Utc::now()))
    }
}

/// Outcome of one `resolve` call.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Resolved(ResolvedUrl),
    /// A newer input arrived while this one was in flight; its result was dropped.
    Superseded,
}

impl Resolution {
    pub fn url(&self) -> Option<&str> {
        match self {
            Resolution::Resolved(resolved) => resolved.url.as_deref(),
            Resolution::Superseded => None,
        }
    }
}

struct Input {
    asset: Option<Arc<Asset>>,
    expires_in: u64,
}

impl Input {
    fn is(&self, asset: &Option<Arc<Asset>>, expires_in: u64) -> bool {
        let same_asset = match (&self.asset, asset) {
            (Some(current), Some(next)) => Arc::ptr_eq(current, next),
            (None, None) => true,
            _ => false,
        };
        same_asset && self.expires_in == expires_in
    }
}

enum Step {
    /// Same input is already being signed; wait for that result.
    Join(u64),
    Sign(u64, Arc<Asset>),
}

#[derive(Default)]
struct Inner {
    input: Option<Input>,
    generation: u64,
}

pub struct AccessResolver<B> {
    backend: Arc<B>,
    inner: Mutex<Inner>,
    state: watch::Sender<ResolvedUrl>,
}

impl<B> AccessResolver<B>
where
    B: AssetBackend,
{
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            inner: Mutex::new(Inner::default()),
            state: watch::Sender::new(ResolvedUrl::default()),
        }
    }

    /// Watch the resolver's output as it changes.
    pub fn subscribe(&self) -> watch::Receiver<ResolvedUrl> {
        self.state.subscribe()
    }

    pub fn current(&self) -> ResolvedUrl {
        self.state.borrow().clone()
    }

    /// Resolve `asset` with the given signed URL lifetime.
    ///
    /// Passing the same `Arc` and expiry again does not restart resolution,
    /// unless the signed URL it produced has expired. If that input is still
    /// being signed, the call waits for the same request instead of reporting
    /// the loading state. Any other input starts over and supersedes whatever
    /// is still in flight.
    pub async fn resolve(&self, asset: Option<Arc<Asset>>, expires_in: u64) -> Resolution {
        let step = {
            let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let unchanged = inner
                .input
                .as_ref()
                .is_some_and(|input| input.is(&asset, expires_in));
            let current = self.current();
            if unchanged && current.loading {
                Step::Join(inner.generation)
            } else if unchanged && !current.is_expired() {
                return Resolution::Resolved(current);
            } else {
                inner.generation += 1;
                inner.input = Some(Input {
                    asset: asset.clone(),
                    expires_in,
                });

                // Absent and public inputs settle without suspending.
                match asset {
                    Some(asset) if asset.is_private => {
                        self.state.send_replace(ResolvedUrl::loading());
                        Step::Sign(inner.generation, asset)
                    }
                    other => {
                        let resolved = other
                            .as_deref()
                            .map(ResolvedUrl::distribution)
                            .unwrap_or_default();
                        self.state.send_replace(resolved.clone());
                        return Resolution::Resolved(resolved);
                    }
                }
            }
        };

        let (generation, asset) = match step {
            Step::Join(generation) => return self.join(generation).await,
            Step::Sign(generation, asset) => (generation, asset),
        };

        let resolved = match self
            .backend
            .signed_url(&asset.id, SignedUrlRequest::new(expires_in))
            .await
        {
            Ok(grant) => ResolvedUrl {
                url: Some(grant.signed_url.clone()),
                source: UrlSource::Signed,
                loading: false,
                error: None,
                grant: Some(grant),
            },
            Err(err) => {
                warn!(asset_id = %asset.id, error = %err, "signing failed; falling back to distribution url");
                ResolvedUrl {
                    url: Some(asset.cloudfront_url.clone()),
                    source: UrlSource::Fallback,
                    loading: false,
                    error: Some(ResolutionError::new(&asset.id, &err)),
                    grant: None,
                }
            }
        };

        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != generation {
            debug!(asset_id = %asset.id, generation, "discarding superseded resolution");
            return Resolution::Superseded;
        }
        self.state.send_replace(resolved.clone());
        Resolution::Resolved(resolved)
    }

    /// Wait for the request already in flight for `generation` to settle.
    async fn join(&self, generation: u64) -> Resolution {
        let mut rx = self.state.subscribe();
        let settled = match rx.wait_for(|state| !state.loading).await {
            Ok(state) => state.clone(),
            Err(_) => return Resolution::Superseded,
        };
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.generation != generation {
            return Resolution::Superseded;
        }
        Resolution::Resolved(settled)
    }

    /// Resolve with [`DEFAULT_EXPIRY_SECS`].
    pub async fn resolve_default(&self, asset: Option<Arc<Asset>>) -> Resolution {
        self.resolve(asset, DEFAULT_EXPIRY_SECS).await
    }
}
