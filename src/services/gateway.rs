//! HttpGateway: the one place that talks HTTP.
//!
//! Attaches the session's bearer token, unwraps the backend's response
//! envelope, turns non-2xx answers into [`ApiError`], and routes every 401
//! through [`Session::invalidate`]. Direct storage transfers also go through
//! here but never carry the bearer token: presigned URLs authorize themselves.

use crate::{
    errors::{ApiError, ApiResult},
    models::{UploadBody, responses::{Envelope, ErrorBody}},
    session::Session,
};
use reqwest::{Body, Client, Method, StatusCode, header};
use serde::{Serialize, de::DeserializeOwned};
use std::{sync::Arc, time::Duration};
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};
use url::Url;

/// Upper bound on how much of a storage error body ends up in an error message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: Client,
    base_url: Url,
    session: Arc<Session>,
}

impl HttpGateway {
    /// Build a gateway for `base_url`. `timeout` applies to whole requests;
    /// `None` keeps reqwest's default of no timeout.
    pub fn new(
        base_url: &str,
        session: Arc<Session>,
        timeout: Option<Duration>,
    ) -> ApiResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ApiError::Transport {
            endpoint: "client setup".into(),
            source,
        })?;
        Self::with_client(client, base_url, session)
    }

    pub fn with_client(client: Client, base_url: &str, session: Arc<Session>) -> ApiResult<Self> {
        let base_url = Url::parse(base_url).map_err(|source| ApiError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        Ok(Self {
            client,
            base_url,
            session,
        })
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl {
                url: self.base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get<T>(&self, segments: &[&str], query: &[(&str, String)]) -> ApiResult<T>
    where
        T: DeserializeOwned,
    {
        self.send::<(), T>(Method::GET, segments, query, None).await
    }

    /// Send an authenticated JSON request and decode the enveloped answer.
    pub async fn send<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments)?;
        let endpoint = format!("{} {}", method, url.path());
        let token = self.session.token().ok_or(ApiError::MissingToken)?;

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&token)
            .header(header::ACCEPT, "application/json");
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        debug!(%endpoint, "sending request");
        let response = request.send().await.map_err(|source| ApiError::Transport {
            endpoint: endpoint.clone(),
            source,
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.session.invalidate(&token, &endpoint);
            return Err(ApiError::Unauthorized { endpoint });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&bytes)
                .unwrap_or_default()
                .into_message();
            debug!(%endpoint, status = status.as_u16(), %message, "request rejected");
            return Err(ApiError::Request {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_slice::<Envelope<T>>(&bytes)
            .map(Envelope::into_inner)
            .map_err(|err| ApiError::Decode {
                endpoint,
                reason: err.to_string(),
            })
    }

    /// PUT raw bytes to a presigned storage URL.
    ///
    /// File bodies are streamed from disk rather than buffered.
    pub async fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        size_bytes: u64,
        body: &UploadBody,
    ) -> ApiResult<()> {
        let url = Url::parse(upload_url).map_err(|source| ApiError::InvalidUrl {
            url: redact_query(upload_url),
            source,
        })?;
        // The query string carries the signature; keep it out of logs and errors.
        let endpoint = format!(
            "PUT {}{}",
            url.host_str().unwrap_or_default(),
            url.path()
        );

        let body = match body {
            UploadBody::Bytes(bytes) => Body::from(bytes.clone()),
            UploadBody::File(path) => {
                let file = File::open(path).await.map_err(|source| ApiError::Io {
                    path: path.clone(),
                    source,
                })?;
                Body::wrap_stream(ReaderStream::new(file))
            }
        };

        debug!(%endpoint, size_bytes, content_type, "transferring object");
        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, size_bytes)
            .body(body)
            .send()
            .await
            .map_err(|source| ApiError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut message = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".into());
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            warn!(%endpoint, status = status.as_u16(), "storage rejected object");
            return Err(ApiError::Request {
                endpoint,
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }
}

fn redact_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}
