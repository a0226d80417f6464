//! Poolside API client.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use poolside_playback::Remote;
use reqwest::{Client, RequestBuilder};
use std::time::Duration;
use tracing::{debug, info};

/// Default playlist catalog endpoint
pub const DEFAULT_CATALOG_URL: &str = "https://api.poolsidefm.workers.dev/v1/get_tracks_by_playlist";

/// Default per-track stream proxy endpoint, queried with `track_id`
pub const DEFAULT_STREAM_URL: &str = "https://api.poolsidefm.workers.dev/v2/get_sc_mp3_stream";

/// Endpoint and timeout settings.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub catalog_url: String,
    pub stream_url: String,

    /// Whole-request timeout for the catalog fetch
    pub catalog_timeout: Duration,

    /// Whole-request timeout for a track fetch; `None` waits indefinitely
    pub stream_timeout: Option<Duration>,

    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            stream_url: DEFAULT_STREAM_URL.to_string(),
            catalog_timeout: Duration::from_secs(10),
            stream_timeout: None,
            user_agent: format!("Poolside/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Client for the catalog endpoint and the stream proxy.
///
/// Every call is single-shot: no retries, failures go straight to the caller.
///
/// # Example
///
/// ```ignore
/// use poolside_client::{ClientConfig, PoolsideClient};
///
/// let client = PoolsideClient::new(ClientConfig::default())?;
/// let catalog = client.catalog().await?;
/// let audio = client.track_stream(123456).await?;
/// ```
#[derive(Debug, Clone)]
pub struct PoolsideClient {
    http: Client,
    config: ClientConfig,
}

impl PoolsideClient {
    /// Create a new client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        validate_url(&config.catalog_url)?;
        validate_url(&config.stream_url)?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the raw catalog payload.
    pub async fn catalog(&self) -> Result<Bytes> {
        let url = &self.config.catalog_url;
        debug!(url = %url, "Fetching catalog");

        let request = self
            .http
            .get(url)
            .timeout(self.config.catalog_timeout);
        let body = send(request).await?;

        info!(bytes = body.len(), "Fetched catalog");
        Ok(body)
    }

    /// Fetch the encoded audio of one track through the stream proxy.
    pub async fn track_stream(&self, track_id: i64) -> Result<Bytes> {
        let url = &self.config.stream_url;
        debug!(url = %url, track_id, "Fetching track stream");

        let mut request = self.http.get(url).query(&[("track_id", track_id)]);
        if let Some(timeout) = self.config.stream_timeout {
            request = request.timeout(timeout);
        }
        let body = send(request).await?;

        debug!(track_id, bytes = body.len(), "Fetched track stream");
        Ok(body)
    }
}

#[async_trait]
impl Remote for PoolsideClient {
    async fn fetch_catalog(&self) -> poolside_playback::Result<Bytes> {
        Ok(self.catalog().await?)
    }

    async fn fetch_track(&self, track_id: i64) -> poolside_playback::Result<Bytes> {
        Ok(self.track_stream(track_id).await?)
    }
}

/// Send a request and read the body, mapping non-2xx to `ServerError`
async fn send(request: RequestBuilder) -> Result<Bytes> {
    let response = request.send().await?;
    let status = response.status();

    if status.is_success() {
        Ok(response.bytes().await?)
    } else {
        let message = response.text().await.unwrap_or_default();
        Err(ClientError::ServerError {
            status: status.as_u16(),
            message,
        })
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(ClientError::InvalidUrl("URL cannot be empty".into()));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ClientError::InvalidUrl(format!(
            "URL must start with http:// or https://: {}",
            url
        )));
    }
    Ok(())
}
