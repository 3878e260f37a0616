use std::time::Duration;

use reqwest::Client;

use crate::{
    error::DownloadError,
    types::{MediaId, StreamsResponse},
    yt::DownloadResolver,
};

/// Message the API sends when it could not look the video up.
pub const API_FAILURE_MESSAGE: &str = "Failed to get info";

/// Client for the RapidAPI video download endpoint.
pub struct RapidApiClient {
    client: Client,
    host: String,
    api_key: String,
    base_url: String,
}

impl RapidApiClient {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            client: Self::build_client(Self::DEFAULT_TIMEOUT),
            base_url: format!("https://{host}"),
            host,
            api_key: api_key.into(),
        }
    }

    fn build_client(timeout: Duration) -> Client {
        Client::builder()
            .timeout(timeout)
            .build()
            .inspect_err(|e| tracing::warn!(error = ?e, "Failed to build API client, using defaults"))
            .unwrap_or_default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = Self::build_client(timeout);
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn request_url(&self, media_id: &MediaId) -> String {
        format!(
            "{}/?url={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&media_id.watch_url())
        )
    }
}

/// Classifies a decoded API response. The first non-success classification wins:
/// an explicit failure message takes precedence over stream matching.
pub fn classify_response(response: StreamsResponse) -> Result<String, DownloadError> {
    if let Some(message) = response
        .message
        .filter(|message| message == API_FAILURE_MESSAGE)
    {
        return Err(DownloadError::ApiFailure(message));
    }

    response
        .streams
        .unwrap_or_default()
        .into_iter()
        .find_map(|stream| {
            let audio_only = stream
                .format
                .as_deref()
                .is_some_and(|format| format.starts_with("audio only"));
            let m4a = stream.extension.as_deref() == Some("m4a");
            stream
                .url
                .filter(|url| audio_only && m4a && !url.is_empty())
        })
        .ok_or(DownloadError::StreamNotFound)
}

impl DownloadResolver for RapidApiClient {
    #[tracing::instrument(skip_all, fields(media_id = %media_id))]
    async fn resolve_download(&self, media_id: &MediaId) -> Result<String, DownloadError> {
        let resp = self
            .client
            .get(self.request_url(media_id))
            .header("X-RapidAPI-Host", &self.host)
            .header("X-RapidAPI-Key", &self.api_key)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make download API request"))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(DownloadError::ApiFailure(format!("HTTP {status}: {message}")));
        }

        let body = resp.json::<serde_json::Value>().await?;
        classify_response(StreamsResponse::from_value(&body))
            .inspect_err(|e| tracing::warn!(error = %e, "Download API gave no usable stream"))
    }
}
