use std::{ops::Deref, sync::LazyLock, time::Duration};

use regex::Regex;

use crate::{error::ResolveError, types::MediaId, yt::SourceResolver};

static VIDEO_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""videoRenderer":\{"videoId":"([^"]+)""#).expect("video id regex is valid")
});

/// Pulls the first video identifier out of a search results page.
pub fn extract_media_id(page: &str) -> Option<MediaId> {
    VIDEO_ID_RE
        .captures(page)
        .and_then(|cap| cap.get(1))
        .map(|m| MediaId::new(m.as_str()))
}

pub struct YtSearch {
    client: reqwest::Client,
    search_url: String,
}

impl YtSearch {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn with_timeout(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .inspect_err(|e| tracing::warn!(error = ?e, "Failed to build search client, using defaults"))
            .unwrap_or_default();
        YtSearch {
            client,
            search_url: <Self as SourceResolver>::SEARCH_URL.to_string(),
        }
    }

    /// Points the resolver at another results endpoint.
    pub fn with_search_url(mut self, url: impl Into<String>) -> Self {
        self.search_url = url.into();
        self
    }
}

impl Default for YtSearch {
    fn default() -> Self {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }
}

impl Deref for YtSearch {
    type Target = reqwest::Client;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

impl SourceResolver for YtSearch {
    const SEARCH_URL: &'static str = "https://www.youtube.com/results";

    #[tracing::instrument(skip(self))]
    async fn resolve(&self, query: &str) -> Result<MediaId, ResolveError> {
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }

        // the query is already percent-encoded
        let response = self
            .get(format!("{}?search_query={query}", self.search_url))
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to make search request"))?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status().as_u16()));
        }

        let page = response.text().await?;
        extract_media_id(&page).ok_or(ResolveError::NoMatch)
    }
}
