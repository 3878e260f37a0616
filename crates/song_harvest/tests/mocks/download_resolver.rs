use std::sync::{Arc, Mutex};

use song_harvest::{types::MediaId, yt::DownloadResolver, DownloadError};

#[derive(Clone)]
pub enum Failure {
    ApiFailure(String),
    StreamNotFound,
}

#[derive(Clone)]
pub struct MockDownloadResolver {
    pub stream_url: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<Failure>,
}

impl Default for MockDownloadResolver {
    fn default() -> Self {
        Self {
            stream_url: "https://cdn.mock/audio.m4a".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }
}

impl MockDownloadResolver {
    pub fn failing(msg: &str) -> Self {
        Self {
            fail_with: Some(Failure::ApiFailure(msg.to_string())),
            ..Default::default()
        }
    }

    pub fn without_audio_stream() -> Self {
        Self {
            fail_with: Some(Failure::StreamNotFound),
            ..Default::default()
        }
    }
}

impl DownloadResolver for MockDownloadResolver {
    async fn resolve_download(&self, media_id: &MediaId) -> Result<String, DownloadError> {
        self.calls.lock().unwrap().push(media_id.to_string());
        match self.fail_with {
            Some(Failure::ApiFailure(ref msg)) => Err(DownloadError::ApiFailure(msg.clone())),
            Some(Failure::StreamNotFound) => Err(DownloadError::StreamNotFound),
            None => Ok(self.stream_url.clone()),
        }
    }
}
