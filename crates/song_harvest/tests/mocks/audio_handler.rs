use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use song_harvest::{tags::TrackTags, yt::AudioHandler};

/// Writes placeholder files so the worker's cleanup runs against real paths.
#[derive(Clone, Default)]
pub struct MockAudioHandler {
    pub fetches: Arc<Mutex<Vec<String>>>,
    pub transcodes: Arc<Mutex<Vec<PathBuf>>>,
    pub tagged: Arc<Mutex<Vec<(PathBuf, TrackTags)>>>,
    pub fail_fetch_with: Option<String>,
    pub fail_transcode_with: Option<String>,
    pub panic_on_fetch: bool,
}

impl MockAudioHandler {
    pub fn failing_fetch(msg: &str) -> Self {
        Self {
            fail_fetch_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn failing_transcode(msg: &str) -> Self {
        Self {
            fail_transcode_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panic_on_fetch: true,
            ..Default::default()
        }
    }
}

impl AudioHandler for MockAudioHandler {
    async fn fetch(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        if self.panic_on_fetch {
            panic!("mock fetch panicked");
        }
        self.fetches.lock().unwrap().push(url.to_string());
        if let Some(ref msg) = self.fail_fetch_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        tokio::fs::write(dest, b"m4a").await?;
        Ok(())
    }

    async fn transcode(&self, source: &Path, target: &Path) -> anyhow::Result<()> {
        self.transcodes.lock().unwrap().push(source.to_path_buf());
        if let Some(ref msg) = self.fail_transcode_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        tokio::fs::write(target, b"mp3").await?;
        Ok(())
    }

    fn write_tags(&self, path: &Path, tags: &TrackTags) -> anyhow::Result<()> {
        self.tagged
            .lock()
            .unwrap()
            .push((path.to_path_buf(), tags.clone()));
        Ok(())
    }
}
