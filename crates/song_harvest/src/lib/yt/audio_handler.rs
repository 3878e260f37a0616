use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use reqwest::redirect::Policy;
use tokio::process::Command;

use crate::{
    tags::{write_id3_tags, TrackTags},
    yt::AudioHandler,
};

/// Fetches streams over HTTP, transcodes with ffmpeg and tags with lofty.
pub struct HttpAudioHandler {
    client: reqwest::Client,
    ffmpeg_path: PathBuf,
}

impl HttpAudioHandler {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

    pub fn new() -> anyhow::Result<Self> {
        Self::with_timeout(Self::DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(Policy::limited(10))
            .timeout(timeout)
            .build()
            .context("Failed to build audio fetch client")?;

        Ok(Self {
            client,
            ffmpeg_path: std::env::var_os("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
        })
    }

    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    /// ffmpeg arguments for an audio-only mp3 encode of `source` into `target`
    pub fn transcode_args(source: &Path, target: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-y".into(), "-hide_banner".into(), "-loglevel".into(), "error".into()];
        args.push("-i".into());
        args.push(source.into());
        args.extend(
            ["-vn", "-codec:a", "libmp3lame", "-q:a", "2"]
                .into_iter()
                .map(OsString::from),
        );
        args.push(target.into());
        args
    }
}

impl AudioHandler for HttpAudioHandler {
    #[tracing::instrument(skip(self, url))]
    async fn fetch(&self, url: &str, dest: &Path) -> anyhow::Result<()> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to request audio stream"))?
            .error_for_status()?;

        let bytes = resp.bytes().await.context("Failed to read audio stream")?;
        if bytes.is_empty() {
            anyhow::bail!("Audio stream was empty");
        }

        tokio::fs::write(dest, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", dest.display()))?;

        tracing::debug!(bytes = bytes.len(), "Fetched audio stream");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn transcode(&self, source: &Path, target: &Path) -> anyhow::Result<()> {
        let output = Command::new(&self.ffmpeg_path)
            .args(Self::transcode_args(source, target))
            .output()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run ffmpeg"))
            .with_context(|| format!("Failed to run {}", self.ffmpeg_path.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("ffmpeg exited with {}: {}", output.status, stderr.trim());
        }

        if !target.exists() {
            anyhow::bail!("ffmpeg did not produce expected file: {}", target.display());
        }

        Ok(())
    }

    fn write_tags(&self, path: &Path, tags: &TrackTags) -> anyhow::Result<()> {
        write_id3_tags(path, tags)
    }
}
