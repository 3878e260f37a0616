//! Fetch, transcode and tag a single resolved track.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use chrono::{NaiveDate, Utc};
use song_store::Track;
use tokio::sync::{Mutex, Semaphore};

use crate::{error::Error, tags::TrackTags, yt::AudioHandler};

/// Serializes directory existence checks so concurrent workers never race
/// on creating the same dated directory.
#[derive(Debug, Default)]
pub struct DirectoryManager {
    lock: Mutex<()>,
}

impl DirectoryManager {
    /// Creates `dir` and its parents if absent. Already existing is not an error.
    pub async fn ensure(&self, dir: &Path) -> io::Result<()> {
        let _guard = self.lock.lock().await;
        if tokio::fs::try_exists(dir).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(dir).await?;
        tracing::debug!(path = ?dir, "Created download directory");
        Ok(())
    }
}

/// Filesystem-safe stem of `"{artist} - {track} - {played} - {station}"`.
///
/// Everything but ASCII letters, digits, spaces and dashes is dropped.
pub fn file_stem(track: &Track) -> String {
    let played = track
        .played_at
        .map(|played_at| played_at.format("%Y-%m-%d %H%M%S").to_string())
        .unwrap_or_default();

    let raw = [
        track.artist.as_deref().unwrap_or_default(),
        track.track.as_deref().unwrap_or_default(),
        played.as_str(),
        track.station.as_deref().unwrap_or_default(),
    ]
    .join(" - ");

    let stem = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || *c == '-')
        .collect::<String>();
    let stem = stem.trim();

    if stem.trim_matches(|c| c == '-' || c == ' ').is_empty() {
        format!("track-{}", track.id)
    } else {
        stem.to_string()
    }
}

pub struct AcquisitionWorker<A> {
    audio_handler: A,
    download_dir: PathBuf,
    directories: DirectoryManager,
    transcoder: Semaphore,
    throttle: Duration,
}

impl<A> AcquisitionWorker<A>
where
    A: AudioHandler + Send + Sync,
{
    pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(200);

    pub fn new(audio_handler: A, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            audio_handler,
            download_dir: download_dir.into(),
            directories: DirectoryManager::default(),
            // one transcode at a time across all workers
            transcoder: Semaphore::new(1),
            throttle: Self::DEFAULT_THROTTLE,
        }
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn audio_handler(&self) -> &A {
        &self.audio_handler
    }

    /// `<download_dir>/archive/<YYYY-MM-DD>`
    pub fn dated_dir(&self, date: NaiveDate) -> PathBuf {
        self.download_dir
            .join("archive")
            .join(date.format("%Y-%m-%d").to_string())
    }

    /// Produces a tagged file for `track` from `stream_url` and returns its path.
    ///
    /// The intermediate source file never outlives this call.
    #[tracing::instrument(skip_all, fields(track_id = %track.id))]
    pub async fn acquire(&self, track: &Track, stream_url: &str) -> Result<PathBuf, Error> {
        let dir = self.dated_dir(Utc::now().date_naive());
        self.directories.ensure(&dir).await.map_err(|e| {
            Error::Fetch(format!("Failed to create directory {}: {e}", dir.display()))
        })?;
        tokio::time::sleep(self.throttle).await;

        let stem = file_stem(track);
        let source = dir.join(format!("{stem}.{}", A::SOURCE_EXTENSION));
        let target = dir.join(format!("{stem}.{}", A::TARGET_EXTENSION));

        if let Err(e) = self.audio_handler.fetch(stream_url, &source).await {
            tracing::error!(error = ?e, "Failed to fetch audio");
            remove_if_exists(&source).await;
            return Err(Error::Fetch(format!("{e:#}")));
        }

        let _permit = self
            .transcoder
            .acquire()
            .await
            .map_err(anyhow::Error::from)?;

        tokio::time::sleep(self.throttle).await;
        let transcoded = self.transcode_and_tag(track, &source, &target).await;

        let removed = tokio::fs::remove_file(&source).await;
        tokio::time::sleep(self.throttle).await;

        if let Err(e) = transcoded {
            remove_if_exists(&target).await;
            if let Err(remove_err) = removed {
                tracing::error!(error = ?remove_err, path = ?source, "Failed to remove source audio");
            }
            return Err(e);
        }

        removed.map_err(|e| {
            tracing::error!(error = ?e, path = ?source, "Failed to remove source audio");
            Error::Uncaught(anyhow::anyhow!(
                "Failed to remove source audio {}: {e}",
                source.display()
            ))
        })?;

        tracing::info!(path = ?target, "Saved tagged audio");
        Ok(target)
    }

    async fn transcode_and_tag(
        &self,
        track: &Track,
        source: &Path,
        target: &Path,
    ) -> Result<(), Error> {
        self.audio_handler
            .transcode(source, target)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to transcode audio"))
            .map_err(|e| Error::Transcode(format!("{e:#}")))?;

        self.audio_handler
            .write_tags(target, &TrackTags::from(track))
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to tag audio"))
            .map_err(|e| Error::Transcode(format!("{e:#}")))
    }
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(error = ?e, path = ?path, "Failed to remove partial file"),
    }
}
