use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::Mutex;

use crate::{
    datastore::{DataStore, InsertResult},
    slugify, NewTrack, Track, TrackId,
};

/// Record list kept in memory and written back to a JSON array on [`DataStore::flush`].
///
/// A track's id is its position in the array.
#[derive(Debug)]
pub struct JsonDataStore {
    path: PathBuf,
    tracks: Mutex<Vec<Track>>,
}

impl JsonDataStore {
    /// Reads the record file at `path`, starting empty if it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();

        let tracks = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .inspect_err(|e| tracing::error!(error = ?e, path = ?path, "Failed to read record file"))
                .with_context(|| format!("Failed to read record file {}", path.display()))?;
            Self::parse(&contents)
                .with_context(|| format!("Failed to parse record file {}", path.display()))?
        } else {
            tracing::warn!(path = ?path, "Record file not found, starting with an empty store");
            Vec::new()
        };

        tracing::debug!(count = tracks.len(), path = ?path, "Loaded record file");

        Ok(JsonDataStore {
            path,
            tracks: Mutex::new(tracks),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parse(contents: &str) -> anyhow::Result<Vec<Track>> {
        let mut tracks = serde_json::from_str::<Vec<Track>>(contents)?;
        for (idx, track) in tracks.iter_mut().enumerate() {
            track.id = TrackId(idx as i64);
            if track.slug.is_empty() {
                track.slug = slugify(
                    track.track.as_deref().unwrap_or_default(),
                    track.artist.as_deref().unwrap_or_default(),
                );
            }
        }
        Ok(tracks)
    }
}

impl DataStore for JsonDataStore {
    async fn load_tracks(&self) -> anyhow::Result<Vec<Track>> {
        Ok(self.tracks.lock().await.clone())
    }

    async fn get_track(&self, id: TrackId) -> anyhow::Result<Option<Track>> {
        let tracks = self.tracks.lock().await;
        Ok(usize::try_from(id.0)
            .ok()
            .and_then(|idx| tracks.get(idx))
            .cloned())
    }

    async fn update_track(&self, track: &Track) -> anyhow::Result<()> {
        let mut tracks = self.tracks.lock().await;
        let slot = usize::try_from(track.id.0)
            .ok()
            .and_then(|idx| tracks.get_mut(idx))
            .ok_or_else(|| anyhow::anyhow!("No record with id {}", track.id))?;
        *slot = track.clone();
        Ok(())
    }

    async fn insert_track(&self, new_track: NewTrack) -> anyhow::Result<InsertResult> {
        let slug = new_track.slug();
        let mut tracks = self.tracks.lock().await;

        if tracks.iter().any(|t| t.slug == slug) {
            return Ok(InsertResult::Duplicate { slug });
        }

        let id = TrackId(tracks.len() as i64);
        tracks.push(new_track.into_track(id));
        Ok(InsertResult::Inserted(id))
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let contents = {
            let tracks = self.tracks.lock().await;
            serde_json::to_string(&*tracks).context("Failed to serialize record list")?
        };

        // the record file is only ever replaced whole
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, contents)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, path = ?tmp_path, "Failed to write record file"))
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;

        tracing::info!(path = ?self.path, "Saved record file");
        Ok(())
    }
}
