use std::sync::{Arc, Mutex};

use song_store::{DataStore, InsertResult, NewTrack, Track, TrackId};

/// In-memory store; ids are positions in `tracks`.
#[derive(Clone, Default)]
pub struct MockDataStore {
    pub tracks: Arc<Mutex<Vec<Track>>>,
    pub updates: Arc<Mutex<Vec<Track>>>,
    pub flushes: Arc<Mutex<usize>>,
    /// Fails every write of a terminal outcome
    pub fail_commits_with: Option<String>,
    pub fail_load_with: Option<String>,
}

impl MockDataStore {
    pub fn with_tracks(tracks: impl IntoIterator<Item = NewTrack>) -> Self {
        let tracks = tracks
            .into_iter()
            .enumerate()
            .map(|(idx, track)| track.into_track(TrackId(idx as i64)))
            .collect();
        Self {
            tracks: Arc::new(Mutex::new(tracks)),
            ..Default::default()
        }
    }

    pub fn failing_commits(mut self, msg: &str) -> Self {
        self.fail_commits_with = Some(msg.to_string());
        self
    }

    pub fn failing(msg: &str) -> Self {
        Self {
            fail_load_with: Some(msg.to_string()),
            ..Default::default()
        }
    }

    pub fn snapshot(&self) -> Vec<Track> {
        self.tracks.lock().unwrap().clone()
    }
}

impl DataStore for MockDataStore {
    async fn load_tracks(&self) -> anyhow::Result<Vec<Track>> {
        if let Some(ref msg) = self.fail_load_with {
            return Err(anyhow::anyhow!("{}", msg));
        }
        Ok(self.snapshot())
    }

    async fn get_track(&self, id: TrackId) -> anyhow::Result<Option<Track>> {
        let tracks = self.tracks.lock().unwrap();
        Ok(usize::try_from(id.0)
            .ok()
            .and_then(|idx| tracks.get(idx))
            .cloned())
    }

    async fn update_track(&self, track: &Track) -> anyhow::Result<()> {
        if let Some(ref msg) = self.fail_commits_with {
            if track.outcome.is_terminal() {
                return Err(anyhow::anyhow!("{}", msg));
            }
        }

        let mut tracks = self.tracks.lock().unwrap();
        let slot = usize::try_from(track.id.0)
            .ok()
            .and_then(|idx| tracks.get_mut(idx))
            .ok_or_else(|| anyhow::anyhow!("No track with id {}", track.id))?;
        *slot = track.clone();
        self.updates.lock().unwrap().push(track.clone());
        Ok(())
    }

    async fn insert_track(&self, track: NewTrack) -> anyhow::Result<InsertResult> {
        let mut tracks = self.tracks.lock().unwrap();
        let slug = track.slug();
        if tracks.iter().any(|t| t.slug == slug) {
            return Ok(InsertResult::Duplicate { slug });
        }
        let id = TrackId(tracks.len() as i64);
        tracks.push(track.into_track(id));
        Ok(InsertResult::Inserted(id))
    }

    async fn flush(&self) -> anyhow::Result<()> {
        *self.flushes.lock().unwrap() += 1;
        Ok(())
    }
}
