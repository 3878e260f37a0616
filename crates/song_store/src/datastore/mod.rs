use std::future::Future;

use crate::{NewTrack, Track, TrackId};

pub mod json;
pub mod postgres;

pub trait DataStore {
    fn load_tracks(&self) -> impl Future<Output = anyhow::Result<Vec<Track>>> + Send;

    fn get_track(&self, id: TrackId)
        -> impl Future<Output = anyhow::Result<Option<Track>>> + Send;

    fn update_track(&self, track: &Track) -> impl Future<Output = anyhow::Result<()>> + Send;

    /// Inserts a track unless one with the same slug already exists.
    fn insert_track(
        &self,
        track: NewTrack,
    ) -> impl Future<Output = anyhow::Result<InsertResult>> + Send;

    /// Persists pending changes. A no-op for backends that write through.
    fn flush(&self) -> impl Future<Output = anyhow::Result<()>> + Send;
}

impl<T: DataStore + Send + Sync> DataStore for &T {
    async fn load_tracks(&self) -> anyhow::Result<Vec<Track>> {
        (**self).load_tracks().await
    }

    async fn get_track(&self, id: TrackId) -> anyhow::Result<Option<Track>> {
        (**self).get_track(id).await
    }

    async fn update_track(&self, track: &Track) -> anyhow::Result<()> {
        (**self).update_track(track).await
    }

    async fn insert_track(&self, track: NewTrack) -> anyhow::Result<InsertResult> {
        (**self).insert_track(track).await
    }

    async fn flush(&self) -> anyhow::Result<()> {
        (**self).flush().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertResult {
    Inserted(TrackId),
    Duplicate { slug: String },
}
