pub mod audio_handler;
pub mod download_api;
pub mod search;

use std::{future::Future, path::Path};

use crate::{
    error::{DownloadError, ResolveError},
    tags::TrackTags,
    types::MediaId,
};

/// Maps a search query to the media identifier of the first matching video.
pub trait SourceResolver {
    const SEARCH_URL: &'static str;

    fn resolve(&self, query: &str) -> impl Future<Output = Result<MediaId, ResolveError>> + Send;
}

/// Maps a media identifier to a direct audio stream URL.
pub trait DownloadResolver {
    fn resolve_download(
        &self,
        media_id: &MediaId,
    ) -> impl Future<Output = Result<String, DownloadError>> + Send;
}

/// Raw audio fetching, transcoding and tagging.
pub trait AudioHandler {
    const SOURCE_EXTENSION: &'static str = "m4a";
    const TARGET_EXTENSION: &'static str = "mp3";

    fn fetch(&self, url: &str, dest: &Path) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn transcode(
        &self,
        source: &Path,
        target: &Path,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;

    fn write_tags(&self, path: &Path, tags: &TrackTags) -> anyhow::Result<()>;
}
