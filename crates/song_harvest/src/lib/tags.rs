//! ID3 tags written onto acquired files.

use std::path::Path;

use anyhow::Context;
use lofty::{
    config::WriteOptions,
    tag::{ItemKey, Tag, TagExt, TagType},
};
use song_store::Track;

/// Marker appended to every genre so harvested files can be told apart.
pub const SCRAPED_GENRE: &str = "Scraped";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackTags {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Program the track was played in
    pub compilation: String,
    pub date: String,
    pub genre: String,
}

impl From<&Track> for TrackTags {
    fn from(track: &Track) -> Self {
        let genre = match track.station.as_deref() {
            Some(station) if !station.is_empty() => format!("{station};{SCRAPED_GENRE}"),
            _ => SCRAPED_GENRE.to_string(),
        };

        TrackTags {
            title: track.track.clone().unwrap_or_default(),
            artist: track.artist.clone().unwrap_or_default(),
            album: track.collection.clone().unwrap_or_default(),
            compilation: track.program.clone().unwrap_or_default(),
            date: track
                .played_at
                .map(|played_at| played_at.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            genre,
        }
    }
}

impl TrackTags {
    fn items(&self) -> [(ItemKey, &str); 6] {
        [
            (ItemKey::TrackTitle, self.title.as_str()),
            (ItemKey::TrackArtist, self.artist.as_str()),
            (ItemKey::AlbumTitle, self.album.as_str()),
            (ItemKey::FlagCompilation, self.compilation.as_str()),
            (ItemKey::RecordingDate, self.date.as_str()),
            (ItemKey::Genre, self.genre.as_str()),
        ]
    }
}

/// Replaces the file's tag with an ID3v2 tag built from `tags`. Empty values are left out.
pub fn write_id3_tags(path: &Path, tags: &TrackTags) -> anyhow::Result<()> {
    let mut tag = Tag::new(TagType::Id3v2);
    for (key, value) in tags.items() {
        if !value.is_empty() {
            tag.insert_text(key, value.to_string());
        }
    }

    tag.save_to_path(path, WriteOptions::default())
        .inspect_err(|e| tracing::error!(error = %e, path = ?path, "Failed to save tags"))
        .with_context(|| format!("Failed to save tags to {}", path.display()))
}
