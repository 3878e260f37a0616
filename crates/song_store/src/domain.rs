use std::{fmt, str::FromStr, sync::LazyLock};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static DURATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("duration regex is valid"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackId(pub i64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a track stands in the acquisition pipeline.
///
/// Legacy spellings written by earlier record files are accepted on read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Outcome {
    #[default]
    Unprocessed,
    Processing,
    Success,
    #[serde(alias = "api_error")]
    ApiFailure,
    #[serde(alias = "dub_error")]
    DubFailure,
    #[serde(alias = "uncaught_error")]
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Unprocessed => "unprocessed",
            Outcome::Processing => "processing",
            Outcome::Success => "success",
            Outcome::ApiFailure => "api-failure",
            Outcome::DubFailure => "dub-failure",
            Outcome::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Outcome::Unprocessed | Outcome::Processing)
    }

    /// Only unprocessed records and api failures (retried across runs) may be
    /// claimed; a claimed record may only move to a terminal outcome.
    pub fn can_transition_to(&self, next: Outcome) -> bool {
        match (self, next) {
            (Outcome::Unprocessed | Outcome::ApiFailure, Outcome::Processing) => true,
            (Outcome::Processing, next) => next.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let outcome = match s {
            "unprocessed" => Outcome::Unprocessed,
            "processing" => Outcome::Processing,
            "success" => Outcome::Success,
            "api-failure" | "api_error" => Outcome::ApiFailure,
            "dub-failure" | "dub_error" => Outcome::DubFailure,
            "error" | "uncaught_error" => Outcome::Error,
            other => anyhow::bail!("Unknown outcome: {other}"),
        };
        Ok(outcome)
    }
}

/// The outcomes a claimed track can settle into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalOutcome {
    Success,
    ApiFailure,
    DubFailure,
    Error,
}

impl From<TerminalOutcome> for Outcome {
    fn from(value: TerminalOutcome) -> Self {
        match value {
            TerminalOutcome::Success => Outcome::Success,
            TerminalOutcome::ApiFailure => Outcome::ApiFailure,
            TerminalOutcome::DubFailure => Outcome::DubFailure,
            TerminalOutcome::Error => Outcome::Error,
        }
    }
}

/// A scraped track and the state of its acquisition.
///
/// Field names in the JSON representation follow the record files produced
/// by the station feeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Track {
    #[serde(skip)]
    pub id: TrackId,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "trackName", default)]
    pub track: Option<String>,
    #[serde(rename = "artistName", default)]
    pub artist: Option<String>,
    #[serde(rename = "collectionName", default)]
    pub collection: Option<String>,
    #[serde(rename = "programName", default)]
    pub program: Option<String>,
    #[serde(rename = "stationName", default)]
    pub station: Option<String>,
    #[serde(rename = "datePlayed", default, with = "played_at_field")]
    pub played_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(rename = "videoURL", default)]
    pub media_id: Option<String>,
    #[serde(default)]
    pub downloaded: bool,
    #[serde(default, with = "outcome_field")]
    pub outcome: Outcome,
    /// Keys written by other tools; carried through unchanged.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A track as produced by a station feed, before it has an identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTrack {
    pub track: String,
    pub artist: String,
    pub collection: Option<String>,
    pub program: Option<String>,
    pub station: String,
    pub played_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
}

impl NewTrack {
    pub fn slug(&self) -> String {
        slugify(&self.track, &self.artist)
    }

    pub fn into_track(self, id: TrackId) -> Track {
        Track {
            id,
            slug: self.slug(),
            track: Some(self.track),
            artist: Some(self.artist),
            collection: self.collection,
            program: self.program,
            station: Some(self.station),
            played_at: self.played_at,
            duration: self.duration,
            ..Default::default()
        }
    }
}

/// Lowercased alphanumeric-only concatenation of track and artist.
pub fn slugify(track: &str, artist: &str) -> String {
    track
        .chars()
        .chain(artist.chars())
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Converts `SS`, `MM:SS` or `HH:MM:SS` style durations into seconds.
pub fn parse_duration(duration: &str) -> Option<i64> {
    let groups = DURATION_RE
        .find_iter(duration)
        .map(|m| m.as_str().parse::<i64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;

    if !(1..=3).contains(&groups.len()) {
        return None;
    }

    Some(groups.iter().fold(0, |acc, part| acc * 60 + part))
}

/// Written as unix seconds. Read from unix seconds, an RFC 3339 timestamp or a
/// bare `YYYY-MM-DD` date (midnight UTC).
mod played_at_field {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub fn serialize<S: Serializer>(
        played_at: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        chrono::serde::ts_seconds_option::serialize(played_at, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Option::<Raw>::deserialize(deserializer)? {
            None => Ok(None),
            Some(Raw::Seconds(secs)) => DateTime::from_timestamp(secs, 0)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {secs}"))),
            Some(Raw::Text(text)) => parse_text(text.trim())
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("unrecognised play date: {text}"))),
        }
    }

    fn parse_text(text: &str) -> Option<DateTime<Utc>> {
        if text.is_empty() {
            return None;
        }
        if let Ok(secs) = text.parse::<i64>() {
            return DateTime::from_timestamp(secs, 0);
        }
        if let Ok(at) = DateTime::parse_from_rfc3339(text) {
            return Some(at.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|at| at.and_utc())
    }
}

/// `Unprocessed` is stored as an absent value.
mod outcome_field {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Outcome;

    pub fn serialize<S: Serializer>(outcome: &Outcome, serializer: S) -> Result<S::Ok, S::Error> {
        match outcome {
            Outcome::Unprocessed => serializer.serialize_none(),
            other => other.serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Outcome, D::Error> {
        Ok(Option::<Outcome>::deserialize(deserializer)?.unwrap_or_default())
    }
}
