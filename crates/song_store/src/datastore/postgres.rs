use anyhow::Context;
use chrono::DateTime;
use sqlx::{migrate::Migrator, postgres::PgPoolOptions, PgPool};

use crate::{
    datastore::{DataStore, InsertResult},
    NewTrack, Outcome, Track, TrackId,
};

static MIGRATOR: Migrator = sqlx::migrate!();

const SELECT_TRACKS: &str = r#"
    SELECT id, slug, track, artist, collection, program, station, date_played,
           duration, genre, query, video_id, downloaded, outcome
    FROM songs
"#;

#[derive(Debug, Clone)]
pub struct PgDataStore {
    pub pool: PgPool,
}

impl PgDataStore {
    /// Establish connection to database and create the songs table
    /// if not exists
    pub async fn init(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .inspect_err(
                |e| tracing::error!(error = ?e, "Failed to establish connection to database"),
            )
            .context("Failed to connect to postgres database")?;

        MIGRATOR
            .run(&pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to run database migrations"))
            .context("Failed to run database migrations")?;

        Ok(PgDataStore { pool })
    }
}

#[derive(sqlx::FromRow)]
struct TrackRow {
    id: i64,
    slug: String,
    track: Option<String>,
    artist: Option<String>,
    collection: Option<String>,
    program: Option<String>,
    station: Option<String>,
    date_played: Option<i64>,
    duration: Option<i64>,
    genre: Option<String>,
    query: Option<String>,
    video_id: Option<String>,
    downloaded: bool,
    outcome: Option<String>,
}

impl TryFrom<TrackRow> for Track {
    type Error = anyhow::Error;

    fn try_from(row: TrackRow) -> Result<Self, Self::Error> {
        let outcome = row
            .outcome
            .as_deref()
            .map(str::parse::<Outcome>)
            .transpose()
            .with_context(|| format!("Invalid outcome for song {}", row.id))?
            .unwrap_or_default();

        Ok(Track {
            id: TrackId(row.id),
            slug: row.slug,
            track: row.track,
            artist: row.artist,
            collection: row.collection,
            program: row.program,
            station: row.station,
            played_at: row.date_played.and_then(|ts| DateTime::from_timestamp(ts, 0)),
            duration: row.duration,
            genre: row.genre,
            query: row.query,
            media_id: row.video_id,
            downloaded: row.downloaded,
            outcome,
            extra: Default::default(),
        })
    }
}

fn outcome_column(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Unprocessed => None,
        other => Some(other.as_str()),
    }
}

impl DataStore for PgDataStore {
    async fn load_tracks(&self) -> anyhow::Result<Vec<Track>> {
        let rows = sqlx::query_as::<_, TrackRow>(SELECT_TRACKS)
            .fetch_all(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to fetch songs"))
            .context("Failed to fetch songs")?;

        rows.into_iter().map(Track::try_from).collect()
    }

    async fn get_track(&self, id: TrackId) -> anyhow::Result<Option<Track>> {
        let row = sqlx::query_as::<_, TrackRow>(&format!("{SELECT_TRACKS} WHERE id = $1"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, track_id = %id, "Failed to fetch song"))
            .context("Failed to fetch song")?;

        row.map(Track::try_from).transpose()
    }

    async fn update_track(&self, track: &Track) -> anyhow::Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE songs
            SET genre = $2, query = $3, video_id = $4, downloaded = $5, outcome = $6
            WHERE id = $1
            "#,
        )
        .bind(track.id.0)
        .bind(&track.genre)
        .bind(&track.query)
        .bind(&track.media_id)
        .bind(track.downloaded)
        .bind(outcome_column(track.outcome))
        .execute(&self.pool)
        .await
        .inspect_err(|err| {
            tracing::error!(
                error = ?err,
                track_id = %track.id,
                "Failed to update song"
            )
        })
        .context("Failed to update song")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("No song with id {}", track.id);
        }

        Ok(())
    }

    async fn insert_track(&self, new_track: NewTrack) -> anyhow::Result<InsertResult> {
        let slug = new_track.slug();

        let inserted = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO songs (slug, track, artist, collection, program, station, date_played, duration)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(&slug)
        .bind(&new_track.track)
        .bind(&new_track.artist)
        .bind(&new_track.collection)
        .bind(&new_track.program)
        .bind(&new_track.station)
        .bind(new_track.played_at.map(|t| t.timestamp()))
        .bind(new_track.duration)
        .fetch_optional(&self.pool)
        .await
        .inspect_err(|err| tracing::error!(error = ?err, %slug, "Failed to insert song"))
        .context("Failed to insert song")?;

        Ok(match inserted {
            Some(id) => InsertResult::Inserted(TrackId(id)),
            None => InsertResult::Duplicate { slug },
        })
    }

    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
