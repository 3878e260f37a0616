use std::{path::PathBuf, str::FromStr};

use anyhow::Context;
use apalis::{
    layers::{retry::RetryPolicy, sentry::SentryLayer},
    prelude::*,
};
use apalis_cron::{CronStream, Tick};
use clap::{Parser, Subcommand};
use cron::Schedule;
use song_harvest::{
    tracing::init_tracing_subscriber,
    yt::{audio_handler::HttpAudioHandler, download_api::RapidApiClient, search::YtSearch},
    HarvestProcessorBuilder, RunSummary, SelectionPolicy,
};
use song_store::{DataStore, JsonDataStore, PgDataStore};

#[derive(Parser)]
#[command(name = "song-harvest", about = "Radio now-playing song harvester")]
struct Cli {
    /// Postgres URL or path to a JSON record file
    #[arg(long, env = "SONG_STORE", default_value = "songRecords.json")]
    store: String,

    /// Download API host
    #[arg(long, env = "RAPIDAPI_HOST", default_value = "getvideo.p.rapidapi.com")]
    api_host: String,

    /// Download API key
    #[arg(long, env = "RAPIDAPI_KEY")]
    api_key: String,

    /// Root directory for harvested audio
    #[arg(long, env = "DOWNLOAD_DIR", default_value = "downloads")]
    download_dir: PathBuf,

    /// Maximum songs to process per run
    #[arg(long, env = "MAX_SONGS_TO_PROCESS", default_value = "20")]
    max_songs: usize,

    /// Tracks processed concurrently
    #[arg(long, default_value = "3")]
    workers: usize,

    /// Stations never harvested
    #[arg(long = "exclude-station", default_values_t = vec!["KCRW".to_string()])]
    excluded_stations: Vec<String>,

    /// Leave tracks that previously hit an api failure alone
    #[arg(long)]
    no_retry_api_failures: bool,

    /// ffmpeg binary used for transcoding
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one harvesting pass and exit
    Run,
    /// Start the cron scheduler
    Cron {
        /// Cron schedule expression
        #[arg(long, env = "CRON_SCHEDULE", default_value = "0 0 */4 * * *")]
        schedule: String,
    },
}

#[derive(Clone)]
struct Config {
    store: String,
    api_host: String,
    api_key: String,
    download_dir: PathBuf,
    max_songs: usize,
    workers: usize,
    excluded_stations: Vec<String>,
    retry_api_failures: bool,
    ffmpeg_path: PathBuf,
}

impl Config {
    fn policy(&self) -> SelectionPolicy {
        self.excluded_stations.iter().fold(
            SelectionPolicy::default()
                .limit(self.max_songs)
                .retry_api_failures(self.retry_api_failures),
            |policy, station| policy.exclude_station(station),
        )
    }

    fn is_postgres(&self) -> bool {
        self.store.starts_with("postgres://") || self.store.starts_with("postgresql://")
    }
}

async fn harvest<D>(config: &Config, store: D) -> anyhow::Result<RunSummary>
where
    D: DataStore + Send + Sync + 'static,
{
    let audio_handler = HttpAudioHandler::new()?.with_ffmpeg_path(&config.ffmpeg_path);

    let processor = HarvestProcessorBuilder::new(&config.download_dir)
        .store(store)
        .source_resolver(YtSearch::default())
        .download_resolver(RapidApiClient::new(&config.api_host, &config.api_key))
        .audio_handler(audio_handler)
        .policy(config.policy())
        .workers(config.workers)
        .build();

    processor.run().await
}

async fn run_pipeline(config: &Config) -> anyhow::Result<()> {
    let summary = if config.is_postgres() {
        let store = PgDataStore::init(&config.store)
            .await
            .context("Failed to connect to song store")?;
        harvest(config, store).await?
    } else {
        let store = JsonDataStore::open(&config.store)
            .await
            .with_context(|| format!("Failed to open song store {}", config.store))?;
        harvest(config, store).await?
    };

    tracing::info!(%summary, "Harvest complete");
    Ok(())
}

async fn handle_tick(_tick: Tick, config: Data<Config>) -> anyhow::Result<()> {
    tracing::info!(max_songs = config.max_songs, "Running scheduled harvest...");
    run_pipeline(&config).await
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: Some("production".into()),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let config = Config {
        store: cli.store,
        api_host: cli.api_host,
        api_key: cli.api_key,
        download_dir: cli.download_dir,
        max_songs: cli.max_songs,
        workers: cli.workers,
        excluded_stations: cli.excluded_stations,
        retry_api_failures: !cli.no_retry_api_failures,
        ffmpeg_path: cli.ffmpeg_path,
    };

    match cli.command {
        Command::Run => {
            tracing::info!(max_songs = config.max_songs, "Running harvest once...");
            run_pipeline(&config).await?;
        }
        Command::Cron { schedule } => {
            tracing::info!(%schedule, "Starting cron scheduler...");
            let schedule = Schedule::from_str(&schedule)?;

            let worker = WorkerBuilder::new("song-harvest-cron")
                .backend(CronStream::new(schedule))
                .retry(RetryPolicy::retries(3))
                .layer(SentryLayer::new())
                .data(config)
                .build(handle_tick);

            worker.run().await?;
        }
    }

    Ok(())
}
