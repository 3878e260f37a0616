pub mod builder;

use std::{fmt, panic::AssertUnwindSafe, path::PathBuf};

use anyhow::Context;
use futures::{stream, FutureExt, StreamExt};
use itertools::Itertools;
use song_store::{DataStore, TerminalOutcome, Track, TrackId};

use crate::{
    error::Error,
    ledger::{ClaimError, TrackLedger},
    query::build_query,
    selector::{select_candidates, SelectionPolicy},
    worker::AcquisitionWorker,
    yt::{AudioHandler, DownloadResolver, SourceResolver},
};

/// What happened to one selected candidate during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackReport {
    Settled {
        id: TrackId,
        outcome: TerminalOutcome,
    },
    /// Another worker or an earlier run already owns the track
    Skipped { id: TrackId },
    CommitFailed {
        id: TrackId,
        outcome: TerminalOutcome,
    },
}

impl TrackReport {
    pub fn id(&self) -> TrackId {
        match self {
            TrackReport::Settled { id, .. }
            | TrackReport::Skipped { id }
            | TrackReport::CommitFailed { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub selected: usize,
    pub success: usize,
    pub api_failure: usize,
    pub dub_failure: usize,
    pub error: usize,
    pub skipped: usize,
    pub failed_commits: usize,
}

impl RunSummary {
    fn from_reports(selected: usize, reports: &[TrackReport]) -> Self {
        let settled = reports
            .iter()
            .filter_map(|report| match report {
                TrackReport::Settled { outcome, .. } => Some(*outcome),
                _ => None,
            })
            .counts();

        let count = |outcome: TerminalOutcome| settled.get(&outcome).copied().unwrap_or_default();

        RunSummary {
            selected,
            success: count(TerminalOutcome::Success),
            api_failure: count(TerminalOutcome::ApiFailure),
            dub_failure: count(TerminalOutcome::DubFailure),
            error: count(TerminalOutcome::Error),
            skipped: reports
                .iter()
                .filter(|r| matches!(r, TrackReport::Skipped { .. }))
                .count(),
            failed_commits: reports
                .iter()
                .filter(|r| matches!(r, TrackReport::CommitFailed { .. }))
                .count(),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} selected: {} success, {} api-failure, {} dub-failure, {} error, {} skipped, {} failed commits",
            self.selected,
            self.success,
            self.api_failure,
            self.dub_failure,
            self.error,
            self.skipped,
            self.failed_commits
        )
    }
}

// The core song acquisition processor
pub struct HarvestProcessor<D, S, R, A> {
    ledger: TrackLedger<D>,
    source_resolver: S,
    download_resolver: R,
    worker: AcquisitionWorker<A>,
    policy: SelectionPolicy,
    workers: usize,
}

impl<D, S, R, A> HarvestProcessor<D, S, R, A>
where
    D: DataStore + Send + Sync + 'static,
    S: SourceResolver + Send + Sync + 'static,
    R: DownloadResolver + Send + Sync + 'static,
    A: AudioHandler + Send + Sync + 'static,
{
    pub fn ledger(&self) -> &TrackLedger<D> {
        &self.ledger
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Runs one harvesting pass over the store.
    #[tracing::instrument(skip(self), fields(workers = self.workers))]
    pub async fn run(&self) -> anyhow::Result<RunSummary> {
        let tracks = self
            .ledger
            .store()
            .load_tracks()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to load tracks"))
            .context("Failed to load tracks")?;

        let candidates = select_candidates(&tracks, &self.policy);
        drop(tracks);

        if candidates.is_empty() {
            tracing::info!("No tracks to process at this time");
        } else {
            tracing::info!(count = candidates.len(), "Processing tracks");
        }

        let reports = stream::iter(candidates.iter().copied())
            .map(|id| self.process_track(id))
            .buffer_unordered(self.workers.max(1))
            .collect::<Vec<_>>()
            .await;

        self.ledger
            .store()
            .flush()
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to flush track store"))
            .context("Failed to flush track store")?;

        let summary = RunSummary::from_reports(candidates.len(), &reports);
        tracing::info!(
            selected = summary.selected,
            success = summary.success,
            api_failure = summary.api_failure,
            dub_failure = summary.dub_failure,
            error = summary.error,
            skipped = summary.skipped,
            failed_commits = summary.failed_commits,
            "Finished harvesting run"
        );
        Ok(summary)
    }

    /// Claims, acquires and commits one track. Never returns an error: every
    /// failure is folded into the report.
    #[tracing::instrument(skip(self))]
    async fn process_track(&self, id: TrackId) -> TrackReport {
        let mut claimed = match self.ledger.claim(id).await {
            Ok(claimed) => claimed,
            Err(ClaimError::Store(e)) => {
                tracing::error!(error = ?e, "Failed to claim track");
                return TrackReport::Skipped { id };
            }
            Err(e) => {
                tracing::debug!(reason = %e, "Skipping track");
                return TrackReport::Skipped { id };
            }
        };

        let acquired = AssertUnwindSafe(self.acquire(claimed.track_mut()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(Error::Uncaught(anyhow::anyhow!(
                    "Acquisition panicked for track {id}"
                )))
            });

        let outcome = match acquired {
            Ok(path) => {
                tracing::info!(path = ?path, "Acquired track");
                TerminalOutcome::Success
            }
            Err(e) => {
                tracing::error!(stage = e.stage(), error = %e, "Failed to acquire track");
                e.outcome()
            }
        };

        match self.ledger.commit(claimed.settle(outcome)).await {
            Ok(_) => TrackReport::Settled { id, outcome },
            Err(e) => {
                tracing::error!(error = ?e, ?outcome, "Failed to commit track outcome");
                TrackReport::CommitFailed { id, outcome }
            }
        }
    }

    /// Query, search, download resolution and the fetch-transcode-tag step.
    /// Derived fields are recorded on `track` as soon as they are known.
    async fn acquire(&self, track: &mut Track) -> Result<PathBuf, Error> {
        let query = build_query(track);
        track.query = Some(query.clone());

        let media_id = self.source_resolver.resolve(&query).await?;
        tracing::debug!(media_id = %media_id, "Resolved media identifier");
        track.media_id = Some(media_id.to_string());

        let stream_url = self.download_resolver.resolve_download(&media_id).await?;

        self.worker.acquire(track, &stream_url).await
    }
}
