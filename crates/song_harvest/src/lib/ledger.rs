//! Serialized access to the record store.
//!
//! Claiming a track and committing its outcome are the only two writes the
//! pipeline performs, and both happen under the ledger's update lock. A
//! [`SettledTrack`] can only be obtained from a [`ClaimedTrack`], which can only
//! be obtained from [`TrackLedger::claim`], so a worker cannot commit a track
//! it never claimed or commit a non-terminal outcome.

use anyhow::Context;
use song_store::{DataStore, Outcome, TerminalOutcome, Track, TrackId};
use tokio::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum ClaimError {
    #[error("No track with id {0}")]
    NotFound(TrackId),
    #[error("Track {id} cannot be claimed from outcome '{outcome}'")]
    NotClaimable { id: TrackId, outcome: Outcome },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// A track held in `processing` by exactly one worker.
#[derive(Debug)]
pub struct ClaimedTrack {
    track: Track,
}

impl ClaimedTrack {
    pub fn id(&self) -> TrackId {
        self.track.id
    }

    pub fn track(&self) -> &Track {
        &self.track
    }

    /// Private working copy; pipeline-derived fields are filled in here.
    pub fn track_mut(&mut self) -> &mut Track {
        &mut self.track
    }

    pub fn settle(mut self, outcome: TerminalOutcome) -> SettledTrack {
        self.track.outcome = outcome.into();
        if outcome == TerminalOutcome::Success {
            self.track.downloaded = true;
        }
        SettledTrack { track: self.track }
    }
}

/// A claimed track carrying its terminal outcome, ready to be committed.
#[derive(Debug)]
pub struct SettledTrack {
    track: Track,
}

impl SettledTrack {
    pub fn track(&self) -> &Track {
        &self.track
    }
}

#[derive(Debug)]
pub struct TrackLedger<D> {
    store: D,
    update_lock: Mutex<()>,
}

impl<D> TrackLedger<D>
where
    D: DataStore + Send + Sync,
{
    pub fn new(store: D) -> Self {
        Self {
            store,
            update_lock: Mutex::new(()),
        }
    }

    /// Read access for selection and flushing; never takes the update lock.
    pub fn store(&self) -> &D {
        &self.store
    }

    #[tracing::instrument(skip(self))]
    pub async fn claim(&self, id: TrackId) -> Result<ClaimedTrack, ClaimError> {
        let _guard = self.update_lock.lock().await;

        let mut track = self
            .store
            .get_track(id)
            .await
            .context("Failed to read track for claim")?
            .ok_or(ClaimError::NotFound(id))?;

        if !track.outcome.can_transition_to(Outcome::Processing) {
            return Err(ClaimError::NotClaimable {
                id,
                outcome: track.outcome,
            });
        }

        track.outcome = Outcome::Processing;
        self.store
            .update_track(&track)
            .await
            .context("Failed to mark track as processing")?;

        tracing::debug!("Claimed track");
        Ok(ClaimedTrack { track })
    }

    #[tracing::instrument(skip_all, fields(track_id = %settled.track.id, outcome = %settled.track.outcome))]
    pub async fn commit(&self, settled: SettledTrack) -> anyhow::Result<Track> {
        let _guard = self.update_lock.lock().await;
        let track = settled.track;

        let current = self
            .store
            .get_track(track.id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Track {} disappeared before commit", track.id))?;

        if !current.outcome.can_transition_to(track.outcome) {
            anyhow::bail!(
                "Illegal outcome transition for track {}: {} -> {}",
                track.id,
                current.outcome,
                track.outcome
            );
        }

        self.store
            .update_track(&track)
            .await
            .inspect_err(|e| tracing::error!(error = ?e, "Failed to commit track outcome"))?;

        tracing::debug!("Committed track outcome");
        Ok(track)
    }
}
