//! Picks which tracks a run will try to acquire.

use std::collections::HashSet;

use itertools::Itertools;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use song_store::{Outcome, Track, TrackId};

#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    /// Upper bound on candidates per run
    pub limit: usize,
    /// Whether tracks that ended in `api-failure` on an earlier run are eligible again
    pub retry_api_failures: bool,
    pub excluded_stations: HashSet<String>,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            limit: 20,
            retry_api_failures: true,
            excluded_stations: HashSet::new(),
        }
    }
}

impl SelectionPolicy {
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn retry_api_failures(mut self, retry: bool) -> Self {
        self.retry_api_failures = retry;
        self
    }

    pub fn exclude_station(mut self, station: impl Into<String>) -> Self {
        self.excluded_stations.insert(station.into());
        self
    }

    pub fn is_eligible(&self, track: &Track) -> bool {
        let outcome_ok = match track.outcome {
            Outcome::Unprocessed => true,
            Outcome::ApiFailure => self.retry_api_failures,
            _ => false,
        };

        if !outcome_ok {
            tracing::debug!(track_id = %track.id, outcome = %track.outcome, "Skipping track because of its outcome");
            return false;
        }

        if let Some(station) = track
            .station
            .as_deref()
            .filter(|s| self.excluded_stations.contains(*s))
        {
            tracing::debug!(track_id = %track.id, station, "Skipping track from excluded station");
            return false;
        }

        true
    }
}

/// Walks the tracks in a uniformly shuffled order and collects up to
/// `policy.limit` distinct eligible ids.
#[tracing::instrument(skip_all, fields(total = tracks.len(), limit = policy.limit))]
pub fn select_candidates(tracks: &[Track], policy: &SelectionPolicy) -> Vec<TrackId> {
    let mut order = (0..tracks.len()).collect::<Vec<_>>();
    order.shuffle(&mut rand::rng());
    collect_eligible(tracks, &order, policy)
}

/// Same as [`select_candidates`] with a reproducible traversal order.
pub fn select_candidates_seeded(
    tracks: &[Track],
    policy: &SelectionPolicy,
    seed: u64,
) -> Vec<TrackId> {
    let mut order = (0..tracks.len()).collect::<Vec<_>>();
    order.shuffle(&mut StdRng::seed_from_u64(seed));
    collect_eligible(tracks, &order, policy)
}

fn collect_eligible(tracks: &[Track], order: &[usize], policy: &SelectionPolicy) -> Vec<TrackId> {
    let selected = order
        .iter()
        .map(|&idx| &tracks[idx])
        .filter(|track| policy.is_eligible(track))
        .map(|track| track.id)
        .unique()
        .take(policy.limit)
        .collect::<Vec<_>>();

    tracing::debug!(selected = selected.len(), "Selected candidate tracks");
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> Vec<Track> {
        let outcomes = [
            (Outcome::Unprocessed, "KUTX"),
            (Outcome::Success, "KUTX"),
            (Outcome::ApiFailure, "KBPA"),
            (Outcome::Error, "KBPA"),
            (Outcome::DubFailure, "W249AR"),
            (Outcome::Processing, "W249AR"),
            (Outcome::Unprocessed, "KCRW"),
            (Outcome::Unprocessed, "WQNQHD2"),
        ];
        outcomes
            .into_iter()
            .enumerate()
            .map(|(idx, (outcome, station))| Track {
                id: TrackId(idx as i64),
                station: Some(station.into()),
                outcome,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_only_eligible_tracks_are_selected() {
        let tracks = tracks();
        let policy = SelectionPolicy::default().exclude_station("KCRW");

        for seed in 0..32 {
            let mut selected = select_candidates_seeded(&tracks, &policy, seed);
            selected.sort();
            assert_eq!(selected, vec![TrackId(0), TrackId(2), TrackId(7)]);
        }
    }

    #[test]
    fn test_api_failures_can_be_left_out() {
        let tracks = tracks();
        let policy = SelectionPolicy::default().retry_api_failures(false);

        let mut selected = select_candidates(&tracks, &policy);
        selected.sort();
        assert_eq!(selected, vec![TrackId(0), TrackId(6), TrackId(7)]);
    }

    #[test]
    fn test_limit_bounds_the_result() {
        let tracks = (0..100)
            .map(|idx| Track {
                id: TrackId(idx),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let policy = SelectionPolicy::default().limit(10);

        let selected = select_candidates(&tracks, &policy);
        assert_eq!(selected.len(), 10);
        assert_eq!(selected.iter().unique().count(), 10);
    }

    #[test]
    fn test_fewer_eligible_than_limit_is_not_an_error() {
        let tracks = tracks();
        let policy = SelectionPolicy::default().limit(50);
        assert_eq!(select_candidates(&tracks, &policy).len(), 4);
        assert!(select_candidates(&[], &policy).is_empty());
    }

    #[test]
    fn test_selection_is_not_biased_to_the_front() {
        let tracks = (0..50)
            .map(|idx| Track {
                id: TrackId(idx),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let policy = SelectionPolicy::default().limit(5);

        let front = (0..5).map(TrackId).collect::<Vec<_>>();
        let all_front = (0..20)
            .map(|seed| select_candidates_seeded(&tracks, &policy, seed))
            .all(|selected| selected == front);
        assert!(!all_front);
    }

    #[test]
    fn test_same_seed_same_selection() {
        let tracks = tracks();
        let policy = SelectionPolicy::default();
        assert_eq!(
            select_candidates_seeded(&tracks, &policy, 42),
            select_candidates_seeded(&tracks, &policy, 42)
        );
    }
}
