//! # Song Store
//!
//! Persistence for scraped radio tracks and the outcome of each acquisition attempt.
//!
//! Two backends share the [`DataStore`] contract: a flat JSON record file
//! ([`JsonDataStore`]) and a Postgres `songs` table ([`PgDataStore`]).

mod datastore;
mod domain;

pub use datastore::json::JsonDataStore;
pub use datastore::postgres::PgDataStore;
pub use datastore::{DataStore, InsertResult};
pub use domain::{
    parse_duration, slugify, NewTrack, Outcome, TerminalOutcome, Track, TrackId,
};
