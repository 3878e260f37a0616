mod error;
mod ledger;
mod processor;
pub mod query;
pub mod selector;
pub mod tags;
#[cfg(test)]
mod test_server;
pub mod tracing;
pub mod types;
pub mod worker;
pub mod yt;

pub use error::{DownloadError, Error, ResolveError};
pub use ledger::{ClaimError, ClaimedTrack, SettledTrack, TrackLedger};
pub use processor::{builder::HarvestProcessorBuilder, HarvestProcessor, RunSummary, TrackReport};
pub use selector::SelectionPolicy;
