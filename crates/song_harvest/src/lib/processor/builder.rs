use std::{path::PathBuf, time::Duration};

use song_store::DataStore;

use crate::{
    ledger::TrackLedger,
    selector::SelectionPolicy,
    worker::AcquisitionWorker,
    yt::{AudioHandler, DownloadResolver, SourceResolver},
    HarvestProcessor,
};

pub struct HarvestProcessorBuilder<D = (), S = (), R = (), A = ()> {
    download_dir: PathBuf,
    store: D,
    source_resolver: S,
    download_resolver: R,
    audio_handler: A,
    policy: SelectionPolicy,
    workers: usize,
    throttle: Option<Duration>,
}

impl HarvestProcessorBuilder {
    pub const DEFAULT_WORKERS: usize = 3;

    pub fn new(download_dir: impl Into<PathBuf>) -> Self {
        Self {
            download_dir: download_dir.into(),
            store: (),
            source_resolver: (),
            download_resolver: (),
            audio_handler: (),
            policy: SelectionPolicy::default(),
            workers: Self::DEFAULT_WORKERS,
            throttle: None,
        }
    }
}

impl<D, S, R, A> HarvestProcessorBuilder<D, S, R, A> {
    pub fn store<D2: DataStore + Send + Sync + 'static>(
        self,
        store: D2,
    ) -> HarvestProcessorBuilder<D2, S, R, A> {
        HarvestProcessorBuilder {
            download_dir: self.download_dir,
            store,
            source_resolver: self.source_resolver,
            download_resolver: self.download_resolver,
            audio_handler: self.audio_handler,
            policy: self.policy,
            workers: self.workers,
            throttle: self.throttle,
        }
    }

    pub fn source_resolver<S2: SourceResolver + Send + Sync + 'static>(
        self,
        source_resolver: S2,
    ) -> HarvestProcessorBuilder<D, S2, R, A> {
        HarvestProcessorBuilder {
            download_dir: self.download_dir,
            store: self.store,
            source_resolver,
            download_resolver: self.download_resolver,
            audio_handler: self.audio_handler,
            policy: self.policy,
            workers: self.workers,
            throttle: self.throttle,
        }
    }

    pub fn download_resolver<R2: DownloadResolver + Send + Sync + 'static>(
        self,
        download_resolver: R2,
    ) -> HarvestProcessorBuilder<D, S, R2, A> {
        HarvestProcessorBuilder {
            download_dir: self.download_dir,
            store: self.store,
            source_resolver: self.source_resolver,
            download_resolver,
            audio_handler: self.audio_handler,
            policy: self.policy,
            workers: self.workers,
            throttle: self.throttle,
        }
    }

    pub fn audio_handler<A2: AudioHandler + Send + Sync + 'static>(
        self,
        audio_handler: A2,
    ) -> HarvestProcessorBuilder<D, S, R, A2> {
        HarvestProcessorBuilder {
            download_dir: self.download_dir,
            store: self.store,
            source_resolver: self.source_resolver,
            download_resolver: self.download_resolver,
            audio_handler,
            policy: self.policy,
            workers: self.workers,
            throttle: self.throttle,
        }
    }

    pub fn policy(mut self, policy: SelectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Number of tracks processed concurrently; zero is treated as one
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Pause taken around each transcode
    pub fn throttle(mut self, throttle: Duration) -> Self {
        self.throttle = Some(throttle);
        self
    }
}

impl<D, S, R, A> HarvestProcessorBuilder<D, S, R, A>
where
    D: DataStore + Send + Sync + 'static,
    S: SourceResolver + Send + Sync + 'static,
    R: DownloadResolver + Send + Sync + 'static,
    A: AudioHandler + Send + Sync + 'static,
{
    pub fn build(self) -> HarvestProcessor<D, S, R, A> {
        let worker = AcquisitionWorker::new(self.audio_handler, self.download_dir);
        let worker = match self.throttle {
            Some(throttle) => worker.with_throttle(throttle),
            None => worker,
        };

        HarvestProcessor {
            ledger: TrackLedger::new(self.store),
            source_resolver: self.source_resolver,
            download_resolver: self.download_resolver,
            worker,
            policy: self.policy,
            workers: self.workers,
        }
    }
}
