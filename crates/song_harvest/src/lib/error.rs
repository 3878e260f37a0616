use song_store::TerminalOutcome;

/// Failure of the search step.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Search query is empty")]
    EmptyQuery,
    #[error("Search request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Search returned HTTP {0}")]
    Status(u16),
    #[error("No media identifier found in search results")]
    NoMatch,
}

/// Failure of the download API step.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Download API could not retrieve info: {0}")]
    ApiFailure(String),
    #[error("Download API returned no matching audio stream")]
    StreamNotFound,
    #[error("Download API request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Everything that can stop a single track's acquisition.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Resolution(#[from] ResolveError),
    #[error("Download API failure: {0}")]
    ApiFailure(String),
    #[error("Download API returned no matching audio stream")]
    StreamNotFound,
    #[error("Failed to fetch audio: {0}")]
    Fetch(String),
    #[error("Failed to transcode audio: {0}")]
    Transcode(String),
    #[error(transparent)]
    Uncaught(#[from] anyhow::Error),
}

impl From<DownloadError> for Error {
    fn from(value: DownloadError) -> Self {
        match value {
            DownloadError::ApiFailure(message) => Error::ApiFailure(message),
            DownloadError::StreamNotFound => Error::StreamNotFound,
            // timeouts count as api failures so the track is retried on a later run
            DownloadError::Request(e) if e.is_timeout() => Error::ApiFailure(e.to_string()),
            DownloadError::Request(e) => Error::Uncaught(e.into()),
        }
    }
}

impl Error {
    pub fn outcome(&self) -> TerminalOutcome {
        match self {
            Error::ApiFailure(_) | Error::StreamNotFound => TerminalOutcome::ApiFailure,
            Error::Transcode(_) => TerminalOutcome::DubFailure,
            Error::Resolution(_) | Error::Fetch(_) | Error::Uncaught(_) => TerminalOutcome::Error,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Error::Resolution(_) => "resolve-source",
            Error::ApiFailure(_) | Error::StreamNotFound => "resolve-download",
            Error::Fetch(_) => "fetch",
            Error::Transcode(_) => "transcode",
            Error::Uncaught(_) => "pipeline",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_mapping() {
        assert_eq!(
            Error::from(ResolveError::NoMatch).outcome(),
            TerminalOutcome::Error
        );
        assert_eq!(
            Error::from(DownloadError::ApiFailure("Failed to get info".into())).outcome(),
            TerminalOutcome::ApiFailure
        );
        assert_eq!(
            Error::from(DownloadError::StreamNotFound).outcome(),
            TerminalOutcome::ApiFailure
        );
        assert_eq!(
            Error::Fetch("connection reset".into()).outcome(),
            TerminalOutcome::Error
        );
        assert_eq!(
            Error::Transcode("ffmpeg exited with 1".into()).outcome(),
            TerminalOutcome::DubFailure
        );
        assert_eq!(
            Error::from(anyhow::anyhow!("boom")).outcome(),
            TerminalOutcome::Error
        );
    }

    #[test]
    fn test_download_errors_stay_distinct() {
        assert!(matches!(
            Error::from(DownloadError::ApiFailure("x".into())),
            Error::ApiFailure(_)
        ));
        assert!(matches!(
            Error::from(DownloadError::StreamNotFound),
            Error::StreamNotFound
        ));
    }
}
