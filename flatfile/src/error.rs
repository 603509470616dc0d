use thiserror::Error;

/// Failure to acquire the bytes of a source
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {location}: {source}")]
    Http {
        location: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("invalid URL {0:?}")]
    InvalidUrl(String),
}

#[derive(Debug, Error)]
pub enum FlatFileError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("invalid field path {0:?}: expected dot-separated field indices")]
    InvalidFieldPath(String),
}
