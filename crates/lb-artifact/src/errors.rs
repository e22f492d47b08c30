use std::path::PathBuf;

use lb_core::{StatusCode, TransportError};
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Artifact '{path}' lists {count} distinct mirror(s), at least 2 are required")]
    InsufficientMirrors { path: PathBuf, count: usize },

    #[error("Fetch policy allows no download rounds")]
    NoRounds,

    /// Local filesystem failure, including placing a verified download. Never retried.
    #[error("Failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Download of '{path}' failed after {} round(s)", .attempts.len())]
    DownloadFailed {
        path: PathBuf,
        attempts: Vec<FailedRound>,
    },
}

/// Why one download round was abandoned. All of these are retried on another mirror.
#[derive(Debug, Error)]
pub enum RoundFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Mirror answered with status {0}")]
    Status(StatusCode),

    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },
}

#[derive(Debug)]
pub struct FailedRound {
    pub mirror: Url,
    pub failure: RoundFailure,
}

pub type Result<T> = std::result::Result<T, ArtifactError>;
