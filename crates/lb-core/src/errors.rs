use thiserror::Error;

/// Failures of a single HTTP exchange
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Network error talking to {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

impl TransportError {
    pub(crate) fn from_reqwest(url: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else {
            Self::Network {
                url: url.to_string(),
                source: error,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
