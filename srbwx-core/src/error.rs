use thiserror::Error;

/// Failure of a forecast fetch cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Primary request failed or returned a non-success status.
    #[error("forecast request for {city} failed: {message}")]
    Network { city: String, message: String },

    /// Primary response arrived but could not be turned into a snapshot.
    #[error("forecast for {city} could not be read: {message}")]
    Parse { city: String, message: String },

    /// The group was superseded by a newer city selection.
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

/// Error returned by a [`crate::provider::WeatherSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed payload: {0}")]
    Payload(String),
}

impl SourceError {
    pub(crate) fn into_fetch_error(self, city: &str) -> FetchError {
        match self {
            SourceError::Payload(message) => FetchError::Parse {
                city: city.to_string(),
                message,
            },
            other => FetchError::Network {
                city: city.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage quota exceeded")]
    QuotaExceeded,
}
