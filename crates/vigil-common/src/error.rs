use thiserror::Error;

/// Failure while fetching from one authority source.
///
/// Transient failures are worth retrying on a later run; permanent ones
/// (schema drift, rejected requests) are surfaced to the run report and
/// not retried within the same run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transient fetch failure: {0}")]
    Transient(String),

    #[error("permanent fetch failure: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        // Timeouts and connection resets retry; decode and builder
        // failures do not.
        if e.is_timeout() || e.is_connect() {
            FetchError::Transient(e.to_string())
        } else {
            FetchError::Permanent(e.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum VigilError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("persist error: {0}")]
    Persist(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl VigilError {
    /// True when the persistence layer itself is unreachable, as opposed to
    /// a per-record write failure. Unreachable storage aborts the run.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            VigilError::Persist(e) => matches!(
                e,
                sqlx::Error::Io(_)
                    | sqlx::Error::PoolTimedOut
                    | sqlx::Error::PoolClosed
                    | sqlx::Error::Tls(_)
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, VigilError>;
