use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriftError {
    #[error("missing {0} in payload")]
    MissingField(&'static str),

    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("no data found for key: {0}")]
    NotFound(String),

    #[error("invalid threshold value: {0}")]
    InvalidThreshold(String),

    #[error("invalid project id: {0}")]
    InvalidProjectId(String),

    #[error("issue tracker unavailable: {0}")]
    TrackerUnavailable(String),

    #[error("issue tracker rejected the request: status {status}")]
    TrackerRejected { status: u16 },
}

impl From<redis::RedisError> for DriftError {
    fn from(err: redis::RedisError) -> Self {
        DriftError::StoreUnavailable(err.to_string())
    }
}

impl From<reqwest::Error> for DriftError {
    fn from(err: reqwest::Error) -> Self {
        DriftError::TrackerUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DriftError>;
