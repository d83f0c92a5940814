use std::io;

use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;
pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("a pipeline run is already in progress (held by {owner})")]
    AlreadyRunning { owner: String },
    #[error("run lease '{0}' was lost before the run finished")]
    LeaseLost(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Database(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("{0}")]
    Config(String),
}

/// Failures of the raw or normalized store. `Unavailable` aborts a run,
/// `NotFound` is only ever raised by a dirty-flag update.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} does not exist")]
    NotFound(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Per-record transformation failures; these never leave the record loop.
#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("payload is missing field {0}")]
    MissingField(&'static str),
    #[error("invalid location: {0}")]
    InvalidLocation(String),
}
