//! Worker error type shared by the classification-side batch jobs.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Client(#[from] scout_clients::ClientError),

    #[error("configuration error: {0}")]
    Config(String),
}
