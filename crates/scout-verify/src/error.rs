//! Verifier error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error(transparent)]
    Client(#[from] scout_clients::ClientError),
}
