//! Export error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("database error: {0}")]
    Store(#[from] sqlx::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
