use thiserror::Error;

use crate::generation::GenerationError;

#[derive(Error, Debug)]
pub enum NotewiseError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Failures raised by the note and history stores.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Note {0} does not exist; refusing to attach processing history")]
    OrphanRejected(i64),
}
