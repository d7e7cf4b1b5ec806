use thiserror::Error;

/// Typed failures at the persistence and classification seams. Feed and
/// per-item problems never surface here: the ingest pipeline degrades
/// them to absent values or skipped items instead of erroring.
#[derive(Error, Debug)]
pub enum AlertwireError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Classification error: {0}")]
    Classification(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
