use crate::messaging::PublisherError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RankingError {
    #[error("Database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("Failed to persist ranking data: {0}")]
    Persistence(String),

    #[error("Failed to broadcast notification: {0}")]
    Notification(#[from] PublisherError),

    #[error("Ranking run was cancelled")]
    Cancelled,

    #[error("Ranking run exceeded its deadline")]
    DeadlineExceeded,

    #[error("Another ranking run is already in progress")]
    AlreadyRunning,

    #[error("Invalid configuration: {0}")]
    Config(String)
}
