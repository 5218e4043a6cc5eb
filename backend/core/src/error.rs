use thiserror::Error;

/// Top-level error type for the Dustline runtime.
#[derive(Debug, Error)]
pub enum BotError {
    #[error("upstream service unavailable: {0}")]
    Upstream(String),

    #[error("session persistence failed: {0}")]
    Persistence(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
