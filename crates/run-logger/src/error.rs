use thiserror::Error;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("run log storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("run log encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
