use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}
