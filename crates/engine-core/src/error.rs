use connectors::{SinkError, SourceError};
use schema_reconcile::ReconcileError;
use thiserror::Error;

/// Top-level error a batch run returns (§7). Aggregates every sub-crate error
/// plus the run-state and delete-phase failure kinds that belong to the
/// engine itself.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("run state missing on non-initial batch")]
    RunExpired,

    #[error("run state present but schema sync was not completed")]
    SchemaIncomplete,

    #[error("delete-phase candidate ratio exceeded the safety threshold")]
    DestructiveAnomaly,

    #[error("delete-phase source key scan exceeded the row ceiling")]
    KeyScanTooLarge,

    #[error("unauthorized")]
    Unauthorized,

    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("run log error: {0}")]
    Log(#[from] run_logger::LogError),
}

#[derive(Debug, Error)]
pub enum StateStoreError {
    #[error("storage error: {0}")]
    Storage(#[from] sled::Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}
