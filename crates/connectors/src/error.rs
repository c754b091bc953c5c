use thiserror::Error;

/// Errors surfaced by the Source Client (§4.1, §7).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("query rejected: {0}")]
    QueryRejected(String),

    #[error("query did not complete within the synchronous window: {0}")]
    QueryIncomplete(String),

    #[error("pagination failed: {0}")]
    PaginationFailed(String),

    #[error("load job failed: {0}")]
    LoadJobFailed(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),
}

/// Errors surfaced by the Sink Client (§4.2, §7).
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("sink DDL failed: {0}")]
    SinkDDLFailed(String),

    #[error("sink upsert failed: {0}")]
    SinkUpsertFailed(String),

    #[error("sink delete failed: {0}")]
    SinkDeleteFailed(String),
}
