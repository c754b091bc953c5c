use crate::{field::Schema, pagination::CursorTuple, value::Value};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Error,
}

/// One end-to-end synchronization attempt (§3 Data Model: Run).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub run_id: String,
    pub job_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
}

impl Run {
    pub fn start(job_id: impl Into<String>, run_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            run_id: run_id.into(),
            job_id: job_id.into(),
            started_at: now,
            ended_at: None,
            status: RunStatus::Running,
        }
    }
}

/// Resumption record for a Run (§3 Data Model: Run State). Exists iff a run is
/// mid-flight (I4); overwritten on every non-terminal batch, deleted on the
/// terminal batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    pub job_id: String,
    pub run_id: String,
    pub last_sync_value: Option<Value>,
    /// Immutable after batch 1 (I1).
    pub source_schema: Schema,
    pub rows_processed: u64,
    pub start_time: DateTime<Utc>,
    pub schema_sync_done: bool,
    pub cursor: Option<CursorTuple>,
    /// Spreadsheet variant only: row offset of the next unread row.
    pub sheet_row_offset: Option<u64>,
    pub is_new_table: bool,
}

impl RunState {
    pub fn init(job_id: impl Into<String>, run_id: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            job_id: job_id.into(),
            run_id: run_id.into(),
            last_sync_value: None,
            source_schema: Schema::default(),
            rows_processed: 0,
            start_time,
            schema_sync_done: false,
            cursor: None,
            sheet_row_offset: None,
            is_new_table: false,
        }
    }
}

/// Result of one `run_batch` invocation, mirroring the admin surface's
/// `POST /api/sync/{id}` response shape (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    pub success: bool,
    pub run_id: String,
    pub has_more: bool,
    pub next_batch: Option<u32>,
    pub rows_processed: u64,
    pub rows_deleted: Option<u64>,
    pub stats: Option<BatchStats>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchStats {
    pub total_rows_processed: u64,
    pub elapsed_seconds: f64,
}
