use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

/// One diagnostic event (§3 Data Model: Log Entry).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub phase: String,
    pub job_id: String,
    pub run_id: String,
    pub message: String,
    /// Redacted before persistence; see `run_logger::redact`.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl LogEntry {
    pub fn new(
        level: LogLevel,
        phase: impl Into<String>,
        job_id: impl Into<String>,
        run_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            phase: phase.into(),
            job_id: job_id.into(),
            run_id: run_id.into(),
            message: message.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub timestamp: DateTime<Utc>,
}
