mod error;
mod redact;

pub use error::LogError;
pub use redact::redact_metadata;

use chrono::{Duration as ChronoDuration, Utc};
use model::log::{LogEntry, RunInfo};
use model::run::RunStatus;
use serde::{Deserialize, Serialize};
use std::path::Path;

const MAX_ENTRIES_PER_RUN: usize = 500;
const MAX_RUNS_PER_JOB: usize = 50;

fn entry_ttl() -> ChronoDuration {
    ChronoDuration::hours(24)
}

fn run_index_ttl() -> ChronoDuration {
    ChronoDuration::days(30)
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
struct RunLog {
    entries: Vec<LogEntry>,
}

/// Per-run, per-job structured log store with a 24h TTL on entries and a 30d
/// TTL on the run index (§4.5). Distinct from process-level `tracing` output -
/// this is the admin dashboard's diagnostic trail, persisted to KV.
pub struct RunLogger {
    db: sled::Db,
}

impl RunLogger {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn logs_key(job_id: &str, run_id: &str) -> String {
        format!("logs:{job_id}:{run_id}")
    }

    fn latest_key(job_id: &str) -> String {
        format!("logs:{job_id}:latest")
    }

    fn job_runs_key(job_id: &str) -> String {
        format!("jobRuns:{job_id}")
    }

    /// Opens a new run record and makes it the job's latest pointer.
    pub fn start_run(&self, job_id: &str, run_id: &str) -> Result<(), LogError> {
        let now = Utc::now();
        let info = RunInfo {
            run_id: run_id.to_string(),
            timestamp: now,
        };
        self.db
            .insert(Self::latest_key(job_id), serde_json::to_vec(&info)?)?;

        let mut runs = self.read_run_index(job_id)?;
        runs.retain(|r| now.signed_duration_since(r.timestamp) < run_index_ttl());
        runs.insert(0, info);
        runs.truncate(MAX_RUNS_PER_JOB);
        self.db
            .insert(Self::job_runs_key(job_id), serde_json::to_vec(&runs)?)?;

        self.db
            .insert(Self::logs_key(job_id, run_id), serde_json::to_vec(&RunLog::default())?)?;
        Ok(())
    }

    /// Appends one diagnostic entry, redacting its metadata first. Silently
    /// drops entries past the 500-entry cap for the run (logged to stderr via
    /// `tracing`, never persisted) rather than growing the record unbounded.
    pub fn log(&self, mut entry: LogEntry) -> Result<(), LogError> {
        entry.metadata = redact_metadata(entry.metadata);
        let key = Self::logs_key(&entry.job_id, &entry.run_id);
        let mut log = self.read_run_log(&entry.job_id, &entry.run_id)?.unwrap_or_default();
        if log.entries.len() >= MAX_ENTRIES_PER_RUN {
            tracing::warn!(
                job_id = %entry.job_id,
                run_id = %entry.run_id,
                "run log entry cap reached; dropping entry (stderr only)"
            );
            return Ok(());
        }
        log.entries.push(entry);
        self.db.insert(key, serde_json::to_vec(&log)?)?;
        Ok(())
    }

    /// Ends the run, recording a terminal status entry.
    pub fn end_run(&self, job_id: &str, run_id: &str, status: RunStatus, message: impl Into<String>) -> Result<(), LogError> {
        use model::log::LogLevel;
        let level = match status {
            RunStatus::Success => LogLevel::Success,
            RunStatus::Error => LogLevel::Error,
            RunStatus::Running => LogLevel::Info,
        };
        self.log(LogEntry::new(level, "run_end", job_id, run_id, message))
    }

    pub fn list_runs(&self, job_id: &str) -> Result<Vec<RunInfo>, LogError> {
        let now = Utc::now();
        let mut runs = self.read_run_index(job_id)?;
        runs.retain(|r| now.signed_duration_since(r.timestamp) < run_index_ttl());
        Ok(runs)
    }

    /// Reads up to `limit` entries for `(job, run)`, newest first. Entries
    /// older than the 24h TTL are treated as already expired.
    pub fn read(&self, job_id: &str, run_id: &str, limit: usize) -> Result<Vec<LogEntry>, LogError> {
        let now = Utc::now();
        let log = self.read_run_log(job_id, run_id)?.unwrap_or_default();
        let mut entries: Vec<LogEntry> = log
            .entries
            .into_iter()
            .filter(|e| now.signed_duration_since(e.timestamp) < entry_ttl())
            .collect();
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }

    /// Clears a single run's logs, or every run for the job when `run_id` is
    /// `None`.
    pub fn clear(&self, job_id: &str, run_id: Option<&str>) -> Result<u64, LogError> {
        match run_id {
            Some(run_id) => {
                let removed = self.db.remove(Self::logs_key(job_id, run_id))?.is_some();
                Ok(removed as u64)
            }
            None => {
                let prefix = format!("logs:{job_id}:");
                let mut removed = 0u64;
                for item in self.db.scan_prefix(prefix) {
                    let (key, _) = item?;
                    self.db.remove(key)?;
                    removed += 1;
                }
                self.db.remove(Self::job_runs_key(job_id))?;
                Ok(removed)
            }
        }
    }

    fn read_run_index(&self, job_id: &str) -> Result<Vec<RunInfo>, LogError> {
        match self.db.get(Self::job_runs_key(job_id))? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(Vec::new()),
        }
    }

    fn read_run_log(&self, job_id: &str, run_id: &str) -> Result<Option<RunLog>, LogError> {
        match self.db.get(Self::logs_key(job_id, run_id))? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::log::LogLevel;
    use tempfile::tempdir;

    #[test]
    fn start_run_registers_latest_pointer_and_index() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::open(dir.path()).unwrap();
        logger.start_run("job-1", "run-1").unwrap();

        let runs = logger.list_runs("job-1").unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].run_id, "run-1");
    }

    #[test]
    fn log_entries_are_read_back_newest_first() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::open(dir.path()).unwrap();
        logger.start_run("job-1", "run-1").unwrap();
        logger
            .log(LogEntry::new(LogLevel::Info, "fetch", "job-1", "run-1", "first"))
            .unwrap();
        logger
            .log(LogEntry::new(LogLevel::Info, "upsert", "job-1", "run-1", "second"))
            .unwrap();

        let entries = logger.read("job-1", "run-1", 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "second");
    }

    #[test]
    fn clear_single_run_leaves_other_runs_intact() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::open(dir.path()).unwrap();
        logger.start_run("job-1", "run-1").unwrap();
        logger.start_run("job-1", "run-2").unwrap();
        logger
            .log(LogEntry::new(LogLevel::Info, "fetch", "job-1", "run-1", "hello"))
            .unwrap();

        logger.clear("job-1", Some("run-1")).unwrap();
        assert!(logger.read("job-1", "run-1", 10).unwrap().is_empty());
        assert_eq!(logger.list_runs("job-1").unwrap().len(), 2);
    }

    #[test]
    fn entry_cap_drops_overflow_without_growing_record() {
        let dir = tempdir().unwrap();
        let logger = RunLogger::open(dir.path()).unwrap();
        logger.start_run("job-1", "run-1").unwrap();
        for i in 0..(MAX_ENTRIES_PER_RUN + 10) {
            logger
                .log(LogEntry::new(LogLevel::Debug, "fetch", "job-1", "run-1", format!("entry {i}")))
                .unwrap();
        }
        let entries = logger.read("job-1", "run-1", MAX_ENTRIES_PER_RUN + 10).unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES_PER_RUN);
    }
}
