use crate::error::StateStoreError;
use chrono::{DateTime, Duration, Utc};
use model::run::RunState;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 24-hour TTL as a garbage-collection backstop against orphaned runs (§4.6).
fn state_ttl() -> Duration {
    Duration::hours(24)
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    written_at: DateTime<Utc>,
    state: RunState,
}

/// Opaque key/value store under `sync_state:{job}:{run}` (§4.6). Writes are
/// idempotent rewrites - each batch fully recomputes the Run State, so there
/// is no stage-ranking to reconcile, unlike a store that accumulates partial
/// progress. The terminal batch deletes the key (I4).
pub struct RunStateStore {
    db: sled::Db,
}

impl RunStateStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StateStoreError> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    fn key(job_id: &str, run_id: &str) -> String {
        format!("sync_state:{job_id}:{run_id}")
    }

    pub fn save(&self, job_id: &str, run_id: &str, state: &RunState) -> Result<(), StateStoreError> {
        let stored = StoredState {
            written_at: Utc::now(),
            state: state.clone(),
        };
        self.db.insert(Self::key(job_id, run_id), serde_json::to_vec(&stored)?)?;
        Ok(())
    }

    pub fn load(&self, job_id: &str, run_id: &str) -> Result<Option<RunState>, StateStoreError> {
        let key = Self::key(job_id, run_id);
        let Some(bytes) = self.db.get(&key)? else {
            return Ok(None);
        };
        let stored: StoredState = serde_json::from_slice(&bytes)?;
        if Utc::now().signed_duration_since(stored.written_at) >= state_ttl() {
            self.db.remove(&key)?;
            return Ok(None);
        }
        Ok(Some(stored.state))
    }

    pub fn delete(&self, job_id: &str, run_id: &str) -> Result<(), StateStoreError> {
        self.db.remove(Self::key(job_id, run_id))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::field::Schema;
    use tempfile::tempdir;

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempdir().unwrap();
        let store = RunStateStore::open(dir.path()).unwrap();
        let state = RunState::init("job-1", "run-1", Utc::now());
        store.save("job-1", "run-1", &state).unwrap();

        let loaded = store.load("job-1", "run-1").unwrap().unwrap();
        assert_eq!(loaded.run_id, "run-1");
        assert_eq!(loaded.source_schema, Schema::default());
    }

    #[test]
    fn delete_removes_state() {
        let dir = tempdir().unwrap();
        let store = RunStateStore::open(dir.path()).unwrap();
        let state = RunState::init("job-1", "run-1", Utc::now());
        store.save("job-1", "run-1", &state).unwrap();
        store.delete("job-1", "run-1").unwrap();
        assert!(store.load("job-1", "run-1").unwrap().is_none());
    }

    #[test]
    fn missing_run_returns_none() {
        let dir = tempdir().unwrap();
        let store = RunStateStore::open(dir.path()).unwrap();
        assert!(store.load("job-1", "ghost-run").unwrap().is_none());
    }
}
