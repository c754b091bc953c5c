pub mod error;
pub mod metrics;
pub mod state;

pub use error::EngineError;
pub use metrics::{Metrics, MetricsSnapshot};
pub use state::RunStateStore;

/// Generates a fresh run id for a batch-1 invocation that wasn't given one
/// explicitly (§3 Data Model: Run).
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
