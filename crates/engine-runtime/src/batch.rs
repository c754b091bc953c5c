use crate::{sheet, warehouse};
use connectors::{SinkClient, SourceClient};
use engine_core::metrics::Metrics;
use engine_core::state::RunStateStore;
use engine_core::EngineError;
use model::job::{Job, JobVariant};
use model::run::{BatchResult, RunStatus};
use run_logger::RunLogger;

/// Borrowed handles a batch run needs; owned once per process by the CLI and
/// passed down by reference so every module here stays free of its own
/// connection setup (§4 Architecture).
pub struct EngineClients<'a> {
    pub source: &'a SourceClient,
    pub sink: &'a SinkClient,
    pub state_store: &'a RunStateStore,
    pub logger: &'a RunLogger,
    pub metrics: &'a Metrics,
}

/// Runs exactly one batch of `job`, dispatching to the variant-specific state
/// machine (§4.4). Batch 1 opens the run in the Run Logger; any error closes
/// it with a terminal `ERROR` entry and records it on the job itself before
/// being returned to the caller.
pub async fn run_batch(
    clients: &EngineClients<'_>,
    job: &mut Job,
    run_id: &str,
    batch_number: u32,
    dry_run: bool,
) -> Result<BatchResult, EngineError> {
    if batch_number == 0 {
        return Err(EngineError::ConfigInvalid(
            "batch_number is 1-indexed; 0 is not a valid batch".to_string(),
        ));
    }

    if batch_number == 1 {
        clients.logger.start_run(&job.id, run_id)?;
    }

    let result = match job.variant {
        JobVariant::WarehouseToSink => warehouse::run(clients, job, run_id, batch_number, dry_run).await,
        JobVariant::SheetToWarehouse => sheet::run(clients, job, run_id, batch_number, dry_run).await,
    };

    if let Err(err) = &result {
        job.mark_error(err.to_string());
        let _ = clients.logger.end_run(&job.id, run_id, RunStatus::Error, err.to_string());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::job::{OnDateTie, SinkLocator, SourceLocator};

    fn warehouse_job() -> Job {
        Job {
            id: "job-1".into(),
            name: "orders".into(),
            enabled: true,
            variant: JobVariant::WarehouseToSink,
            source: SourceLocator { project: "p".into(), dataset: "d".into(), table: "orders".into() },
            sink: SinkLocator { table: "orders".into(), project: None, dataset: None },
            incremental_column: Some("updated_at".into()),
            force_string_fields: vec![],
            upsert_columns: vec!["id".into()],
            sheets_append: false,
            cron_schedule: None,
            on_date_tie: OnDateTie::Skip,
            last_run: None,
        }
    }

    #[test]
    fn dispatch_selects_warehouse_variant_for_bq_to_supabase_jobs() {
        let job = warehouse_job();
        assert!(matches!(job.variant, JobVariant::WarehouseToSink));
    }

    #[tokio::test]
    async fn rejects_batch_number_zero_before_opening_clients() {
        let state_store = engine_core::state::RunStateStore::open(
            tempfile::tempdir().unwrap().path(),
        )
        .unwrap();
        let logger = run_logger::RunLogger::open(tempfile::tempdir().unwrap().path()).unwrap();
        let metrics = Metrics::new();
        let http = reqwest::Client::new();
        let source = SourceClient::new(
            http.clone(),
            "https://warehouse.example".into(),
            std::sync::Arc::new(connectors::auth::TokenCache::new(
                http.clone(),
                connectors::auth::ServiceAccountCredential {
                    client_email: "svc@example.iam".into(),
                    private_key: String::new(),
                    token_uri: "https://example.com/token".into(),
                },
                "scope",
            )),
            "https://sheets.example".into(),
            std::sync::Arc::new(connectors::auth::TokenCache::new(
                http.clone(),
                connectors::auth::ServiceAccountCredential {
                    client_email: "svc@example.iam".into(),
                    private_key: String::new(),
                    token_uri: "https://example.com/token".into(),
                },
                "scope",
            )),
        );
        let sink = SinkClient::new(http, "https://sink.example".into(), "key".into());
        let clients = EngineClients {
            source: &source,
            sink: &sink,
            state_store: &state_store,
            logger: &logger,
            metrics: &metrics,
        };
        let mut job = warehouse_job();
        let err = run_batch(&clients, &mut job, "run-1", 0, false).await.unwrap_err();
        assert!(matches!(err, EngineError::ConfigInvalid(_)));
    }
}
