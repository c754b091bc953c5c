use crate::error::CliError;
use connectors::auth::{ServiceAccountCredential, TokenCache};
use connectors::{SinkClient, SourceClient};
use engine_config::EngineEnv;
use engine_core::metrics::Metrics;
use engine_core::state::RunStateStore;
use run_logger::RunLogger;
use std::sync::Arc;

const WAREHOUSE_SCOPE: &str = "https://www.googleapis.com/auth/bigquery";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Everything `run_batch` needs, built once per CLI invocation from
/// `EngineEnv` (§10.3). Kept separate from `engine_runtime::EngineClients` so
/// this crate owns the connections while the engine only borrows them.
pub struct Clients {
    pub source: SourceClient,
    pub sink: SinkClient,
    pub state_store: RunStateStore,
    pub logger: RunLogger,
    pub metrics: Metrics,
}

pub fn build(env: &EngineEnv) -> Result<Clients, CliError> {
    let http = reqwest::Client::new();

    let warehouse_credential = load_credential(&env.warehouse_credential_path)?;
    let warehouse_auth = Arc::new(TokenCache::new(http.clone(), warehouse_credential.clone(), WAREHOUSE_SCOPE));

    let sheets_credential = if env.sheets_credential_path.is_empty() {
        warehouse_credential
    } else {
        load_credential(&env.sheets_credential_path)?
    };
    let sheets_auth = Arc::new(TokenCache::new(http.clone(), sheets_credential, SHEETS_SCOPE));

    let source = SourceClient::new(
        http.clone(),
        env.warehouse_base_url.clone(),
        warehouse_auth,
        env.sheets_base_url.clone(),
        sheets_auth,
    );
    let sink = SinkClient::new(http, env.sink_base_url.clone(), env.sink_service_role_key.clone());

    let state_store = RunStateStore::open(&env.state_dir)?;
    let logger = RunLogger::open(&env.log_dir)?;
    let metrics = Metrics::new();

    Ok(Clients {
        source,
        sink,
        state_store,
        logger,
        metrics,
    })
}

fn load_credential(path: &str) -> Result<ServiceAccountCredential, CliError> {
    let raw = std::fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(CliError::CredentialParse)
}
