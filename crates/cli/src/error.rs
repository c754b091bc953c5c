use engine_config::ConfigError;
use engine_core::error::StateStoreError;
use engine_core::EngineError;
use run_logger::LogError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("batch run failed: {0}")]
    Engine(#[from] EngineError),

    #[error("run state store error: {0}")]
    StateStore(#[from] StateStoreError),

    #[error("run log error: {0}")]
    Log(#[from] LogError),

    #[error("failed to parse service-account credential: {0}")]
    CredentialParse(serde_json::Error),

    #[error("failed to serialize output to JSON: {0}")]
    JsonSerialize(serde_json::Error),
}
