use crate::error::ConfigError;

/// Connection configuration sourced from the process environment (§10.3).
/// Job definitions describe *what* to sync; `EngineEnv` describes *where* the
/// warehouse, spreadsheet, and sink collaborators live and how to authenticate
/// against them. Kept separate from `Job` so the same job file can run against
/// a staging or production environment by swapping env vars alone.
#[derive(Debug, Clone)]
pub struct EngineEnv {
    pub warehouse_base_url: String,
    pub warehouse_credential_path: String,
    pub sheets_base_url: String,
    pub sheets_credential_path: String,
    pub sink_base_url: String,
    pub sink_service_role_key: String,
    pub state_dir: String,
    pub log_dir: String,
}

impl EngineEnv {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            warehouse_base_url: required("SYNC_WAREHOUSE_BASE_URL")?,
            warehouse_credential_path: required("SYNC_WAREHOUSE_CREDENTIAL_PATH")?,
            sheets_base_url: optional("SYNC_SHEETS_BASE_URL", "https://sheets.googleapis.com"),
            sheets_credential_path: optional("SYNC_SHEETS_CREDENTIAL_PATH", ""),
            sink_base_url: required("SYNC_SINK_BASE_URL")?,
            sink_service_role_key: required("SYNC_SINK_SERVICE_ROLE_KEY")?,
            state_dir: optional("SYNC_STATE_DIR", "./sync-state"),
            log_dir: optional("SYNC_LOG_DIR", "./sync-logs"),
        })
    }
}

fn required(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_var_is_reported_by_name() {
        std::env::remove_var("SYNC_WAREHOUSE_BASE_URL");
        let err = required("SYNC_WAREHOUSE_BASE_URL").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "SYNC_WAREHOUSE_BASE_URL"));
    }

    #[test]
    fn optional_var_falls_back_to_default() {
        std::env::remove_var("SYNC_LOG_DIR_TEST_UNSET");
        assert_eq!(optional("SYNC_LOG_DIR_TEST_UNSET", "./fallback"), "./fallback");
    }
}
