use crate::error::ConfigError;
use model::job::Job;
use std::path::Path;

/// Loads a Job definition from a local file, standing in for the admin
/// surface's Job CRUD store when the engine runs standalone via the CLI
/// (§10.3). TOML is tried first when the extension is ambiguous, since the
/// teacher's own config examples are TOML.
pub fn load_job_file(path: impl AsRef<Path>) -> Result<Job, ConfigError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string())),
        Some("toml") => toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string())),
        _ => toml::from_str(&raw)
            .map_err(|toml_err| toml_err.to_string())
            .or_else(|toml_err| {
                serde_json::from_str(&raw).map_err(|json_err| format!("{toml_err}; {json_err}"))
            })
            .map_err(ConfigError::Parse),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_toml_job_definition() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(
            file,
            r#"
            id = "job-1"
            name = "orders sync"
            variant = "warehouse-to-sink"
            upsert_columns = ["id"]

            [source]
            project = "proj"
            dataset = "ds"
            table = "orders"

            [sink]
            table = "orders"
            "#
        )
        .unwrap();

        let job = load_job_file(file.path()).unwrap();
        assert_eq!(job.id, "job-1");
        assert_eq!(job.upsert_columns, vec!["id".to_string()]);
    }

    #[test]
    fn rejects_malformed_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "not = [valid").unwrap();
        assert!(load_job_file(file.path()).is_err());
    }
}
