use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config file is neither valid TOML nor JSON: {0}")]
    Parse(String),

    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("job configuration invalid: {0}")]
    Validation(String),

    #[error("conflicting job settings: {0}")]
    ConflictingSettings(String),
}
