use thiserror::Error;

pub type WellnessResult<T> = Result<T, WellnessError>;

#[derive(Error, Debug)]
pub enum WellnessError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation rejected: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Profile store unavailable: {0}")]
    PersistenceUnavailable(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for WellnessError {
    fn from(err: config::ConfigError) -> Self {
        WellnessError::Config(err.to_string())
    }
}
