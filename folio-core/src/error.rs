use thiserror::Error;

/// Errors surfaced while bringing the service up: loading configuration
/// and talking to Postgres. Subsystems carry their own error enums.
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),
}
