//! Postgres pool construction and readiness probes.

use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::config::DatabaseConfig;
use crate::error::FolioError;

pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, FolioError> {
    Ok(PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.url)
        .await?)
}

/// Returns the server version string, failing if the database is unreachable.
pub async fn health_check(pool: &PgPool) -> Result<String, FolioError> {
    let row: (String,) = sqlx::query_as("SELECT version()").fetch_one(pool).await?;
    Ok(row.0)
}

/// Returns the installed pgvector version, or `None` when the extension
/// is missing. Recommendation KNN queries require it.
pub async fn check_pgvector(pool: &PgPool) -> Result<Option<String>, FolioError> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT extversion FROM pg_extension WHERE extname = 'vector'")
            .fetch_optional(pool)
            .await?;
    Ok(row.map(|(v,)| v))
}
