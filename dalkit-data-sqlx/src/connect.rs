use crate::error::SqlxErrorExt;
use dalkit_data::DataError;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Build a connection pool for the given Postgres url.
pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, DataError> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await
        .map_err(|e| e.into_data_error())
}

/// [`connect`], but for scripts and CLIs that cannot run without a
/// database: a failure is logged and the process exits with code 1.
pub async fn connect_or_fail(url: &str, max_connections: u32) -> PgPool {
    match connect(url, max_connections).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(%err, "failed to connect to database");
            std::process::exit(1);
        }
    }
}
