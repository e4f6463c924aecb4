use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::services::Metrics;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await?;

    // Verify the connection
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(pool)
}

/// Retry [`create_pool`] with a fixed delay until the database is reachable
pub async fn connect_with_retry(
    database_url: &str,
    max_connections: u32,
    retry_delay: Duration,
    metrics: &Metrics,
) -> PgPool {
    loop {
        match create_pool(database_url, max_connections).await {
            Ok(pool) => {
                tracing::info!("Connected to database");
                metrics.set_db_connected(true);
                return pool;
            }
            Err(e) => {
                metrics.set_db_connected(false);
                tracing::error!(
                    "Failed to connect to database: {}, retrying in {:?}",
                    e,
                    retry_delay
                );
                tokio::time::sleep(retry_delay).await;
            }
        }
    }
}
