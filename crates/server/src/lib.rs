pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod state;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use feed::FeedClient;
use services::SchedulerJob;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub use api::{create_app, create_router};
pub use config::{Config, ConfigError};
pub use db::{connect_with_retry, create_pool};
pub use error::{AppError, AppResult};
pub use repositories::{FeedRepository, PgFeedRepository};
pub use services::{
    Component, ConnectionSupervisor, FeedEnqueueJob, IngestionService, Metrics, SchedulerService,
};
pub use state::AppState;

/// Bind the health endpoint and serve it in the background
pub async fn serve_health(port: u16, metrics: Arc<Metrics>) -> AppResult<JoinHandle<()>> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = create_app(AppState::new(metrics));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Health endpoint listening on http://{}/health", addr);

    Ok(tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Health server error: {}", e);
        }
    }))
}

/// Consume fetch jobs forever
pub async fn run_worker(config: Config) -> AppResult<()> {
    let metrics = Arc::new(Metrics::new(Component::Worker));
    let _health = serve_health(config.health_port, metrics.clone()).await?;

    let pool = connect_with_retry(
        &config.database_url,
        config.max_connections,
        config.reconnect_delay,
        &metrics,
    )
    .await;

    let repository = Arc::new(PgFeedRepository::new(pool));
    let fetcher = Arc::new(FeedClient::new(config.request_timeout)?);
    let ingestion = Arc::new(IngestionService::new(repository, fetcher, metrics.clone()));

    let supervisor = ConnectionSupervisor::new(
        config.broker.clone(),
        ingestion,
        metrics,
        config.reconnect_delay,
    );
    supervisor.run().await;

    Ok(())
}

/// Enqueue stale sources now, then on every poll interval
pub async fn run_scheduler(config: Config) -> AppResult<()> {
    let metrics = Arc::new(Metrics::new(Component::Scheduler));
    metrics.set_healthy(true);
    let _health = serve_health(config.health_port, metrics.clone()).await?;

    let pool = connect_with_retry(
        &config.database_url,
        config.max_connections,
        config.reconnect_delay,
        &metrics,
    )
    .await;

    let repository = Arc::new(PgFeedRepository::new(pool));
    let job = Arc::new(FeedEnqueueJob::new(repository, metrics, &config));

    if let Err(e) = job.execute().await {
        tracing::error!("Initial feed enqueue failed: {}", e);
    }

    let scheduler = SchedulerService::new().with_arc_job(job);
    tracing::info!(
        "Scheduler started with {} job(s), interval {:?}",
        scheduler.job_count(),
        config.poll_interval
    );

    for handle in scheduler.start() {
        handle
            .await
            .map_err(|e| AppError::internal(format!("Scheduler task ended: {}", e)))?;
    }

    Ok(())
}
