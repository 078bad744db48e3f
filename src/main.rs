mod api;
mod config;
mod error;
mod models;
mod tracker;
mod work;
mod worker;

use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use config::Config;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracker::JobTracker;

#[derive(Clone)]
pub struct AppState {
    pub tracker: Arc<JobTracker>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "report_jobs_api=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    let state = AppState {
        tracker: Arc::new(JobTracker::with_simulated_work(config.tracker.clone())),
    };

    worker::spawn_cleanup_worker(
        Arc::clone(&state.tracker),
        config.cleanup_interval,
        config.retention,
    );

    let app = Router::new()
        .route("/healthz", get(api::healthz))
        .route("/jobs/start", post(api::start_job))
        .route("/jobs/status", get(api::job_status))
        .route("/jobs/{job_id}", get(api::get_job))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        step_interval_ms = config.tracker.step_interval.as_millis() as u64,
        steps = config.tracker.step_count,
        max_active = config.tracker.max_active_jobs,
        "report-jobs-api listening on {}",
        config.bind_addr
    );
    axum::serve(listener, app).await?;
    Ok(())
}
