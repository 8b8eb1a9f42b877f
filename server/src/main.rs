//! FlightSurety Coordinator
//!
//! Serves the FlightSurety API and runs the simulated oracle fleet against a
//! single in-process ledger.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tokio::time::{sleep, Duration};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use flightsurety_core::FlightSurety;
use flightsurety_server::{
    app_state::AppState,
    build_router,
    config::{OracleRunnerConfig, ServerConfig},
    oracle_runner::{OracleRunner, StartError},
};

const RUNNER_SUPERVISOR_MAX_BACKOFF_SECONDS: u64 = 30;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    let surety = Arc::new(
        FlightSurety::new(
            config.params.clone(),
            config.owner.clone(),
            config.genesis_airline.clone(),
            &config.genesis_name,
        )
        .context("invalid ledger parameters")?,
    );
    info!(
        owner = %config.owner,
        genesis = %config.genesis_airline,
        "ledger initialised"
    );

    spawn_oracle_supervisor(surety.clone(), config.oracles.clone());

    let app = build_router(AppState::new(surety)).layer(build_cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Start and supervise the simulated oracle fleet.
fn spawn_oracle_supervisor(surety: Arc<FlightSurety>, config: OracleRunnerConfig) {
    tokio::spawn(async move {
        let mut restart_count: u32 = 0;
        loop {
            let runner = OracleRunner::new(surety.clone(), config.clone()).await;
            let handle = tokio::spawn(async move { runner.start().await });

            match handle.await {
                Ok(Ok(())) => {
                    info!("oracle runner exited cleanly; stopping supervisor");
                    break;
                }
                Ok(Err(StartError::NoOracles)) => {
                    info!("Oracle runner disabled: no simulated oracles configured");
                    break;
                }
                Ok(Err(err)) => {
                    error!(error = %err, "oracle runner failed to start; restarting");
                }
                Err(join_error) => {
                    if join_error.is_panic() {
                        error!("oracle runner panicked; restarting");
                    } else {
                        error!(error = %join_error, "oracle runner task failed; restarting");
                    }
                }
            }

            restart_count = restart_count.saturating_add(1);
            let backoff_seconds = (2u64.saturating_pow(restart_count.min(5)))
                .min(RUNNER_SUPERVISOR_MAX_BACKOFF_SECONDS);
            warn!(restart_count, backoff_seconds, "oracle runner restart backoff");
            sleep(Duration::from_secs(backoff_seconds)).await;
        }
    });
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
