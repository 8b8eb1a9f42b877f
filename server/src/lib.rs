//! FlightSurety coordinator
//!
//! HTTP surface over the `FlightSurety` state holder, plus the simulated
//! oracle fleet that answers status requests.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

pub mod app_state;
pub mod config;
pub mod handlers;
pub mod models;
pub mod oracle_runner;
pub mod routes;

use app_state::AppState;

/// Build the application router without CORS, which is configured by the binary.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(routes::status_routes())
        .merge(routes::airline_routes())
        .merge(routes::oracle_routes())
        .merge(routes::flight_routes())
        .merge(routes::admin_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "FlightSurety API Server"
}

async fn health_check() -> &'static str {
    "OK"
}
