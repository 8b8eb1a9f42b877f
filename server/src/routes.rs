//! Route definitions for the FlightSurety API

use axum::{
    routing::{get, post},
    Router,
};

use crate::app_state::AppState;
use crate::handlers::*;

// Status routes
pub fn status_routes() -> Router<AppState> {
    Router::new()
        .route("/api", get(api_index))
        .route("/api/status", get(get_status))
        .route("/api/events", get(list_events))
}

// Airline routes
pub fn airline_routes() -> Router<AppState> {
    Router::new()
        .route("/api/airlines/nominate", post(nominate_airline))
        .route("/api/airlines/fund", post(fund_airline))
        .route("/api/airlines/:address", get(get_airline))
}

// Oracle routes
pub fn oracle_routes() -> Router<AppState> {
    Router::new()
        .route("/api/oracles", post(register_oracle))
        .route("/api/oracles/responses", post(submit_oracle_response))
        .route("/api/oracles/:address", get(get_oracle))
}

// Flight status routes
pub fn flight_routes() -> Router<AppState> {
    Router::new().route(
        "/api/flights/status",
        get(get_flight_status).post(request_flight_status),
    )
}

// Admin routes
pub fn admin_routes() -> Router<AppState> {
    Router::new().route("/api/admin/operational", post(set_operating_status))
}
