//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;
use flightsurety_core::FlightSurety;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub surety: Arc<FlightSurety>,
}

impl AppState {
    pub fn new(surety: Arc<FlightSurety>) -> Self {
        Self { surety }
    }
}

impl FromRef<AppState> for Arc<FlightSurety> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.surety.clone()
    }
}
