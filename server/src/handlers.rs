//! HTTP handlers for the FlightSurety API

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use tracing::warn;
use validator::Validate;

use flightsurety_core::{
    Address, EventRecord, FlightSurety, FlightSuretyError, RequestKey, ResponseOutcome,
    StatusRequestView,
};

use crate::models::{
    parse_wei, AirlineResponse, ApiResponse, EventsQuery, FlightStatusQuery, FlightStatusRequest,
    FundAirlineRequest, FundResponse, NominateAirlineRequest, NominationResponse,
    OperatingStatusRequest, OracleResponse, RegisterOracleRequest, StatusRequestedResponse,
    StatusResponse, SubmitResponseRequest,
};

const DEFAULT_EVENT_PAGE: usize = 100;
const MAX_EVENT_PAGE: usize = 500;

type ApiResult<T> = (StatusCode, Json<ApiResponse<T>>);

fn ok<T>(data: T) -> ApiResult<T> {
    (StatusCode::OK, Json(ApiResponse::ok(data)))
}

fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ApiResponse::err(message)))
}

/// HTTP status for a core error.
pub fn error_status(err: &FlightSuretyError) -> StatusCode {
    match err {
        FlightSuretyError::OperationNotAllowed | FlightSuretyError::Unauthorized { .. } => {
            StatusCode::FORBIDDEN
        }
        FlightSuretyError::AlreadyRegistered { .. }
        | FlightSuretyError::AlreadyFunded { .. }
        | FlightSuretyError::AlreadyFinalized => StatusCode::CONFLICT,
        FlightSuretyError::NotRegistered { .. } | FlightSuretyError::UnknownAirline { .. } => {
            StatusCode::NOT_FOUND
        }
        FlightSuretyError::InsufficientStake { .. }
        | FlightSuretyError::IndexMismatch { .. }
        | FlightSuretyError::InvalidStatusCode(_) => StatusCode::BAD_REQUEST,
        FlightSuretyError::InvalidParameters(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn core_error<T>(err: FlightSuretyError) -> ApiResult<T> {
    if err.is_client_error() {
        warn!(code = err.code(), error = %err, "request rejected");
    }
    fail(error_status(&err), format!("{}: {}", err.code(), err))
}

fn validation_error<T>(err: validator::ValidationErrors) -> ApiResult<T> {
    fail(StatusCode::BAD_REQUEST, format!("Validation error: {}", err))
}

pub async fn api_index() -> Json<Value> {
    Json(json!({ "message": "An API for use with your Dapp!" }))
}

pub async fn get_status(State(surety): State<Arc<FlightSurety>>) -> ApiResult<StatusResponse> {
    ok(StatusResponse {
        owner: surety.owner().to_string(),
        summary: surety.summary(),
    })
}

pub async fn get_airline(
    State(surety): State<Arc<FlightSurety>>,
    Path(address): Path<String>,
) -> ApiResult<AirlineResponse> {
    let address = Address::new(address);
    match surety.airline(&address) {
        Some(record) => ok(record.into()),
        None => core_error(FlightSuretyError::UnknownAirline { airline: address }),
    }
}

pub async fn nominate_airline(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<NominateAirlineRequest>,
) -> ApiResult<NominationResponse> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    let caller = Address::new(payload.caller);
    let candidate = Address::new(payload.airline);
    match surety.nominate_airline(&caller, &candidate, payload.name.trim()) {
        Ok(outcome) => ok(NominationResponse {
            state: surety.airline_state(&candidate),
            airline: candidate.to_string(),
            outcome,
        }),
        Err(e) => core_error(e),
    }
}

pub async fn fund_airline(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<FundAirlineRequest>,
) -> ApiResult<FundResponse> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    let airline = Address::new(payload.caller);
    match surety.fund_airline(&airline, parse_wei(&payload.amount)) {
        Ok(funded) => ok(FundResponse {
            airline: airline.to_string(),
            funded,
            total_funded: surety.total_funded(),
        }),
        Err(e) => core_error(e),
    }
}

pub async fn register_oracle(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<RegisterOracleRequest>,
) -> ApiResult<OracleResponse> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    let caller = Address::new(payload.caller);
    match surety.register_oracle(&caller, parse_wei(&payload.stake)) {
        Ok(_) => match surety.oracles().node(&caller) {
            Some(node) => (StatusCode::CREATED, Json(ApiResponse::ok(node.into()))),
            None => core_error(FlightSuretyError::NotRegistered { address: caller }),
        },
        Err(e) => core_error(e),
    }
}

pub async fn get_oracle(
    State(surety): State<Arc<FlightSurety>>,
    Path(address): Path<String>,
) -> ApiResult<OracleResponse> {
    let address = Address::new(address);
    match surety.oracles().node(&address) {
        Some(node) => ok(node.into()),
        None => core_error(FlightSuretyError::NotRegistered { address }),
    }
}

pub async fn submit_oracle_response(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<SubmitResponseRequest>,
) -> ApiResult<ResponseOutcome> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    match surety.submit_oracle_response(
        &Address::new(payload.caller),
        payload.index,
        &Address::new(payload.airline),
        &payload.flight,
        payload.timestamp,
        payload.status_code,
    ) {
        Ok(outcome) => ok(outcome),
        Err(e) => core_error(e),
    }
}

pub async fn request_flight_status(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<FlightStatusRequest>,
) -> ApiResult<StatusRequestedResponse> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    let airline = Address::new(payload.airline);
    match surety.request_flight_status(&airline, &payload.flight, payload.timestamp) {
        Ok(selected_index) => ok(StatusRequestedResponse {
            airline: airline.to_string(),
            flight: payload.flight,
            timestamp: payload.timestamp,
            selected_index,
        }),
        Err(e) => core_error(e),
    }
}

pub async fn get_flight_status(
    State(surety): State<Arc<FlightSurety>>,
    Query(query): Query<FlightStatusQuery>,
) -> ApiResult<StatusRequestView> {
    let key = RequestKey::new(Address::new(query.airline), query.flight, query.timestamp);
    match surety.status_request(&key) {
        Some(view) => ok(view),
        None => fail(StatusCode::NOT_FOUND, format!("no status request for {key}")),
    }
}

pub async fn list_events(
    State(surety): State<Arc<FlightSurety>>,
    Query(query): Query<EventsQuery>,
) -> ApiResult<Vec<EventRecord>> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_EVENT_PAGE)
        .clamp(1, MAX_EVENT_PAGE);
    ok(surety.events().since(query.after.unwrap_or(0), limit))
}

pub async fn set_operating_status(
    State(surety): State<Arc<FlightSurety>>,
    Json(payload): Json<OperatingStatusRequest>,
) -> ApiResult<StatusResponse> {
    if let Err(e) = payload.validate() {
        return validation_error(e);
    }

    match surety.set_operating_status(&Address::new(payload.caller), payload.operational) {
        Ok(()) => ok(StatusResponse {
            owner: surety.owner().to_string(),
            summary: surety.summary(),
        }),
        Err(e) => core_error(e),
    }
}
