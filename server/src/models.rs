//! Request and response DTOs for the FlightSurety API

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use flightsurety_core::{
    AirlineRecord, AirlineState, NominationOutcome, OracleIndexes, OracleNode, Summary,
};

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

/// Wei amounts travel as decimal strings so they survive JavaScript clients.
fn validate_wei(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<u128>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("wei_amount"))
}

pub fn parse_wei(value: &str) -> u128 {
    value.parse().unwrap_or_default()
}

#[derive(Debug, Deserialize, Validate)]
pub struct NominateAirlineRequest {
    #[validate(length(min = 1))]
    pub caller: String,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1, max = 64))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FundAirlineRequest {
    #[validate(length(min = 1))]
    pub caller: String,
    #[validate(custom = "validate_wei")]
    pub amount: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterOracleRequest {
    #[validate(length(min = 1))]
    pub caller: String,
    #[validate(custom = "validate_wei")]
    pub stake: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitResponseRequest {
    #[validate(length(min = 1))]
    pub caller: String,
    pub index: u8,
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    pub timestamp: u64,
    pub status_code: u8,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FlightStatusRequest {
    #[validate(length(min = 1))]
    pub airline: String,
    #[validate(length(min = 1, max = 32))]
    pub flight: String,
    pub timestamp: u64,
}

/// Query parameters for reading a status request
#[derive(Debug, Deserialize)]
pub struct FlightStatusQuery {
    pub airline: String,
    pub flight: String,
    pub timestamp: u64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct OperatingStatusRequest {
    #[validate(length(min = 1))]
    pub caller: String,
    pub operational: bool,
}

/// Query parameters for replaying the event log
#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub after: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct AirlineResponse {
    pub address: String,
    pub name: String,
    pub state: AirlineState,
    pub state_code: u8,
    pub votes: Vec<String>,
    pub deposit: String,
    pub is_funded: bool,
}

impl From<AirlineRecord> for AirlineResponse {
    fn from(record: AirlineRecord) -> Self {
        Self {
            address: record.address.to_string(),
            name: record.name,
            state: record.state,
            state_code: record.state.code(),
            votes: record.votes.iter().map(ToString::to_string).collect(),
            deposit: record.deposit.to_string(),
            is_funded: record.state == AirlineState::Funded,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NominationResponse {
    pub airline: String,
    pub state: AirlineState,
    #[serde(flatten)]
    pub outcome: NominationOutcome,
}

#[derive(Debug, Serialize)]
pub struct FundResponse {
    pub airline: String,
    pub funded: bool,
    pub total_funded: u32,
}

#[derive(Debug, Serialize)]
pub struct OracleResponse {
    pub address: String,
    pub indexes: OracleIndexes,
    pub stake: String,
}

impl From<OracleNode> for OracleResponse {
    fn from(node: OracleNode) -> Self {
        Self {
            address: node.address.to_string(),
            indexes: node.indexes,
            stake: node.stake.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StatusRequestedResponse {
    pub airline: String,
    pub flight: String,
    pub timestamp: u64,
    pub selected_index: u8,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub owner: String,
    #[serde(flatten)]
    pub summary: Summary,
}
