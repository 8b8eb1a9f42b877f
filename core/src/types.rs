//! Shared identifiers and value types.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::FlightSuretyError;

/// Participant identity as attributed by the ledger (airline, oracle node or
/// the contract owner).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Airline lifecycle. Variants are ordered so that a transition is legal only
/// if it moves to a strictly greater state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirlineState {
    Unregistered = 0,
    Nominated = 1,
    Registered = 2,
    Funded = 3,
}

impl AirlineState {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Registered or Funded.
    pub fn is_member(self) -> bool {
        self >= AirlineState::Registered
    }
}

impl fmt::Display for AirlineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AirlineState::Unregistered => "unregistered",
            AirlineState::Nominated => "nominated",
            AirlineState::Registered => "registered",
            AirlineState::Funded => "funded",
        };
        f.write_str(label)
    }
}

/// Flight status codes reported by oracles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FlightStatus {
    Unknown = 0,
    OnTime = 10,
    LateAirline = 20,
    LateWeather = 30,
    LateTechnical = 40,
    LateOther = 50,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for FlightStatus {
    type Error = FlightSuretyError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        FlightStatus::ALL
            .into_iter()
            .find(|status| status.code() == code)
            .ok_or(FlightSuretyError::InvalidStatusCode(code))
    }
}

impl From<FlightStatus> for u8 {
    fn from(status: FlightStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlightStatus::Unknown => "unknown",
            FlightStatus::OnTime => "on_time",
            FlightStatus::LateAirline => "late_airline",
            FlightStatus::LateWeather => "late_weather",
            FlightStatus::LateTechnical => "late_technical",
            FlightStatus::LateOther => "late_other",
        };
        f.write_str(label)
    }
}

/// Identity of one flight-status fact: (airline, flight, timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    pub airline: Address,
    pub flight: String,
    pub timestamp: u64,
}

impl RequestKey {
    pub fn new(airline: Address, flight: impl Into<String>, timestamp: u64) -> Self {
        Self {
            airline,
            flight: flight.into(),
            timestamp,
        }
    }

    /// Hex SHA-256 over the key fields, used as a stable identifier in logs
    /// and API payloads.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.airline.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(self.flight.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.timestamp.to_be_bytes());
        hex::encode(hasher.finalize())
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.airline, self.flight, self.timestamp)
    }
}
