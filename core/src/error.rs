//! Error types for the FlightSurety core.
//!
//! Every precondition is checked before any record is touched, so an `Err`
//! from a mutating call always means nothing changed.

use thiserror::Error;

use crate::types::Address;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, FlightSuretyError>;

/// Errors returned by the registry, the oracle directory and consensus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlightSuretyError {
    #[error("operations are paused")]
    OperationNotAllowed,

    #[error("caller {caller} is not allowed to perform this operation")]
    Unauthorized { caller: Address },

    #[error("{address} is already registered")]
    AlreadyRegistered { address: Address },

    #[error("airline {airline} is already funded")]
    AlreadyFunded { airline: Address },

    #[error("insufficient stake: required {required} wei, provided {provided} wei")]
    InsufficientStake { required: u128, provided: u128 },

    #[error("{address} is not registered")]
    NotRegistered { address: Address },

    #[error("index {index} does not match an open request for this flight")]
    IndexMismatch { index: u8 },

    #[error("status request is already finalized")]
    AlreadyFinalized,

    #[error("invalid flight status code: {0}")]
    InvalidStatusCode(u8),

    #[error("unknown airline {airline}")]
    UnknownAirline { airline: Address },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

impl FlightSuretyError {
    /// Stable machine-readable code for API responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OperationNotAllowed => "operation_not_allowed",
            Self::Unauthorized { .. } => "unauthorized",
            Self::AlreadyRegistered { .. } => "already_registered",
            Self::AlreadyFunded { .. } => "already_funded",
            Self::InsufficientStake { .. } => "insufficient_stake",
            Self::NotRegistered { .. } => "not_registered",
            Self::IndexMismatch { .. } => "index_mismatch",
            Self::AlreadyFinalized => "already_finalized",
            Self::InvalidStatusCode(_) => "invalid_status_code",
            Self::UnknownAirline { .. } => "unknown_airline",
            Self::InvalidParameters(_) => "invalid_parameters",
        }
    }

    /// Whether the error was caused by the caller rather than by configuration.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::InvalidParameters(_))
    }
}
