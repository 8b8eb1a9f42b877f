//! Append-only event log.
//!
//! Every committed state change appends one entry. Entries are numbered from
//! 1 so that a cursor of 0 replays the whole log. Live subscribers receive
//! entries over a broadcast channel; anyone who falls behind can catch up with
//! [`EventLog::since`].

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{Address, FlightStatus, RequestKey};

const BROADCAST_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    OperatingStatusChanged {
        operational: bool,
    },
    AirlineNominated {
        airline: Address,
        nominator: Address,
        votes: usize,
        majority: usize,
    },
    AirlineRegistered {
        airline: Address,
        name: String,
    },
    AirlineFunded {
        airline: Address,
        amount: u128,
    },
    OracleRegistered {
        oracle: Address,
        indexes: Vec<u8>,
    },
    RequestAnnounced {
        airline: Address,
        flight: String,
        timestamp: u64,
        selected_index: u8,
    },
    OracleReport {
        airline: Address,
        flight: String,
        timestamp: u64,
        status: FlightStatus,
        oracle: Address,
    },
    StatusFinalized {
        airline: Address,
        flight: String,
        timestamp: u64,
        status: FlightStatus,
    },
}

impl LedgerEvent {
    pub(crate) fn request_announced(key: &RequestKey, selected_index: u8) -> Self {
        LedgerEvent::RequestAnnounced {
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp: key.timestamp,
            selected_index,
        }
    }

    pub(crate) fn oracle_report(key: &RequestKey, status: FlightStatus, oracle: &Address) -> Self {
        LedgerEvent::OracleReport {
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp: key.timestamp,
            status,
            oracle: oracle.clone(),
        }
    }

    pub(crate) fn status_finalized(key: &RequestKey, status: FlightStatus) -> Self {
        LedgerEvent::StatusFinalized {
            airline: key.airline.clone(),
            flight: key.flight.clone(),
            timestamp: key.timestamp,
            status,
        }
    }

    /// Request key for events that concern a status request.
    pub fn request_key(&self) -> Option<RequestKey> {
        match self {
            LedgerEvent::RequestAnnounced {
                airline,
                flight,
                timestamp,
                ..
            }
            | LedgerEvent::OracleReport {
                airline,
                flight,
                timestamp,
                ..
            }
            | LedgerEvent::StatusFinalized {
                airline,
                flight,
                timestamp,
                ..
            } => Some(RequestKey::new(airline.clone(), flight.clone(), *timestamp)),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::OperatingStatusChanged { .. } => "OperatingStatusChanged",
            LedgerEvent::AirlineNominated { .. } => "AirlineNominated",
            LedgerEvent::AirlineRegistered { .. } => "AirlineRegistered",
            LedgerEvent::AirlineFunded { .. } => "AirlineFunded",
            LedgerEvent::OracleRegistered { .. } => "OracleRegistered",
            LedgerEvent::RequestAnnounced { .. } => "RequestAnnounced",
            LedgerEvent::OracleReport { .. } => "OracleReport",
            LedgerEvent::StatusFinalized { .. } => "StatusFinalized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub recorded_at: DateTime<Utc>,
    pub event: LedgerEvent,
}

pub struct EventLog {
    entries: RwLock<Vec<EventRecord>>,
    sender: broadcast::Sender<EventRecord>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            entries: RwLock::new(Vec::new()),
            sender,
        }
    }

    /// Append an event and return its sequence number.
    pub fn append(&self, event: LedgerEvent) -> u64 {
        let mut entries = self.entries.write();
        let record = EventRecord {
            sequence: entries.len() as u64 + 1,
            recorded_at: Utc::now(),
            event,
        };
        let sequence = record.sequence;
        tracing::trace!(sequence, event = record.event.name(), "event appended");

        // Sending while the write lock is held keeps broadcast order equal to
        // sequence order.
        let _ = self.sender.send(record.clone());
        entries.push(record);
        sequence
    }

    /// Entries with `sequence > cursor`, oldest first, at most `limit` of them.
    pub fn since(&self, cursor: u64, limit: usize) -> Vec<EventRecord> {
        let entries = self.entries.read();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX).min(entries.len());
        entries[start..].iter().take(limit).cloned().collect()
    }

    pub fn latest_sequence(&self) -> u64 {
        self.entries.read().len() as u64
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live feed of entries appended after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.sender.subscribe()
    }
}
