//! The authoritative state holder.
//!
//! `FlightSurety` owns the gate, the airline registry, the oracle directory,
//! status consensus and the event log, and attributes every call to a caller
//! address the way a ledger would.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::consensus::{OracleConsensus, RequestCounts, ResponseOutcome, StatusRequestView};
use crate::entropy::{IndexSource, RandomIndexSource};
use crate::error::Result;
use crate::events::{EventLog, LedgerEvent};
use crate::gate::OperationalGate;
use crate::oracle::{OracleDirectory, OracleIndexes};
use crate::registry::{AirlineRecord, AirlineRegistry, NominationOutcome};
use crate::types::{Address, AirlineState, FlightStatus, RequestKey};

/// Aggregate counts for status endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub operational: bool,
    pub total_funded_airlines: u32,
    pub registered_oracles: usize,
    pub requests: RequestCounts,
    pub last_event: u64,
}

pub struct FlightSurety {
    params: Parameters,
    gate: Arc<OperationalGate>,
    /// Held across the flag swap and its event so the log records toggles
    /// in the order they took effect.
    toggle: Mutex<()>,
    events: Arc<EventLog>,
    registry: AirlineRegistry,
    oracles: Arc<OracleDirectory>,
    consensus: OracleConsensus,
}

impl FlightSurety {
    /// Build with OS-seeded index draws.
    pub fn new(
        params: Parameters,
        owner: Address,
        genesis_airline: Address,
        genesis_name: &str,
    ) -> Result<Self> {
        Self::with_index_source(
            params,
            owner,
            genesis_airline,
            genesis_name,
            Arc::new(RandomIndexSource),
        )
    }

    pub fn with_index_source(
        params: Parameters,
        owner: Address,
        genesis_airline: Address,
        genesis_name: &str,
        source: Arc<dyn IndexSource>,
    ) -> Result<Self> {
        params.validate()?;

        let gate = Arc::new(OperationalGate::new(owner));
        let events = Arc::new(EventLog::new());
        let registry = AirlineRegistry::new(
            params.clone(),
            gate.clone(),
            events.clone(),
            genesis_airline,
            genesis_name,
        );
        let oracles = Arc::new(OracleDirectory::new(
            params.clone(),
            gate.clone(),
            events.clone(),
            source.clone(),
        ));
        let consensus = OracleConsensus::new(
            params.clone(),
            gate.clone(),
            events.clone(),
            oracles.clone(),
            source,
        );

        Ok(Self {
            params,
            gate,
            toggle: Mutex::new(()),
            events,
            registry,
            oracles,
            consensus,
        })
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn owner(&self) -> &Address {
        self.gate.owner()
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    pub fn registry(&self) -> &AirlineRegistry {
        &self.registry
    }

    pub fn oracles(&self) -> &OracleDirectory {
        &self.oracles
    }

    pub fn consensus(&self) -> &OracleConsensus {
        &self.consensus
    }

    // ----- operations -----

    pub fn is_operational(&self) -> bool {
        self.gate.is_operational()
    }

    pub fn set_operating_status(&self, caller: &Address, operational: bool) -> Result<()> {
        let _toggle = self.toggle.lock();
        if self.gate.set_operating_status(caller, operational)? {
            self.events
                .append(LedgerEvent::OperatingStatusChanged { operational });
        }
        Ok(())
    }

    /// `caller` nominates `candidate`.
    pub fn nominate_airline(
        &self,
        caller: &Address,
        candidate: &Address,
        name: &str,
    ) -> Result<NominationOutcome> {
        self.registry.nominate(caller, candidate, name)
    }

    pub fn fund_airline(&self, airline: &Address, amount: u128) -> Result<bool> {
        self.registry.fund(airline, amount)
    }

    /// `caller` registers itself as an oracle node.
    pub fn register_oracle(&self, caller: &Address, stake: u128) -> Result<OracleIndexes> {
        self.oracles.register(caller, stake)
    }

    pub fn indexes_of(&self, node: &Address) -> Result<OracleIndexes> {
        self.oracles.indexes_of(node)
    }

    pub fn request_flight_status(
        &self,
        airline: &Address,
        flight: &str,
        timestamp: u64,
    ) -> Result<u8> {
        self.consensus
            .request_status(&RequestKey::new(airline.clone(), flight, timestamp))
    }

    /// `caller` answers a status request. `status_code` must be one of the
    /// six flight status codes.
    pub fn submit_oracle_response(
        &self,
        caller: &Address,
        index: u8,
        airline: &Address,
        flight: &str,
        timestamp: u64,
        status_code: u8,
    ) -> Result<ResponseOutcome> {
        self.gate.require_operational()?;
        let status = FlightStatus::try_from(status_code)?;
        self.consensus.submit_response(
            caller,
            index,
            &RequestKey::new(airline.clone(), flight, timestamp),
            status,
        )
    }

    // ----- reads -----

    pub fn is_funded(&self, airline: &Address) -> bool {
        self.registry.is_funded(airline)
    }

    pub fn airline_state(&self, airline: &Address) -> AirlineState {
        self.registry.get_state(airline)
    }

    pub fn airline(&self, airline: &Address) -> Option<AirlineRecord> {
        self.registry.airline(airline)
    }

    pub fn total_funded(&self) -> u32 {
        self.registry.total_funded()
    }

    pub fn status_request(&self, key: &RequestKey) -> Option<StatusRequestView> {
        self.consensus.status_request(key)
    }

    pub fn final_status(&self, key: &RequestKey) -> Option<FlightStatus> {
        self.consensus.final_status(key)
    }

    pub fn summary(&self) -> Summary {
        Summary {
            operational: self.gate.is_operational(),
            total_funded_airlines: self.registry.total_funded(),
            registered_oracles: self.oracles.len(),
            requests: self.consensus.request_counts(),
            last_event: self.events.latest_sequence(),
        }
    }
}
