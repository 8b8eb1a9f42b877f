//! Airline admission and funding.
//!
//! An airline moves forward through Unregistered, Nominated, Registered and
//! Funded and never back. While fewer than `bootstrap_airlines` airlines are
//! funded, a single funded airline can admit a candidate on its own. After
//! that a candidate needs distinct votes from at least half of the funded
//! airlines (rounded up), with the threshold recomputed on every call.
//!
//! All registry records live behind one lock: a nomination reads the
//! nominator, the candidate and the funded count together, and admission is
//! low-volume compared to oracle traffic.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::error::{FlightSuretyError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::gate::OperationalGate;
use crate::types::{Address, AirlineState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirlineRecord {
    pub address: Address,
    pub name: String,
    pub state: AirlineState,
    /// Nominators counted toward admission. Emptied once Registered.
    pub votes: BTreeSet<Address>,
    /// Deposit in wei, zero until Funded.
    pub deposit: u128,
}

impl AirlineRecord {
    fn new(address: Address, name: String) -> Self {
        Self {
            address,
            name,
            state: AirlineState::Unregistered,
            votes: BTreeSet::new(),
            deposit: 0,
        }
    }
}

/// Result of a nomination call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NominationOutcome {
    pub accepted: bool,
    pub vote_count: usize,
    /// Votes this call needed for admission.
    pub majority: usize,
    pub total_funded: u32,
}

#[derive(Debug, Default)]
struct RegistryState {
    airlines: HashMap<Address, AirlineRecord>,
    total_funded: u32,
}

impl RegistryState {
    fn state_of(&self, address: &Address) -> AirlineState {
        self.airlines
            .get(address)
            .map(|record| record.state)
            .unwrap_or(AirlineState::Unregistered)
    }
}

/// `ceil(total_funded / 2)`.
pub fn majority_of(total_funded: u32) -> usize {
    (total_funded as usize).div_ceil(2)
}

pub struct AirlineRegistry {
    params: Parameters,
    gate: Arc<OperationalGate>,
    events: Arc<EventLog>,
    state: RwLock<RegistryState>,
}

impl AirlineRegistry {
    /// Create the registry with the genesis airline already Registered.
    pub fn new(
        params: Parameters,
        gate: Arc<OperationalGate>,
        events: Arc<EventLog>,
        genesis: Address,
        genesis_name: impl Into<String>,
    ) -> Self {
        let genesis_name = genesis_name.into();
        let mut record = AirlineRecord::new(genesis.clone(), genesis_name.clone());
        record.state = AirlineState::Registered;

        let mut state = RegistryState::default();
        state.airlines.insert(genesis.clone(), record);

        events.append(LedgerEvent::AirlineRegistered {
            airline: genesis.clone(),
            name: genesis_name,
        });
        tracing::info!(airline = %genesis, "genesis airline registered");

        Self {
            params,
            gate,
            events,
            state: RwLock::new(state),
        }
    }

    /// Cast `nominator`'s vote for `candidate`.
    pub fn nominate(
        &self,
        nominator: &Address,
        candidate: &Address,
        name: &str,
    ) -> Result<NominationOutcome> {
        self.gate.require_operational()?;

        let mut state = self.state.write();

        if state.state_of(nominator) != AirlineState::Funded {
            return Err(FlightSuretyError::Unauthorized {
                caller: nominator.clone(),
            });
        }
        if state.state_of(candidate).is_member() {
            return Err(FlightSuretyError::AlreadyRegistered {
                address: candidate.clone(),
            });
        }

        let total_funded = state.total_funded;

        if total_funded < self.params.bootstrap_airlines {
            let record = state
                .airlines
                .entry(candidate.clone())
                .or_insert_with(|| AirlineRecord::new(candidate.clone(), name.to_string()));
            record.state = AirlineState::Registered;
            record.votes.clear();

            self.events.append(LedgerEvent::AirlineRegistered {
                airline: candidate.clone(),
                name: record.name.clone(),
            });
            tracing::info!(
                airline = %candidate,
                nominator = %nominator,
                total_funded,
                "airline registered during bootstrap"
            );

            return Ok(NominationOutcome {
                accepted: true,
                vote_count: 1,
                majority: 1,
                total_funded,
            });
        }

        let majority = majority_of(total_funded);

        if let Some(existing) = state.airlines.get(candidate) {
            if existing.votes.contains(nominator) {
                tracing::debug!(
                    airline = %candidate,
                    nominator = %nominator,
                    "duplicate nomination ignored"
                );
                return Ok(NominationOutcome {
                    accepted: false,
                    vote_count: existing.votes.len(),
                    majority,
                    total_funded,
                });
            }
        }

        let record = state
            .airlines
            .entry(candidate.clone())
            .or_insert_with(|| AirlineRecord::new(candidate.clone(), name.to_string()));
        if record.name.is_empty() {
            record.name = name.to_string();
        }
        record.votes.insert(nominator.clone());
        let vote_count = record.votes.len();

        let accepted = vote_count >= majority;
        if accepted {
            record.state = AirlineState::Registered;
            record.votes.clear();
            self.events.append(LedgerEvent::AirlineRegistered {
                airline: candidate.clone(),
                name: record.name.clone(),
            });
            tracing::info!(
                airline = %candidate,
                vote_count,
                majority,
                "airline registered by quorum"
            );
        } else {
            record.state = AirlineState::Nominated;
            self.events.append(LedgerEvent::AirlineNominated {
                airline: candidate.clone(),
                nominator: nominator.clone(),
                votes: vote_count,
                majority,
            });
            tracing::info!(
                airline = %candidate,
                nominator = %nominator,
                vote_count,
                majority,
                "airline nominated"
            );
        }

        Ok(NominationOutcome {
            accepted,
            vote_count,
            majority,
            total_funded,
        })
    }

    /// Deposit `amount` wei for a Registered airline, making it Funded.
    pub fn fund(&self, airline: &Address, amount: u128) -> Result<bool> {
        self.gate.require_operational()?;

        if amount < self.params.minimum_fund {
            return Err(FlightSuretyError::InsufficientStake {
                required: self.params.minimum_fund,
                provided: amount,
            });
        }

        let mut state = self.state.write();
        match state.state_of(airline) {
            AirlineState::Funded => {
                return Err(FlightSuretyError::AlreadyFunded {
                    airline: airline.clone(),
                })
            }
            AirlineState::Registered => {}
            AirlineState::Unregistered | AirlineState::Nominated => {
                return Err(FlightSuretyError::NotRegistered {
                    address: airline.clone(),
                })
            }
        }

        state.total_funded += 1;
        let total_funded = state.total_funded;
        if let Some(record) = state.airlines.get_mut(airline) {
            record.state = AirlineState::Funded;
            record.deposit = amount;
        }

        self.events.append(LedgerEvent::AirlineFunded {
            airline: airline.clone(),
            amount,
        });
        tracing::info!(airline = %airline, amount, total_funded, "airline funded");

        Ok(true)
    }

    pub fn is_funded(&self, airline: &Address) -> bool {
        self.get_state(airline) == AirlineState::Funded
    }

    pub fn get_state(&self, airline: &Address) -> AirlineState {
        self.state.read().state_of(airline)
    }

    pub fn total_funded(&self) -> u32 {
        self.state.read().total_funded
    }

    pub fn airline(&self, airline: &Address) -> Option<AirlineRecord> {
        self.state.read().airlines.get(airline).cloned()
    }

    /// All known airlines ordered by address.
    pub fn airlines(&self) -> Vec<AirlineRecord> {
        let mut airlines: Vec<_> = self.state.read().airlines.values().cloned().collect();
        airlines.sort_by(|a, b| a.address.cmp(&b.address));
        airlines
    }
}
