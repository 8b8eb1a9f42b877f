//! Oracle node registration and index assignment.
//!
//! Each node gets three indexes at registration, drawn with replacement from
//! `[0, index_range)`. They never change afterwards. A node answers only the
//! status requests whose selected index is one of its own.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::{Parameters, INDEXES_PER_ORACLE};
use crate::entropy::IndexSource;
use crate::error::{FlightSuretyError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::gate::OperationalGate;
use crate::types::Address;

pub type OracleIndexes = [u8; INDEXES_PER_ORACLE];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleNode {
    pub address: Address,
    pub indexes: OracleIndexes,
    pub stake: u128,
    pub registered_at: DateTime<Utc>,
}

impl OracleNode {
    pub fn holds(&self, index: u8) -> bool {
        self.indexes.contains(&index)
    }
}

pub struct OracleDirectory {
    params: Parameters,
    gate: Arc<OperationalGate>,
    events: Arc<EventLog>,
    source: Arc<dyn IndexSource>,
    nodes: DashMap<Address, OracleNode>,
}

impl OracleDirectory {
    pub fn new(
        params: Parameters,
        gate: Arc<OperationalGate>,
        events: Arc<EventLog>,
        source: Arc<dyn IndexSource>,
    ) -> Self {
        Self {
            params,
            gate,
            events,
            source,
            nodes: DashMap::new(),
        }
    }

    /// Register `node` with `stake` wei and return its assigned indexes.
    pub fn register(&self, node: &Address, stake: u128) -> Result<OracleIndexes> {
        self.gate.require_operational()?;

        if stake < self.params.minimum_oracle_stake {
            return Err(FlightSuretyError::InsufficientStake {
                required: self.params.minimum_oracle_stake,
                provided: stake,
            });
        }

        match self.nodes.entry(node.clone()) {
            Entry::Occupied(_) => Err(FlightSuretyError::AlreadyRegistered {
                address: node.clone(),
            }),
            Entry::Vacant(slot) => {
                let indexes = self.draw_indexes();
                slot.insert(OracleNode {
                    address: node.clone(),
                    indexes,
                    stake,
                    registered_at: Utc::now(),
                });

                self.events.append(LedgerEvent::OracleRegistered {
                    oracle: node.clone(),
                    indexes: indexes.to_vec(),
                });
                tracing::info!(oracle = %node, ?indexes, "oracle registered");
                Ok(indexes)
            }
        }
    }

    pub fn indexes_of(&self, node: &Address) -> Result<OracleIndexes> {
        self.nodes
            .get(node)
            .map(|entry| entry.indexes)
            .ok_or_else(|| FlightSuretyError::NotRegistered {
                address: node.clone(),
            })
    }

    pub fn is_registered(&self, node: &Address) -> bool {
        self.nodes.contains_key(node)
    }

    pub fn node(&self, node: &Address) -> Option<OracleNode> {
        self.nodes.get(node).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn draw_indexes(&self) -> OracleIndexes {
        let mut indexes = [0u8; INDEXES_PER_ORACLE];
        for slot in indexes.iter_mut() {
            *slot = self.source.draw(self.params.index_range);
        }
        indexes
    }
}
