//! Flight-status consensus among oracle nodes.
//!
//! A status request is keyed by (airline, flight, timestamp) and carries one
//! selected index. Only nodes holding that index may answer, and each node
//! answers a request at most once. The first status whose responder count
//! reaches `min_responses` becomes final and the request stops accepting
//! responses.
//!
//! Requests live in a `DashMap`, so every submission runs under the lock of
//! its own entry: the dedup check, the count and the finalization of one key
//! are atomic. Accepted responses then append to the shared event log while
//! still holding that entry, so appends from all keys pass through the log's
//! write lock one at a time and the log keeps a single total order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::config::Parameters;
use crate::entropy::IndexSource;
use crate::error::{FlightSuretyError, Result};
use crate::events::{EventLog, LedgerEvent};
use crate::gate::OperationalGate;
use crate::oracle::OracleDirectory;
use crate::types::{Address, FlightStatus, RequestKey};

#[derive(Debug, Clone)]
enum RequestState {
    Open {
        responses: BTreeMap<FlightStatus, BTreeSet<Address>>,
    },
    Finalized {
        status: FlightStatus,
        finalized_at: DateTime<Utc>,
        responders: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Recorded { count: usize },
    Finalized { count: usize },
    Duplicate,
}

#[derive(Debug, Clone)]
struct StatusRequest {
    selected_index: u8,
    requested_at: DateTime<Utc>,
    state: RequestState,
}

impl StatusRequest {
    fn new(selected_index: u8) -> Self {
        Self {
            selected_index,
            requested_at: Utc::now(),
            state: RequestState::Open {
                responses: BTreeMap::new(),
            },
        }
    }

    /// Count `node`'s answer. Once the quorum is reached the response sets
    /// are dropped and only the final status is kept.
    fn record(
        &mut self,
        node: &Address,
        status: FlightStatus,
        min_responses: usize,
    ) -> Result<RecordOutcome> {
        let responses = match &mut self.state {
            RequestState::Finalized { .. } => return Err(FlightSuretyError::AlreadyFinalized),
            RequestState::Open { responses } => responses,
        };

        if responses.values().any(|responders| responders.contains(node)) {
            return Ok(RecordOutcome::Duplicate);
        }

        let responders = responses.entry(status).or_default();
        responders.insert(node.clone());
        let count = responders.len();

        if count < min_responses {
            return Ok(RecordOutcome::Recorded { count });
        }

        let total: usize = responses.values().map(BTreeSet::len).sum();
        self.state = RequestState::Finalized {
            status,
            finalized_at: Utc::now(),
            responders: total,
        };
        Ok(RecordOutcome::Finalized { count })
    }

    fn view(&self, key: &RequestKey) -> StatusRequestView {
        let (final_status, finalized_at, tallies, responders) = match &self.state {
            RequestState::Open { responses } => {
                let tallies: Vec<StatusTally> = responses
                    .iter()
                    .map(|(status, nodes)| StatusTally {
                        status: *status,
                        count: nodes.len(),
                    })
                    .collect();
                let responders = tallies.iter().map(|tally| tally.count).sum();
                (None, None, tallies, responders)
            }
            RequestState::Finalized {
                status,
                finalized_at,
                responders,
            } => (Some(*status), Some(*finalized_at), Vec::new(), *responders),
        };

        StatusRequestView {
            key: key.clone(),
            digest: key.digest(),
            selected_index: self.selected_index,
            requested_at: self.requested_at,
            final_status,
            finalized_at,
            responders,
            tallies,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTally {
    pub status: FlightStatus,
    pub count: usize,
}

/// Read-only snapshot of a status request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequestView {
    pub key: RequestKey,
    pub digest: String,
    pub selected_index: u8,
    pub requested_at: DateTime<Utc>,
    pub final_status: Option<FlightStatus>,
    pub finalized_at: Option<DateTime<Utc>>,
    /// Distinct nodes that answered.
    pub responders: usize,
    /// Per-status counts while open; empty once finalized.
    pub tallies: Vec<StatusTally>,
}

/// What a submitted response did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ResponseOutcome {
    Recorded { status: FlightStatus, count: usize },
    Finalized { status: FlightStatus, count: usize },
    /// The node had already answered this request.
    Duplicate,
    /// The request was already finalized.
    Ignored,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestCounts {
    pub open: usize,
    pub finalized: usize,
}

pub struct OracleConsensus {
    params: Parameters,
    gate: Arc<OperationalGate>,
    events: Arc<EventLog>,
    directory: Arc<OracleDirectory>,
    source: Arc<dyn IndexSource>,
    requests: DashMap<RequestKey, StatusRequest>,
}

impl OracleConsensus {
    pub fn new(
        params: Parameters,
        gate: Arc<OperationalGate>,
        events: Arc<EventLog>,
        directory: Arc<OracleDirectory>,
        source: Arc<dyn IndexSource>,
    ) -> Self {
        Self {
            params,
            gate,
            events,
            directory,
            source,
            requests: DashMap::new(),
        }
    }

    /// Open a status request for `key` and announce it. Asking again for a
    /// known key returns the index chosen the first time.
    pub fn request_status(&self, key: &RequestKey) -> Result<u8> {
        self.gate.require_operational()?;

        match self.requests.entry(key.clone()) {
            Entry::Occupied(existing) => Ok(existing.get().selected_index),
            Entry::Vacant(slot) => {
                let selected_index = self.source.draw(self.params.index_range);
                slot.insert(StatusRequest::new(selected_index));

                self.events
                    .append(LedgerEvent::request_announced(key, selected_index));
                tracing::info!(
                    request = %key,
                    digest = %key.digest(),
                    selected_index,
                    "status request announced"
                );
                Ok(selected_index)
            }
        }
    }

    /// Record `node`'s answer for `key` under `index`.
    ///
    /// Responses to a finalized request are dropped and reported as
    /// [`ResponseOutcome::Ignored`] rather than as an error.
    pub fn submit_response(
        &self,
        node: &Address,
        index: u8,
        key: &RequestKey,
        status: FlightStatus,
    ) -> Result<ResponseOutcome> {
        self.gate.require_operational()?;

        let indexes = self.directory.indexes_of(node)?;
        if !indexes.contains(&index) {
            return Err(FlightSuretyError::IndexMismatch { index });
        }

        let mut request = self
            .requests
            .get_mut(key)
            .ok_or(FlightSuretyError::IndexMismatch { index })?;
        if request.selected_index != index {
            return Err(FlightSuretyError::IndexMismatch { index });
        }

        match request.record(node, status, self.params.min_responses) {
            Err(FlightSuretyError::AlreadyFinalized) => {
                tracing::debug!(request = %key, oracle = %node, "late response ignored");
                Ok(ResponseOutcome::Ignored)
            }
            Err(err) => Err(err),
            Ok(RecordOutcome::Duplicate) => {
                tracing::debug!(request = %key, oracle = %node, "duplicate response ignored");
                Ok(ResponseOutcome::Duplicate)
            }
            Ok(RecordOutcome::Recorded { count }) => {
                self.events
                    .append(LedgerEvent::oracle_report(key, status, node));
                tracing::debug!(request = %key, oracle = %node, %status, count, "oracle response recorded");
                Ok(ResponseOutcome::Recorded { status, count })
            }
            Ok(RecordOutcome::Finalized { count }) => {
                self.events
                    .append(LedgerEvent::oracle_report(key, status, node));
                self.events
                    .append(LedgerEvent::status_finalized(key, status));
                tracing::info!(request = %key, %status, count, "flight status finalized");
                Ok(ResponseOutcome::Finalized { status, count })
            }
        }
    }

    pub fn status_request(&self, key: &RequestKey) -> Option<StatusRequestView> {
        self.requests.get(key).map(|request| request.view(key))
    }

    pub fn final_status(&self, key: &RequestKey) -> Option<FlightStatus> {
        self.requests
            .get(key)
            .and_then(|request| match request.state {
                RequestState::Finalized { status, .. } => Some(status),
                RequestState::Open { .. } => None,
            })
    }

    pub fn selected_index(&self, key: &RequestKey) -> Option<u8> {
        self.requests.get(key).map(|request| request.selected_index)
    }

    pub fn request_counts(&self) -> RequestCounts {
        let mut counts = RequestCounts::default();
        for entry in self.requests.iter() {
            match entry.value().state {
                RequestState::Open { .. } => counts.open += 1,
                RequestState::Finalized { .. } => counts.finalized += 1,
            }
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ONE_ETHER;
    use crate::oracle::tests::ScriptedIndexSource;

    struct Fixture {
        owner: Address,
        gate: Arc<OperationalGate>,
        events: Arc<EventLog>,
        directory: Arc<OracleDirectory>,
        consensus: OracleConsensus,
    }

    /// `node_draws` feeds oracle registration, `request_draws` feeds
    /// request index selection.
    fn setup(node_draws: &[u8], request_draws: &[u8]) -> Fixture {
        let owner = Address::new("0xowner");
        let gate = Arc::new(OperationalGate::new(owner.clone()));
        let events = Arc::new(EventLog::new());
        let params = Parameters::default();
        let directory = Arc::new(OracleDirectory::new(
            params.clone(),
            gate.clone(),
            events.clone(),
            Arc::new(ScriptedIndexSource::new(node_draws)),
        ));
        let consensus = OracleConsensus::new(
            params,
            gate.clone(),
            events.clone(),
            directory.clone(),
            Arc::new(ScriptedIndexSource::new(request_draws)),
        );
        Fixture {
            owner,
            gate,
            events,
            directory,
            consensus,
        }
    }

    fn key(flight: &str) -> RequestKey {
        RequestKey::new(Address::new("0xa0"), flight, 1_700_000_000)
    }

    fn oracle(n: u32) -> Address {
        Address::new(format!("0xo{n}"))
    }

    #[test]
    fn test_request_is_idempotent() {
        let f = setup(&[], &[4, 9]);
        let k = key("ND1309");

        assert_eq!(f.consensus.request_status(&k), Ok(4));
        assert_eq!(f.consensus.request_status(&k), Ok(4));
        assert_eq!(f.events.len(), 1);
        assert_eq!(f.consensus.request_counts().open, 1);

        assert_eq!(f.consensus.request_status(&key("ND1310")), Ok(9));
    }

    #[test]
    fn test_finalized_request_is_never_reopened() {
        let f = setup(&[4; 9], &[4, 7]);
        let k = key("ND1309");
        for n in 1..=3 {
            f.directory.register(&oracle(n), ONE_ETHER).unwrap();
        }
        assert_eq!(f.consensus.request_status(&k), Ok(4));
        for n in 1..=3 {
            f.consensus
                .submit_response(&oracle(n), 4, &k, FlightStatus::LateTechnical)
                .unwrap();
        }
        assert_eq!(f.consensus.final_status(&k), Some(FlightStatus::LateTechnical));
        let logged = f.events.len();

        assert_eq!(f.consensus.request_status(&k), Ok(4));
        assert_eq!(f.events.len(), logged);
        assert_eq!(f.consensus.final_status(&k), Some(FlightStatus::LateTechnical));
        assert_eq!(
            f.consensus.request_counts(),
            RequestCounts {
                open: 0,
                finalized: 1
            }
        );
    }

    #[test]
    fn test_node_answers_each_key_once() {
        let f = setup(&[2, 5, 7], &[5, 2]);
        let node = oracle(1);
        f.directory.register(&node, ONE_ETHER).unwrap();

        let first = key("ND1309");
        let second = key("ND1310");
        assert_eq!(f.consensus.request_status(&first), Ok(5));
        assert_eq!(f.consensus.request_status(&second), Ok(2));

        assert_eq!(
            f.consensus.submit_response(&node, 5, &first, FlightStatus::OnTime),
            Ok(ResponseOutcome::Recorded {
                status: FlightStatus::OnTime,
                count: 1
            })
        );
        assert!(matches!(
            f.consensus.submit_response(&node, 2, &second, FlightStatus::OnTime),
            Ok(ResponseOutcome::Recorded { .. })
        ));
        assert_eq!(
            f.consensus.submit_response(&node, 5, &first, FlightStatus::LateWeather),
            Ok(ResponseOutcome::Duplicate)
        );

        let view = f.consensus.status_request(&first).unwrap();
        assert_eq!(view.responders, 1);
        assert_eq!(
            view.tallies,
            vec![StatusTally {
                status: FlightStatus::OnTime,
                count: 1
            }]
        );
    }

    #[test]
    fn test_index_must_match_request() {
        let f = setup(&[2, 5, 7], &[5]);
        let node = oracle(1);
        f.directory.register(&node, ONE_ETHER).unwrap();
        let k = key("ND1309");
        f.consensus.request_status(&k).unwrap();

        // Held by the node but not selected.
        assert_eq!(
            f.consensus.submit_response(&node, 2, &k, FlightStatus::OnTime),
            Err(FlightSuretyError::IndexMismatch { index: 2 })
        );
        // Not held by the node.
        assert_eq!(
            f.consensus.submit_response(&node, 3, &k, FlightStatus::OnTime),
            Err(FlightSuretyError::IndexMismatch { index: 3 })
        );
        // No such request.
        assert_eq!(
            f.consensus.submit_response(&node, 5, &key("XX1"), FlightStatus::OnTime),
            Err(FlightSuretyError::IndexMismatch { index: 5 })
        );
        assert_eq!(f.consensus.status_request(&k).unwrap().responders, 0);
    }

    #[test]
    fn test_unregistered_node_rejected() {
        let f = setup(&[], &[5]);
        let k = key("ND1309");
        f.consensus.request_status(&k).unwrap();
        assert_eq!(
            f.consensus.submit_response(&oracle(9), 5, &k, FlightStatus::OnTime),
            Err(FlightSuretyError::NotRegistered { address: oracle(9) })
        );
    }

    #[test]
    fn test_quorum_finalizes_once() {
        let f = setup(&[5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5, 5], &[5]);
        for n in 1..=4 {
            f.directory.register(&oracle(n), ONE_ETHER).unwrap();
        }
        let k = key("ND1309");
        f.consensus.request_status(&k).unwrap();

        f.consensus
            .submit_response(&oracle(1), 5, &k, FlightStatus::LateAirline)
            .unwrap();
        f.consensus
            .submit_response(&oracle(2), 5, &k, FlightStatus::LateAirline)
            .unwrap();
        assert_eq!(f.consensus.final_status(&k), None);

        assert_eq!(
            f.consensus.submit_response(&oracle(3), 5, &k, FlightStatus::LateAirline),
            Ok(ResponseOutcome::Finalized {
                status: FlightStatus::LateAirline,
                count: 3
            })
        );
        assert_eq!(f.consensus.final_status(&k), Some(FlightStatus::LateAirline));

        let events_before = f.events.len();
        assert_eq!(
            f.consensus.submit_response(&oracle(4), 5, &k, FlightStatus::LateWeather),
            Ok(ResponseOutcome::Ignored)
        );
        assert_eq!(f.events.len(), events_before);

        let view = f.consensus.status_request(&k).unwrap();
        assert_eq!(view.final_status, Some(FlightStatus::LateAirline));
        assert_eq!(view.responders, 3);
        assert!(view.tallies.is_empty());
        assert_eq!(
            f.consensus.request_counts(),
            RequestCounts {
                open: 0,
                finalized: 1
            }
        );
    }

    #[test]
    fn test_split_votes_stay_open() {
        let f = setup(&[1, 1, 1, 1, 1, 1, 1, 1, 1], &[1]);
        for n in 1..=3 {
            f.directory.register(&oracle(n), ONE_ETHER).unwrap();
        }
        let k = key("ND1309");
        f.consensus.request_status(&k).unwrap();

        let statuses = [
            FlightStatus::OnTime,
            FlightStatus::LateWeather,
            FlightStatus::OnTime,
        ];
        for (n, status) in (1..=3).zip(statuses) {
            f.consensus.submit_response(&oracle(n), 1, &k, status).unwrap();
        }

        let view = f.consensus.status_request(&k).unwrap();
        assert_eq!(view.final_status, None);
        assert_eq!(view.responders, 3);
        assert_eq!(
            view.tallies,
            vec![
                StatusTally {
                    status: FlightStatus::OnTime,
                    count: 2
                },
                StatusTally {
                    status: FlightStatus::LateWeather,
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_closed_gate_blocks_requests_and_responses() {
        let f = setup(&[5, 5, 5], &[5]);
        f.directory.register(&oracle(1), ONE_ETHER).unwrap();
        let k = key("ND1309");
        f.consensus.request_status(&k).unwrap();

        f.gate.set_operating_status(&f.owner, false).unwrap();
        assert_eq!(
            f.consensus.request_status(&key("ND2")),
            Err(FlightSuretyError::OperationNotAllowed)
        );
        assert_eq!(
            f.consensus.submit_response(&oracle(1), 5, &k, FlightStatus::OnTime),
            Err(FlightSuretyError::OperationNotAllowed)
        );

        // Pausing does not cancel the open request.
        f.gate.set_operating_status(&f.owner, true).unwrap();
        assert!(f.consensus.submit_response(&oracle(1), 5, &k, FlightStatus::OnTime).is_ok());
    }

    #[test]
    fn test_record_after_finalize_is_soft_error() {
        let mut request = StatusRequest::new(3);
        let node = oracle(1);
        assert_eq!(
            request.record(&node, FlightStatus::OnTime, 1),
            Ok(RecordOutcome::Finalized { count: 1 })
        );
        assert_eq!(
            request.record(&oracle(2), FlightStatus::OnTime, 1),
            Err(FlightSuretyError::AlreadyFinalized)
        );
    }
}
