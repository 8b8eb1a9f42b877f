//! Simulated oracle nodes.
//!
//! The runner registers a fleet of oracle nodes against the shared
//! `FlightSurety`, then tails the event log from a persisted cursor. Every
//! `RequestAnnounced` entry is answered by each simulated node holding the
//! announced index. The cursor is written to disk after each batch; replaying
//! a batch is harmless because the core counts each node at most once.
//!
//! The event log itself lives in memory, so the saved cursor only carries
//! over between runners sharing one ledger, such as a supervisor restart
//! inside the same process. A fresh process starts a new log, finds the saved
//! cursor ahead of it and replays from the beginning.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use flightsurety_core::{
    Address, FlightStatus, FlightSurety, FlightSuretyError, LedgerEvent, OracleIndexes,
    RequestKey, ResponseOutcome,
};

use crate::config::OracleRunnerConfig;

const EVENT_BATCH: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("no simulated oracles configured")]
    NoOracles,
    #[error("oracle registration failed: {0}")]
    Registration(#[from] FlightSuretyError),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RunnerState {
    last_processed_event: u64,
}

#[derive(Debug, Clone)]
struct SimulatedOracle {
    address: Address,
    indexes: OracleIndexes,
}

pub struct OracleRunner {
    surety: Arc<FlightSurety>,
    config: OracleRunnerConfig,
    nodes: Vec<SimulatedOracle>,
    cursor: Mutex<u64>,
}

impl OracleRunner {
    /// Load the persisted cursor. A cursor ahead of the log was written
    /// against an earlier process's log and is discarded.
    pub async fn new(surety: Arc<FlightSurety>, config: OracleRunnerConfig) -> Self {
        let persisted = read_runner_state(&config.state_file)
            .await
            .map(|state| state.last_processed_event)
            .unwrap_or(0);

        let latest = surety.events().latest_sequence();
        let cursor = if persisted > latest {
            warn!(
                persisted,
                latest, "persisted cursor is ahead of the event log; replaying from the start"
            );
            0
        } else {
            persisted
        };

        Self {
            surety,
            config,
            nodes: Vec::new(),
            cursor: Mutex::new(cursor),
        }
    }

    /// Register the simulated fleet. Nodes registered by an earlier run keep
    /// their indexes.
    pub fn register_nodes(&mut self) -> Result<usize, FlightSuretyError> {
        self.nodes.clear();
        for n in 0..self.config.simulated_oracles {
            let address = oracle_address(n);
            let indexes = match self.surety.register_oracle(&address, self.config.stake) {
                Ok(indexes) => indexes,
                Err(FlightSuretyError::AlreadyRegistered { .. }) => {
                    self.surety.indexes_of(&address)?
                }
                Err(err) => return Err(err),
            };
            debug!(oracle = %address, ?indexes, "simulated oracle ready");
            self.nodes.push(SimulatedOracle { address, indexes });
        }
        Ok(self.nodes.len())
    }

    pub async fn cursor(&self) -> u64 {
        *self.cursor.lock().await
    }

    pub async fn start(mut self) -> Result<(), StartError> {
        if self.config.simulated_oracles == 0 {
            warn!("Oracle runner disabled: SIMULATED_ORACLES is 0");
            return Err(StartError::NoOracles);
        }

        let registered = self.register_nodes()?;
        info!(registered, "oracle runner started");

        let mut feed = self.surety.events().subscribe();
        loop {
            if let Err(err) = self.poll_once().await {
                error!(error = %err, "oracle runner poll cycle failed");
            }

            tokio::select! {
                _ = sleep(self.config.poll_interval) => {}
                received = feed.recv() => match received {
                    Ok(_) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => {
                        info!("event log closed; oracle runner stopping");
                        return Ok(());
                    }
                },
            }
        }
    }

    /// Process one batch of events after the cursor and return the number of
    /// responses submitted.
    pub async fn poll_once(&self) -> Result<usize> {
        let mut cursor_guard = self.cursor.lock().await;
        let from = *cursor_guard;
        let batch = self.surety.events().since(from, EVENT_BATCH);
        if batch.is_empty() {
            return Ok(0);
        }

        let mut submitted = 0;
        let mut processed = from;
        for record in &batch {
            if let LedgerEvent::RequestAnnounced { selected_index, .. } = &record.event {
                if let Some(key) = record.event.request_key() {
                    match self.answer(&key, *selected_index) {
                        Ok(count) => submitted += count,
                        Err(FlightSuretyError::OperationNotAllowed) => {
                            // Retry this announcement once operations resume.
                            warn!(request = %key, "operations paused; deferring request");
                            break;
                        }
                        Err(err) => {
                            warn!(request = %key, error = %err, "oracle response rejected");
                        }
                    }
                }
            }
            processed = record.sequence;
        }

        if processed != from {
            *cursor_guard = processed;
            persist_runner_state(
                &self.config.state_file,
                &RunnerState {
                    last_processed_event: processed,
                },
            )
            .await?;
        }

        info!(from, to = processed, submitted, "oracle runner cycle complete");
        Ok(submitted)
    }

    /// Submit one response from every simulated node holding `index`.
    fn answer(&self, key: &RequestKey, index: u8) -> Result<usize, FlightSuretyError> {
        let mut submitted = 0;
        for node in self.nodes.iter().filter(|node| node.indexes.contains(&index)) {
            let status = self.pick_status();
            let outcome = self.surety.submit_oracle_response(
                &node.address,
                index,
                &key.airline,
                &key.flight,
                key.timestamp,
                status.code(),
            )?;
            debug!(oracle = %node.address, request = %key, %status, ?outcome, "oracle answered");
            match outcome {
                ResponseOutcome::Recorded { .. } | ResponseOutcome::Finalized { .. } => {
                    submitted += 1
                }
                ResponseOutcome::Duplicate => {}
                ResponseOutcome::Ignored => break,
            }
        }
        Ok(submitted)
    }

    fn pick_status(&self) -> FlightStatus {
        self.config.fixed_status.unwrap_or_else(|| {
            *FlightStatus::ALL
                .choose(&mut rand::thread_rng())
                .unwrap_or(&FlightStatus::Unknown)
        })
    }
}

pub fn oracle_address(n: usize) -> Address {
    Address::new(format!("0xoracle{n:02}"))
}

async fn read_runner_state(path: &Path) -> Result<RunnerState> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).context("parsing oracle runner state")
}

async fn persist_runner_state(path: &Path, state: &RunnerState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let payload = serde_json::to_string_pretty(state)?;
    tokio::fs::write(path, payload)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
