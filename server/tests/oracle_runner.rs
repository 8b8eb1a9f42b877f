//! Simulated oracle fleet against an in-memory ledger.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use flightsurety_core::{
    Address, FlightStatus, FlightSurety, IndexSource, LedgerEvent, Parameters, RequestKey,
    ONE_ETHER,
};
use flightsurety_server::config::OracleRunnerConfig;
use flightsurety_server::oracle_runner::{oracle_address, OracleRunner, StartError};

struct Constant(u8);

impl IndexSource for Constant {
    fn draw(&self, range: u8) -> u8 {
        self.0 % range
    }
}

fn surety() -> Arc<FlightSurety> {
    Arc::new(
        FlightSurety::with_index_source(
            Parameters::default(),
            Address::new("0xowner"),
            Address::new("0xgenesis"),
            "Genesis Air",
            Arc::new(Constant(3)),
        )
        .unwrap(),
    )
}

fn config(state_file: PathBuf, simulated_oracles: usize) -> OracleRunnerConfig {
    OracleRunnerConfig {
        simulated_oracles,
        stake: ONE_ETHER,
        poll_interval: Duration::from_millis(10),
        state_file,
        fixed_status: Some(FlightStatus::LateWeather),
    }
}

#[tokio::test]
async fn test_fleet_finalizes_announced_request() {
    let dir = tempfile::tempdir().unwrap();
    let surety = surety();
    let mut runner = OracleRunner::new(surety.clone(), config(dir.path().join("state.json"), 5)).await;
    assert_eq!(runner.register_nodes().unwrap(), 5);

    let genesis = Address::new("0xgenesis");
    surety.request_flight_status(&genesis, "ND1309", 42).unwrap();

    // Three nodes reach quorum; the remaining two are ignored.
    assert_eq!(runner.poll_once().await.unwrap(), 3);

    let key = RequestKey::new(genesis, "ND1309", 42);
    assert_eq!(surety.final_status(&key), Some(FlightStatus::LateWeather));

    let finals = surety
        .events()
        .since(0, 1000)
        .into_iter()
        .filter(|record| matches!(record.event, LedgerEvent::StatusFinalized { .. }))
        .count();
    assert_eq!(finals, 1);
}

#[tokio::test]
async fn test_cursor_is_persisted_and_reloaded() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("nested").join("state.json");
    let surety = surety();

    let mut runner = OracleRunner::new(surety.clone(), config(state_file.clone(), 3)).await;
    runner.register_nodes().unwrap();
    surety
        .request_flight_status(&Address::new("0xgenesis"), "ND1309", 1)
        .unwrap();
    runner.poll_once().await.unwrap();

    let processed = runner.cursor().await;
    assert!(processed > 0);
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&state_file).unwrap()).unwrap();
    assert_eq!(saved["last_processed_event"], processed);

    // A second runner resumes where the first stopped and re-registers
    // without error.
    let mut resumed = OracleRunner::new(surety.clone(), config(state_file, 3)).await;
    assert_eq!(resumed.cursor().await, processed);
    assert_eq!(resumed.register_nodes().unwrap(), 3);
}

#[tokio::test]
async fn test_cursor_ahead_of_log_is_reset() {
    let dir = tempfile::tempdir().unwrap();
    let state_file = dir.path().join("state.json");
    std::fs::write(&state_file, r#"{ "last_processed_event": 9999 }"#).unwrap();

    let runner = OracleRunner::new(surety(), config(state_file, 3)).await;
    assert_eq!(runner.cursor().await, 0);
}

#[tokio::test]
async fn test_paused_ledger_defers_announcements() {
    let dir = tempfile::tempdir().unwrap();
    let surety = surety();
    let owner = Address::new("0xowner");
    let mut runner = OracleRunner::new(surety.clone(), config(dir.path().join("state.json"), 3)).await;
    runner.register_nodes().unwrap();

    let genesis = Address::new("0xgenesis");
    surety.request_flight_status(&genesis, "ND1309", 7).unwrap();
    let announced_at = surety.events().latest_sequence();
    surety.set_operating_status(&owner, false).unwrap();

    assert_eq!(runner.poll_once().await.unwrap(), 0);
    assert_eq!(runner.cursor().await, announced_at - 1);

    surety.set_operating_status(&owner, true).unwrap();
    assert_eq!(runner.poll_once().await.unwrap(), 3);
    let key = RequestKey::new(genesis, "ND1309", 7);
    assert_eq!(surety.final_status(&key), Some(FlightStatus::LateWeather));
}

#[tokio::test]
async fn test_start_without_oracles_is_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let runner = OracleRunner::new(surety(), config(dir.path().join("state.json"), 0)).await;
    assert!(matches!(runner.start().await, Err(StartError::NoOracles)));
}

#[tokio::test]
async fn test_started_runner_answers_live_requests() {
    let dir = tempfile::tempdir().unwrap();
    let surety = surety();
    let runner = OracleRunner::new(surety.clone(), config(dir.path().join("state.json"), 4)).await;
    let handle = tokio::spawn(runner.start());

    // Wait for the fleet to register before announcing.
    let fleet = oracle_address(3);
    for _ in 0..200 {
        if surety.oracles().is_registered(&fleet) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let genesis = Address::new("0xgenesis");
    surety.request_flight_status(&genesis, "ND1309", 99).unwrap();
    let key = RequestKey::new(genesis, "ND1309", 99);

    let mut finalized = None;
    for _ in 0..200 {
        finalized = surety.final_status(&key);
        if finalized.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    handle.abort();

    assert_eq!(finalized, Some(FlightStatus::LateWeather));
}
