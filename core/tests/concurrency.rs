//! Racing callers against one shared `FlightSurety`.

use std::sync::Arc;
use std::thread;

use flightsurety_core::{
    Address, AirlineState, FlightSurety, FlightSuretyError, IndexSource, LedgerEvent, Parameters,
    RequestKey, ResponseOutcome, ONE_ETHER,
};

/// Every draw returns the same index.
struct Constant(u8);

impl IndexSource for Constant {
    fn draw(&self, range: u8) -> u8 {
        self.0 % range
    }
}

fn surety() -> FlightSurety {
    FlightSurety::with_index_source(
        Parameters::default(),
        Address::new("0xowner"),
        Address::new("0xgenesis"),
        "Genesis Air",
        Arc::new(Constant(6)),
    )
    .unwrap()
}

#[test]
fn test_concurrent_responses_finalize_exactly_once() {
    let surety = surety();
    let airline = Address::new("0xgenesis");
    let nodes: Vec<Address> = (0..24).map(|n| Address::new(format!("0xoracle{n}"))).collect();
    for node in &nodes {
        surety.register_oracle(node, ONE_ETHER).unwrap();
    }
    surety.request_flight_status(&airline, "ND1309", 7).unwrap();
    let cursor = surety.events().latest_sequence();

    let outcomes: Vec<ResponseOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = nodes
            .iter()
            .map(|node| {
                let surety = &surety;
                let airline = &airline;
                scope.spawn(move || {
                    surety
                        .submit_oracle_response(node, 6, airline, "ND1309", 7, 20)
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let finalized = outcomes
        .iter()
        .filter(|o| matches!(o, ResponseOutcome::Finalized { .. }))
        .count();
    let recorded = outcomes
        .iter()
        .filter(|o| matches!(o, ResponseOutcome::Recorded { .. }))
        .count();
    let ignored = outcomes
        .iter()
        .filter(|o| matches!(o, ResponseOutcome::Ignored))
        .count();
    assert_eq!(finalized, 1);
    assert_eq!(recorded, 2);
    assert_eq!(ignored, nodes.len() - 3);

    let events = surety.events().since(cursor, 1000);
    let finals = events
        .iter()
        .filter(|r| matches!(r.event, LedgerEvent::StatusFinalized { .. }))
        .count();
    assert_eq!(finals, 1);
}

#[test]
fn test_keys_finalize_independently() {
    let surety = surety();
    let airline = Address::new("0xgenesis");
    let nodes: Vec<Address> = (0..3).map(|n| Address::new(format!("0xoracle{n}"))).collect();
    for node in &nodes {
        surety.register_oracle(node, ONE_ETHER).unwrap();
    }
    let flights: Vec<String> = (0..16).map(|n| format!("FL{n:03}")).collect();
    for flight in &flights {
        surety.request_flight_status(&airline, flight, 1).unwrap();
    }

    thread::scope(|scope| {
        for flight in &flights {
            for node in &nodes {
                let surety = &surety;
                let airline = &airline;
                scope.spawn(move || {
                    surety
                        .submit_oracle_response(node, 6, airline, flight, 1, 10)
                        .unwrap();
                });
            }
        }
    });

    for flight in &flights {
        let key = RequestKey::new(airline.clone(), flight.as_str(), 1);
        assert!(surety.final_status(&key).is_some(), "{flight} not finalized");
    }
    assert_eq!(surety.summary().requests.finalized, flights.len());
}

#[test]
fn test_concurrent_votes_register_once() {
    let surety = surety();
    let genesis = Address::new("0xgenesis");
    surety.fund_airline(&genesis, ONE_ETHER).unwrap();

    let mut voters = vec![genesis.clone()];
    for n in 1..6 {
        let airline = Address::new(format!("0xair{n}"));
        for voter in &voters {
            if surety.nominate_airline(voter, &airline, "Air").unwrap().accepted {
                break;
            }
        }
        surety.fund_airline(&airline, ONE_ETHER).unwrap();
        voters.push(airline);
    }
    assert_eq!(surety.total_funded(), 6);

    let candidate = Address::new("0xcandidate");
    let results: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = voters
            .iter()
            .map(|voter| {
                let surety = &surety;
                let candidate = &candidate;
                scope.spawn(move || surety.nominate_airline(voter, candidate, "Candidate"))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let accepted = results
        .iter()
        .filter(|r| matches!(r, Ok(outcome) if outcome.accepted))
        .count();
    let late = results
        .iter()
        .filter(|r| matches!(r, Err(FlightSuretyError::AlreadyRegistered { .. })))
        .count();
    assert_eq!(accepted, 1);
    // Majority is ceil(6/2) = 3: two votes pending, one accepting, the rest late.
    assert_eq!(late, voters.len() - 3);
    assert_eq!(surety.airline_state(&candidate), AirlineState::Registered);
}

#[test]
fn test_concurrent_toggles_log_in_commit_order() {
    let owner = Address::new("0xowner");
    for _ in 0..50 {
        let surety = surety();
        thread::scope(|scope| {
            for t in 0..8 {
                let surety = &surety;
                let owner = &owner;
                scope.spawn(move || {
                    for i in 0..200 {
                        surety
                            .set_operating_status(owner, (i + t) % 2 == 0)
                            .unwrap();
                    }
                });
            }
        });

        let toggles: Vec<bool> = surety
            .events()
            .since(0, usize::MAX)
            .into_iter()
            .filter_map(|record| match record.event {
                LedgerEvent::OperatingStatusChanged { operational } => Some(operational),
                _ => None,
            })
            .collect();

        // Starting from operational, every logged change must flip the flag.
        let mut expected = false;
        for operational in &toggles {
            assert_eq!(*operational, expected, "log out of commit order: {toggles:?}");
            expected = !expected;
        }
        if let Some(last) = toggles.last() {
            assert_eq!(*last, surety.is_operational());
        }
    }
}
