//! FlightSurety core
//!
//! Governance and consensus for a decentralized flight-insurance registry:
//!
//! 1. **Gate** (`gate.rs`) - owner-controlled switch checked by every mutation
//! 2. **Registry** (`registry.rs`) - airline admission by bootstrap or quorum vote, and funding
//! 3. **Oracles** (`oracle.rs`) - oracle node registration and index assignment
//! 4. **Consensus** (`consensus.rs`) - status requests and threshold finalization
//! 5. **Events** (`events.rs`) - replayable log consumed by oracle nodes
//!
//! ```text
//! requestStatus(key) -> RequestAnnounced{selected_index}
//!   oracle nodes holding selected_index -> submitResponse(status)
//!   MIN_RESPONSES matching responses   -> StatusFinalized{status}
//! ```

pub mod config;
pub mod consensus;
pub mod entropy;
pub mod error;
pub mod events;
pub mod gate;
pub mod oracle;
pub mod registry;
pub mod surety;
pub mod types;

pub use config::{Parameters, ONE_ETHER};
pub use consensus::{OracleConsensus, RequestCounts, ResponseOutcome, StatusRequestView, StatusTally};
pub use entropy::{IndexSource, RandomIndexSource, SeededIndexSource};
pub use error::{FlightSuretyError, Result};
pub use events::{EventLog, EventRecord, LedgerEvent};
pub use gate::OperationalGate;
pub use oracle::{OracleDirectory, OracleIndexes, OracleNode};
pub use registry::{AirlineRecord, AirlineRegistry, NominationOutcome};
pub use surety::{FlightSurety, Summary};
pub use types::{Address, AirlineState, FlightStatus, RequestKey};
