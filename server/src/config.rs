//! Server configuration from the environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use flightsurety_core::{Address, FlightStatus, Parameters};

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub owner: Address,
    pub genesis_airline: Address,
    pub genesis_name: String,
    pub params: Parameters,
    pub oracles: OracleRunnerConfig,
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct OracleRunnerConfig {
    /// Number of simulated oracle nodes registered at startup; 0 disables the runner.
    pub simulated_oracles: usize,
    pub stake: u128,
    pub poll_interval: Duration,
    /// Where the last processed event sequence is persisted.
    pub state_file: PathBuf,
    /// Report this status instead of a random one.
    pub fixed_status: Option<FlightStatus>,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Parameters::default();
        let params = Parameters {
            minimum_fund: env_or("MINIMUM_FUND_WEI", defaults.minimum_fund)?,
            minimum_oracle_stake: env_or("MINIMUM_ORACLE_STAKE_WEI", defaults.minimum_oracle_stake)?,
            index_range: env_or("ORACLE_INDEX_RANGE", defaults.index_range)?,
            min_responses: env_or("MIN_RESPONSES", defaults.min_responses)?,
            bootstrap_airlines: env_or("BOOTSTRAP_AIRLINES", defaults.bootstrap_airlines)?,
        };

        let fixed_status = match env::var("ORACLE_FIXED_STATUS") {
            Ok(raw) if !raw.trim().is_empty() => {
                let code: u8 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("ORACLE_FIXED_STATUS must be a status code, got {raw:?}"))?;
                Some(FlightStatus::try_from(code)?)
            }
            _ => None,
        };

        let oracles = OracleRunnerConfig {
            simulated_oracles: env_or("SIMULATED_ORACLES", 15)?,
            stake: env_or("ORACLE_STAKE_WEI", params.minimum_oracle_stake)?,
            poll_interval: Duration::from_millis(env_or("ORACLE_POLL_INTERVAL_MS", 1000)?),
            state_file: PathBuf::from(
                env::var("COORDINATOR_STATE_FILE")
                    .unwrap_or_else(|_| "server/.coordinator_state.json".to_string()),
            ),
            fixed_status,
        };

        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            port: env_or("PORT", 3001)?,
            owner: Address::new(env::var("OWNER_ADDRESS").unwrap_or_else(|_| "0xowner".to_string())),
            genesis_airline: Address::new(
                env::var("GENESIS_AIRLINE_ADDRESS").unwrap_or_else(|_| "0xgenesis".to_string()),
            ),
            genesis_name: env::var("GENESIS_AIRLINE_NAME")
                .unwrap_or_else(|_| "Genesis Airline".to_string()),
            params,
            oracles,
            cors_allowed_origins,
        })
    }
}

/// Parse `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        Err(_) => Ok(default),
    }
}
