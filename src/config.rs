use crate::core::optimizer::SettlementAlgorithm;
use dotenv::dotenv;
use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

#[derive(Clone)]
pub struct Config {
    pub log_level: String,
    /// Upper bound on one ledger read; exceeding it surfaces as `StoreUnavailable`.
    pub store_timeout: Duration,
    /// When set, valid cache entries older than this are recomputed on read.
    pub balance_max_age: Option<Duration>,
    pub settlement_algorithm: SettlementAlgorithm,
    pub ledger_file: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("log_level", &self.log_level)
            .field("store_timeout_ms", &self.store_timeout.as_millis())
            .field("balance_max_age_secs", &self.balance_max_age.map(|d| d.as_secs()))
            .field("settlement_algorithm", &self.settlement_algorithm)
            .field("ledger_file", &self.ledger_file)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            store_timeout: Duration::from_millis(5_000),
            balance_max_age: None,
            settlement_algorithm: SettlementAlgorithm::Greedy,
            ledger_file: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();

        Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            store_timeout: env::var("STORE_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            balance_max_age: env::var("BALANCE_MAX_AGE_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs),
            settlement_algorithm: env::var("SETTLEMENT_ALGORITHM")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.settlement_algorithm),
            ledger_file: env::var("LEDGER_FILE").ok().filter(|v| !v.trim().is_empty()),
        }
    }
}

pub static CONFIG: Lazy<Config> = Lazy::new(Config::from_env);
