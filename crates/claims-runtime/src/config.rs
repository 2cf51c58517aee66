//! Runtime configuration with environment overrides.

use chrono::Duration as ChronoDuration;
use serde::Deserialize;

use claims_engine::{EngineConfig, TimeoutPolicy};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub bind_addr: String,
    pub ledger_path: String,
    pub tick_interval_ms: u64,
    pub validate_timeout_secs: i64,
    pub validate_retries: u32,
    pub fulfill_timeout_secs: i64,
    pub fulfill_retries: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".into(),
            ledger_path: "claims_ledger.db".into(),
            tick_interval_ms: 250,
            validate_timeout_secs: 10,
            validate_retries: 3,
            fulfill_timeout_secs: 10,
            fulfill_retries: 3,
        }
    }
}

impl RuntimeConfig {
    /// Defaults overridden by `CLAIMS_*` environment variables; unparseable
    /// values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind_addr: env_or("CLAIMS_BIND_ADDR", defaults.bind_addr),
            ledger_path: env_or("CLAIMS_LEDGER_PATH", defaults.ledger_path),
            tick_interval_ms: env_parsed("CLAIMS_TICK_INTERVAL_MS", defaults.tick_interval_ms),
            validate_timeout_secs: env_parsed(
                "CLAIMS_VALIDATE_TIMEOUT_SECS",
                defaults.validate_timeout_secs,
            ),
            validate_retries: env_parsed("CLAIMS_VALIDATE_RETRIES", defaults.validate_retries),
            fulfill_timeout_secs: env_parsed(
                "CLAIMS_FULFILL_TIMEOUT_SECS",
                defaults.fulfill_timeout_secs,
            ),
            fulfill_retries: env_parsed("CLAIMS_FULFILL_RETRIES", defaults.fulfill_retries),
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            validate: TimeoutPolicy::new(
                ChronoDuration::seconds(self.validate_timeout_secs),
                self.validate_retries,
            ),
            fulfill: TimeoutPolicy::new(
                ChronoDuration::seconds(self.fulfill_timeout_secs),
                self.fulfill_retries,
            ),
        }
    }

    pub fn tick_period(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
