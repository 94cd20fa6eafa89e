use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

/// What the admin aggregator does when one of the signal collectors fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationFailurePolicy {
    /// The whole bulk read fails with `SignalSourceFailure`.
    Fail,
    /// The failed signal is read as `false` for every mentee and a warning is returned.
    Degrade,
}

impl FromStr for AggregationFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "degrade" => Ok(Self::Degrade),
            other => anyhow::bail!("unknown aggregation failure policy '{other}' (expected fail|degrade)"),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rust_log: String,
    /// Upper bound on a single signal collector query.
    pub signal_timeout: Duration,
    pub aggregation_policy: AggregationFailurePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let signal_timeout_ms = std::env::var("SIGNAL_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u64>()
            .context("SIGNAL_TIMEOUT_MS must be a whole number of milliseconds")?;

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            signal_timeout: Duration::from_millis(signal_timeout_ms),
            aggregation_policy: std::env::var("AGGREGATION_FAILURE_POLICY")
                .unwrap_or_else(|_| "fail".to_string())
                .parse()?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
