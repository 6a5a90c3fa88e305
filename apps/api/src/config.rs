use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_EVALUATOR_TIMEOUT_SECS: u64 = 30;

/// Application configuration loaded from environment variables.
/// Only malformed values are fatal; every variable has a fallback.
#[derive(Debug, Clone)]
pub struct Config {
    /// Absent: sessions live in memory only.
    pub database_url: Option<String>,
    /// Absent: every evaluator call takes its fallback.
    pub anthropic_api_key: Option<String>,
    pub evaluator_timeout: Duration,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            anthropic_api_key: optional_env("ANTHROPIC_API_KEY"),
            evaluator_timeout: Duration::from_secs(
                optional_env("EVALUATOR_TIMEOUT_SECS")
                    .map(|v| v.parse::<u64>())
                    .transpose()
                    .context("EVALUATOR_TIMEOUT_SECS must be a whole number of seconds")?
                    .unwrap_or(DEFAULT_EVALUATOR_TIMEOUT_SECS),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
