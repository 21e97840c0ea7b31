//! Environment configuration.
//!
//! Every setting has a default; `from_lookup` takes the variable source as a
//! closure so tests never touch the process environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use ledgermerge_engine::{DEFAULT_DETAIL_LIMIT, DEFAULT_MAX_STAGED, DiffOptions, MatchStrategy};
use ledgermerge_storage::RetryPolicy;

pub const ENV_ADDR: &str = "LEDGER_ADDR";
pub const ENV_DB: &str = "LEDGER_DB";
pub const ENV_STAGING_DIR: &str = "LEDGER_STAGING_DIR";
pub const ENV_MAX_UPLOAD_MB: &str = "LEDGER_MAX_UPLOAD_MB";
pub const ENV_MAX_STAGED: &str = "LEDGER_MAX_STAGED";
pub const ENV_DIFF_LIMIT: &str = "LEDGER_DIFF_LIMIT";
pub const ENV_MATCH: &str = "LEDGER_MATCH";
pub const ENV_RETRY_ATTEMPTS: &str = "LEDGER_RETRY_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "LEDGER_RETRY_BACKOFF_MS";

const DEFAULT_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 4960);
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;

#[derive(Debug, Error)]
#[error("invalid {key}={value:?}: {reason}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub staging_dir: PathBuf,
    pub max_upload_bytes: u64,
    pub max_staged: usize,
    pub diff: DiffOptions,
    pub retry: RetryPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(DEFAULT_ADDR),
            db_path: PathBuf::from("data/ledger.db"),
            staging_dir: PathBuf::from("data/temp"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
            max_staged: DEFAULT_MAX_STAGED,
            diff: DiffOptions::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let max_upload_mb: u64 = parse_or(&lookup, ENV_MAX_UPLOAD_MB, DEFAULT_MAX_UPLOAD_MB)?;
        let backoff_ms: u64 = parse_or(
            &lookup,
            ENV_RETRY_BACKOFF_MS,
            defaults.retry.initial_backoff.as_millis() as u64,
        )?;

        Ok(Self {
            addr: parse_or(&lookup, ENV_ADDR, defaults.addr)?,
            db_path: lookup(ENV_DB).map(PathBuf::from).unwrap_or(defaults.db_path),
            staging_dir: lookup(ENV_STAGING_DIR)
                .map(PathBuf::from)
                .unwrap_or(defaults.staging_dir),
            max_upload_bytes: max_upload_mb.saturating_mul(1024 * 1024),
            max_staged: parse_or(&lookup, ENV_MAX_STAGED, DEFAULT_MAX_STAGED)?,
            diff: DiffOptions {
                detail_limit: parse_or(&lookup, ENV_DIFF_LIMIT, DEFAULT_DETAIL_LIMIT)?,
                match_strategy: parse_or(&lookup, ENV_MATCH, MatchStrategy::default())?,
            },
            retry: RetryPolicy {
                max_attempts: parse_or(&lookup, ENV_RETRY_ATTEMPTS, defaults.retry.max_attempts)?,
                initial_backoff: Duration::from_millis(backoff_ms),
                ..defaults.retry
            },
        })
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.addr.to_string(), "127.0.0.1:4960");
        assert_eq!(cfg.db_path, PathBuf::from("data/ledger.db"));
        assert_eq!(cfg.staging_dir, PathBuf::from("data/temp"));
        assert_eq!(cfg.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(cfg.max_staged, DEFAULT_MAX_STAGED);
        assert_eq!(cfg.diff, DiffOptions::default());
        assert_eq!(cfg.retry, RetryPolicy::default());
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = ServerConfig::from_lookup(lookup(&[
            (ENV_ADDR, "0.0.0.0:8080"),
            (ENV_DB, "/var/lib/ledger.db"),
            (ENV_MAX_UPLOAD_MB, "2"),
            (ENV_MAX_STAGED, "3"),
            (ENV_DIFF_LIMIT, "25"),
            (ENV_MATCH, "title"),
            (ENV_RETRY_ATTEMPTS, "3"),
            (ENV_RETRY_BACKOFF_MS, "10"),
        ]))
        .unwrap();
        assert_eq!(cfg.addr.port(), 8080);
        assert_eq!(cfg.db_path, PathBuf::from("/var/lib/ledger.db"));
        assert_eq!(cfg.max_upload_bytes, 2 * 1024 * 1024);
        assert_eq!(cfg.max_staged, 3);
        assert_eq!(cfg.diff.detail_limit, 25);
        assert_eq!(cfg.diff.match_strategy, MatchStrategy::ByTitle);
        assert_eq!(cfg.retry.max_attempts, 3);
        assert_eq!(cfg.retry.initial_backoff, Duration::from_millis(10));
    }

    #[test]
    fn blank_value_falls_back_to_default() {
        let cfg = ServerConfig::from_lookup(lookup(&[(ENV_DIFF_LIMIT, "  ")])).unwrap();
        assert_eq!(cfg.diff.detail_limit, DEFAULT_DETAIL_LIMIT);
    }

    #[test]
    fn malformed_value_names_the_variable() {
        let err = ServerConfig::from_lookup(lookup(&[(ENV_MAX_UPLOAD_MB, "lots")])).unwrap_err();
        assert_eq!(err.key, ENV_MAX_UPLOAD_MB);
        assert!(err.to_string().contains("LEDGER_MAX_UPLOAD_MB"));

        let err = ServerConfig::from_lookup(lookup(&[(ENV_MATCH, "fuzzy")])).unwrap_err();
        assert_eq!(err.key, ENV_MATCH);
    }
}
