//! Runtime configuration read from the process environment.
//!
//! [`load_from_env`] reads every setting once at startup and rejects the
//! whole configuration if any value is malformed or out of range, so the
//! service never starts with a silently defaulted setting.
//!
//! # Connections
//!
//! `DATABASE_URL` wins when present. Otherwise it is assembled from
//! `DB_HOST` (localhost), `DB_PORT` (5432), `DB_USER`, `DB_PASSWORD` and
//! `DB_NAME`. Redis is optional: `REDIS_URL`, or `REDIS_HOST` with
//! `REDIS_PORT` (6379), `REDIS_PASSWORD` and `REDIS_DB` (0). Without either,
//! caching is disabled.
//!
//! # Redirect behaviour
//!
//! | Variable                 | Default                 | Meaning                                  |
//! |--------------------------|-------------------------|------------------------------------------|
//! | `BASE_URL`               | `http://localhost:3000` | Base of rendered short URLs              |
//! | `ALIAS_PATH_PREFIX`      | unset                   | `/{prefix}/{alias}` alias-only route     |
//! | `UTM_NOOVERRIDE`         | false                   | Append `utm_nooverride=1`                |
//! | `STORE_TIMEOUT_MS`       | 2000                    | Bound on each store round-trip           |
//! | `STRICT_ACCOUNTING`      | false                   | Fail redirects whose hit update fails    |
//! | `KEY_CHECKSUM`           | false                   | Keys carry a trailing check symbol       |
//! | `HIT_QUEUE_CAPACITY`     | 10000                   | Buffered hit events (100..=1000000)      |
//! | `HIT_WORKER_CONCURRENCY` | 4                       | Concurrent hit updates (1..=256)         |
//! | `CACHE_TTL_SECONDS`      | 3600                    | Redis entry lifetime                     |
//!
//! # Server
//!
//! `LISTEN` (`0.0.0.0:3000`), `RUST_LOG` (`info`), `LOG_FORMAT`
//! (`text` or `json`), `RATE_LIMIT_PER_SECOND` (50), `RATE_LIMIT_BURST`
//! (200), `BEHIND_PROXY` (false) and the pool settings `DB_MAX_CONNECTIONS`,
//! `DB_CONNECT_TIMEOUT`, `DB_IDLE_TIMEOUT`, `DB_MAX_LIFETIME`.

use anyhow::{Context, Result, anyhow, ensure};
use std::env;
use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::utils::alias::validate_alias;

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub log_format: LogFormat,
    /// Base of rendered short URLs, e.g. `https://s.example.com`.
    pub base_url: String,
    /// When set, `GET /{prefix}/{segment}` resolves aliases only.
    pub alias_path_prefix: Option<String>,
    pub utm_nooverride: bool,
    pub store_timeout_ms: u64,
    pub strict_accounting: bool,
    pub key_checksum: bool,
    pub hit_queue_capacity: usize,
    pub hit_worker_concurrency: usize,
    pub cache_ttl_seconds: u64,
    pub rate_limit_per_second: u64,
    pub rate_limit_burst: u32,
    /// Key the rate limiter by forwarding headers. Only safe behind a trusted proxy.
    pub behind_proxy: bool,
    pub db_max_connections: u32,
    /// Seconds.
    pub db_connect_timeout: u64,
    /// Seconds.
    pub db_idle_timeout: u64,
    /// Seconds.
    pub db_max_lifetime: u64,
}

impl Config {
    /// Reads all settings without range checks.
    ///
    /// # Errors
    ///
    /// Returns an error naming the variable if a value does not parse or the
    /// database connection cannot be assembled.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: database_url()?,
            redis_url: redis_url(),
            listen_addr: parsed("LISTEN", SocketAddr::from(([0, 0, 0, 0], 3000)))?,
            log_level: text("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: parsed("LOG_FORMAT", LogFormat::Text)?,
            base_url: text("BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
            alias_path_prefix: text("ALIAS_PATH_PREFIX")
                .map(|p| p.trim_matches('/').to_ascii_lowercase())
                .filter(|p| !p.is_empty()),
            utm_nooverride: flag("UTM_NOOVERRIDE")?,
            store_timeout_ms: parsed("STORE_TIMEOUT_MS", 2000)?,
            strict_accounting: flag("STRICT_ACCOUNTING")?,
            key_checksum: flag("KEY_CHECKSUM")?,
            hit_queue_capacity: parsed("HIT_QUEUE_CAPACITY", 10_000)?,
            hit_worker_concurrency: parsed("HIT_WORKER_CONCURRENCY", 4)?,
            cache_ttl_seconds: parsed("CACHE_TTL_SECONDS", 3600)?,
            rate_limit_per_second: parsed("RATE_LIMIT_PER_SECOND", 50)?,
            rate_limit_burst: parsed("RATE_LIMIT_BURST", 200)?,
            behind_proxy: flag("BEHIND_PROXY")?,
            db_max_connections: parsed("DB_MAX_CONNECTIONS", 10)?,
            db_connect_timeout: parsed("DB_CONNECT_TIMEOUT", 30)?,
            db_idle_timeout: parsed("DB_IDLE_TIMEOUT", 600)?,
            db_max_lifetime: parsed("DB_MAX_LIFETIME", 1800)?,
        })
    }

    /// Checks ranges and cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            has_scheme(&self.database_url, &["postgres", "postgresql"]),
            "DATABASE_URL must be a postgres:// URL, got '{}'",
            mask_connection_string(&self.database_url)
        );
        if let Some(redis_url) = &self.redis_url {
            ensure!(
                has_scheme(redis_url, &["redis", "rediss"]),
                "REDIS_URL must be a redis:// or rediss:// URL, got '{}'",
                mask_connection_string(redis_url)
            );
        }
        ensure!(
            has_scheme(&self.base_url, &["http", "https"]),
            "BASE_URL must be an absolute http(s) URL, got '{}'",
            self.base_url
        );
        if let Some(prefix) = &self.alias_path_prefix {
            validate_alias(prefix, None)
                .map_err(|e| anyhow!("ALIAS_PATH_PREFIX '{prefix}' is unusable: {e}"))?;
        }

        in_range("STORE_TIMEOUT_MS", self.store_timeout_ms, 1, 60_000)?;
        in_range("HIT_QUEUE_CAPACITY", self.hit_queue_capacity, 100, 1_000_000)?;
        in_range("HIT_WORKER_CONCURRENCY", self.hit_worker_concurrency, 1, 256)?;
        at_least("CACHE_TTL_SECONDS", self.cache_ttl_seconds, 1)?;
        in_range("RATE_LIMIT_PER_SECOND", self.rate_limit_per_second, 1, 1000)?;
        at_least("RATE_LIMIT_BURST", self.rate_limit_burst, 1)?;
        at_least("DB_MAX_CONNECTIONS", self.db_max_connections, 1)?;
        at_least("DB_CONNECT_TIMEOUT", self.db_connect_timeout, 1)?;

        Ok(())
    }

    /// Bound applied to every store round-trip.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Logs the effective settings with credentials masked.
    pub fn print_summary(&self) {
        tracing::info!(
            listen = %self.listen_addr,
            database = %mask_connection_string(&self.database_url),
            redis = %self
                .redis_url
                .as_deref()
                .map(mask_connection_string)
                .unwrap_or_else(|| "disabled".to_string()),
            base_url = %self.base_url,
            alias_prefix = self.alias_path_prefix.as_deref().unwrap_or("-"),
            accounting = if self.strict_accounting { "strict" } else { "best-effort" },
            store_timeout_ms = self.store_timeout_ms,
            hit_queue_capacity = self.hit_queue_capacity,
            key_checksum = self.key_checksum,
            log_format = %self.log_format,
            "Configuration loaded"
        );
    }
}

fn database_url() -> Result<String> {
    if let Some(url) = text("DATABASE_URL") {
        return Ok(url);
    }

    let required = |name: &str| {
        text(name).with_context(|| format!("{name} must be set when DATABASE_URL is not"))
    };
    let user = required("DB_USER")?;
    let password = required("DB_PASSWORD")?;
    let name = required("DB_NAME")?;
    let host = text("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = text("DB_PORT").unwrap_or_else(|| "5432".to_string());

    Ok(format!("postgres://{user}:{password}@{host}:{port}/{name}"))
}

/// `None` disables caching.
fn redis_url() -> Option<String> {
    if let Some(url) = text("REDIS_URL") {
        return Some(url);
    }

    let host = text("REDIS_HOST")?;
    let port = text("REDIS_PORT").unwrap_or_else(|| "6379".to_string());
    let db = text("REDIS_DB").unwrap_or_else(|| "0".to_string());
    let auth = text("REDIS_PASSWORD")
        .map(|password| format!(":{password}@"))
        .unwrap_or_default();

    Some(format!("redis://{auth}{host}:{port}/{db}"))
}

/// Non-empty, trimmed value of `name`.
fn text(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses `name`, or returns `default` when it is unset.
fn parsed<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match text(name) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("{name}: invalid value '{raw}': {e}")),
        None => Ok(default),
    }
}

fn flag(name: &str) -> Result<bool> {
    match text(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(anyhow!("{name}: expected a boolean, got '{other}'")),
    }
}

fn in_range<T: PartialOrd + fmt::Display>(name: &str, value: T, min: T, max: T) -> Result<()> {
    ensure!(
        value >= min && value <= max,
        "{name} must be between {min} and {max}, got {value}"
    );
    Ok(())
}

fn at_least<T: PartialOrd + fmt::Display>(name: &str, value: T, min: T) -> Result<()> {
    ensure!(value >= min, "{name} must be at least {min}, got {value}");
    Ok(())
}

fn has_scheme(url: &str, schemes: &[&str]) -> bool {
    Url::parse(url).is_ok_and(|u| schemes.contains(&u.scheme()))
}

/// Replaces the password of a connection URL with `***`.
///
/// Strings that are not URLs, or carry no password, are returned unchanged.
pub fn mask_connection_string(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) if parsed.password().is_some() => {
            if parsed.set_password(Some("***")).is_err() {
                return "***".to_string();
            }
            parsed.to_string()
        }
        _ => url.to_string(),
    }
}

/// Reads and validates the configuration.
///
/// Expects `.env` to have been applied already (see `main.rs`).
///
/// # Errors
///
/// Returns an error if a variable is missing, malformed or out of range.
pub fn load_from_env() -> Result<Config> {
    let config = Config::from_env()?;
    config.validate()?;
    Ok(config)
}
