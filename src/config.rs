//! Engine configuration loading and validation.
//!
//! Configuration is loaded from a TOML file with environment variable
//! overrides for secrets (marketplace credentials are never read from the
//! config file; they come from the `CredentialStore` port at task-run time).

use std::path::Path;

use serde::Deserialize;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

fn default_http_base_url() -> String {
    "https://api-seller.ozon.ru".to_string()
}
fn default_http_timeout_ms() -> u64 {
    10_000
}
fn default_http_retry_attempts() -> u32 {
    3
}
fn default_http_retry_base_ms() -> u64 {
    200
}
fn default_draft_poll_interval_ms() -> u64 {
    10_000
}
fn default_draft_poll_max_attempts() -> u32 {
    1_000
}
fn default_draft_recreate_max_attempts() -> u32 {
    1_000
}
fn default_draft_lifetime_ms() -> i64 {
    1_800_000
}
fn default_draft_recreate_backoff_ms() -> u64 {
    1_000
}
fn default_timeslot_poll_interval_ms() -> u64 {
    3_000
}
fn default_timeslot_window_max_days() -> i64 {
    28
}
fn default_rate_limit_second_ms() -> u64 {
    2_000
}
fn default_rate_limit_per_minute() -> u32 {
    2
}
fn default_rate_limit_per_hour() -> u32 {
    50
}
fn default_rate_limit_min_wait_ms() -> u64 {
    250
}
fn default_order_id_poll_attempts() -> u32 {
    5
}
fn default_order_id_poll_delay_ms() -> u64 {
    1_000
}
fn default_ready_days_min() -> i64 {
    0
}
fn default_ready_days_max() -> i64 {
    28
}
fn default_ready_days_default() -> i64 {
    1
}
fn default_database_url() -> String {
    "ozon_slot_engine.sqlite3".to_string()
}
fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}
fn default_sku_resolve_batch_size() -> usize {
    100
}

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Rate-limiting constants for draft-creating and draft-inspection endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_limit_second_ms")]
    pub per_second_ms: u64,
    #[serde(default = "default_rate_limit_per_minute")]
    pub per_minute: u32,
    #[serde(default = "default_rate_limit_per_hour")]
    pub per_hour: u32,
    #[serde(default = "default_rate_limit_min_wait_ms")]
    pub min_wait_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second_ms: default_rate_limit_second_ms(),
            per_minute: default_rate_limit_per_minute(),
            per_hour: default_rate_limit_per_hour(),
            min_wait_ms: default_rate_limit_min_wait_ms(),
        }
    }
}

/// Draft controller timing and retry limits.
#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    #[serde(default = "default_draft_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_draft_poll_max_attempts")]
    pub poll_max_attempts: u32,
    #[serde(default = "default_draft_recreate_max_attempts")]
    pub recreate_max_attempts: u32,
    #[serde(default = "default_draft_lifetime_ms")]
    pub lifetime_ms: i64,
    #[serde(default = "default_draft_recreate_backoff_ms")]
    pub recreate_backoff_ms: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_draft_poll_interval_ms(),
            poll_max_attempts: default_draft_poll_max_attempts(),
            recreate_max_attempts: default_draft_recreate_max_attempts(),
            lifetime_ms: default_draft_lifetime_ms(),
            recreate_backoff_ms: default_draft_recreate_backoff_ms(),
        }
    }
}

/// Timeslot search window limits.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeslotConfig {
    #[serde(default = "default_timeslot_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_timeslot_window_max_days")]
    pub window_max_days: i64,
}

impl Default for TimeslotConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_timeslot_poll_interval_ms(),
            window_max_days: default_timeslot_window_max_days(),
        }
    }
}

/// HTTP client timeout/retry policy.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_base_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_http_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_http_retry_base_ms")]
    pub retry_base_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: default_http_base_url(),
            timeout_ms: default_http_timeout_ms(),
            retry_attempts: default_http_retry_attempts(),
            retry_base_ms: default_http_retry_base_ms(),
        }
    }
}

/// Readiness day bounds and post-supply order-id resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplyConfig {
    #[serde(default = "default_ready_days_min")]
    pub ready_days_min: i64,
    #[serde(default = "default_ready_days_max")]
    pub ready_days_max: i64,
    #[serde(default = "default_ready_days_default")]
    pub ready_days_default: i64,
    #[serde(default = "default_order_id_poll_attempts")]
    pub order_id_poll_attempts: u32,
    #[serde(default = "default_order_id_poll_delay_ms")]
    pub order_id_poll_delay_ms: u64,
    #[serde(default = "default_sku_resolve_batch_size")]
    pub sku_resolve_batch_size: usize,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            ready_days_min: default_ready_days_min(),
            ready_days_max: default_ready_days_max(),
            ready_days_default: default_ready_days_default(),
            order_id_poll_attempts: default_order_id_poll_attempts(),
            order_id_poll_delay_ms: default_order_id_poll_delay_ms(),
            sku_resolve_batch_size: default_sku_resolve_batch_size(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub draft: DraftConfig,
    #[serde(default)]
    pub timeslot: TimeslotConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub supply: SupplyConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            http: HttpConfig::default(),
            draft: DraftConfig::default(),
            timeslot: TimeslotConfig::default(),
            rate_limit: RateLimitConfig::default(),
            supply: SupplyConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, falling back to defaults for any
    /// field the file doesn't set. Missing file is not an error; an absent
    /// `config.toml` simply means "use defaults".
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        toml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))
    }

    /// Validate cross-field invariants that `serde` defaults can't express.
    pub fn validate(&self) -> Result<()> {
        if self.supply.ready_days_min > self.supply.ready_days_max {
            return Err(Error::Config(format!(
                "ready_days_min ({}) must be <= ready_days_max ({})",
                self.supply.ready_days_min, self.supply.ready_days_max
            )));
        }
        if !(self.supply.ready_days_min..=self.supply.ready_days_max)
            .contains(&self.supply.ready_days_default)
        {
            return Err(Error::Config(format!(
                "ready_days_default ({}) must be within [{}, {}]",
                self.supply.ready_days_default,
                self.supply.ready_days_min,
                self.supply.ready_days_max
            )));
        }
        Ok(())
    }

    /// Initialise the global `tracing` subscriber. Call once at process start.
    pub fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        match self.logging.format {
            LogFormat::Json => {
                let _ = fmt().with_env_filter(filter).json().try_init();
            }
            LogFormat::Pretty => {
                let _ = fmt().with_env_filter(filter).try_init();
            }
        }
    }
}
