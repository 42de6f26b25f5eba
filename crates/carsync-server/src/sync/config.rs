//! Sync configuration
//!
//! Configuration for the catalog reconciliation engine. All values are read
//! from the environment exactly once, at startup, into explicit structs that
//! are passed into the client and reconciler at construction; no sync logic
//! reads ambient process state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Inclusive model-year range accepted by the normalizer and pushed down to
/// the source as a server-side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, year: i32) -> bool {
        year >= self.min && year <= self.max
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            min: 2012,
            max: 2022,
        }
    }
}

/// External catalog source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Catalog endpoint URL (without query parameters)
    pub base_url: String,
    /// Application id credential, sent as the `X-Parse-Application-Id` header
    pub app_id: String,
    /// Master key credential, sent as the `X-Parse-Master-Key` header
    pub master_key: String,
    /// Per-call timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of records requested per snapshot
    pub fetch_limit: u32,
}

impl SourceConfig {
    /// Load source configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Ok(Self {
            base_url: std::env::var("SYNC_SOURCE_URL")
                .unwrap_or_else(|_| DEFAULT_SOURCE_URL.to_string()),
            app_id: std::env::var("SYNC_SOURCE_APP_ID").unwrap_or_default(),
            master_key: std::env::var("SYNC_SOURCE_MASTER_KEY").unwrap_or_default(),
            timeout_secs: std::env::var("SYNC_SOURCE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SOURCE_TIMEOUT_SECS),
            fetch_limit: std::env::var("SYNC_SOURCE_FETCH_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_FETCH_LIMIT),
        })
    }

    /// Validate the source configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_url.is_empty() {
            anyhow::bail!("SYNC_SOURCE_URL cannot be empty");
        }
        if self.app_id.is_empty() {
            anyhow::bail!("SYNC_SOURCE_APP_ID cannot be empty");
        }
        if self.master_key.is_empty() {
            anyhow::bail!("SYNC_SOURCE_MASTER_KEY cannot be empty");
        }
        if self.timeout_secs == 0 {
            anyhow::bail!("SYNC_SOURCE_TIMEOUT_SECS must be greater than 0");
        }
        if self.fetch_limit == 0 {
            anyhow::bail!("SYNC_SOURCE_FETCH_LIMIT must be greater than 0");
        }
        Ok(())
    }

    /// Get the per-call timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_URL.to_string(),
            app_id: String::new(),
            master_key: String::new(),
            timeout_secs: DEFAULT_SOURCE_TIMEOUT_SECS,
            fetch_limit: DEFAULT_FETCH_LIMIT,
        }
    }
}

/// Default catalog endpoint.
pub const DEFAULT_SOURCE_URL: &str = "https://parseapi.back4app.com/classes/Car_Model_List";

/// Default per-call timeout in seconds.
pub const DEFAULT_SOURCE_TIMEOUT_SECS: u64 = 30;

/// Default maximum records requested per snapshot.
pub const DEFAULT_FETCH_LIMIT: u32 = 10_000;

/// Default interval between reconciliation cycles (1 hour).
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 3600;

/// Default records per batch transaction.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Default retry budget per batch.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default base backoff delay in milliseconds.
pub const DEFAULT_RETRY_BASE_DELAY_MS: u64 = 500;

/// Main sync configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Whether scheduled reconciliation is enabled
    pub enabled: bool,
    /// Interval between reconciliation cycles in seconds
    pub interval_secs: u64,
    /// Records per batch transaction
    pub batch_size: usize,
    /// Retry budget per batch (total attempts)
    pub max_retries: u32,
    /// Base backoff delay in milliseconds; attempt n waits base * 2^n
    pub retry_base_delay_ms: u64,
    /// Accepted model-year range
    pub years: YearRange,
    /// External source configuration
    pub source: SourceConfig,
}

impl SyncConfig {
    /// Load sync configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            enabled: std::env::var("SYNC_ENABLED")
                .unwrap_or_else(|_| "false".to_string())
                .parse()
                .unwrap_or(false),
            interval_secs: std::env::var("SYNC_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SYNC_INTERVAL_SECS),
            batch_size: std::env::var("SYNC_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
            max_retries: std::env::var("SYNC_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_MAX_RETRIES),
            retry_base_delay_ms: std::env::var("SYNC_RETRY_BASE_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_BASE_DELAY_MS),
            years: YearRange::new(
                std::env::var("SYNC_YEAR_MIN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(YearRange::default().min),
                std::env::var("SYNC_YEAR_MAX")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(YearRange::default().max),
            ),
            source: SourceConfig::from_env()?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.interval_secs == 0 {
            anyhow::bail!("SYNC_INTERVAL_SECS must be greater than 0");
        }
        if self.batch_size == 0 {
            anyhow::bail!("SYNC_BATCH_SIZE must be greater than 0");
        }
        if self.max_retries == 0 {
            anyhow::bail!("SYNC_MAX_RETRIES must be greater than 0");
        }
        if self.years.min > self.years.max {
            anyhow::bail!(
                "SYNC_YEAR_MIN ({}) cannot be greater than SYNC_YEAR_MAX ({})",
                self.years.min,
                self.years.max
            );
        }
        if self.enabled {
            self.source.validate()?;
        }
        Ok(())
    }

    /// Get the cycle interval as a Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay_ms: DEFAULT_RETRY_BASE_DELAY_MS,
            years: YearRange::default(),
            source: SourceConfig::default(),
        }
    }
}
