//! Allocator configuration via `wishid.toml`
//!
//! Selects the counter store backend, the allocation strategy, and optional
//! caller-side retries. A missing section falls back to its defaults: an
//! in-memory store with the `auto` strategy and no retries.

use crate::allocator::Strategy;
use crate::retry::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wishid_core::{Error, Result};
use wishid_storage::{LastWriteReporting, MemoryStoreOptions, SqliteOptions};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "wishid.toml";

fn default_lock_wait_timeout_ms() -> u64 {
    5000
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

/// Counter store backend and its settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local in-memory store
    Memory {
        /// Row lock wait timeout in milliseconds
        #[serde(default = "default_lock_wait_timeout_ms")]
        lock_wait_timeout_ms: u64,
        /// What upserts report back
        #[serde(default)]
        last_write_reporting: LastWriteReporting,
    },
    /// SQLite database file, shareable between processes
    Sqlite {
        /// Database file path
        path: PathBuf,
        /// Busy timeout in milliseconds
        #[serde(default = "default_busy_timeout_ms")]
        busy_timeout_ms: u64,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Memory {
            lock_wait_timeout_ms: default_lock_wait_timeout_ms(),
            last_write_reporting: LastWriteReporting::default(),
        }
    }
}

impl StoreConfig {
    /// Options for the in-memory store, if this is one
    pub fn memory_options(&self) -> Option<MemoryStoreOptions> {
        match self {
            StoreConfig::Memory {
                lock_wait_timeout_ms,
                last_write_reporting,
            } => Some(
                MemoryStoreOptions::default()
                    .with_lock_wait_timeout(Duration::from_millis(*lock_wait_timeout_ms))
                    .with_last_write_reporting(*last_write_reporting),
            ),
            StoreConfig::Sqlite { .. } => None,
        }
    }

    /// Options for the SQLite store, if this is one
    pub fn sqlite_options(&self) -> Option<SqliteOptions> {
        match self {
            StoreConfig::Sqlite {
                busy_timeout_ms, ..
            } => Some(
                SqliteOptions::default().with_busy_timeout(Duration::from_millis(*busy_timeout_ms)),
            ),
            StoreConfig::Memory { .. } => None,
        }
    }
}

/// Allocator configuration loaded from `wishid.toml`.
///
/// # Example
///
/// ```toml
/// strategy = "auto"
///
/// [store]
/// backend = "sqlite"
/// path = "data/wishid.sqlite"
///
/// [retry]
/// max_retries = 3
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocatorConfig {
    /// Allocation strategy
    #[serde(default)]
    pub strategy: Strategy,
    /// Counter store backend
    #[serde(default)]
    pub store: StoreConfig,
    /// Caller-side retries; absent means failures surface immediately
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<RetryConfig>,
}

impl AllocatorConfig {
    /// Check values serde cannot
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for zero timeouts, an empty SQLite path, or a
    /// retry base delay above the maximum delay.
    pub fn validate(&self) -> Result<()> {
        match &self.store {
            StoreConfig::Memory {
                lock_wait_timeout_ms,
                ..
            } if *lock_wait_timeout_ms == 0 => {
                return Err(Error::InvalidConfig(
                    "store.lock_wait_timeout_ms must be greater than 0".to_string(),
                ));
            }
            StoreConfig::Sqlite { path, .. } if path.as_os_str().is_empty() => {
                return Err(Error::InvalidConfig(
                    "store.path must not be empty".to_string(),
                ));
            }
            _ => {}
        }

        if let Some(retry) = &self.retry {
            if retry.base_delay_ms > retry.max_delay_ms {
                return Err(Error::InvalidConfig(format!(
                    "retry.base_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                    retry.base_delay_ms, retry.max_delay_ms
                )));
            }
        }
        Ok(())
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AllocatorConfig = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{} ({})", msg, path.display()))
            }
            other => other,
        })
    }

    /// Serialize to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::InvalidConfig(format!("Failed to serialize config: {}", e)))
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# wishid allocator configuration
#
# Allocation strategy: "auto" (default), "locking" or "upsert"
#   "locking" = lock the counter row, read it, write it back (any backend)
#   "upsert"  = one atomic insert-or-increment (backend must support it)
#   "auto"    = upsert when the store supports it, locking otherwise
strategy = "auto"

[store]
# Counter store backend: "memory" or "sqlite"
backend = "memory"
lock_wait_timeout_ms = 5000
last_write_reporting = "resulting-value"

# SQLite store shared between processes:
# [store]
# backend = "sqlite"
# path = "data/wishid.sqlite"
# busy_timeout_ms = 5000

# Caller-side retries for lock wait timeouts and busy errors.
# Disabled when this section is absent.
# [retry]
# max_retries = 3
# base_delay_ms = 10
# max_delay_ms = 100
"#
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }
}
