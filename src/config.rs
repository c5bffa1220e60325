// =============================================================================
// CONFIGURATION MODULE
// =============================================================================
// Loads runtime settings from environment variables (after dotenvy has read
// .env). Everything has a default, so a bare `coffee-inventory` just works
// against ./inventory.json and ./orders.json.
//
//   INVENTORY_PATH     catalog document         (./inventory.json)
//   ORDERS_PATH        order log document       (./orders.json)
//   HTTP_TIMEOUT_SECS  per-request API timeout  (30)
//   SYNC_COOLDOWN_MS   watcher debounce window  (3000)
//   SYNC_SETTLE_MS     watcher settle delay     (500)
//   METRICS_PORT       Prometheus listener in auto mode (unset = off)
//   LOG_FORMAT         text | json              (text)
// =============================================================================

use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// -----------------------------------------------------------------------------
// LOG FORMAT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format '{other}' (expected text or json)"),
        }
    }
}

// -----------------------------------------------------------------------------
// CONFIG STRUCT
// -----------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct Config {
    /// Catalog document path
    pub inventory_path: PathBuf,

    /// Order log document path
    pub orders_path: PathBuf,

    /// Timeout applied to every API request
    pub http_timeout: Duration,

    /// Minimum spacing between accepted file-change events
    pub sync_cooldown: Duration,

    /// Delay between an accepted event and reading the file
    pub sync_settle: Duration,

    /// Port for the Prometheus listener in auto mode
    pub metrics_port: Option<u16>,

    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inventory_path: PathBuf::from("./inventory.json"),
            orders_path: PathBuf::from("./orders.json"),
            http_timeout: Duration::from_secs(30),
            sync_cooldown: Duration::from_millis(3000),
            sync_settle: Duration::from_millis(500),
            metrics_port: None,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    // -------------------------------------------------------------------------
    // LOAD CONFIGURATION FROM ENVIRONMENT
    // -------------------------------------------------------------------------
    /// Creates a Config from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            inventory_path: var("INVENTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.inventory_path),

            orders_path: var("ORDERS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.orders_path),

            http_timeout: match var("HTTP_TIMEOUT_SECS") {
                Some(v) => Duration::from_secs(
                    v.trim()
                        .parse()
                        .context("Failed to parse HTTP_TIMEOUT_SECS as a number")?,
                ),
                None => defaults.http_timeout,
            },

            sync_cooldown: match var("SYNC_COOLDOWN_MS") {
                Some(v) => Duration::from_millis(
                    v.trim()
                        .parse()
                        .context("Failed to parse SYNC_COOLDOWN_MS as a number")?,
                ),
                None => defaults.sync_cooldown,
            },

            sync_settle: match var("SYNC_SETTLE_MS") {
                Some(v) => Duration::from_millis(
                    v.trim()
                        .parse()
                        .context("Failed to parse SYNC_SETTLE_MS as a number")?,
                ),
                None => defaults.sync_settle,
            },

            metrics_port: var("METRICS_PORT")
                .map(|v| v.trim().parse())
                .transpose()
                .context("Failed to parse METRICS_PORT as a port number")?,

            log_format: var("LOG_FORMAT")
                .map(|v| v.parse())
                .transpose()
                .context("Failed to parse LOG_FORMAT")?
                .unwrap_or_default(),
        })
    }

    /// Apply command-line path overrides.
    pub fn with_paths(mut self, inventory: Option<PathBuf>, orders: Option<PathBuf>) -> Self {
        if let Some(path) = inventory {
            self.inventory_path = path;
        }
        if let Some(path) = orders {
            self.orders_path = path;
        }
        self
    }
}
