//! Configuration management for Fieldguard.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{FieldguardError, Result};
use crate::ratelimit::{PolicySet, Retention};

/// Prefix for environment overrides, e.g. `FIELDGUARD__SERVER__LISTEN_ADDR`.
const ENV_PREFIX: &str = "FIELDGUARD";

/// Upper bound for the reclaimer interval and grace periods (30 days).
pub const MAX_RECLAIM_SECS: u64 = 30 * 24 * 3600;

/// Main configuration for the Fieldguard service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldguardConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Stale counter reclamation
    #[serde(default)]
    pub reclaimer: ReclaimerConfig,

    /// Per-policy limit overrides
    #[serde(default)]
    pub policies: PoliciesConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,

    /// Take the client address from the first `X-Forwarded-For` entry
    #[serde(default)]
    pub trust_forwarded_for: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            trust_forwarded_for: false,
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Reclamation schedule and grace periods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReclaimerConfig {
    /// Seconds between reclamation passes
    #[serde(default = "default_reclaim_interval")]
    pub interval_secs: u64,

    /// Seconds an expired general counter is kept
    #[serde(default = "default_general_grace")]
    pub general_grace_secs: u64,

    /// Seconds an expired heavy-operation counter is kept
    #[serde(default = "default_heavy_grace")]
    pub heavy_grace_secs: u64,
}

impl Default for ReclaimerConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reclaim_interval(),
            general_grace_secs: default_general_grace(),
            heavy_grace_secs: default_heavy_grace(),
        }
    }
}

fn default_reclaim_interval() -> u64 {
    900
}

fn default_general_grace() -> u64 {
    900
}

fn default_heavy_grace() -> u64 {
    3600
}

impl ReclaimerConfig {
    /// Time between passes.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Grace periods as a registry retention setting.
    pub fn retention(&self) -> Retention {
        Retention {
            general: Duration::from_secs(self.general_grace_secs),
            heavy: Duration::from_secs(self.heavy_grace_secs),
        }
    }
}

/// Partial override of a policy's threshold or window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitOverride {
    /// Requests admitted per window
    #[serde(default)]
    pub max_requests: Option<u32>,

    /// Window length in seconds
    #[serde(default)]
    pub window_secs: Option<u64>,
}

/// Overrides keyed by policy name. Unset policies keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoliciesConfig {
    /// Per-client throttle on the general store
    #[serde(default)]
    pub general: Option<LimitOverride>,
    /// Bulk exports and other expensive operations
    #[serde(default)]
    pub heavy_operation: Option<LimitOverride>,
    /// Expensive database queries
    #[serde(default)]
    pub database_intensive: Option<LimitOverride>,
    /// Excel downloads counted per client address
    #[serde(default)]
    pub excel_by_ip: Option<LimitOverride>,
    /// Excel downloads counted per authenticated user
    #[serde(default)]
    pub excel_by_user: Option<LimitOverride>,
}

impl FieldguardConfig {
    /// Load configuration from a file, with `FIELDGUARD__*` environment
    /// variables layered on top.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()?;
        let config: FieldguardConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with only `FIELDGUARD__*` environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;
        let config: FieldguardConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: FieldguardConfig = serde_yaml::from_str(yaml)
            .map_err(|e| FieldguardError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.reclaimer.interval_secs == 0 {
            return Err(FieldguardError::Config(
                "reclaimer.interval_secs must be greater than zero".to_string(),
            ));
        }
        let reclaimer = [
            ("interval_secs", self.reclaimer.interval_secs),
            ("general_grace_secs", self.reclaimer.general_grace_secs),
            ("heavy_grace_secs", self.reclaimer.heavy_grace_secs),
        ];
        for (name, secs) in reclaimer {
            if secs > MAX_RECLAIM_SECS {
                return Err(FieldguardError::Config(format!(
                    "reclaimer.{} must be at most {} seconds",
                    name, MAX_RECLAIM_SECS
                )));
            }
        }
        PolicySet::from_config(&self.policies)
            .map(|_| ())
            .map_err(|e| FieldguardError::Config(format!("Invalid policy override: {}", e)))
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }
}
