// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Arena Configuration Types
//
// Defines the YAML configuration schema for an arena host, including:
// - Turn scheduler retry/backoff and timeout policy
// - Battle creation limits
// - Spectator delivery bounds
// - Provider adapters to register at startup
// - Archive backend, HTTP server, logging and metrics settings

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level arena configuration (`arena-config.yaml`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArenaConfig {
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub spectators: SpectatorConfig,

    /// Provider adapters registered at startup
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default)]
    pub archive: ArchiveConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Retry, timeout and cancellation policy for provider calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Attempts per turn, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles per attempt
    #[serde(default = "default_base_backoff")]
    pub base_backoff_ms: u64,

    /// Upper bound on a single backoff wait
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,

    /// Bounded wait for a single provider call
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_ms: u64,

    /// How long a cancelled provider call may take to wind down
    #[serde(default = "default_cancel_grace")]
    pub cancel_grace_ms: u64,
}

impl SchedulerConfig {
    /// Backoff to wait after failed attempt number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(20);
        let delay = self.base_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(delay)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn cancel_grace(&self) -> Duration {
        Duration::from_millis(self.cancel_grace_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_backoff_ms: default_base_backoff(),
            max_backoff_ms: default_max_backoff(),
            provider_timeout_ms: default_provider_timeout(),
            cancel_grace_ms: default_cancel_grace(),
        }
    }
}

/// Bounds enforced at battle creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_agents")]
    pub max_agents: usize,

    #[serde(default = "default_max_turns")]
    pub max_turns: u32,

    #[serde(default = "default_max_turn_delay")]
    pub max_turn_delay_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_agents: default_max_agents(),
            max_turns: default_max_turns(),
            max_turn_delay_ms: default_max_turn_delay(),
        }
    }
}

/// Per-sink delivery bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpectatorConfig {
    /// Events buffered per sink before it is considered too slow and detached
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Upper bound on a single delivery to one sink
    #[serde(default = "default_send_timeout")]
    pub send_timeout_ms: u64,
}

impl SpectatorConfig {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for SpectatorConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            send_timeout_ms: default_send_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Name agents refer to in their `provider` field
    pub name: String,

    /// Adapter type; only "scripted" is built in
    #[serde(rename = "type")]
    pub provider_type: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Replies cycled by the scripted adapter
    #[serde(default)]
    pub replies: Vec<String>,

    /// Artificial latency per call
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum ArchiveConfig {
    Memory,
    Directory { path: PathBuf },
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self::Memory
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_api_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_api_port(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    8000
}

fn default_provider_timeout() -> u64 {
    60_000
}

fn default_cancel_grace() -> u64 {
    250
}

fn default_max_agents() -> usize {
    8
}

fn default_max_turns() -> u32 {
    500
}

fn default_max_turn_delay() -> u64 {
    60_000
}

fn default_queue_capacity() -> usize {
    64
}

fn default_send_timeout() -> u64 {
    2000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

fn default_metrics_port() -> u16 {
    9090
}

impl ArenaConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Discover configuration file using precedence order
    /// 1. ARENA_CONFIG_PATH environment variable
    /// 2. ./arena-config.yaml (working directory)
    /// 3. ~/.arena/config.yaml (user home)
    /// 4. /etc/arena/config.yaml (Unix only)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("ARENA_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./arena-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".arena").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        {
            let system_config = PathBuf::from("/etc/arena/config.yaml");
            if system_config.exists() {
                return Some(system_config);
            }
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit path must exist and parse
        let mut config = if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?
        } else if let Some(path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", path);
            Self::from_yaml_file(path)?
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            Self::default()
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply ARENA_* environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = std::env::var("ARENA_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(address) = std::env::var("ARENA_BIND_ADDRESS") {
            self.server.bind_address = address;
        }
        if let Some(port) = std::env::var("ARENA_PORT").ok().and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scheduler.max_attempts == 0 {
            anyhow::bail!("scheduler.max_attempts must be at least 1");
        }
        if self.scheduler.provider_timeout_ms == 0 {
            anyhow::bail!("scheduler.provider_timeout_ms must be greater than 0");
        }
        if self.scheduler.base_backoff_ms > self.scheduler.max_backoff_ms {
            anyhow::bail!("scheduler.base_backoff_ms must not exceed scheduler.max_backoff_ms");
        }
        if self.spectators.queue_capacity == 0 {
            anyhow::bail!("spectators.queue_capacity must be at least 1");
        }
        if self.limits.max_agents < 2 {
            anyhow::bail!("limits.max_agents must be at least 2");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_yields_defaults() {
        let config = ArenaConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config.scheduler, SchedulerConfig::default());
        assert_eq!(config.archive, ArchiveConfig::Memory);
        assert!(config.providers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
scheduler:
  max_attempts: 5
  base_backoff_ms: 100
providers:
  - name: house
    type: scripted
    replies: ["hello", "goodbye"]
    latency_ms: 10
archive:
  backend: directory
  path: /var/lib/arena
server:
  port: 9000
logging:
  format: json
"#;
        let config = ArenaConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.scheduler.max_attempts, 5);
        assert_eq!(config.scheduler.max_backoff_ms, 8000);
        assert_eq!(config.providers[0].provider_type, "scripted");
        assert!(config.providers[0].enabled);
        assert_eq!(
            config.archive,
            ArchiveConfig::Directory { path: PathBuf::from("/var/lib/arena") }
        );
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind_address, "127.0.0.1");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let scheduler = SchedulerConfig {
            base_backoff_ms: 100,
            max_backoff_ms: 350,
            ..SchedulerConfig::default()
        };
        assert_eq!(scheduler.backoff_for(1), Duration::from_millis(100));
        assert_eq!(scheduler.backoff_for(2), Duration::from_millis(200));
        assert_eq!(scheduler.backoff_for(3), Duration::from_millis(350));
        assert_eq!(scheduler.backoff_for(40), Duration::from_millis(350));
    }

    #[test]
    fn test_saved_config_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena-config.yaml");

        let mut config = ArenaConfig::default();
        config.server.port = 7100;
        config.archive = ArchiveConfig::Directory { path: dir.path().join("archive") };
        config.to_yaml_file(&path).unwrap();

        let loaded = ArenaConfig::from_yaml_file(&path).unwrap();
        assert_eq!(loaded.server.port, 7100);
        assert_eq!(loaded.archive, config.archive);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ArenaConfig::default();
        config.scheduler.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = ArenaConfig::default();
        config.spectators.queue_capacity = 0;
        assert!(config.validate().is_err());

        let mut config = ArenaConfig::default();
        config.scheduler.base_backoff_ms = 10_000;
        assert!(config.validate().is_err());

        let mut config = ArenaConfig::default();
        config.scheduler.provider_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("provider_timeout_ms"));
    }
}
