// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Plugin Configuration Types
//
// Defines the configuration manifest for the Quobyte Docker plugin host:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Fixed-user mount watcher activation and API call timeout
// - Docker connection settings
// - Logging and metrics settings

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const API_VERSION: &str = "quobyte.com/v1";
pub const KIND: &str = "PluginConfig";
pub const CONFIG_PATH_ENV: &str = "QUOBYTE_PLUGIN_CONFIG";

/// Top-level Kubernetes-style plugin configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfigManifest {
    /// API version (must be "quobyte.com/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "PluginConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    pub spec: PluginConfigSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    /// Human-readable host name
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PluginConfigSpec {
    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Rebuild containers labelled `quobyte.user`/`quobyte.group` with fixed-user mounts.
    /// Needs a Quobyte client (1.3+) with fixed user mounts enabled.
    /// Default: false
    #[serde(default)]
    pub enabled: bool,

    /// Upper bound for a single Docker API call made while recreating a container
    #[serde(default = "default_api_timeout")]
    pub api_timeout_seconds: u64,
}

impl WatcherConfig {
    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_seconds)
    }
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_timeout_seconds: default_api_timeout(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Path to Docker socket
    /// Default: auto-detect (DOCKER_HOST, then /var/run/docker.sock)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_socket_path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<MetricsConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable Prometheus metrics exposition
    #[serde(default)]
    pub enabled: bool,

    /// Metrics endpoint port
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

fn default_api_timeout() -> u64 {
    30
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

impl Default for PluginConfigManifest {
    fn default() -> Self {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "quobyte-plugin".to_string());

        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: hostname,
                labels: None,
            },
            spec: PluginConfigSpec::default(),
        }
    }
}

impl PluginConfigManifest {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. QUOBYTE_PLUGIN_CONFIG environment variable
    /// 2. ./quobyte-plugin.yaml (working directory)
    /// 3. ~/.quobyte/plugin.yaml (user home)
    /// 4. /etc/quobyte/plugin.yaml (system)
    pub fn discover_config() -> Option<PathBuf> {
        Self::candidate_paths().into_iter().find(|path| path.exists())
    }

    /// Paths checked by [`Self::discover_config`], in order.
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            paths.push(PathBuf::from(path));
        }

        paths.push(PathBuf::from("./quobyte-plugin.yaml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".quobyte").join("plugin.yaml"));
        }

        paths.push(PathBuf::from("/etc/quobyte/plugin.yaml"));
        paths
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(cli_path: Option<PathBuf>) -> anyhow::Result<Self> {
        // Explicit CLI path fails if missing or invalid
        if let Some(path) = cli_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path).map_err(|e| {
                anyhow::anyhow!("Failed to load config at {:?}: {}", path, e)
            })?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::debug!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("QUOBYTE_ALLOW_FIXED_USER_MOUNTS") {
            match parse_bool(&val) {
                Some(enabled) => {
                    tracing::info!(
                        "Environment override: QUOBYTE_ALLOW_FIXED_USER_MOUNTS={}",
                        enabled
                    );
                    self.spec.watcher.enabled = enabled;
                }
                None => {
                    tracing::warn!(
                        "Invalid value for QUOBYTE_ALLOW_FIXED_USER_MOUNTS: '{}'. Expected true/false. Ignoring.",
                        val
                    );
                }
            }
        }

        if let Ok(path) = std::env::var("QUOBYTE_DOCKER_SOCKET") {
            if !path.is_empty() {
                tracing::info!("Environment override: QUOBYTE_DOCKER_SOCKET={}", path);
                self.spec.runtime.docker_socket_path = Some(path);
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        if self.spec.watcher.api_timeout_seconds == 0 {
            anyhow::bail!("spec.watcher.api_timeout_seconds must be greater than zero");
        }

        if let Some(logging) = self.logging() {
            if !matches!(logging.format.as_str(), "json" | "text") {
                anyhow::bail!(
                    "Invalid logging format: '{}'. Must be 'json' or 'text'",
                    logging.format
                );
            }
        }

        if let Some(metrics) = self.metrics() {
            if metrics.enabled && metrics.port == 0 {
                anyhow::bail!("Metrics port cannot be 0 when metrics are enabled");
            }
        }

        Ok(())
    }

    pub fn logging(&self) -> Option<&LoggingConfig> {
        self.spec.observability.as_ref()?.logging.as_ref()
    }

    pub fn metrics(&self) -> Option<&MetricsConfig> {
        self.spec.observability.as_ref()?.metrics.as_ref()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
