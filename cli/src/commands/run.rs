// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Plugin host
//!
//! Loads the configuration, sets up logging and metrics, and runs the
//! fixed-user mount watcher against the local Docker daemon until shutdown.
//! A broken Docker event feed ends the process with an error.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

use quobyte_core::application::{RecreationCoordinator, Watcher};
use quobyte_core::domain::plugin_config::PluginConfigManifest;
use quobyte_core::infrastructure::{DockerEventSource, DockerRuntime};

use crate::logging::{init_logging, LogFormat};

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct RunOverrides {
    pub allow_fixed_user_mounts: bool,
    pub docker_socket: Option<String>,
    pub api_timeout_seconds: Option<u64>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

impl RunOverrides {
    pub fn apply(&self, config: &mut PluginConfigManifest) {
        if self.allow_fixed_user_mounts {
            config.spec.watcher.enabled = true;
        }
        if let Some(socket) = &self.docker_socket {
            config.spec.runtime.docker_socket_path = Some(socket.clone());
        }
        if let Some(timeout) = self.api_timeout_seconds {
            config.spec.watcher.api_timeout_seconds = timeout;
        }
    }

    /// Log level and format: flag, then config file, then `info`/text.
    fn logging(&self, config: &PluginConfigManifest) -> (String, LogFormat) {
        let level = self
            .log_level
            .clone()
            .or_else(|| config.logging().map(|l| l.level.clone()))
            .unwrap_or_else(|| "info".to_string());

        let format = self
            .log_format
            .or_else(|| config.logging().and_then(|l| LogFormat::from_config(&l.format)))
            .unwrap_or(LogFormat::Text);

        (level, format)
    }
}

pub async fn execute(config_path: Option<PathBuf>, overrides: RunOverrides) -> Result<()> {
    let mut config = PluginConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;
    overrides.apply(&mut config);

    let (level, format) = overrides.logging(&config);
    init_logging(&level, format)?;

    config
        .validate()
        .context("Configuration validation failed")?;

    info!("Quobyte Docker plugin starting on {}", config.metadata.name);

    if !config.spec.watcher.enabled {
        info!("Fixed user mounts are disabled, watcher not started");
        return Ok(());
    }

    if let Some(metrics) = config.metrics().filter(|m| m.enabled) {
        install_metrics_exporter(metrics.port)?;
    }

    let runtime = DockerRuntime::new(config.spec.runtime.docker_socket_path.as_deref())
        .context("Failed to connect to Docker")?;
    runtime.healthcheck().await?;

    let events = Arc::new(DockerEventSource::new(runtime.client().clone()));
    let coordinator = RecreationCoordinator::new(Arc::new(runtime))
        .with_api_timeout(config.spec.watcher.api_timeout());

    let mut watcher = Watcher::new(events, coordinator);
    let shutdown_token = watcher.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown_token.cancel();
    });

    watcher
        .run()
        .await
        .context("Fixed-user mount watcher stopped")?;

    info!(
        recreated = watcher.coordinator().recreated().len(),
        "Quobyte Docker plugin shutting down"
    );

    Ok(())
}

fn install_metrics_exporter(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus metrics exporter")?;

    info!("Metrics exposed on http://{}/metrics", addr);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quobyte_core::domain::plugin_config::{LoggingConfig, ObservabilityConfig};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_disabled_watcher_exits_without_contacting_docker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quobyte-plugin.yaml");
        PluginConfigManifest::default().to_yaml_file(&path).unwrap();

        let overrides = RunOverrides {
            docker_socket: Some(dir.path().join("missing.sock").display().to_string()),
            ..Default::default()
        };

        execute(Some(path), overrides).await.unwrap();
    }

    #[test]
    fn test_flags_override_config() {
        let mut config = PluginConfigManifest::default();
        let overrides = RunOverrides {
            allow_fixed_user_mounts: true,
            docker_socket: Some("/custom/docker.sock".to_string()),
            api_timeout_seconds: Some(7),
            ..Default::default()
        };

        overrides.apply(&mut config);
        assert!(config.spec.watcher.enabled);
        assert_eq!(config.spec.runtime.docker_socket_path.as_deref(), Some("/custom/docker.sock"));
        assert_eq!(config.spec.watcher.api_timeout_seconds, 7);
    }

    #[test]
    fn test_absent_flag_keeps_config_activation() {
        let mut config = PluginConfigManifest::default();
        config.spec.watcher.enabled = true;

        RunOverrides::default().apply(&mut config);
        assert!(config.spec.watcher.enabled);
    }

    #[test]
    fn test_logging_precedence() {
        let mut config = PluginConfigManifest::default();
        assert_eq!(
            RunOverrides::default().logging(&config),
            ("info".to_string(), LogFormat::Text)
        );

        config.spec.observability = Some(ObservabilityConfig {
            logging: Some(LoggingConfig {
                level: "debug".to_string(),
                format: "json".to_string(),
            }),
            metrics: None,
        });
        assert_eq!(
            RunOverrides::default().logging(&config),
            ("debug".to_string(), LogFormat::Json)
        );

        let flags = RunOverrides {
            log_level: Some("warn".to_string()),
            log_format: Some(LogFormat::Text),
            ..Default::default()
        };
        assert_eq!(flags.logging(&config), ("warn".to_string(), LogFormat::Text));
    }
}
