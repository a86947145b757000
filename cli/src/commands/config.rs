// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Configuration management commands
//!
//! Commands: show, validate, generate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::{Path, PathBuf};

use quobyte_core::domain::plugin_config::{PluginConfigManifest, CONFIG_PATH_ENV};
use quobyte_core::domain::labels::{LABEL_GROUP, LABEL_USER};
use quobyte_core::domain::WATCHED_DRIVER;

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Show config file paths checked
        #[arg(long)]
        paths: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to config file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Generate sample configuration
    Generate {
        /// Output path (default: ./quobyte-plugin.yaml)
        #[arg(short, long, default_value = "./quobyte-plugin.yaml")]
        output: PathBuf,
    },
}

pub async fn handle_command(
    command: ConfigCommand,
    config_override: Option<PathBuf>,
) -> Result<()> {
    match command {
        ConfigCommand::Show { paths } => show(config_override, paths).await,
        ConfigCommand::Validate { file } => validate(file.or(config_override)).await,
        ConfigCommand::Generate { output } => generate(&output).await,
    }
}

async fn show(config_override: Option<PathBuf>, show_paths: bool) -> Result<()> {
    let config = PluginConfigManifest::load_or_default(config_override.clone())
        .context("Failed to load configuration")?;

    if show_paths {
        println!("{}", "Configuration discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  --config flag: {}", path.display()),
            None => println!("  --config flag: {}", "(not set)".dimmed()),
        }
        if std::env::var(CONFIG_PATH_ENV).is_err() {
            println!("  {}: {}", CONFIG_PATH_ENV, "(not set)".dimmed());
        }
        for path in PluginConfigManifest::candidate_paths() {
            let marker = if path.exists() { "found".green() } else { "missing".dimmed() };
            println!("  {} ({})", path.display(), marker);
        }
        println!();
    }

    println!("{}", "Current configuration:".bold());
    println!();
    println!("  Name: {}", config.metadata.name);
    println!();

    println!("{}", "Fixed-user mount watcher:".bold());
    let state = if config.spec.watcher.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!("  State: {}", state);
    println!("  Watched driver: {}", WATCHED_DRIVER);
    println!("  Labels: {}, {}", LABEL_USER, LABEL_GROUP);
    println!("  API timeout: {}s", config.spec.watcher.api_timeout_seconds);
    println!();

    println!("{}", "Docker:".bold());
    println!(
        "  Socket: {}",
        config
            .spec
            .runtime
            .docker_socket_path
            .as_deref()
            .unwrap_or("(auto-detect)")
    );
    println!();

    if let Some(logging) = config.logging() {
        println!("{}", "Logging:".bold());
        println!("  Level: {}", logging.level);
        println!("  Format: {}", logging.format);
        println!();
    }

    if let Some(metrics) = config.metrics() {
        println!("{}", "Metrics:".bold());
        println!("  Enabled: {}", metrics.enabled);
        println!("  Port: {}", metrics.port);
        println!();
    }

    Ok(())
}

async fn validate(config_path: Option<PathBuf>) -> Result<()> {
    println!("Validating configuration...");

    let config = PluginConfigManifest::load_or_default(config_path)
        .context("Failed to load configuration")?;

    config
        .validate()
        .context("Configuration validation failed")?;

    println!("{}", "✓ Configuration is valid".green());

    Ok(())
}

async fn generate(output: &Path) -> Result<()> {
    PluginConfigManifest::default()
        .to_yaml_file(output)
        .with_context(|| format!("Failed to write config to {:?}", output))?;

    println!(
        "{}",
        format!("✓ Configuration generated: {}", output.display()).green()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_generate_then_validate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("quobyte-plugin.yaml");

        generate(&path).await.unwrap();
        assert!(path.exists());

        validate(Some(path.clone())).await.unwrap();

        let generated = PluginConfigManifest::from_yaml_file(&path).unwrap();
        assert!(!generated.spec.watcher.enabled);
    }

    #[tokio::test]
    async fn test_validate_rejects_wrong_kind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(
            &path,
            "apiVersion: quobyte.com/v1\nkind: NodeConfig\nmetadata:\n  name: n\nspec: {}\n",
        )
        .unwrap();

        assert!(validate(Some(path)).await.is_err());
    }
}
