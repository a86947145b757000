// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::container::{ContainerId, ContainerSnapshot};
use crate::domain::mount::MountSpec;
use crate::domain::runtime::{ContainerRuntime, RuntimeError};
use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StartContainerOptions,
};
use bollard::models::{ContainerConfig, ContainerInspectResponse, HostConfig, MountPoint};
use bollard::Docker;
use tracing::{debug, info};

/// Seconds bollard waits on the daemon socket before giving up on a request.
const CLIENT_TIMEOUT_SECS: u64 = 120;

#[derive(Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    pub fn new(socket_path: Option<&str>) -> Result<Self, RuntimeError> {
        Ok(Self {
            docker: connect(socket_path)?,
        })
    }

    pub fn client(&self) -> &Docker {
        &self.docker
    }

    /// Verify Docker daemon is accessible
    pub async fn healthcheck(&self) -> Result<(), RuntimeError> {
        self.docker.ping().await.map_err(|e| {
            RuntimeError::Connection(format!(
                "Cannot connect to Docker daemon: {}\n\n\
                 Docker healthcheck failed. Ensure Docker is running:\n\
                 - sudo systemctl start docker\n\n\
                 Verify with: docker ps",
                e
            ))
        })?;
        Ok(())
    }
}

/// Connect to the Docker daemon on a custom socket or through local defaults.
pub fn connect(socket_path: Option<&str>) -> Result<Docker, RuntimeError> {
    match socket_path {
        Some(path) => {
            Docker::connect_with_unix(path, CLIENT_TIMEOUT_SECS, bollard::API_DEFAULT_VERSION)
                .map_err(|e| {
                    RuntimeError::Connection(format!(
                        "Failed to connect to Docker at {}: {}\n\n\
                         Ensure Docker is running and the socket path is correct.",
                        path, e
                    ))
                })
        }
        None => Docker::connect_with_local_defaults().map_err(|e| {
            RuntimeError::Connection(format!(
                "Failed to connect to Docker: {}\n\n\
                 Common causes:\n\
                 - Docker daemon not running (check: docker ps)\n\
                 - Permission denied accessing Docker socket\n\
                 - Current user not in 'docker' group\n\n\
                 Try:\n\
                 - Start Docker: systemctl start docker\n\
                 - Check permissions: ls -la /var/run/docker.sock",
                e
            ))
        }),
    }
}

pub(crate) fn map_error(err: bollard::errors::Error) -> RuntimeError {
    match err {
        bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message,
        } => RuntimeError::NotFound(message),
        other => RuntimeError::Api(other.to_string()),
    }
}

fn mount_spec(mount: MountPoint) -> MountSpec {
    MountSpec {
        name: mount.name.filter(|n| !n.is_empty()),
        source: mount.source.unwrap_or_default(),
        destination: mount.destination.unwrap_or_default(),
        driver: mount.driver.filter(|d| !d.is_empty()),
        mode: mount.mode,
        read_write: mount.rw.unwrap_or(true),
    }
}

fn snapshot_from_inspect(
    requested: &ContainerId,
    inspect: ContainerInspectResponse,
) -> ContainerSnapshot {
    ContainerSnapshot {
        id: inspect
            .id
            .map(ContainerId::new)
            .unwrap_or_else(|| requested.clone()),
        name: inspect.name,
        config: inspect.config.unwrap_or_default(),
        host_config: inspect.host_config.unwrap_or_default(),
        mounts: inspect
            .mounts
            .unwrap_or_default()
            .into_iter()
            .map(mount_spec)
            .collect(),
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn inspect(&self, id: &ContainerId) -> Result<ContainerSnapshot, RuntimeError> {
        let inspect = self
            .docker
            .inspect_container(id.as_str(), None::<InspectContainerOptions>)
            .await
            .map_err(map_error)?;

        Ok(snapshot_from_inspect(id, inspect))
    }

    async fn create(
        &self,
        config: ContainerConfig,
        host_config: HostConfig,
    ) -> Result<ContainerId, RuntimeError> {
        let create_config: Config<String> = Config {
            host_config: Some(host_config),
            ..Config::from(config)
        };

        let res = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, create_config)
            .await
            .map_err(map_error)?;

        for warning in &res.warnings {
            debug!(container_id = %res.id, "Docker create warning: {}", warning);
        }

        info!("Created container: {}", res.id);
        Ok(ContainerId::new(res.id))
    }

    async fn remove(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        let options = RemoveContainerOptions {
            force,
            v: remove_volumes,
            ..Default::default()
        };

        self.docker
            .remove_container(id.as_str(), Some(options))
            .await
            .map_err(map_error)?;

        info!("Removed container: {}", id.as_str());
        Ok(())
    }

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await
            .map_err(map_error)?;

        info!("Started container: {}", id.as_str());
        Ok(())
    }
}
