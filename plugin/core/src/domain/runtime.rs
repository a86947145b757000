// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use crate::domain::container::{ContainerId, ContainerSnapshot, LifecycleEvent};
use async_trait::async_trait;
use bollard::models::{ContainerConfig, HostConfig};
use futures::stream::BoxStream;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Cannot reach container runtime: {0}")]
    Connection(String),
    #[error("Container not found: {0}")]
    NotFound(String),
    #[error("Container runtime API call failed: {0}")]
    Api(String),
    #[error("Container runtime did not answer within {0:?}")]
    Timeout(Duration),
}

/// The container operations the recreation flow needs from the engine.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn inspect(&self, id: &ContainerId) -> Result<ContainerSnapshot, RuntimeError>;

    /// Create a container and return the identifier the engine generated.
    async fn create(
        &self,
        config: ContainerConfig,
        host_config: HostConfig,
    ) -> Result<ContainerId, RuntimeError>;

    async fn remove(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError>;

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError>;
}

/// Source of container lifecycle events, in delivery order.
///
/// Delivery is at-least-once; consumers must tolerate duplicates. An `Err`
/// item means the feed is broken and no further events will follow.
pub trait EventSource: Send + Sync {
    fn subscribe(&self) -> BoxStream<'static, Result<LifecycleEvent, RuntimeError>>;
}
