// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Container lifecycle events and point-in-time container snapshots.

use crate::domain::mount::MountSpec;
use bollard::models::{ContainerConfig, HostConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContainerId(pub String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 12-character form the Docker CLI prints.
    pub fn short(&self) -> &str {
        match self.0.char_indices().nth(12) {
            Some((idx, _)) => &self.0[..idx],
            None => &self.0,
        }
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

/// Kind of a container lifecycle event, as reported in the event `action`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Create,
    Start,
    Die,
    Destroy,
    Other(String),
}

impl EventStatus {
    pub fn from_action(action: &str) -> Self {
        match action {
            "create" => Self::Create,
            "start" => Self::Start,
            "die" => Self::Die,
            "destroy" => Self::Destroy,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "create",
            Self::Start => "start",
            Self::Die => "die",
            Self::Destroy => "destroy",
            Self::Other(action) => action,
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    pub container_id: ContainerId,
    pub status: EventStatus,
}

impl LifecycleEvent {
    pub fn new(container_id: impl Into<String>, status: EventStatus) -> Self {
        Self {
            container_id: ContainerId::new(container_id),
            status,
        }
    }
}

/// Container state as returned by inspect.
///
/// `config` and `host_config` are kept in the engine's own models so a
/// replacement can be created with everything except the mounts carried over
/// verbatim. The snapshot is stale as soon as the runtime mutates the container.
#[derive(Debug, Clone, Default)]
pub struct ContainerSnapshot {
    pub id: ContainerId,
    pub name: Option<String>,
    pub config: ContainerConfig,
    pub host_config: HostConfig,
    pub mounts: Vec<MountSpec>,
}

impl ContainerSnapshot {
    pub fn labels(&self) -> Option<&HashMap<String, String>> {
        self.config.labels.as_ref()
    }
}
