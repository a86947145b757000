// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Mount Rewriter
//!
//! Pure functions that turn a container's Quobyte mounts into identity-qualified
//! mounts and fold the result back into the host configuration used to create
//! the replacement container.
//!
//! A Quobyte mount source such as `/run/docker/quobyte/mnt/vol42` is rewritten to
//! `/run/docker/quobyte/mnt/{identity}@vol42`, where the identity is derived from
//! the container's [`LabelSet`]:
//!
//! | labels            | new leaf                  |
//! |-------------------|---------------------------|
//! | user + group      | `{user}#{group}@{volume}` |
//! | user              | `{user}@{volume}`         |
//! | none              | `root@{volume}`           |
//!
//! Nothing here touches the runtime or shared state.

use crate::domain::labels::LabelSet;
use bollard::models::{HostConfig, Mount, MountTypeEnum};
use serde::{Deserialize, Serialize};

/// A mount as reported by container inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpec {
    /// Volume name, for volume mounts
    pub name: Option<String>,
    /// Host-side path
    pub source: String,
    /// Path inside the container
    pub destination: String,
    /// Volume driver, `None` for bind mounts
    pub driver: Option<String>,
    pub mode: Option<String>,
    pub read_write: bool,
}

impl MountSpec {
    pub fn uses_driver(&self, driver: &str) -> bool {
        self.driver.as_deref() == Some(driver)
    }
}

/// Rewrite the source of every mount backed by `driver`.
///
/// Mounts of any other driver are returned unchanged. An empty label set still
/// rewrites, using the default `root` identity; callers that want no mutation
/// must not call this at all.
pub fn rewrite_mounts(mounts: &[MountSpec], labels: &LabelSet, driver: &str) -> Vec<MountSpec> {
    let identity = labels.identity();

    mounts
        .iter()
        .map(|mount| {
            if !mount.uses_driver(driver) {
                return mount.clone();
            }

            match qualify_source(&mount.source, &identity) {
                Some(source) => MountSpec {
                    source,
                    ..mount.clone()
                },
                None => mount.clone(),
            }
        })
        .collect()
}

/// `/a/b/vol1` + `alice` -> `/a/b/alice@vol1`.
///
/// Returns `None` when the path has no separator or no leaf.
fn qualify_source(source: &str, identity: &str) -> Option<String> {
    let (parent, volume) = source.rsplit_once('/')?;
    if volume.is_empty() {
        return None;
    }
    Some(format!("{}/{}@{}", parent, identity, volume))
}

/// Write rewritten mounts back into a host configuration.
///
/// `original` and `rewritten` are index-aligned, as produced by
/// [`rewrite_mounts`]. For each mount whose source changed, any `binds` entry or
/// `mounts` entry targeting the same destination is dropped and a bind mount
/// from the new source is added in its place. The rest of the host
/// configuration is carried over untouched.
pub fn apply_to_host_config(
    host_config: &HostConfig,
    original: &[MountSpec],
    rewritten: &[MountSpec],
) -> HostConfig {
    let mut host_config = host_config.clone();

    for (before, after) in original.iter().zip(rewritten) {
        if before.source == after.source {
            continue;
        }

        let destination = after.destination.as_str();

        if let Some(binds) = host_config.binds.as_mut() {
            binds.retain(|bind| bind_destination(bind) != Some(destination));
        }

        let mounts = host_config.mounts.get_or_insert_with(Vec::new);
        mounts.retain(|m| m.target.as_deref() != Some(destination));
        mounts.push(Mount {
            target: Some(after.destination.clone()),
            source: Some(after.source.clone()),
            typ: Some(MountTypeEnum::BIND),
            read_only: Some(!after.read_write),
            ..Default::default()
        });
    }

    host_config
}

/// Destination of a `source:destination[:options]` bind string.
fn bind_destination(bind: &str) -> Option<&str> {
    bind.split(':').nth(1)
}

/// True when [`rewrite_mounts`] qualified at least one source.
pub fn mounts_changed(original: &[MountSpec], rewritten: &[MountSpec]) -> bool {
    original
        .iter()
        .zip(rewritten)
        .any(|(before, after)| before.source != after.source)
}

/// True when at least one mount is backed by `driver`.
pub fn has_driver_mounts(mounts: &[MountSpec], driver: &str) -> bool {
    mounts.iter().any(|m| m.uses_driver(driver))
}
