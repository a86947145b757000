// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Recreation Coordinator
//!
//! Rebuilds a labelled container so its Quobyte mounts point at an
//! identity-qualified path. Mount configuration cannot change after creation,
//! so the container is replaced:
//!
//! ```text
//! event ─▶ status filter ─▶ inspect ─▶ dedup ─▶ labels ─▶ rewrite
//!                                                           │
//!            start new ◀─ remove old ◀─ record new id ◀─ create new
//! ```
//!
//! The replacement's own `create` event comes back through the feed. Its ID is
//! recorded in the [`RecreatedSet`] before anything else happens to either
//! container, which is what stops the coordinator from rebuilding its own
//! output forever.
//!
//! No step is retried. A failed create leaves the original untouched; a failed
//! remove leaves both containers; a failed start leaves a stopped replacement.

use crate::domain::container::{ContainerId, LifecycleEvent};
use crate::domain::event_filter::EventFilter;
use crate::domain::labels::{LABEL_GROUP, LABEL_USER};
use crate::domain::mount::{
    apply_to_host_config, has_driver_mounts, mounts_changed, rewrite_mounts,
};
use crate::domain::runtime::{ContainerRuntime, RuntimeError};
use crate::domain::WATCHED_DRIVER;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, trace, warn};

const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// IDs of containers this process created. Grows monotonically for the
/// lifetime of the coordinator and is never persisted.
#[derive(Debug, Default)]
pub struct RecreatedSet {
    ids: HashSet<ContainerId>,
}

impl RecreatedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, id: ContainerId) {
        self.ids.insert(id);
    }

    pub fn contains(&self, id: &ContainerId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Terminal state of a successfully handled event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecreationOutcome {
    /// Event kind is not watched
    Filtered,
    /// Container was created by this coordinator
    Deduplicated,
    /// No labels in the reserved namespace
    Unlabelled,
    /// Labelled, but no mount uses the watched driver
    NoWatchedMounts,
    /// Watched mounts exist but none has a source path that can be qualified
    Unrewritable,
    Recreated { replacement: ContainerId },
}

impl RecreationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::Deduplicated => "deduplicated",
            Self::Unlabelled => "unlabelled",
            Self::NoWatchedMounts => "no_watched_mounts",
            Self::Unrewritable => "unrewritable",
            Self::Recreated { .. } => "recreated",
        }
    }
}

#[derive(Debug, Error)]
pub enum RecreationError {
    #[error("failed to inspect container {container_id}: {source}")]
    Inspect {
        container_id: ContainerId,
        source: RuntimeError,
    },

    #[error(
        "failed to create replacement for container {container_id}: {source}{}",
        create_hint(.source)
    )]
    Create {
        container_id: ContainerId,
        source: RuntimeError,
    },

    #[error(
        "replacement {replacement} created but original container {container_id} \
         could not be removed, both now exist: {source}"
    )]
    Remove {
        container_id: ContainerId,
        replacement: ContainerId,
        source: RuntimeError,
    },

    #[error(
        "original container {container_id} removed but replacement {replacement} \
         failed to start: {source}"
    )]
    Start {
        container_id: ContainerId,
        replacement: ContainerId,
        source: RuntimeError,
    },
}

impl RecreationError {
    /// The container the event was about.
    pub fn container_id(&self) -> &ContainerId {
        match self {
            Self::Inspect { container_id, .. }
            | Self::Create { container_id, .. }
            | Self::Remove { container_id, .. }
            | Self::Start { container_id, .. } => container_id,
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            Self::Inspect { .. } => "inspect",
            Self::Create { .. } => "create",
            Self::Remove { .. } => "remove",
            Self::Start { .. } => "start",
        }
    }

    /// Both containers exist (or may exist), or the replacement is stopped.
    pub fn needs_operator(&self) -> bool {
        matches!(
            self,
            Self::Remove { .. }
                | Self::Start { .. }
                | Self::Create {
                    source: RuntimeError::Timeout(_),
                    ..
                }
        )
    }
}

/// A timed-out create may still have completed on the daemon side.
fn create_hint(source: &RuntimeError) -> &'static str {
    match source {
        RuntimeError::Timeout(_) => {
            " (the daemon may still have created an untracked replacement, check for a duplicate)"
        }
        _ => "",
    }
}

pub struct RecreationCoordinator {
    runtime: Arc<dyn ContainerRuntime>,
    filter: EventFilter,
    driver: String,
    recreated: RecreatedSet,
    api_timeout: Duration,
}

impl RecreationCoordinator {
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            filter: EventFilter::default(),
            driver: WATCHED_DRIVER.to_string(),
            recreated: RecreatedSet::new(),
            api_timeout: DEFAULT_API_TIMEOUT,
        }
    }

    pub fn with_filter(mut self, filter: EventFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_api_timeout(mut self, api_timeout: Duration) -> Self {
        self.api_timeout = api_timeout;
        self
    }

    pub fn recreated(&self) -> &RecreatedSet {
        &self.recreated
    }

    /// Run one event through the recreation flow to a terminal state.
    pub async fn handle_event(
        &mut self,
        event: &LifecycleEvent,
    ) -> Result<RecreationOutcome, RecreationError> {
        let result = self.process(event).await;

        match &result {
            Ok(outcome) => {
                metrics::counter!("quobyte_watcher_events_total", "outcome" => outcome.as_str())
                    .increment(1);
            }
            Err(e) => {
                metrics::counter!("quobyte_watcher_failures_total", "stage" => e.stage())
                    .increment(1);
            }
        }

        result
    }

    async fn process(
        &mut self,
        event: &LifecycleEvent,
    ) -> Result<RecreationOutcome, RecreationError> {
        if !self.filter.matches_status(event) {
            trace!(container_id = %event.container_id, status = %event.status, "Ignoring event");
            return Ok(RecreationOutcome::Filtered);
        }

        let snapshot = bounded(self.api_timeout, self.runtime.inspect(&event.container_id))
            .await
            .map_err(|source| RecreationError::Inspect {
                container_id: event.container_id.clone(),
                source,
            })?;

        if self.recreated.contains(&snapshot.id) {
            debug!(
                container_id = %snapshot.id,
                "Container is a replacement created by this watcher, skipping"
            );
            return Ok(RecreationOutcome::Deduplicated);
        }

        let labels = self.filter.watched_labels(&snapshot);
        if labels.is_empty() {
            return Ok(RecreationOutcome::Unlabelled);
        }

        if !has_driver_mounts(&snapshot.mounts, &self.driver) {
            debug!(
                container_id = %snapshot.id,
                driver = %self.driver,
                "Container has {} labels but no {} mounts",
                self.filter.label_prefix(),
                self.driver
            );
            return Ok(RecreationOutcome::NoWatchedMounts);
        }

        if let Some(group) = labels.ignored_group() {
            warn!(
                container_id = %snapshot.id,
                group,
                "{} is set without {}, the group is ignored and root is used",
                LABEL_GROUP,
                LABEL_USER
            );
        }

        let rewritten = rewrite_mounts(&snapshot.mounts, &labels, &self.driver);
        if !mounts_changed(&snapshot.mounts, &rewritten) {
            warn!(
                container_id = %snapshot.id,
                "No {} mount source could be qualified, leaving container untouched",
                self.driver
            );
            return Ok(RecreationOutcome::Unrewritable);
        }

        let host_config = apply_to_host_config(&snapshot.host_config, &snapshot.mounts, &rewritten);

        info!(
            container_id = %snapshot.id,
            name = snapshot.name.as_deref().unwrap_or(""),
            identity = %labels.identity(),
            "Recreating container with fixed-user mounts"
        );

        let replacement = bounded(
            self.api_timeout,
            self.runtime.create(snapshot.config.clone(), host_config),
        )
        .await
        .map_err(|source| RecreationError::Create {
            container_id: snapshot.id.clone(),
            source,
        })?;

        // Must happen before the old container is touched: the replacement's
        // create event may already be queued behind this one.
        self.recreated.record(replacement.clone());
        debug!(container_id = %snapshot.id, replacement = %replacement, "Recorded replacement");

        bounded(self.api_timeout, self.runtime.remove(&snapshot.id, true, false))
            .await
            .map_err(|source| RecreationError::Remove {
                container_id: snapshot.id.clone(),
                replacement: replacement.clone(),
                source,
            })?;

        bounded(self.api_timeout, self.runtime.start(&replacement))
            .await
            .map_err(|source| RecreationError::Start {
                container_id: snapshot.id.clone(),
                replacement: replacement.clone(),
                source,
            })?;

        info!(container_id = %snapshot.id, replacement = %replacement, "Container recreated");

        Ok(RecreationOutcome::Recreated { replacement })
    }
}

async fn bounded<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, RuntimeError>>,
) -> Result<T, RuntimeError> {
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RuntimeError::Timeout(limit)),
    }
}
