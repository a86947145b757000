// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Fixed-user mount watcher
//!
//! Drains the container event feed into the [`RecreationCoordinator`], one
//! event at a time. Per-event failures are logged and the loop moves on; only
//! a broken feed ends the watcher with an error.

use crate::application::recreation::{RecreationCoordinator, RecreationOutcome};
use crate::domain::container::LifecycleEvent;
use crate::domain::runtime::{EventSource, RuntimeError};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("container event feed failed: {0}")]
    Connection(#[source] RuntimeError),
}

pub struct Watcher {
    events: Arc<dyn EventSource>,
    coordinator: RecreationCoordinator,
    shutdown_token: CancellationToken,
}

impl Watcher {
    pub fn new(events: Arc<dyn EventSource>, coordinator: RecreationCoordinator) -> Self {
        Self {
            events,
            coordinator,
            shutdown_token: CancellationToken::new(),
        }
    }

    /// Get a handle to trigger shutdown
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    pub fn coordinator(&self) -> &RecreationCoordinator {
        &self.coordinator
    }

    /// Consume events until the feed closes, fails, or shutdown is requested.
    ///
    /// An event already being handled runs to completion before shutdown is
    /// observed, so a recreation is never abandoned halfway by this loop.
    pub async fn run(&mut self) -> Result<(), WatcherError> {
        let shutdown = self.shutdown_token.clone();
        let mut events = self.events.subscribe();

        info!("Watching container events for fixed-user mounts");

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping watcher");
                    return Ok(());
                }
                next = events.next() => match next {
                    Some(Ok(event)) => self.dispatch(&event).await,
                    Some(Err(e)) => {
                        error!("Container event feed failed: {}", e);
                        return Err(WatcherError::Connection(e));
                    }
                    None => {
                        warn!("Container event feed closed");
                        return Ok(());
                    }
                },
            }
        }
    }

    async fn dispatch(&mut self, event: &LifecycleEvent) {
        match self.coordinator.handle_event(event).await {
            Ok(RecreationOutcome::Filtered) => {}
            Ok(outcome) => {
                debug!(
                    container_id = %event.container_id,
                    status = %event.status,
                    outcome = outcome.as_str(),
                    "Event handled"
                );
            }
            Err(e) if e.needs_operator() => {
                error!(
                    container_id = %e.container_id(),
                    stage = e.stage(),
                    "Recreation left a partial state, manual cleanup required: {}",
                    e
                );
            }
            Err(e) => {
                warn!(
                    container_id = %e.container_id(),
                    stage = e.stage(),
                    "Error handling event: {}",
                    e
                );
            }
        }
    }
}
