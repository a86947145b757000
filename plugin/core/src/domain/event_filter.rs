// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Event Filter
//!
//! Decides which lifecycle events are worth inspecting and which container
//! labels belong to the reserved namespace.

use crate::domain::container::{ContainerSnapshot, EventStatus, LifecycleEvent};
use crate::domain::labels::{LabelSet, LABEL_PREFIX};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct EventFilter {
    watched_statuses: HashSet<EventStatus>,
    label_prefix: String,
}

impl EventFilter {
    pub fn new(
        watched_statuses: impl IntoIterator<Item = EventStatus>,
        label_prefix: impl Into<String>,
    ) -> Self {
        Self {
            watched_statuses: watched_statuses.into_iter().collect(),
            label_prefix: label_prefix.into(),
        }
    }

    /// True only for recognized event kinds. Anything else is ignored, never an error.
    pub fn matches_status(&self, event: &LifecycleEvent) -> bool {
        self.watched_statuses.contains(&event.status)
    }

    /// Every config label whose key starts with the reserved prefix.
    pub fn watched_labels(&self, snapshot: &ContainerSnapshot) -> LabelSet {
        snapshot
            .labels()
            .into_iter()
            .flatten()
            .filter(|(key, _)| key.starts_with(&self.label_prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    pub fn label_prefix(&self) -> &str {
        &self.label_prefix
    }
}

impl Default for EventFilter {
    /// Container creation events and the `quobyte.` namespace.
    fn default() -> Self {
        Self::new([EventStatus::Create], LABEL_PREFIX)
    }
}
