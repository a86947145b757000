// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Docker Event Source
//!
//! Translates the Docker `/events` feed into domain [`LifecycleEvent`]s.
//! Only container events are requested from the daemon; messages without an
//! actor ID are dropped. Any transport error ends the stream, since the
//! daemon does not resume a broken feed on its own.

use crate::domain::container::{EventStatus, LifecycleEvent};
use crate::domain::runtime::{EventSource, RuntimeError};
use bollard::models::EventMessage;
use bollard::system::EventsOptions;
use bollard::Docker;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::collections::HashMap;

pub struct DockerEventSource {
    docker: Docker,
}

impl DockerEventSource {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

impl EventSource for DockerEventSource {
    fn subscribe(&self) -> BoxStream<'static, Result<LifecycleEvent, RuntimeError>> {
        let options = EventsOptions::<String> {
            filters: HashMap::from([("type".to_string(), vec!["container".to_string()])]),
            ..Default::default()
        };

        self.docker
            .events(Some(options))
            .filter_map(|message| async move {
                match message {
                    Ok(message) => lifecycle_event(message).map(Ok),
                    Err(e) => Some(Err(RuntimeError::Connection(e.to_string()))),
                }
            })
            // Nothing after a transport error is trustworthy.
            .scan(false, |failed, item| {
                let next = if *failed {
                    None
                } else {
                    *failed = item.is_err();
                    Some(item)
                };
                futures::future::ready(next)
            })
            .boxed()
    }
}

fn lifecycle_event(message: EventMessage) -> Option<LifecycleEvent> {
    let id = message.actor?.id.filter(|id| !id.is_empty())?;
    let action = message.action.unwrap_or_default();
    Some(LifecycleEvent::new(id, EventStatus::from_action(&action)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::models::EventActor;

    fn message(id: Option<&str>, action: &str) -> EventMessage {
        EventMessage {
            action: Some(action.to_string()),
            actor: Some(EventActor {
                id: id.map(str::to_string),
                attributes: Some(HashMap::from([(
                    "quobyte.user".to_string(),
                    "alice".to_string(),
                )])),
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_message_maps_to_event() {
        let event = lifecycle_event(message(Some("4f66ad9a0b2e"), "create")).unwrap();
        assert_eq!(event.container_id.as_str(), "4f66ad9a0b2e");
        assert_eq!(event.status, EventStatus::Create);
    }

    #[test]
    fn test_unknown_action_is_kept_verbatim() {
        let event =
            lifecycle_event(message(Some("4f66ad9a0b2e"), "health_status: healthy")).unwrap();
        assert_eq!(event.status, EventStatus::Other("health_status: healthy".to_string()));
    }

    #[test]
    fn test_message_without_actor_is_dropped() {
        assert!(lifecycle_event(message(None, "create")).is_none());
        assert!(lifecycle_event(message(Some(""), "create")).is_none());
        assert!(lifecycle_event(EventMessage::default()).is_none());
    }
}
