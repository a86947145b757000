// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use async_trait::async_trait;
use bollard::models::{ContainerConfig, HostConfig};
use futures::stream::{self, BoxStream, StreamExt};
use quobyte_core::application::{RecreationCoordinator, RecreationOutcome, Watcher};
use quobyte_core::domain::container::{ContainerId, ContainerSnapshot, EventStatus, LifecycleEvent};
use quobyte_core::domain::labels::LABEL_USER;
use quobyte_core::domain::mount::MountSpec;
use quobyte_core::domain::runtime::{ContainerRuntime, EventSource, RuntimeError};
use quobyte_core::domain::WATCHED_DRIVER;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio_test::assert_ok;

/// Docker stand-in that logs every API call as a line of text.
struct RecordingDocker {
    containers: Mutex<HashMap<String, ContainerSnapshot>>,
    log: Mutex<Vec<String>>,
    created: Mutex<Vec<(ContainerConfig, HostConfig)>>,
}

impl RecordingDocker {
    fn with(containers: Vec<ContainerSnapshot>) -> Self {
        Self {
            containers: Mutex::new(
                containers
                    .into_iter()
                    .map(|c| (c.id.as_str().to_string(), c))
                    .collect(),
            ),
            log: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContainerRuntime for RecordingDocker {
    async fn inspect(&self, id: &ContainerId) -> Result<ContainerSnapshot, RuntimeError> {
        self.log.lock().unwrap().push(format!("inspect {}", id.as_str()));
        self.containers
            .lock()
            .unwrap()
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(id.as_str().to_string()))
    }

    async fn create(
        &self,
        config: ContainerConfig,
        host_config: HostConfig,
    ) -> Result<ContainerId, RuntimeError> {
        let id = format!("C{}", self.created.lock().unwrap().len() + 2);
        self.log.lock().unwrap().push(format!("create {}", id));
        self.created
            .lock()
            .unwrap()
            .push((config.clone(), host_config.clone()));
        self.containers.lock().unwrap().insert(
            id.clone(),
            ContainerSnapshot {
                id: ContainerId::new(id.clone()),
                config,
                host_config,
                ..Default::default()
            },
        );
        Ok(ContainerId::new(id))
    }

    async fn remove(
        &self,
        id: &ContainerId,
        force: bool,
        remove_volumes: bool,
    ) -> Result<(), RuntimeError> {
        self.log.lock().unwrap().push(format!(
            "remove {} force={} volumes={}",
            id.as_str(),
            force,
            remove_volumes
        ));
        self.containers.lock().unwrap().remove(id.as_str());
        Ok(())
    }

    async fn start(&self, id: &ContainerId) -> Result<(), RuntimeError> {
        self.log.lock().unwrap().push(format!("start {}", id.as_str()));
        Ok(())
    }
}

struct Feed(Mutex<Vec<LifecycleEvent>>);

impl EventSource for Feed {
    fn subscribe(&self) -> BoxStream<'static, Result<LifecycleEvent, RuntimeError>> {
        let events = std::mem::take(&mut *self.0.lock().unwrap());
        stream::iter(events.into_iter().map(Ok)).boxed()
    }
}

fn container(id: &str, labels: &[(&str, &str)]) -> ContainerSnapshot {
    ContainerSnapshot {
        id: ContainerId::new(id),
        name: Some(format!("/{}", id.to_lowercase())),
        config: ContainerConfig {
            image: Some("registry.local/batch:2.1".to_string()),
            cmd: Some(vec!["run.sh".to_string()]),
            env: Some(vec!["TZ=UTC".to_string()]),
            labels: Some(
                labels
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
            ..Default::default()
        },
        host_config: HostConfig {
            binds: Some(vec!["vol42:/data".to_string()]),
            memory: Some(512 * 1024 * 1024),
            ..Default::default()
        },
        mounts: vec![MountSpec {
            name: Some("vol42".to_string()),
            source: "/mnt/store/vol42".to_string(),
            destination: "/data".to_string(),
            driver: Some(WATCHED_DRIVER.to_string()),
            mode: Some("z".to_string()),
            read_write: true,
        }],
    }
}

#[tokio::test]
async fn labelled_create_event_replaces_container_in_order() {
    let original = container("C1", &[(LABEL_USER, "bob")]);
    let docker = Arc::new(RecordingDocker::with(vec![original.clone()]));
    let mut coordinator = RecreationCoordinator::new(docker.clone());

    let outcome = assert_ok!(
        coordinator
            .handle_event(&LifecycleEvent::new("C1", EventStatus::Create))
            .await
    );
    assert_eq!(
        outcome,
        RecreationOutcome::Recreated {
            replacement: ContainerId::new("C2")
        }
    );

    assert_eq!(
        docker.log(),
        vec![
            "inspect C1".to_string(),
            "create C2".to_string(),
            "remove C1 force=true volumes=false".to_string(),
            "start C2".to_string(),
        ]
    );

    let created = docker.created.lock().unwrap();
    let (config, host_config) = &created[0];
    assert_eq!(config, &original.config);
    assert_eq!(host_config.memory, original.host_config.memory);
    let mounts = host_config.mounts.as_ref().unwrap();
    assert_eq!(mounts[0].source.as_deref(), Some("/mnt/store/bob@vol42"));
    assert_eq!(mounts[0].target.as_deref(), Some("/data"));
}

#[tokio::test]
async fn unlabelled_container_costs_one_inspect() {
    let docker = Arc::new(RecordingDocker::with(vec![container("C1", &[("team", "data")])]));
    let mut coordinator = RecreationCoordinator::new(docker.clone());

    let outcome = assert_ok!(
        coordinator
            .handle_event(&LifecycleEvent::new("C1", EventStatus::Create))
            .await
    );
    assert_eq!(outcome, RecreationOutcome::Unlabelled);
    assert_eq!(docker.log(), vec!["inspect C1".to_string()]);
}

#[tokio::test]
async fn watcher_never_rebuilds_its_own_replacements() {
    let docker = Arc::new(RecordingDocker::with(vec![
        container("C1", &[(LABEL_USER, "bob")]),
        container("C9", &[(LABEL_USER, "carol")]),
    ]));
    let feed = Arc::new(Feed(Mutex::new(vec![
        LifecycleEvent::new("C1", EventStatus::Create),
        LifecycleEvent::new("C1", EventStatus::Create),
        LifecycleEvent::new("C2", EventStatus::Create),
        LifecycleEvent::new("C2", EventStatus::Start),
        LifecycleEvent::new("C9", EventStatus::Create),
        LifecycleEvent::new("C3", EventStatus::Create),
        LifecycleEvent::new("C2", EventStatus::Create),
    ])));

    let mut watcher = Watcher::new(feed, RecreationCoordinator::new(docker.clone()));
    assert_ok!(watcher.run().await);

    let log = docker.log();
    let creates: Vec<_> = log.iter().filter(|l| l.starts_with("create")).collect();
    assert_eq!(creates, vec!["create C2", "create C3"]);
    // The duplicate C1 event finds the container already gone.
    assert_eq!(log.iter().filter(|l| *l == "inspect C1").count(), 2);
    assert_eq!(watcher.coordinator().recreated().len(), 2);
}
