// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod docker_runtime;
pub mod docker_events;

pub use docker_events::DockerEventSource;
pub use docker_runtime::DockerRuntime;
