// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod recreation;
pub mod watcher;

pub use recreation::{RecreatedSet, RecreationCoordinator, RecreationError, RecreationOutcome};
pub use watcher::{Watcher, WatcherError};
