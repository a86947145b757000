// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Domain types for the fixed-user mount watcher.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Events, snapshots, labels, mount rewriting and the runtime port

pub mod container;
pub mod labels;
pub mod event_filter;
pub mod mount;
pub mod runtime;
pub mod plugin_config;

/// Storage driver whose mounts are eligible for rewriting.
pub const WATCHED_DRIVER: &str = "quobyte";
