// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Quobyte Plugin Core
//!
//! Watches Docker container lifecycle events and rebuilds containers whose
//! Quobyte mounts must carry a fixed user/group identity.
//!
//! # Architecture
//!
//! - **Layer:** Core System
//! - **Purpose:** Domain model, recreation coordinator and Docker adapters

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
