// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the Quobyte Docker plugin CLI

pub mod config;
pub mod run;

pub use self::config::ConfigCommand;
pub use self::run::RunOverrides;
