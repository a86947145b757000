// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Reserved label namespace
//!
//! Operators request identity-qualified mounts by labelling a container with
//! `quobyte.user` and optionally `quobyte.group`. A container carrying neither
//! is mounted as `root`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const LABEL_PREFIX: &str = "quobyte.";
pub const LABEL_USER: &str = "quobyte.user";
pub const LABEL_GROUP: &str = "quobyte.group";

/// Identity used when a container names no user.
pub const DEFAULT_IDENTITY: &str = "root";

/// Labels of a single container restricted to the reserved namespace.
///
/// Backed by an ordered map, so two sets extracted from the same labels compare
/// equal no matter how the runtime ordered them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet(BTreeMap<String, String>);

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn user(&self) -> Option<&str> {
        self.get(LABEL_USER)
    }

    pub fn group(&self) -> Option<&str> {
        self.get(LABEL_GROUP)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// A group label that has no effect because no user is set.
    pub fn ignored_group(&self) -> Option<&str> {
        match (self.user(), self.group()) {
            (None, Some(group)) => Some(group),
            _ => None,
        }
    }

    /// Identity prefix for the mount leaf: `user#group`, `user` or `root`.
    pub fn identity(&self) -> String {
        match (self.user(), self.group()) {
            (Some(user), Some(group)) => format!("{}#{}", user, group),
            (Some(user), None) => user.to_string(),
            _ => DEFAULT_IDENTITY.to_string(),
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_variants() {
        assert_eq!(LabelSet::new().identity(), "root");

        let user_only: LabelSet = [(LABEL_USER, "alice")].into_iter().collect();
        assert_eq!(user_only.identity(), "alice");

        let both: LabelSet = [(LABEL_USER, "alice"), (LABEL_GROUP, "eng")].into_iter().collect();
        assert_eq!(both.identity(), "alice#eng");
    }

    #[test]
    fn test_group_without_user_falls_back_to_root() {
        let group_only: LabelSet = [(LABEL_GROUP, "eng")].into_iter().collect();
        assert!(!group_only.is_empty());
        assert_eq!(group_only.identity(), "root");
        assert_eq!(group_only.ignored_group(), Some("eng"));

        let both: LabelSet = [(LABEL_USER, "alice"), (LABEL_GROUP, "eng")].into_iter().collect();
        assert_eq!(both.ignored_group(), None);
    }
}
