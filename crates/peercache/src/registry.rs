// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Group, Loader};

/// A name-indexed collection of [`Group`]s.
///
/// Hosts usually keep one registry per process so that a transport layer serving peer requests
/// can resolve `/{group}/{key}` to the right group. Registering a group under a name that is
/// already taken replaces the previous group; existing `Arc<Group>` handles keep working.
///
/// # Thread safety
///
/// This type is thread-safe. Lookups take a shared lock; registrations take an exclusive one.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<Group>>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a group and registers it under `name`.
    ///
    /// `cache_bytes` bounds the group's local cache; 0 leaves it unbounded.
    ///
    /// # Examples
    ///
    /// ```
    /// use peercache::{GroupRegistry, loader_fn};
    ///
    /// let registry = GroupRegistry::new();
    /// let scores = registry.new_group("scores", 2 << 10, loader_fn(|key| match key {
    ///     "Tom" => Ok(b"630".to_vec()),
    ///     _ => Err(format!("{key} does not exist").into()),
    /// }));
    ///
    /// assert_eq!(scores.get("Tom").unwrap().as_string(), "630");
    /// assert!(scores.get("unknown").is_err());
    /// ```
    pub fn new_group(&self, name: impl Into<String>, cache_bytes: usize, loader: impl Loader + 'static) -> Arc<Group> {
        self.register(Group::new(name.into(), cache_bytes, Arc::new(loader)))
    }

    /// Registers an already built group, replacing any group of the same name.
    pub fn register(&self, group: Group) -> Arc<Group> {
        let group = Arc::new(group);
        let replaced = self
            .groups
            .write()
            .insert(group.name().to_string(), Arc::clone(&group))
            .is_some();

        tracing::info!(cache.group = group.name(), replaced, "group.registered");
        group
    }

    /// Returns the group registered under `name`.
    #[must_use]
    pub fn get_group(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.read().get(name).map(Arc::clone)
    }

    /// Returns the names of all registered groups, sorted.
    #[must_use]
    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if no group is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;
    use testing_aids::LogCapture;

    use super::*;
    use crate::loader_fn;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(GroupRegistry: Send, Sync);
    }

    #[test]
    fn registration_is_logged() {
        let capture = LogCapture::new();
        let _guard = tracing::subscriber::set_default(capture.subscriber());

        let registry = GroupRegistry::new();
        let _ = registry.new_group("scores", 0, loader_fn(|_| Ok(Vec::new())));

        capture.assert_contains("group.registered");
        capture.assert_contains("scores");
        capture.assert_contains("replaced=false");
    }

    #[test]
    fn empty_registry() {
        let registry = GroupRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert!(registry.get_group("missing").is_none());
        assert!(registry.group_names().is_empty());
    }
}
