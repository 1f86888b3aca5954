// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use byteview::ByteView;
use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::{Context, Error};

/// A named namespace of cached values.
pub trait Group: Send + Sync + fmt::Debug {
    /// The name the group is registered under.
    fn name(&self) -> &str;

    /// Looks up `key`, asking the owning peer if this process does not own it.
    fn get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>>;

    /// Looks up `key` without consulting peers.
    ///
    /// This is what a peer's request is served with: the request only arrives here because the
    /// sender believes this process owns the key.
    fn local_get<'a>(&'a self, ctx: &'a Context, key: &'a str) -> BoxFuture<'a, Result<ByteView, Error>>;
}

/// The groups known to a process, by name.
#[derive(Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<dyn Group>>>,
}

impl GroupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateGroup`] if a group with the same name exists.
    pub fn register(&self, group: Arc<dyn Group>) -> Result<(), Error> {
        let mut groups = self.groups.write();
        let name = group.name();
        if groups.contains_key(name) {
            return Err(Error::DuplicateGroup(name.to_owned()));
        }

        groups.insert(name.to_owned(), group);
        Ok(())
    }

    /// Returns the group named `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn Group>> {
        self.groups.read().get(name).map(Arc::clone)
    }

    /// Removes and returns the group named `name`.
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Group>> {
        self.groups.write().remove(name)
    }

    /// Names of all registered groups, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.groups.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRegistry").field("groups", &self.names()).finish()
    }
}
