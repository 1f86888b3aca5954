// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt;
use std::sync::{Arc, OnceLock};

use futures::future::BoxFuture;

use crate::{Context, Error, GetRequest, GetResponse};

/// Fetches values from a peer that owns them.
pub trait PeerGetter: Send + Sync + fmt::Debug {
    /// Asks the peer for the value described by `request`.
    fn fetch<'a>(&'a self, ctx: &'a Context, request: &'a GetRequest) -> BoxFuture<'a, Result<GetResponse, Error>>;
}

/// Locates the peer that owns a key.
pub trait PeerPicker: Send + Sync + fmt::Debug {
    /// Returns the owning peer, or `None` when the key is owned by this process or no peers are
    /// known.
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>>;
}

/// A [`PeerPicker`] that never finds a peer, so every key is loaded locally.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPeers;

impl PeerPicker for NoPeers {
    fn pick_peer(&self, _key: &str) -> Option<Arc<dyn PeerGetter>> {
        None
    }
}

type PickerFactory = Box<dyn Fn(&str) -> Option<Arc<dyn PeerPicker>> + Send + Sync>;

/// Holds the peer picker groups consult when they are created.
///
/// At most one source can be registered, either a single picker shared by every group or a
/// factory that picks per group name. Until something is registered, groups run with [`NoPeers`].
#[derive(Default)]
pub struct PeerPickerRegistry {
    factory: OnceLock<PickerFactory>,
}

impl PeerPickerRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a picker shared by every group.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] if a picker was registered before.
    pub fn register(&self, picker: Arc<dyn PeerPicker>) -> Result<(), Error> {
        self.register_per_group(move |_| Some(Arc::clone(&picker)))
    }

    /// Registers a factory choosing the picker for each group by name.
    ///
    /// A factory returning `None` leaves that group with [`NoPeers`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRegistered`] if a picker was registered before.
    pub fn register_per_group<F>(&self, factory: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<Arc<dyn PeerPicker>> + Send + Sync + 'static,
    {
        self.factory
            .set(Box::new(factory))
            .map_err(|_rejected| Error::AlreadyRegistered)
    }

    /// Whether a picker has been registered.
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.factory.get().is_some()
    }

    /// The picker for the group named `group`.
    #[must_use]
    pub fn picker_for(&self, group: &str) -> Arc<dyn PeerPicker> {
        self.factory
            .get()
            .and_then(|factory| factory(group))
            .unwrap_or_else(|| Arc::new(NoPeers))
    }
}

impl fmt::Debug for PeerPickerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerPickerRegistry")
            .field("registered", &self.is_registered())
            .finish()
    }
}
