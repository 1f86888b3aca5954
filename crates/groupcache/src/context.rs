// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use http::Extensions;

/// Caller-supplied data that travels with a lookup.
///
/// The cache never looks inside a context; it only hands it to loaders and to the transport
/// selector, which may use it to pick credentials, deadlines or a tracing parent. Values are keyed
/// by their type.
#[derive(Debug, Clone, Default)]
pub struct Context {
    extensions: Extensions,
}

impl Context {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a value, returning the previous value of the same type.
    pub fn insert<T>(&mut self, value: T) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value)
    }

    /// Builder-style variant of [`insert`][Self::insert].
    #[must_use]
    pub fn with<T>(mut self, value: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value);
        self
    }

    /// Returns the value of type `T`, if present.
    #[must_use]
    pub fn get<T>(&self) -> Option<&T>
    where
        T: Send + Sync + 'static,
    {
        self.extensions.get()
    }
}

impl From<Extensions> for Context {
    fn from(extensions: Extensions) -> Self {
        Self { extensions }
    }
}
