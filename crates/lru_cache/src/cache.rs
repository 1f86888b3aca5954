// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::mem;

use hashbrown::HashMap;

use crate::list::{Iter, NodeIndex, RecencyList};

/// Callback invoked with every entry that leaves the cache, except those handed back by
/// [`LruCache::take`].
pub type EvictionCallback<K, V> = Box<dyn FnMut(K, V) + Send>;

/// A fixed-capacity key-value store that evicts the least recently used entry.
///
/// Every operation runs in O(1): a hash map points at slots of a slab-backed linked list that
/// keeps entries ordered from most to least recently used.
///
/// Both [`add`][Self::add] and [`get`][Self::get] reorder entries, so all access needs `&mut self`.
/// The cache does no locking of its own; share it between threads by wrapping it in a mutex.
pub struct LruCache<K, V> {
    map: HashMap<K, NodeIndex>,
    list: RecencyList<K, V>,
    max_entries: usize,
    on_evicted: Option<EvictionCallback<K, V>>,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone,
{
    /// Creates a cache that holds at most `max_entries` entries.
    ///
    /// A `max_entries` of zero means the cache never evicts on its own.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            map: HashMap::new(),
            list: RecencyList::default(),
            max_entries,
            on_evicted: None,
        }
    }

    /// Registers a callback that receives every evicted entry.
    ///
    /// The callback runs for entries dropped to make room, for entries removed via
    /// [`remove`][Self::remove] or [`remove_oldest`][Self::remove_oldest] and for every entry
    /// discarded by [`clear`][Self::clear]. Only [`take`][Self::take] bypasses it, since the value
    /// goes back to the caller.
    #[must_use]
    pub fn with_eviction_callback<F>(mut self, callback: F) -> Self
    where
        F: FnMut(K, V) + Send + 'static,
    {
        self.on_evicted = Some(Box::new(callback));
        self
    }

    /// The configured capacity; zero means unbounded.
    #[must_use]
    pub const fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Inserts or updates an entry and marks it as the most recently used one.
    ///
    /// Updating an existing key never evicts anything. Inserting a new key into a full cache
    /// evicts the least recently used entry.
    pub fn add(&mut self, key: K, value: V) {
        if let Some(&idx) = self.map.get(&key) {
            *self.list.value_mut(idx) = value;
            self.list.move_to_front(idx);
            return;
        }

        let idx = self.list.push_front(key.clone(), value);
        self.map.insert(key, idx);

        if self.max_entries != 0 && self.list.len() > self.max_entries {
            self.remove_oldest();
        }
    }

    /// Looks up an entry and, on a hit, marks it as the most recently used one.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.list.move_to_front(idx);
        Some(self.list.value(idx))
    }

    /// Looks up an entry without changing its position.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.get(key).map(|&idx| self.list.value(idx))
    }

    /// Whether the cache holds `key`. Does not change its position.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    /// Removes an entry, passing it to the eviction callback. Absent keys are ignored.
    ///
    /// Returns whether an entry was removed.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(idx) = self.map.remove(key) else {
            return false;
        };

        let (key, value) = self.list.remove(idx);
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(key, value);
        }
        true
    }

    /// Removes an entry and hands its value back without running the eviction callback.
    pub fn take<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        let (_, value) = self.list.remove(idx);
        Some(value)
    }

    /// Evicts the least recently used entry, if there is one.
    pub fn remove_oldest(&mut self) {
        let Some(idx) = self.list.back() else {
            return;
        };

        let (key, value) = self.list.remove(idx);
        self.map.remove(&key);

        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(key, value);
        }
    }

    /// The number of entries in the cache.
    #[must_use]
    pub fn len(&self) -> usize {
        debug_assert_eq!(self.map.len(), self.list.len());
        self.list.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the entries from most to least recently used without reordering them.
    pub fn iter(&self) -> Iter<'_, K, V> {
        self.list.iter()
    }

    /// Evicts every entry and releases the memory held by the cache.
    ///
    /// The eviction callback runs once per entry, in no particular order.
    pub fn clear(&mut self) {
        let list = mem::take(&mut self.list);
        self.map = HashMap::new();

        match self.on_evicted.as_mut() {
            Some(on_evicted) => list.into_entries().for_each(|(key, value)| on_evicted(key, value)),
            None => drop(list),
        }
    }
}

impl<K, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("len", &self.list.len())
            .field("max_entries", &self.max_entries)
            .field("on_evicted", &self.on_evicted.is_some())
            .finish_non_exhaustive()
    }
}
