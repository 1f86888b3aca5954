// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Coalesces duplicate async tasks into a single execution.
//!
//! This crate provides [`UniFlight`], a mechanism for deduplicating concurrent async operations.
//! When multiple tasks request the same work (identified by a key) while it is in flight, only one
//! of them performs the work and every caller receives a clone of the same output.
//!
//! Deduplication only spans the lifetime of the call: as soon as the work completes, its key is
//! forgotten and the next request for it starts a fresh execution. Keeping results around is the
//! job of a cache sitting in front of the `UniFlight`.
//!
//! # Example
//!
//! ```
//! use uniflight::UniFlight;
//!
//! # async fn example() {
//! let group: UniFlight<&str, String> = UniFlight::new();
//!
//! // Multiple concurrent calls with the same key will share a single execution
//! let result = group.work("user:123", || async {
//!     // This expensive operation runs only once, even if called concurrently
//!     "expensive_result".to_string()
//! }).await;
//! # }
//! ```
//!
//! # Errors
//!
//! Fallible work is expressed by making the output a `Result`. A failure is shared exactly like a
//! success: every caller that joined the call receives a clone of the same error and nobody
//! retries on its own. The following call for the key runs the work again.
//!
//! # Cancellation and Panic Safety
//!
//! - Dropping a caller that merely waits has no effect on the others.
//! - If the caller driving the work is dropped or panics, one of the remaining callers takes over
//!   and runs its own closure.
//! - Once every caller for a key has been dropped, polled or not, the key leaves the table.
//!
//! # Thread Safety
//!
//! [`UniFlight`] is `Send` and `Sync`, and can be shared across threads. The internal table lock
//! is held only to look up, insert and remove entries, never while the work runs, so slow work for
//! one key does not hold up any other key.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use async_once_cell::OnceCell;
use parking_lot::Mutex;

/// Represents a class of work and creates a space in which units of work
/// can be executed with duplicate suppression.
pub struct UniFlight<K, T> {
    mapping: Mutex<HashMap<K, Entry<T>>>,
}

/// The cell shared by everyone waiting on one key, and how many of them are still around.
struct Entry<T> {
    cell: Arc<OnceCell<T>>,
    callers: usize,
}

impl<K, T> Default for UniFlight<K, T> {
    fn default() -> Self {
        Self {
            mapping: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, T> fmt::Debug for UniFlight<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UniFlight").field("in_flight", &self.mapping.lock().len()).finish()
    }
}

impl<K, T> UniFlight<K, T>
where
    K: Hash + Eq + Clone,
{
    /// Creates a new `UniFlight` instance.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of keys with work currently in flight.
    ///
    /// A key counts as long as at least one caller for it is still alive, whether or not that
    /// caller has been polled yet.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.mapping.lock().len()
    }

    /// Execute and return the value for a given function, making sure that only one
    /// operation per key is in flight at a given moment. If a duplicate call comes in,
    /// that caller waits until the first one completes and returns the same value.
    ///
    /// The call joins in-flight work as soon as `work` is invoked, not when the returned
    /// future is first polled. Dropping the returned future leaves the call; once every caller
    /// for a key has completed or been dropped, the key is no longer tracked.
    pub fn work<F, Fut>(&self, key: K, func: F) -> impl Future<Output = T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
        T: Clone,
    {
        let flight = self.join(key);

        async move {
            // The closure is only invoked if this caller ends up driving the work.
            let value = flight.cell.get_or_init(async { func().await }).await.clone();
            flight.land();
            value
        }
    }

    fn join(&self, key: K) -> Flight<'_, K, T> {
        let mut mapping = self.mapping.lock();
        let entry = mapping.entry(key.clone()).or_insert_with(|| Entry {
            cell: Arc::new(OnceCell::new()),
            callers: 0,
        });
        entry.callers += 1;
        let cell = Arc::clone(&entry.cell);
        drop(mapping);

        Flight { group: self, key, cell }
    }
}

/// One caller's membership in the work for a key.
///
/// All bookkeeping happens under the table lock, so the last member to leave, by finishing or by
/// being dropped, is the one that removes the entry.
struct Flight<'a, K, T>
where
    K: Hash + Eq,
{
    group: &'a UniFlight<K, T>,
    key: K,
    cell: Arc<OnceCell<T>>,
}

impl<K, T> Flight<'_, K, T>
where
    K: Hash + Eq,
{
    /// The work is done: forget the key right away so the next call starts afresh, even while
    /// other members are still picking up the value.
    fn land(&self) {
        let mut mapping = self.group.mapping.lock();
        if mapping.get(&self.key).is_some_and(|entry| Arc::ptr_eq(&entry.cell, &self.cell)) {
            mapping.remove(&self.key);
        }
    }
}

impl<K, T> Drop for Flight<'_, K, T>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        let mut mapping = self.group.mapping.lock();

        // A newer entry for the same key belongs to a later call and is left alone.
        let Some(entry) = mapping.get_mut(&self.key).filter(|entry| Arc::ptr_eq(&entry.cell, &self.cell)) else {
            return;
        };

        entry.callers -= 1;
        if entry.callers == 0 {
            mapping.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use static_assertions::assert_impl_all;

    use super::*;

    #[test]
    fn thread_safe_type() {
        assert_impl_all!(UniFlight<String, Result<String, String>>: Send, Sync);
    }

    #[tokio::test]
    async fn entry_removed_after_completion() {
        let group = UniFlight::new();
        let fut = group.work("key", || async { 1 });
        assert_eq!(group.in_flight(), 1);
        assert_eq!(fut.await, 1);
        assert_eq!(group.in_flight(), 0);
    }

    #[test]
    fn unpolled_callers_are_counted_and_released() {
        let group: UniFlight<&str, i32> = UniFlight::new();

        let first = group.work("key", || async { 1 });
        let second = group.work("key", || async { 2 });
        assert_eq!(group.mapping.lock()["key"].callers, 2);

        drop(first);
        assert_eq!(group.in_flight(), 1);
        drop(second);
        assert_eq!(group.in_flight(), 0);
    }

    #[tokio::test]
    async fn stale_member_leaves_newer_entry_alone() {
        let group: UniFlight<&str, i32> = UniFlight::new();

        let landed = group.join("key");
        landed.land();
        let newer = group.work("key", || async { 7 });

        drop(landed);
        assert_eq!(group.in_flight(), 1);
        assert_eq!(newer.await, 7);
        assert_eq!(group.in_flight(), 0);
    }
}
