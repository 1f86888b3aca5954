// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recency list backing the LRU cache.
//!
//! Entries live in a slab of nodes linked into a doubly-linked list ordered from most recently
//! used (head) to least recently used (tail). Nodes are addressed by index so the cache map can
//! point straight at them; freed slots are chained into a free list and reused.

/// Index of a node in the slab.
pub type NodeIndex = usize;

/// Sentinel value indicating no node.
const NULL_INDEX: NodeIndex = NodeIndex::MAX;

#[derive(Debug)]
struct Node<K, V> {
    /// The cached entry, `None` while the slot sits on the free list.
    entry: Option<(K, V)>,

    /// Towards the head (more recently used).
    prev: NodeIndex,

    /// Towards the tail (less recently used). Doubles as the free list link.
    next: NodeIndex,
}

impl<K, V> Node<K, V> {
    const fn vacant(next: NodeIndex) -> Self {
        Self {
            entry: None,
            prev: NULL_INDEX,
            next,
        }
    }
}

/// Slab-backed doubly-linked list of cache entries in recency order.
#[derive(Debug)]
pub struct RecencyList<K, V> {
    nodes: Vec<Node<K, V>>,
    head: NodeIndex,
    tail: NodeIndex,
    free_head: NodeIndex,
    len: usize,
}

impl<K, V> Default for RecencyList<K, V> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            head: NULL_INDEX,
            tail: NULL_INDEX,
            free_head: NULL_INDEX,
            len: 0,
        }
    }
}

impl<K, V> RecencyList<K, V> {
    pub const fn len(&self) -> usize {
        self.len
    }

    /// The least recently used node, if any.
    pub fn back(&self) -> Option<NodeIndex> {
        (self.tail != NULL_INDEX).then_some(self.tail)
    }

    /// Inserts an entry as the most recently used one and returns its index.
    pub fn push_front(&mut self, key: K, value: V) -> NodeIndex {
        let idx = self.alloc_node();
        self.nodes[idx].entry = Some((key, value));
        self.link_front(idx);
        self.len += 1;
        idx
    }

    /// Marks the node as the most recently used one.
    pub fn move_to_front(&mut self, idx: NodeIndex) {
        if self.head == idx {
            return;
        }

        self.unlink(idx);
        self.link_front(idx);
    }

    /// Unlinks the node, returns its slot to the free list and hands back the entry.
    ///
    /// # Panics
    ///
    /// Panics if `idx` does not refer to an occupied node, which means the map and the list
    /// went out of sync.
    pub fn remove(&mut self, idx: NodeIndex) -> (K, V) {
        let entry = self.nodes[idx].entry.take().expect("removing a vacant recency list node");

        self.unlink(idx);
        self.nodes[idx].next = self.free_head;
        self.free_head = idx;
        self.len -= 1;

        entry
    }

    pub fn value(&self, idx: NodeIndex) -> &V {
        &self.entry(idx).1
    }

    pub fn value_mut(&mut self, idx: NodeIndex) -> &mut V {
        &mut self.nodes[idx].entry.as_mut().expect("accessing a vacant recency list node").1
    }

    fn entry(&self, idx: NodeIndex) -> &(K, V) {
        self.nodes[idx].entry.as_ref().expect("accessing a vacant recency list node")
    }

    /// Iterates from the most recently used entry to the least recently used one.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            list: self,
            cursor: self.head,
            remaining: self.len,
        }
    }

    /// Consumes the list, yielding every entry in slab order.
    pub fn into_entries(self) -> impl Iterator<Item = (K, V)> {
        self.nodes.into_iter().filter_map(|node| node.entry)
    }

    fn alloc_node(&mut self) -> NodeIndex {
        if self.free_head == NULL_INDEX {
            self.nodes.push(Node::vacant(NULL_INDEX));
            return self.nodes.len() - 1;
        }

        let idx = self.free_head;
        self.free_head = self.nodes[idx].next;
        idx
    }

    fn link_front(&mut self, idx: NodeIndex) {
        self.nodes[idx].prev = NULL_INDEX;
        self.nodes[idx].next = self.head;

        if self.head == NULL_INDEX {
            self.tail = idx;
        } else {
            self.nodes[self.head].prev = idx;
        }

        self.head = idx;
    }

    fn unlink(&mut self, idx: NodeIndex) {
        let prev = self.nodes[idx].prev;
        let next = self.nodes[idx].next;

        if prev == NULL_INDEX {
            self.head = next;
        } else {
            self.nodes[prev].next = next;
        }

        if next == NULL_INDEX {
            self.tail = prev;
        } else {
            self.nodes[next].prev = prev;
        }

        self.nodes[idx].prev = NULL_INDEX;
        self.nodes[idx].next = NULL_INDEX;
    }
}

/// Iterator over entries from most to least recently used.
#[derive(Debug)]
pub struct Iter<'a, K, V> {
    list: &'a RecencyList<K, V>,
    cursor: NodeIndex,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NULL_INDEX {
            return None;
        }

        let list = self.list;
        let (key, value) = list.entry(self.cursor);
        self.cursor = list.nodes[self.cursor].next;
        self.remaining -= 1;
        Some((key, value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
