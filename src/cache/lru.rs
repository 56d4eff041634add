//! LRU Store Module
//!
//! Implements the bounded key-value store that backs the cache, ordered by
//! recency of access.

use std::collections::HashMap;
use std::hash::Hash;
use std::iter;

/// Sentinel link for "no node".
const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    prev: usize,
    next: usize,
}

// == LRU Store ==
/// Fixed-capacity key-value store with least-recently-used eviction.
///
/// Nodes live in a dense `Vec` and are chained into a doubly-linked list by
/// index:
/// - `head` = Most recently used
/// - `tail` = Least recently used
///
/// The hash index maps each key to its slot, so lookup, promotion, insertion
/// and removal are all O(1). Removing a node moves the last slot into the
/// freed one, keeping the `Vec` dense.
///
/// The store knows nothing about expiry; values are opaque.
#[derive(Debug)]
pub struct LruStore<K, V> {
    index: HashMap<K, usize>,
    nodes: Vec<Node<K, V>>,
    head: usize,
    tail: usize,
    capacity: usize,
}

impl<K, V> LruStore<K, V>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an empty store holding at most `capacity` entries.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            index: HashMap::with_capacity(capacity),
            nodes: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    // == Get ==
    /// Returns the value for `key` and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<&V> {
        let idx = *self.index.get(key)?;
        self.promote(idx);
        Some(&self.nodes[idx].value)
    }

    // == Peek ==
    /// Returns the value for `key` without touching the access order.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.index.get(key).map(|&idx| &self.nodes[idx].value)
    }

    // == Contains ==
    pub fn contains(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    // == Add ==
    /// Inserts or overwrites `key`, marking it most recently used.
    ///
    /// A new key arriving at capacity evicts the least recently used entry
    /// first. Returns `true` if an eviction happened.
    pub fn add(&mut self, key: K, value: V) -> bool {
        if let Some(&idx) = self.index.get(&key) {
            self.nodes[idx].value = value;
            self.promote(idx);
            return false;
        }

        let evicted = self.nodes.len() >= self.capacity && self.pop_oldest().is_some();

        let idx = self.nodes.len();
        self.nodes.push(Node {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        });
        self.index.insert(key, idx);
        self.push_front(idx);

        evicted
    }

    // == Remove ==
    /// Removes `key`, returning whether it was present.
    pub fn remove(&mut self, key: &K) -> bool {
        self.remove_entry(key).is_some()
    }

    /// Removes `key` and returns its value.
    pub fn remove_entry(&mut self, key: &K) -> Option<V> {
        let idx = self.index.remove(key)?;
        Some(self.detach(idx).1)
    }

    // == Oldest ==
    /// Returns the least recently used entry without removing it.
    pub fn peek_oldest(&self) -> Option<(&K, &V)> {
        self.nodes.get(self.tail).map(|n| (&n.key, &n.value))
    }

    /// Removes and returns the least recently used entry.
    pub fn pop_oldest(&mut self) -> Option<(K, V)> {
        if self.tail == NIL {
            return None;
        }
        let idx = self.tail;
        self.index.remove(&self.nodes[idx].key);
        Some(self.detach(idx))
    }

    // == Clear ==
    /// Drops every entry. Capacity is unchanged.
    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    // == Length ==
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys from most to least recently used.
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        iter::successors(self.nodes.get(self.head), move |n| self.nodes.get(n.next))
            .map(|n| &n.key)
    }

    // == Linking ==
    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
        if prev != NIL {
            self.nodes[prev].next = next;
        } else {
            self.head = next;
        }
        if next != NIL {
            self.nodes[next].prev = prev;
        } else {
            self.tail = prev;
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.nodes[idx].prev = NIL;
        self.nodes[idx].next = self.head;
        if self.head != NIL {
            self.nodes[self.head].prev = idx;
        } else {
            self.tail = idx;
        }
        self.head = idx;
    }

    fn promote(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    /// Unlinks the node at `idx` and frees its slot. The caller has already
    /// dropped it from the index.
    fn detach(&mut self, idx: usize) -> (K, V) {
        self.unlink(idx);
        let node = self.nodes.swap_remove(idx);

        // The former last node now lives at `idx`; repoint its neighbours.
        if idx < self.nodes.len() {
            let (prev, next) = (self.nodes[idx].prev, self.nodes[idx].next);
            if prev != NIL {
                self.nodes[prev].next = idx;
            } else {
                self.head = idx;
            }
            if next != NIL {
                self.nodes[next].prev = idx;
            } else {
                self.tail = idx;
            }
            if let Some(slot) = self.index.get_mut(&self.nodes[idx].key) {
                *slot = idx;
            }
        }

        (node.key, node.value)
    }
}
