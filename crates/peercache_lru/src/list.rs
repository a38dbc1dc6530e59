// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Recency list for LRU eviction.
//!
//! Nodes live in a slab and link to each other by slot index, so promoting an entry never
//! moves it in memory. Vacated slots are chained into a free list and reused by later inserts.
//! The head of the list is the least recently used entry, the tail the most recently used.

/// Index of a node slot within the slab.
pub(crate) type NodeIndex = usize;

#[derive(Debug)]
struct Node<V> {
    key: String,
    value: V,
    prev: Option<NodeIndex>,
    next: Option<NodeIndex>,
}

#[derive(Debug)]
enum Slot<V> {
    Occupied(Node<V>),
    /// Free slot, holding the next free slot in the chain.
    Vacant(Option<NodeIndex>),
}

#[derive(Debug)]
pub(crate) struct RecencyList<V> {
    slots: Vec<Slot<V>>,
    free_head: Option<NodeIndex>,
    head: Option<NodeIndex>,
    tail: Option<NodeIndex>,
    len: usize,
}

impl<V> RecencyList<V> {
    pub(crate) const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_head: None,
            head: None,
            tail: None,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    /// Returns the least recently used node.
    pub(crate) const fn front(&self) -> Option<NodeIndex> {
        self.head
    }

    /// Appends a node at the most recently used end.
    pub(crate) fn push_back(&mut self, key: String, value: V) -> NodeIndex {
        let node = Node {
            key,
            value,
            prev: self.tail,
            next: None,
        };

        let idx = match self.free_head {
            Some(idx) => {
                let Slot::Vacant(next_free) = &self.slots[idx] else {
                    unreachable!("free list points at an occupied slot");
                };
                self.free_head = *next_free;
                self.slots[idx] = Slot::Occupied(node);
                idx
            }
            None => {
                self.slots.push(Slot::Occupied(node));
                self.slots.len() - 1
            }
        };

        match self.tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.len += 1;
        idx
    }

    /// Moves a node to the most recently used end.
    pub(crate) fn move_to_back(&mut self, idx: NodeIndex) {
        if self.tail == Some(idx) {
            return;
        }

        self.unlink(idx);

        let tail = self.tail;
        self.node_mut(idx).prev = tail;
        match tail {
            Some(tail) => self.node_mut(tail).next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Unlinks a node and returns its slot to the free list.
    pub(crate) fn remove(&mut self, idx: NodeIndex) -> (String, V) {
        self.unlink(idx);

        let slot = std::mem::replace(&mut self.slots[idx], Slot::Vacant(self.free_head));
        self.free_head = Some(idx);
        self.len -= 1;

        match slot {
            Slot::Occupied(node) => (node.key, node.value),
            Slot::Vacant(_) => unreachable!("removed a vacant slot"),
        }
    }

    pub(crate) fn key(&self, idx: NodeIndex) -> &str {
        &self.node(idx).key
    }

    pub(crate) fn value(&self, idx: NodeIndex) -> &V {
        &self.node(idx).value
    }

    pub(crate) fn value_mut(&mut self, idx: NodeIndex) -> &mut V {
        &mut self.node_mut(idx).value
    }

    /// Iterates from least to most recently used.
    pub(crate) fn iter(&self) -> Iter<'_, V> {
        Iter {
            list: self,
            cursor: self.head,
        }
    }

    fn unlink(&mut self, idx: NodeIndex) {
        let (prev, next) = {
            let node = self.node(idx);
            (node.prev, node.next)
        };

        match prev {
            Some(prev) => self.node_mut(prev).next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.node_mut(next).prev = prev,
            None => self.tail = prev,
        }

        let node = self.node_mut(idx);
        node.prev = None;
        node.next = None;
    }

    fn node(&self, idx: NodeIndex) -> &Node<V> {
        match &self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("linked index {idx} refers to a vacant slot"),
        }
    }

    fn node_mut(&mut self, idx: NodeIndex) -> &mut Node<V> {
        match &mut self.slots[idx] {
            Slot::Occupied(node) => node,
            Slot::Vacant(_) => unreachable!("linked index {idx} refers to a vacant slot"),
        }
    }
}

/// Iterator over `(key, value)` pairs in eviction order.
#[derive(Debug)]
pub(crate) struct Iter<'a, V> {
    list: &'a RecencyList<V>,
    cursor: Option<NodeIndex>,
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = (&'a str, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.cursor?;
        let node = self.list.node(idx);
        self.cursor = node.next;
        Some((node.key.as_str(), &node.value))
    }
}
