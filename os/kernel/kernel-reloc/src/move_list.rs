//! A list of pending or emitted relocations, addressed through slot references.
//!
//! The planner prunes and splits this list while scanning it, keeping two
//! live cursors at once (one over the entry currently being placed, one
//! over the entry being searched for an eviction candidate). The original
//! C implementation does this with "parent pointers" — pointers to the
//! `next` field (or list head) through which a node is currently reachable
//! — so that `delete`/`split` can operate in O(1) without a back-pointer.
//!
//! Safe Rust has no address-of-a-pointer, so this crate models the same
//! idiom with an index arena: [`Slot`] names either the list's own head
//! link or a specific node's `next` link, and [`MoveList`] resolves a
//! `Slot` to the arena index it currently points at on every call. This
//! keeps both cursors valid and independent even as nodes are deleted or
//! split out from under one of them.

use crate::addr::Addr;
use alloc::vec::Vec;

/// A pending or emitted relocation: copy `len` bytes from `src` to `dst`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MoveEntry {
    pub dst: Addr,
    pub src: Addr,
    pub len: u64,
}

impl MoveEntry {
    #[inline]
    #[must_use]
    pub const fn new(dst: Addr, src: Addr, len: u64) -> Self {
        Self { dst, src, len }
    }
}

#[derive(Debug, Copy, Clone)]
struct Node {
    entry: MoveEntry,
    next: Option<usize>,
}

/// A handle naming the link through which a node is currently reachable:
/// either the list's head pointer, or a specific node's `next` field.
///
/// Resolving a `Slot` to "the node it currently names" is always done
/// freshly against the live list (see [`MoveList::node_at`]), so a `Slot`
/// captured before a `delete` or `split_at` call keeps naming the same
/// *link*, even though the node reachable through that link has changed.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Slot {
    /// The list's own head pointer.
    Head,
    /// The `next` field of the node at this arena index.
    After(usize),
}

/// A singly linked list of [`MoveEntry`] values, implemented as an index
/// arena so that [`Slot`] can stand in for a pointer-to-pointer.
#[derive(Debug, Default)]
pub struct MoveList {
    nodes: Vec<Option<Node>>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl MoveList {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            head: None,
            tail: None,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Append an entry at the end of the list.
    pub fn push_back(&mut self, entry: MoveEntry) {
        let idx = self.alloc_node(entry, None);
        match self.tail {
            Some(t) => self.nodes[t].as_mut().unwrap().next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }

    /// Deep-copy this list, preserving order.
    #[must_use]
    pub fn dup_all(&self) -> Self {
        let mut out = Self::new();
        for entry in self.iter() {
            out.push_back(entry);
        }
        out
    }

    /// Collect the list into a plain `Vec`, in order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<MoveEntry> {
        self.iter().collect()
    }

    /// Ordered traversal from head to tail.
    #[must_use]
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            list: self,
            next: self.head,
        }
    }

    /// The entry currently reachable through `slot`, if any.
    #[must_use]
    pub fn entry(&self, slot: Slot) -> Option<MoveEntry> {
        self.node_at(slot).map(|idx| self.node(idx).entry)
    }

    /// The slot naming the link just past `slot`'s current node — i.e. a
    /// cursor advance that does not mutate the list.
    #[must_use]
    pub fn after(&self, slot: Slot) -> Option<Slot> {
        self.node_at(slot).map(Slot::After)
    }

    /// Unlink and drop the node at `slot`. The returned `Slot` still
    /// names the same link, which now reaches whatever the deleted node's
    /// successor was — so a traversal cursor can keep iterating from the
    /// same variable.
    pub fn delete(&mut self, slot: Slot) -> Slot {
        let idx = self
            .node_at(slot)
            .expect("delete requires a live node at slot");
        let next = self.node(idx).next;
        match slot {
            Slot::Head => self.head = next,
            Slot::After(p) => self.nodes[p].as_mut().unwrap().next = next,
        }
        if self.tail == Some(idx) {
            self.tail = match slot {
                Slot::Head => None,
                Slot::After(p) => Some(p),
            };
        }
        self.nodes[idx] = None;
        slot
    }

    /// Overwrite the entry's `src` in place (used when an eviction target
    /// relocates a surviving entry's source bytes).
    pub fn set_src(&mut self, slot: Slot, new_src: Addr) {
        let idx = self
            .node_at(slot)
            .expect("set_src requires a live node at slot");
        self.nodes[idx].as_mut().unwrap().entry.src = new_src;
    }

    /// Given that `[start, start + len)` lies entirely within the entry
    /// named by `slot`, split it into up to three consecutive entries
    /// (prefix, middle, suffix), each inheriting the original `dst - src`
    /// delta. Returns the slot naming the middle entry.
    pub fn split_at(&mut self, slot: Slot, start: Addr, len: u64) -> Slot {
        let idx = self
            .node_at(slot)
            .expect("split_at requires a live node at slot");
        let original = self.node(idx).entry;
        debug_assert!(start.as_u64() >= original.src.as_u64());
        debug_assert!(start.as_u64() < original.src.as_u64() + original.len);

        let mut cur_slot = slot;
        let mut cur_idx = idx;

        // Split off the prefix, if `start` is strictly inside the entry.
        if start.as_u64() > original.src.as_u64() {
            let prefix_len = start.as_u64() - original.src.as_u64();
            let suffix = MoveEntry::new(
                Addr::new(original.dst.as_u64() + prefix_len),
                start,
                original.len - prefix_len,
            );
            let old_next = self.node(cur_idx).next;
            let suffix_idx = self.alloc_node(suffix, old_next);
            if self.tail == Some(cur_idx) {
                self.tail = Some(suffix_idx);
            }
            let node = self.nodes[cur_idx].as_mut().unwrap();
            node.entry.len = prefix_len;
            node.next = Some(suffix_idx);

            cur_slot = Slot::After(cur_idx);
            cur_idx = suffix_idx;
        }

        // Split off the suffix, if the (possibly already-shrunk) entry is longer than `len`.
        let cur_entry = self.node(cur_idx).entry;
        if cur_entry.len > len {
            let tail_len = cur_entry.len - len;
            let tail = MoveEntry::new(
                Addr::new(cur_entry.dst.as_u64() + len),
                Addr::new(cur_entry.src.as_u64() + len),
                tail_len,
            );
            let old_next = self.node(cur_idx).next;
            let tail_idx = self.alloc_node(tail, old_next);
            if self.tail == Some(cur_idx) {
                self.tail = Some(tail_idx);
            }
            let node = self.nodes[cur_idx].as_mut().unwrap();
            node.entry.len = len;
            node.next = Some(tail_idx);
        }

        cur_slot
    }

    fn alloc_node(&mut self, entry: MoveEntry, next: Option<usize>) -> usize {
        self.nodes.push(Some(Node { entry, next }));
        self.nodes.len() - 1
    }

    fn node(&self, idx: usize) -> &Node {
        self.nodes[idx]
            .as_ref()
            .expect("arena index must name a live node")
    }

    fn node_at(&self, slot: Slot) -> Option<usize> {
        match slot {
            Slot::Head => self.head,
            Slot::After(p) => self.nodes[p].as_ref().and_then(|n| n.next),
        }
    }
}

/// Ordered, read-only traversal of a [`MoveList`].
pub struct Iter<'a> {
    list: &'a MoveList,
    next: Option<usize>,
}

impl Iterator for Iter<'_> {
    type Item = MoveEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let idx = self.next?;
        let node = self.list.node(idx);
        self.next = node.next;
        Some(node.entry)
    }
}
