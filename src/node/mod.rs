//! Compressed trie node and the recursive algorithms that restructure it.
//!
//! A node owns a compressed byte run (`segment`). The byte that follows the
//! segment selects a child and is *not* stored in the child's own segment:
//! the full key of an entry ending at a node is
//!
//! ```text
//! parent path ++ segment
//! ```
//!
//! where the parent path of a child is `parent path ++ parent segment ++ idx`.
//!
//! Structural rules kept by every mutation:
//! - a terminal node has `count >= 1`, a non-terminal node has `count == 0`
//! - a non-terminal node never has zero children, except a fresh root
//! - after a delete, a non-terminal node never has exactly one child

mod debug;

use std::collections::BTreeMap;
use std::num::NonZeroU64;

use smallvec::SmallVec;

use crate::encoding::common_prefix_len;
use crate::Member;

/// Inline capacity of a segment before it spills to the heap.
const INLINE_SEGMENT: usize = 16;

type Segment = SmallVec<[u8; INLINE_SEGMENT]>;

/// A node of the compressed trie.
///
/// Handles to nodes are handed out by [`RadixTrie::add`](crate::RadixTrie::add)
/// and [`RadixTrie::get_entry_mut`](crate::RadixTrie::get_entry_mut) so that
/// loaders can overwrite occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Node {
    segment: Segment,
    terminal: bool,
    count: u64,
    children: BTreeMap<u8, Node>,
}

/// Result of a prefix walk: the node whose subtree holds every key starting
/// with the prefix, plus the path bytes leading up to that node's segment.
pub(crate) struct PrefixMatch<'a> {
    pub(crate) node: &'a Node,
    pub(crate) base: Vec<u8>,
}

impl Node {
    /// The compressed byte run owned by this node.
    #[inline]
    pub fn segment(&self) -> &[u8] {
        &self.segment
    }

    /// Whether an inserted entry ends at this node.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.terminal
    }

    /// Occurrence count of the entry ending here (0 for non-terminal nodes).
    #[inline]
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Number of children hanging below this node.
    #[inline]
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// Child selected by `idx`, the first byte after this node's segment.
    #[inline]
    pub fn child(&self, idx: u8) -> Option<&Node> {
        self.children.get(&idx)
    }

    /// Overwrite the occurrence count of the entry ending at this node.
    ///
    /// Used by loaders that already know the cumulative count of an entry.
    pub fn set_count(&mut self, count: NonZeroU64) {
        debug_assert!(self.terminal, "set_count on a non-terminal node");
        self.count = count.get();
    }

    /// Add `n` occurrences to the entry ending at this node (saturating).
    pub fn add_count(&mut self, n: u64) {
        debug_assert!(self.terminal, "add_count on a non-terminal node");
        self.count = self.count.saturating_add(n);
    }

    /// A node that has never held anything: the state of a new root.
    #[inline]
    pub(crate) fn is_fresh(&self) -> bool {
        self.segment.is_empty() && !self.terminal && self.children.is_empty()
    }

    /// No entry ends here and nothing hangs below; the parent drops it.
    #[inline]
    fn is_vacant(&self) -> bool {
        !self.terminal && self.children.is_empty()
    }

    fn mark_terminal(&mut self) {
        self.terminal = true;
        self.count = self.count.saturating_add(1);
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Weave `key` into the subtree and return the node the entry ends at.
    pub(crate) fn insert(&mut self, mut key: &[u8]) -> &mut Node {
        let mut node = self;
        loop {
            if node.is_fresh() {
                node.segment = Segment::from_slice(key);
                node.mark_terminal();
                return node;
            }

            let shared = common_prefix_len(&node.segment, key);
            if shared < node.segment.len() {
                node.split_at(shared);
            }

            match key.get(shared) {
                Some(&idx) => {
                    node = node.children.entry(idx).or_default();
                    key = &key[shared + 1..];
                }
                None => {
                    node.mark_terminal();
                    return node;
                }
            }
        }
    }

    /// Push everything after `segment[..at]` down into a new child.
    ///
    /// The child takes over the tail of the segment (minus its index byte),
    /// the terminal flag, the count and all children; this node keeps only
    /// the shared head and becomes a plain branch point.
    fn split_at(&mut self, at: usize) {
        let idx = self.segment[at];
        let tail = Segment::from_slice(&self.segment[at + 1..]);
        self.segment.truncate(at);

        let terminal = std::mem::take(&mut self.terminal);
        let count = std::mem::take(&mut self.count);
        let child = Node {
            segment: tail,
            terminal,
            count: if terminal { count.max(1) } else { 0 },
            children: std::mem::take(&mut self.children),
        };
        self.children.insert(idx, child);
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Terminal node for exactly `key`, if the entry is live.
    pub(crate) fn find(&self, mut key: &[u8]) -> Option<&Node> {
        let mut node = self;
        loop {
            key = key.strip_prefix(node.segment.as_slice())?;
            match key.split_first() {
                None => return node.terminal.then_some(node),
                Some((idx, rest)) => {
                    node = node.children.get(idx)?;
                    key = rest;
                }
            }
        }
    }

    /// Mutable variant of [`Node::find`].
    pub(crate) fn find_mut(&mut self, mut key: &[u8]) -> Option<&mut Node> {
        let mut node = self;
        loop {
            key = key.strip_prefix(node.segment.as_slice())?;
            match key.split_first() {
                None => return node.terminal.then_some(node),
                Some((idx, rest)) => {
                    node = node.children.get_mut(idx)?;
                    key = rest;
                }
            }
        }
    }

    /// Child indices leading from this node to the live entry `key`.
    fn entry_path(&self, mut key: &[u8]) -> Option<Vec<u8>> {
        let mut path = Vec::new();
        let mut node = self;
        loop {
            key = key.strip_prefix(node.segment.as_slice())?;
            match key.split_first() {
                None => return node.terminal.then_some(path),
                Some((&idx, rest)) => {
                    node = node.children.get(&idx)?;
                    path.push(idx);
                    key = rest;
                }
            }
        }
    }

    /// Locate the subtree holding every key that starts with `prefix`.
    ///
    /// A prefix ending in the middle of a segment matches that segment's node;
    /// the prefix itself need not be an entry.
    pub(crate) fn find_prefix(&self, prefix: &[u8]) -> Option<PrefixMatch<'_>> {
        let mut node = self;
        let mut base = Vec::with_capacity(prefix.len());
        let mut rest = prefix;
        loop {
            let seg = node.segment.as_slice();
            if rest.len() <= seg.len() {
                if !seg.starts_with(rest) {
                    return None;
                }
                return Some(PrefixMatch { node, base });
            }

            let (head, tail) = rest.split_at(seg.len());
            if head != seg {
                return None;
            }
            let idx = tail[0];
            let child = node.children.get(&idx)?;
            base.extend_from_slice(seg);
            base.push(idx);
            node = child;
            rest = &tail[1..];
        }
    }

    /// Sum of the counts of every entry in this subtree, this node included.
    pub fn aggregate_count(&self) -> u64 {
        let mut total = 0u64;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.terminal {
                total = total.saturating_add(node.count);
            }
            stack.extend(node.children.values());
        }
        total
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Remove one occurrence of `key`.
    ///
    /// Returns the remaining count of the entry, or `None` if `key` was not a
    /// live entry. A node left without entry or children is dropped by its
    /// parent; a branch point left with a single child absorbs it.
    ///
    /// Only the entry node and its parent change shape.
    pub(crate) fn delete(&mut self, key: &[u8]) -> Option<u64> {
        let path = self.entry_path(key)?;
        let Some((&last, upper)) = path.split_last() else {
            let remaining = self.release();
            self.compact();
            return Some(remaining);
        };

        let mut parent = self;
        for idx in upper {
            parent = parent.children.get_mut(idx)?;
        }
        let entry = parent.children.get_mut(&last)?;
        let remaining = entry.release();
        if remaining == 0 {
            if entry.is_vacant() {
                parent.children.remove(&last);
                parent.compact();
            } else {
                entry.compact();
            }
        }
        Some(remaining)
    }

    /// Drop one occurrence of the entry ending here and return what is left.
    fn release(&mut self) -> u64 {
        debug_assert!(self.terminal && self.count > 0);
        self.count -= 1;
        if self.count == 0 {
            self.terminal = false;
        }
        self.count
    }

    /// Restore the structural rules after this node lost its entry or a child.
    fn compact(&mut self) {
        if self.terminal {
            return;
        }
        if self.children.is_empty() {
            // Only reachable at the root; anything else is dropped by its parent.
            self.segment.clear();
            return;
        }
        while !self.terminal && self.children.len() == 1 {
            let Some((idx, child)) = self.children.pop_first() else {
                break;
            };
            self.absorb(idx, child);
        }
    }

    /// Merge the sole child (reached through `idx`) into this node.
    fn absorb(&mut self, idx: u8, mut child: Node) {
        self.segment.push(idx);
        self.segment.extend_from_slice(&child.segment);
        self.terminal = child.terminal;
        self.count = child.count;
        self.children = std::mem::take(&mut child.children);
    }

    // =========================================================================
    // Enumeration
    // =========================================================================

    /// Append every entry of this subtree to `out` in byte order.
    ///
    /// `path` holds the key bytes leading up to this node's segment and is
    /// restored before returning.
    pub(crate) fn collect_members(&self, path: &mut Vec<u8>, out: &mut Vec<Member>) {
        let base = path.len();
        // (node, path length above it, index byte that selected it)
        let mut stack: Vec<(&Node, usize, Option<u8>)> = vec![(self, base, None)];
        while let Some((node, len, idx)) = stack.pop() {
            path.truncate(len);
            path.extend(idx);
            path.extend_from_slice(&node.segment);
            if node.terminal {
                out.push(Member {
                    key: path.clone(),
                    count: node.count,
                });
            }
            let here = path.len();
            for (&child_idx, child) in node.children.iter().rev() {
                stack.push((child, here, Some(child_idx)));
            }
        }
        path.truncate(base);
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if self.children.values().all(|c| c.children.is_empty()) {
            return;
        }
        // Unlink level by level; the derived drop recurses once per level.
        let mut stack: Vec<Node> = std::mem::take(&mut self.children).into_values().collect();
        while let Some(mut node) = stack.pop() {
            stack.extend(std::mem::take(&mut node.children).into_values());
        }
    }
}
