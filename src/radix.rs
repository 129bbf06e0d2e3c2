//! Single-threaded trie owning the root node.
//!
//! [`RadixTrie`] is the `&mut self` core; [`Trie`](crate::Trie) wraps it in a
//! whole-trie lock for shared use.

use crate::node::Node;
use crate::Member;

/// Compressed byte trie with per-entry occurrence counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadixTrie {
    root: Node,
    /// Distinct live entries.
    entries: usize,
}

impl RadixTrie {
    /// Create an empty trie.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries
    }

    /// True when no entry is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Sum of the occurrence counts of all entries.
    pub fn total_count(&self) -> u64 {
        self.root.aggregate_count()
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Insert one occurrence of `key` and return the node the entry ends at.
    ///
    /// The handle lets loaders overwrite the count with
    /// [`Node::set_count`] instead of incrementing it.
    pub fn add(&mut self, key: impl AsRef<[u8]>) -> &mut Node {
        let node = self.root.insert(key.as_ref());
        if node.count() == 1 {
            self.entries += 1;
        }
        node
    }

    /// Remove one occurrence of `key`.
    ///
    /// Returns true if `key` was a live entry, whether or not this call
    /// removed it completely. Deleting the empty key is a no-op returning
    /// false.
    pub fn delete(&mut self, key: impl AsRef<[u8]>) -> bool {
        let key = key.as_ref();
        if key.is_empty() {
            return false;
        }
        match self.root.delete(key) {
            Some(0) => {
                self.entries -= 1;
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Terminal node of `key`, if it is a live entry.
    pub fn get_entry(&self, key: impl AsRef<[u8]>) -> Option<&Node> {
        self.root.find(key.as_ref())
    }

    /// Mutable terminal node of `key`, if it is a live entry.
    pub fn get_entry_mut(&mut self, key: impl AsRef<[u8]>) -> Option<&mut Node> {
        self.root.find_mut(key.as_ref())
    }

    /// Whether `key` is a live entry.
    pub fn has(&self, key: impl AsRef<[u8]>) -> bool {
        self.get_entry(key).is_some()
    }

    /// Whether `key` is a live entry, and its occurrence count.
    pub fn has_count(&self, key: impl AsRef<[u8]>) -> (bool, u64) {
        match self.get_entry(key) {
            Some(node) => (true, node.count()),
            None => (false, 0),
        }
    }

    /// Whether any entry starts with `prefix`.
    pub fn has_prefix(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.has_prefix_count(prefix).0
    }

    /// Whether any entry starts with `prefix`, and the summed occurrence count
    /// of all such entries.
    pub fn has_prefix_count(&self, prefix: impl AsRef<[u8]>) -> (bool, u64) {
        match self.root.find_prefix(prefix.as_ref()) {
            Some(m) => {
                let count = m.node.aggregate_count();
                (count > 0, count)
            }
            None => (false, 0),
        }
    }

    /// All entries with their counts, in byte order.
    pub fn members(&self) -> Vec<Member> {
        let mut out = Vec::with_capacity(self.entries);
        self.root.collect_members(&mut Vec::new(), &mut out);
        out
    }

    /// All entries starting with `prefix`, in byte order. Empty when nothing
    /// matches.
    pub fn prefix_members(&self, prefix: impl AsRef<[u8]>) -> Vec<Member> {
        let mut out = Vec::new();
        if let Some(mut m) = self.root.find_prefix(prefix.as_ref()) {
            m.node.collect_members(&mut m.base, &mut out);
        }
        out
    }

    /// Keys of all entries, in byte order.
    pub fn members_list(&self) -> Vec<Vec<u8>> {
        self.members().into_iter().map(|m| m.key).collect()
    }

    /// Keys of all entries starting with `prefix`, in byte order.
    pub fn prefix_members_list(&self, prefix: impl AsRef<[u8]>) -> Vec<Vec<u8>> {
        self.prefix_members(prefix)
            .into_iter()
            .map(|m| m.key)
            .collect()
    }

    /// Indented human-readable tree, for debugging.
    pub fn dump(&self) -> String {
        self.root.to_string()
    }

    /// Structural rule violations; empty for a healthy trie.
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) -> Vec<String> {
        let mut issues = self.root.check_invariants();
        let live = self.members().len();
        if live != self.entries {
            issues.push(format!(
                "entry counter says {} but {} entries are reachable",
                self.entries, live
            ));
        }
        issues
    }
}

impl<K: AsRef<[u8]>> FromIterator<K> for RadixTrie {
    fn from_iter<I: IntoIterator<Item = K>>(iter: I) -> Self {
        let mut trie = RadixTrie::new();
        trie.extend(iter);
        trie
    }
}

impl<K: AsRef<[u8]>> Extend<K> for RadixTrie {
    fn extend<I: IntoIterator<Item = K>>(&mut self, iter: I) {
        for key in iter {
            self.add(key);
        }
    }
}
