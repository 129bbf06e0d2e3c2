//! # termtrie
//!
//! A compressed prefix trie (radix tree) over byte strings with occurrence
//! counting, built as the indexing core of a word/term index.
//!
//! ## Features
//!
//! - **Counted entries**: inserting a key again bumps its count, deleting
//!   decrements it and only removes the entry when the count reaches zero
//! - **Prefix queries**: existence and aggregated counts for any prefix,
//!   including prefixes ending in the middle of a compressed segment
//! - **Compaction**: deletes unwind splits, so a trie emptied by deletes is
//!   identical to a fresh one
//! - **Persistence**: entries and counts round-trip through a compact
//!   front-coded dump format
//!
//! Matching is byte-exact: no case folding or normalization, and multi-byte
//! characters may be split across nodes.
//!
//! ## Example
//!
//! ```rust
//! use termtrie::Trie;
//!
//! let trie = Trie::new();
//! for word in ["food", "foodie", "foods", "foodchain", "foodcrave"] {
//!     trie.add(word);
//! }
//! trie.add("foods");
//!
//! assert!(!trie.has("foo"));
//! assert_eq!(trie.has_count("foods"), (true, 2));
//! assert_eq!(trie.has_prefix_count("foo"), (true, 6));
//! assert_eq!(trie.prefix_members("foodc").len(), 2);
//!
//! assert!(trie.delete("foods"));
//! assert_eq!(trie.has_count("foods"), (true, 1));
//! ```
//!
//! ## Concurrency
//!
//! [`Trie`] guards the whole structure with one reader/writer lock: `add` and
//! `delete` take it exclusively, every query takes it shared, each for the
//! full duration of the call. [`RadixTrie`] is the unsynchronized core for
//! single-threaded use.

#![deny(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod encoding;
pub mod error;
mod node;
pub mod persist;
mod radix;

pub use error::{DecodeError, PersistError, Result};
pub use node::Node;
pub use persist::{FsStorage, Storage};
pub use radix::RadixTrie;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// An entry together with its occurrence count.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Member {
    /// The full key.
    pub key: Vec<u8>,
    /// How often the key is currently stored.
    pub count: u64,
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", String::from_utf8_lossy(&self.key), self.count)
    }
}

/// Configuration for a [`Trie`].
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Minimum number of mutations since the last save before
    /// [`Trie::save_if_due`] writes a dump. 0 saves every time.
    pub persist_threshold_ops: u64,
}

/// A thread-safe counted trie.
///
/// All operations are synchronous and run to completion on the calling
/// thread.
pub struct Trie {
    inner: RwLock<RadixTrie>,
    /// Mutations since the last successful save.
    ops: AtomicU64,
    config: Config,
}

impl Trie {
    /// Create a new empty trie with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new empty trie with the given configuration.
    pub fn with_config(config: Config) -> Self {
        Self::from_parts(RadixTrie::new(), config)
    }

    pub(crate) fn from_parts(inner: RadixTrie, config: Config) -> Self {
        Self {
            inner: RwLock::new(inner),
            ops: AtomicU64::new(0),
            config,
        }
    }

    /// The configuration this trie was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Insert one occurrence of `key`. Returns the entry's new count.
    ///
    /// Use [`Trie::add_entry`] to get a handle on the entry's node instead.
    pub fn add(&self, key: impl AsRef<[u8]>) -> u64 {
        let mut inner = self.inner.write();
        let count = inner.add(key).count();
        self.ops.fetch_add(1, Ordering::Relaxed);
        count
    }

    /// Insert one occurrence of `key` and return a handle on the node the
    /// entry ends at, e.g. to overwrite its count with [`Node::set_count`].
    ///
    /// The exclusive lock is held until the handle is dropped.
    pub fn add_entry(&self, key: impl AsRef<[u8]>) -> MappedRwLockWriteGuard<'_, Node> {
        let inner = self.inner.write();
        self.ops.fetch_add(1, Ordering::Relaxed);
        RwLockWriteGuard::map(inner, |trie| trie.add(key))
    }

    /// Remove one occurrence of `key`.
    ///
    /// Returns true if `key` was a live entry before the call. Deleting the
    /// empty key is a no-op returning false. Only successful deletes count
    /// toward [`pending_ops`](Trie::pending_ops).
    pub fn delete(&self, key: impl AsRef<[u8]>) -> bool {
        let key = key.as_ref();
        if key.is_empty() {
            return false;
        }
        let mut inner = self.inner.write();
        let deleted = inner.delete(key);
        if deleted {
            self.ops.fetch_add(1, Ordering::Relaxed);
        }
        deleted
    }

    /// Whether `key` is a live entry.
    pub fn has(&self, key: impl AsRef<[u8]>) -> bool {
        self.inner.read().has(key)
    }

    /// Whether `key` is a live entry, and its occurrence count.
    pub fn has_count(&self, key: impl AsRef<[u8]>) -> (bool, u64) {
        self.inner.read().has_count(key)
    }

    /// Whether any entry starts with `prefix`.
    pub fn has_prefix(&self, prefix: impl AsRef<[u8]>) -> bool {
        self.inner.read().has_prefix(prefix)
    }

    /// Whether any entry starts with `prefix`, and the summed count of all
    /// such entries.
    pub fn has_prefix_count(&self, prefix: impl AsRef<[u8]>) -> (bool, u64) {
        self.inner.read().has_prefix_count(prefix)
    }

    /// All entries with their counts, in byte order.
    pub fn members(&self) -> Vec<Member> {
        self.inner.read().members()
    }

    /// All entries starting with `prefix`, in byte order.
    pub fn prefix_members(&self, prefix: impl AsRef<[u8]>) -> Vec<Member> {
        self.inner.read().prefix_members(prefix)
    }

    /// Keys of all entries, in byte order.
    pub fn members_list(&self) -> Vec<Vec<u8>> {
        self.inner.read().members_list()
    }

    /// Keys of all entries starting with `prefix`, in byte order.
    pub fn prefix_members_list(&self, prefix: impl AsRef<[u8]>) -> Vec<Vec<u8>> {
        self.inner.read().prefix_members_list(prefix)
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Check if the trie is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Sum of the occurrence counts of all entries.
    pub fn total_count(&self) -> u64 {
        self.inner.read().total_count()
    }

    /// Indented human-readable tree, for debugging.
    pub fn dump(&self) -> String {
        self.inner.read().dump()
    }

    /// Mutations since the last successful save.
    pub fn pending_ops(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    /// Hold the shared lock for a batch of queries.
    pub fn read(&self) -> RwLockReadGuard<'_, RadixTrie> {
        self.inner.read()
    }

    /// Hold the exclusive lock for a batch of mutations.
    ///
    /// Mutations made through the guard are not added to
    /// [`pending_ops`](Trie::pending_ops).
    pub fn write(&self) -> RwLockWriteGuard<'_, RadixTrie> {
        self.inner.write()
    }

    /// Unwrap the single-threaded core.
    pub fn into_inner(self) -> RadixTrie {
        self.inner.into_inner()
    }

    pub(crate) fn note_ops(&self, n: u64) {
        self.ops.fetch_add(n, Ordering::Relaxed);
    }

    pub(crate) fn clear_ops(&self, n: u64) {
        // Mutations that raced the save stay pending.
        let _ = self
            .ops
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |ops| {
                Some(ops.saturating_sub(n))
            });
    }
}

impl Default for Trie {
    fn default() -> Self {
        Self::new()
    }
}

impl From<RadixTrie> for Trie {
    fn from(inner: RadixTrie) -> Self {
        Self::from_parts(inner, Config::default())
    }
}

impl fmt::Debug for Trie {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("Trie")
            .field("len", &inner.len())
            .field("pending_ops", &self.pending_ops())
            .field("config", &self.config)
            .finish()
    }
}



#[cfg(test)]
mod proptests;
