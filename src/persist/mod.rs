//! Dumping entries to storage and loading them back.
//!
//! Only the set of `(entry, count)` pairs is persisted; the trie shape is
//! rebuilt on load.
//!
//! ## Format
//!
//! An empty stream is a valid dump with no entries. Otherwise:
//!
//! ```text
//! magic    b"TTRI"
//! version  u8 (= 1)
//! records  { varint shared, varint suffix_len, suffix bytes, varint count }*
//! ```
//!
//! Keys are front-coded against the previous record (`shared` bytes are
//! taken from it). Writers emit records in byte order so consecutive keys
//! share as much as possible; readers accept any order.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::num::NonZeroU64;
use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::encoding::{
    decode_bytes, decode_varint, encode_bytes, front_decode, front_encode, write_varint,
};
use crate::error::{DecodeError, PersistError, Result};
use crate::{Config, Member, RadixTrie, Trie};

/// First bytes of every non-empty dump.
pub const MAGIC: [u8; 4] = *b"TTRI";

/// Current format revision.
pub const FORMAT_VERSION: u8 = 1;

const HEADER_LEN: usize = MAGIC.len() + 1;

/// Storage collaborator the dumps are read from and written to.
pub trait Storage: Send + Sync {
    /// Open an existing dump for reading.
    fn open_for_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>>;

    /// Create (or truncate) a dump for writing.
    fn create_for_write<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>>;
}

/// [`Storage`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    fn open_for_read<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Read + 'a>> {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }

    fn create_for_write<'a>(&'a self, path: &Path) -> io::Result<Box<dyn Write + 'a>> {
        Ok(Box::new(BufWriter::new(File::create(path)?)))
    }
}

/// Serialize `members` (header included) into `out`.
pub fn encode_members(members: &[Member], out: &mut Vec<u8>) {
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    let mut prev: &[u8] = &[];
    for member in members {
        let (shared, suffix) = front_encode(prev, &member.key);
        write_varint(shared as u64, out);
        encode_bytes(suffix, out);
        write_varint(member.count, out);
        prev = &member.key;
    }
}

/// Parse a dump produced by [`encode_members`].
///
/// The whole buffer is validated; on error nothing is returned.
pub fn decode_members(buf: &[u8]) -> Result<Vec<Member>> {
    if buf.is_empty() {
        return Ok(Vec::new());
    }
    if buf.len() < HEADER_LEN && MAGIC.starts_with(buf) {
        return Err(PersistError::TruncatedHeader { len: buf.len() });
    }
    if buf.len() < HEADER_LEN || buf[..MAGIC.len()] != MAGIC {
        return Err(PersistError::BadMagic {
            found: buf[..buf.len().min(MAGIC.len())].to_vec(),
        });
    }
    let version = buf[MAGIC.len()];
    if version != FORMAT_VERSION {
        return Err(PersistError::UnsupportedVersion(version));
    }

    let mut members: Vec<Member> = Vec::new();
    let mut pos = HEADER_LEN;
    while pos < buf.len() {
        let prev = members.last().map(|m| m.key.as_slice());
        let (member, used) =
            decode_record(&buf[pos..], prev).map_err(|source| PersistError::Record {
                record: members.len(),
                offset: pos,
                source,
            })?;
        pos += used;
        members.push(member);
    }
    Ok(members)
}

fn decode_record(
    buf: &[u8],
    prev: Option<&[u8]>,
) -> std::result::Result<(Member, usize), DecodeError> {
    let (shared, mut used) = decode_varint(buf)?;
    let (suffix, n) = decode_bytes(&buf[used..])?;
    used += n;
    let (count, n) = decode_varint(&buf[used..])?;
    used += n;

    let shared = usize::try_from(shared).unwrap_or(usize::MAX);
    let key = front_decode(prev.unwrap_or_default(), shared, suffix)?;
    Ok((Member { key, count }, used))
}

fn read_dump(storage: &dyn Storage, path: &Path) -> Result<Vec<Member>> {
    let mut buf = Vec::new();
    storage
        .open_for_read(path)
        .and_then(|mut reader| reader.read_to_end(&mut buf))
        .map_err(|e| PersistError::io(path, e))?;
    if buf.is_empty() {
        debug!(path = %path.display(), "trie.load.empty_dump");
    }
    decode_members(&buf)
}

impl RadixTrie {
    /// Insert `key` with an absolute count, or add `count` to an existing
    /// entry when `additive` is set.
    fn apply_member(&mut self, member: &Member, additive: bool) -> bool {
        let Some(count) = NonZeroU64::new(member.count) else {
            warn!(
                key = %String::from_utf8_lossy(&member.key),
                "trie.load.skip_zero_count"
            );
            return false;
        };
        if additive {
            if let Some(node) = self.get_entry_mut(&member.key) {
                node.add_count(count.get());
                return true;
            }
        }
        self.add(&member.key).set_count(count);
        true
    }
}

impl Trie {
    /// Write all entries to `path` through `storage`.
    ///
    /// Returns the number of records written.
    pub fn save(&self, storage: &dyn Storage, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let start = Instant::now();
        let (members, ops) = {
            let inner = self.inner.read();
            (inner.members(), self.pending_ops())
        };

        let mut buf = Vec::new();
        encode_members(&members, &mut buf);
        storage
            .create_for_write(path)
            .and_then(|mut writer| {
                writer.write_all(&buf)?;
                writer.flush()
            })
            .map_err(|e| PersistError::io(path, e))?;

        self.clear_ops(ops);
        info!(
            path = %path.display(),
            records = members.len(),
            bytes = buf.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trie.save.completed"
        );
        Ok(members.len())
    }

    /// [`Trie::save`] to the local filesystem.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.save(&FsStorage, path)
    }

    /// Save only when at least `persist_threshold_ops` mutations happened
    /// since the last save. Returns `None` when the save was skipped.
    pub fn save_if_due(
        &self,
        storage: &dyn Storage,
        path: impl AsRef<Path>,
    ) -> Result<Option<usize>> {
        let pending = self.pending_ops();
        if pending < self.config.persist_threshold_ops {
            debug!(
                pending,
                threshold = self.config.persist_threshold_ops,
                "trie.save.not_due"
            );
            return Ok(None);
        }
        self.save(storage, path).map(Some)
    }

    /// Build a new trie from the dump at `path`, restoring absolute counts.
    pub fn load(storage: &dyn Storage, path: impl AsRef<Path>) -> Result<Trie> {
        Self::load_with_config(storage, path, Config::default())
    }

    /// [`Trie::load`] with an explicit configuration.
    pub fn load_with_config(
        storage: &dyn Storage,
        path: impl AsRef<Path>,
        config: Config,
    ) -> Result<Trie> {
        let path = path.as_ref();
        debug!(path = %path.display(), "trie.load.start");
        let members = read_dump(storage, path)?;

        let start = Instant::now();
        let mut inner = RadixTrie::new();
        for member in &members {
            inner.apply_member(member, false);
        }
        info!(
            path = %path.display(),
            records = members.len(),
            entries = inner.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trie.load.completed"
        );
        Ok(Trie::from_parts(inner, config))
    }

    /// [`Trie::load`] from the local filesystem.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Trie> {
        Self::load(&FsStorage, path)
    }

    /// Merge the dump at `path` into this trie: counts of existing entries
    /// are increased by the stored count, new entries take it as is.
    ///
    /// The dump is decoded completely before the trie is touched, so on
    /// error the trie is unchanged. Returns the number of records applied.
    pub fn merge(&self, storage: &dyn Storage, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        debug!(path = %path.display(), "trie.merge.start");
        let members = read_dump(storage, path)?;

        let start = Instant::now();
        let applied = {
            let mut inner = self.inner.write();
            let mut applied = 0usize;
            for member in &members {
                if inner.apply_member(member, true) {
                    applied += 1;
                }
            }
            self.note_ops(applied as u64);
            applied
        };
        info!(
            path = %path.display(),
            records = members.len(),
            applied,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "trie.merge.completed"
        );
        Ok(applied)
    }

    /// [`Trie::merge`] from the local filesystem.
    pub fn merge_file(&self, path: impl AsRef<Path>) -> Result<usize> {
        self.merge(&FsStorage, path)
    }
}
