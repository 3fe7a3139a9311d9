//! On-disk key layouts for the evidence database.
//!
//! Two layouts coexist in deployed databases:
//!
//! - **v1 (legacy)**: a single prefix byte (`0x00` committed, `0x01`
//!   pending) followed by `"{HEIGHT:016X}/{HASH:hex}"`. Zero-padded
//!   big-endian hex keeps lexicographic order equal to numeric height order.
//! - **v2 (structured)**: a prefix byte (`9` committed, `10` pending), the
//!   height as fixed-width big-endian, then the raw 32-byte hash. Fixed-width
//!   big-endian integers are order-preserving under byte comparison, and the
//!   hash is fixed-length, so tuple order is preserved.
//!
//! Both sort pending entries oldest-first by height, which is what gives
//! [`crate::Pool::pending_evidence`] its FIFO iteration order.
//!
//! The layout in use is recorded under the `"version"` key. The record is
//! append-only: once a database says `v2`, it is never silently read as v1
//! again.

use tessera_storage::{Database, StorageError};
use tessera_types::Evidence;

/// Key under which the layout version marker is stored.
pub const VERSION_KEY: &[u8] = b"version";

const V1_PREFIX_COMMITTED: u8 = 0x00;
const V1_PREFIX_PENDING: u8 = 0x01;

// v2 prefixes are distinct small integers, disjoint from the v1 bytes.
const V2_PREFIX_COMMITTED: u8 = 9;
const V2_PREFIX_PENDING: u8 = 10;

/// An on-disk key layout for evidence entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyLayout {
    /// Legacy byte-prefix layout with hex-encoded suffix
    #[default]
    V1,
    /// Structured layout with binary height and hash
    V2,
}

impl KeyLayout {
    /// Parse a layout from its on-disk version marker.
    pub fn from_version(version: &[u8]) -> Option<Self> {
        match version {
            b"v1" => Some(KeyLayout::V1),
            b"v2" => Some(KeyLayout::V2),
            _ => None,
        }
    }

    /// The on-disk version marker for this layout.
    pub fn version(&self) -> &'static str {
        match self {
            KeyLayout::V1 => "v1",
            KeyLayout::V2 => "v2",
        }
    }

    /// Prefix under which pending evidence is stored.
    pub fn pending_prefix(&self) -> Vec<u8> {
        match self {
            KeyLayout::V1 => vec![V1_PREFIX_PENDING],
            KeyLayout::V2 => vec![V2_PREFIX_PENDING],
        }
    }

    /// Prefix under which committed evidence markers are stored.
    pub fn committed_prefix(&self) -> Vec<u8> {
        match self {
            KeyLayout::V1 => vec![V1_PREFIX_COMMITTED],
            KeyLayout::V2 => vec![V2_PREFIX_COMMITTED],
        }
    }

    /// Pending key for a piece of evidence.
    pub fn key_pending(&self, evidence: &Evidence) -> Vec<u8> {
        match self {
            KeyLayout::V1 => v1_key(V1_PREFIX_PENDING, evidence),
            KeyLayout::V2 => v2_key(V2_PREFIX_PENDING, evidence),
        }
    }

    /// Committed key for a piece of evidence.
    pub fn key_committed(&self, evidence: &Evidence) -> Vec<u8> {
        match self {
            KeyLayout::V1 => v1_key(V1_PREFIX_COMMITTED, evidence),
            KeyLayout::V2 => v2_key(V2_PREFIX_COMMITTED, evidence),
        }
    }
}

impl std::fmt::Display for KeyLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.version())
    }
}

fn v1_key(prefix: u8, evidence: &Evidence) -> Vec<u8> {
    let suffix = format!(
        "{:016X}/{}",
        evidence.height(),
        hex::encode_upper(evidence.hash())
    );
    let mut key = Vec::with_capacity(1 + suffix.len());
    key.push(prefix);
    key.extend_from_slice(suffix.as_bytes());
    key
}

fn v2_key(prefix: u8, evidence: &Evidence) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + 8 + 32);
    key.push(prefix);
    key.extend_from_slice(&evidence.height().to_be_bytes());
    key.extend_from_slice(&evidence.hash());
    key
}

/// Choose the key layout for a database and persist the choice.
///
/// The on-disk version record is the single source of truth: if present it
/// wins over the caller's request. A missing record on a non-empty database
/// means the data predates version records and is v1. Only on a fresh
/// database does the requested layout take effect (default v1). The chosen
/// version is written back with a durable sync so the choice survives any
/// later crash.
///
/// # Panics
///
/// Panics on an unrecognized version record; running with a misread layout
/// would corrupt the keyspace.
pub fn select_layout(
    db: &Database,
    requested: Option<KeyLayout>,
) -> Result<KeyLayout, StorageError> {
    let layout = match db.get(VERSION_KEY)? {
        Some(version) => match KeyLayout::from_version(&version) {
            Some(layout) => layout,
            None => panic!(
                "unknown evidence db key layout version: {:?}",
                String::from_utf8_lossy(&version)
            ),
        },
        None if !db.is_empty()? => KeyLayout::V1,
        None => requested.unwrap_or_default(),
    };

    db.put_sync(VERSION_KEY, layout.version().as_bytes())?;
    Ok(layout)
}
