//! Physical key layout for namespaces.
//!
//! Two disjoint families share the flat keyspace:
//!
//! | Family | Layout |
//! |---|---|
//! | meta | `meta/{name}` |
//! | data | `data/{name}/{key}` |
//!
//! Names may not contain the `/` separator (see [`validate_name`]), so
//! `data/{name}/` is a prefix of no other namespace's data prefix and every
//! range below is closed by the successor of its prefix. This layout is the
//! only persisted contract and must not change.

use crate::error::{NamespaceError, NamespaceResult};

/// Prefix shared by every meta key.
pub const META_PREFIX: &[u8] = b"meta/";

/// Prefix shared by every data key.
pub const DATA_PREFIX: &[u8] = b"data/";

/// Separates the namespace name from the user key inside a data key.
pub const SEPARATOR: u8 = b'/';

/// Longest accepted namespace name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// A half-open key range `[lower, upper)`. `upper = None` is unbounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    pub lower: Vec<u8>,
    pub upper: Option<Vec<u8>>,
}

impl KeyRange {
    /// Every key starting with `prefix`.
    pub fn prefix(prefix: Vec<u8>) -> Self {
        let upper = prefix_successor(&prefix);
        Self {
            lower: prefix,
            upper,
        }
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        key >= self.lower.as_slice() && self.upper.as_deref().is_none_or(|upper| key < upper)
    }
}

/// Meta key for `name`. `encode_meta("")` is the lower bound of the meta range.
pub fn encode_meta(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(META_PREFIX.len() + name.len());
    key.extend_from_slice(META_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Extract the namespace name from a meta key.
pub fn decode_meta(key: &[u8]) -> Option<&[u8]> {
    key.strip_prefix(META_PREFIX)
}

/// Prefix shared by every data key of `name`.
pub fn data_prefix(name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(DATA_PREFIX.len() + name.len() + 1);
    key.extend_from_slice(DATA_PREFIX);
    key.extend_from_slice(name.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Data key for `key` inside namespace `name`.
pub fn encode_data(name: &str, key: &str) -> Vec<u8> {
    let mut out = data_prefix(name);
    out.extend_from_slice(key.as_bytes());
    out
}

/// The range holding every meta key and nothing else.
pub fn meta_range() -> KeyRange {
    KeyRange::prefix(encode_meta(""))
}

/// The range holding every data key of `name` and nothing else.
pub fn data_range(name: &str) -> KeyRange {
    KeyRange::prefix(data_prefix(name))
}

/// Smallest byte string greater than every string starting with `prefix`.
///
/// Trailing `0xFF` bytes cannot be incremented and are dropped first. Returns
/// `None` when no such bound exists (empty or all-`0xFF` prefix).
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut upper = prefix.to_vec();
    while let Some(last) = upper.pop() {
        if last < u8::MAX {
            upper.push(last + 1);
            return Some(upper);
        }
    }
    None
}

/// Reject names that could alias another namespace's key range.
pub fn validate_name(name: &str) -> NamespaceResult<()> {
    let invalid = |reason| NamespaceError::InvalidName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid("name is longer than 255 bytes"));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
    {
        return Err(invalid("allowed characters are [A-Za-z0-9_.-]"));
    }
    Ok(())
}
