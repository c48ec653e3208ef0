//! Namespace lifecycle markers and listing records.

use serde::{Deserialize, Serialize};

/// Lifecycle marker stored in a namespace's meta entry.
///
/// The persisted bytes are the ASCII strings `EXISTS` and `DELETING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum NamespaceState {
    Exists,
    /// Tombstoned; waiting for the garbage collector.
    Deleting,
}

impl NamespaceState {
    const EXISTS: &'static [u8] = b"EXISTS";
    const DELETING: &'static [u8] = b"DELETING";

    /// The bytes written to the meta entry.
    pub const fn marker(self) -> &'static [u8] {
        match self {
            Self::Exists => Self::EXISTS,
            Self::Deleting => Self::DELETING,
        }
    }

    /// Parse a meta entry value. Unknown markers yield `None`.
    pub fn from_marker(value: &[u8]) -> Option<Self> {
        match value {
            Self::EXISTS => Some(Self::Exists),
            Self::DELETING => Some(Self::Deleting),
            _ => None,
        }
    }
}

/// One row of a namespace listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub state: NamespaceState,
}
