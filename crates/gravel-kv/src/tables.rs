//! redb table definitions for the gravel store.

use redb::TableDefinition;

/// The flat ordered keyspace. Callers own the key layout; the store only
/// guarantees lexicographic byte ordering.
pub const ENTRIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("entries");
