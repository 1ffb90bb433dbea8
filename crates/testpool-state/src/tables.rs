//! redb table definitions for the record store.

use redb::TableDefinition;

/// Records keyed by id. Iteration order is ascending id, which doubles as
/// the allocator's stable selection order.
pub const RECORDS: TableDefinition<u64, &[u8]> = TableDefinition::new("records");

/// Unique index: `document_number` → record id.
pub const DOC_INDEX: TableDefinition<&str, u64> = TableDefinition::new("doc_index");

/// Store-level counters (currently only `next_record_id`).
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");
