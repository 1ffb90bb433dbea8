//! testpool-state — embedded record store for the test-data pool.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and in-memory
//! storage for pooled test-data records plus the exclusive-checkout
//! allocator and the process-wide settings store.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value column, keyed by a
//! monotonically assigned `u64` id so that table iteration yields a stable
//! insertion order. A secondary `doc_index` table enforces global uniqueness
//! of `document_number`.
//!
//! Checkout (scan for a matching AVAILABLE record, then reserve it) runs
//! inside a single redb write transaction. redb serializes write
//! transactions, so two concurrent checkouts can never reserve the same
//! record.
//!
//! The `RecordStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod settings;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use settings::{ColumnKind, CustomColumn, Settings, SettingsStore};
pub use store::RecordStore;
pub use types::*;
