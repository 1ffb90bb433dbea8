//! RecordStore — redb-backed pool of test-data records.
//!
//! Provides typed CRUD over records plus the exclusive-checkout allocator,
//! release transitions, and bulk import with duplicate skipping. All values
//! are JSON-serialized into redb's `&[u8]` value column. The store supports
//! both on-disk and in-memory backends (the latter for testing).
//!
//! Checkout runs its scan-then-reserve sequence inside one write
//! transaction. redb admits a single write transaction at a time, so the
//! selection and the IN_USE transition commit as one atomic unit and two
//! concurrent checkouts never win the same record.

use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

const NEXT_RECORD_ID: &str = "next_record_id";

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct RecordStore {
    db: Arc<Database>,
}

impl RecordStore {
    /// Open (or create) a persistent record store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory record store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(RECORDS).map_err(map_err!(Table))?;
        txn.open_table(DOC_INDEX).map_err(map_err!(Table))?;
        txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── CRUD ───────────────────────────────────────────────────────

    /// Create one record. Fails with `Validation` on an empty document
    /// number and `Conflict` on a duplicate one.
    pub fn create(&self, new: NewRecord) -> StateResult<Record> {
        if new.document_number.trim().is_empty() {
            return Err(StateError::Validation(
                "document_number must not be empty".to_string(),
            ));
        }

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let record;
        {
            let mut docs = txn.open_table(DOC_INDEX).map_err(map_err!(Table))?;
            if docs
                .get(new.document_number.as_str())
                .map_err(map_err!(Read))?
                .is_some()
            {
                return Err(StateError::Conflict(new.document_number));
            }

            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let id = counters
                .get(NEXT_RECORD_ID)
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .unwrap_or(1);
            counters
                .insert(NEXT_RECORD_ID, id + 1)
                .map_err(map_err!(Write))?;

            record = new.into_record(id, unix_now());
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            let mut records = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            records.insert(id, value.as_slice()).map_err(map_err!(Write))?;
            docs.insert(record.document_number.as_str(), id)
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = record.id, doc = %record.document_number, "record created");
        Ok(record)
    }

    /// Get a record by id.
    pub fn get(&self, id: RecordId) -> StateResult<Option<Record>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        match table.get(id).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: Record =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List records matching a filter, in ascending id order, honoring
    /// skip/limit.
    pub fn list(&self, filter: &ListFilter) -> StateResult<Vec<Record>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        let mut matched = 0usize;
        for entry in table.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let record: Record =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if !filter.matches(&record) {
                continue;
            }
            matched += 1;
            if matched <= filter.skip {
                continue;
            }
            results.push(record);
            if let Some(limit) = filter.limit {
                if results.len() >= limit {
                    break;
                }
            }
        }
        Ok(results)
    }

    /// Apply a partial update. Only fields present in the patch change.
    pub fn update(&self, id: RecordId, patch: &RecordPatch) -> StateResult<Record> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let updated;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let mut record = match table.get(id).map_err(map_err!(Read))? {
                Some(guard) => serde_json::from_slice::<Record>(guard.value())
                    .map_err(map_err!(Deserialize))?,
                None => return Err(StateError::NotFound(format!("record {id}"))),
            };
            record.apply(patch);
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table.insert(id, value.as_slice()).map_err(map_err!(Write))?;
            updated = record;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(updated)
    }

    /// Delete a record by id. Returns true if it existed. Destructive and
    /// irreversible.
    pub fn delete(&self, id: RecordId) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut records = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let removed = records.remove(id).map_err(map_err!(Write))?;
            existed = match removed {
                Some(guard) => {
                    let record: Record =
                        serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                    let mut docs = txn.open_table(DOC_INDEX).map_err(map_err!(Table))?;
                    docs.remove(record.document_number.as_str())
                        .map_err(map_err!(Write))?;
                    true
                }
                None => false,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, existed, "record deleted");
        Ok(existed)
    }

    /// Delete every record. Returns the number removed. The id counter is
    /// not reset, so ids are never reused.
    pub fn delete_all(&self) -> StateResult<u64> {
        // Scan and remove inside one write transaction, so a concurrent
        // create cannot slip a record in between the scan and the removal
        // and lose its doc-index entry.
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut records = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let mut docs = txn.open_table(DOC_INDEX).map_err(map_err!(Table))?;
            let mut ids = Vec::new();
            let mut doc_numbers = Vec::new();
            for entry in records.iter().map_err(map_err!(Read))? {
                let (key, value) = entry.map_err(map_err!(Read))?;
                let record: Record =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                ids.push(key.value());
                doc_numbers.push(record.document_number);
            }
            count = ids.len() as u64;
            for id in &ids {
                records.remove(id).map_err(map_err!(Write))?;
            }
            for doc in &doc_numbers {
                docs.remove(doc.as_str()).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count, "all records deleted");
        Ok(count)
    }

    // ── Checkout allocator ─────────────────────────────────────────

    /// Reserve the first AVAILABLE record (ascending id order) matching the
    /// filter: set it IN_USE, stamp `last_used_at`/`last_used_by`, and
    /// commit. Selection and mutation happen inside one write transaction,
    /// so no concurrent checkout can observe or win the same record.
    ///
    /// `NotFound` means the pool has nothing matching right now; callers
    /// decide whether to retry or fail the test run.
    pub fn checkout(&self, filter: &CheckoutFilter, consumer_id: &str) -> StateResult<Record> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let reserved;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let mut selected: Option<Record> = None;
            for entry in table.iter().map_err(map_err!(Read))? {
                let (_, value) = entry.map_err(map_err!(Read))?;
                let record: Record =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                if record.status == RecordStatus::Available && filter.matches(&record) {
                    selected = Some(record);
                    break;
                }
            }
            let Some(mut record) = selected else {
                // Dropping the transaction aborts it; nothing was mutated.
                return Err(StateError::NotFound(
                    "no available record for criteria".to_string(),
                ));
            };
            record.status = RecordStatus::InUse;
            record.last_used_at = Some(unix_now());
            record.last_used_by = Some(consumer_id.to_string());
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table
                .insert(record.id, value.as_slice())
                .map_err(map_err!(Write))?;
            reserved = record;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = reserved.id, consumer = consumer_id, "record checked out");
        Ok(reserved)
    }

    /// Transition a record to AVAILABLE, CONSUMED, or BLOCKED. Unconditional
    /// overwrite of `status` (idempotent, no guard on the current state);
    /// counters and timestamps are untouched.
    pub fn release(&self, id: RecordId, new_status: RecordStatus) -> StateResult<Record> {
        if new_status == RecordStatus::InUse {
            return Err(StateError::Validation(
                "release target must be AVAILABLE, CONSUMED, or BLOCKED".to_string(),
            ));
        }
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let released;
        {
            let mut table = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let mut record = match table.get(id).map_err(map_err!(Read))? {
                Some(guard) => serde_json::from_slice::<Record>(guard.value())
                    .map_err(map_err!(Deserialize))?,
                None => return Err(StateError::NotFound(format!("record {id}"))),
            };
            record.status = new_status;
            let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
            table.insert(id, value.as_slice()).map_err(map_err!(Write))?;
            released = record;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id, status = ?new_status, "record released");
        Ok(released)
    }

    // ── Bulk import ────────────────────────────────────────────────

    /// Bulk create records, skipping duplicate document numbers. Within the
    /// batch the first occurrence wins; numbers already in the store are
    /// skipped. No partial-item merging. Runs as one transaction.
    pub fn import(&self, batch: Vec<NewRecord>) -> StateResult<ImportReport> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let mut report = ImportReport::default();
        {
            let mut records = txn.open_table(RECORDS).map_err(map_err!(Table))?;
            let mut docs = txn.open_table(DOC_INDEX).map_err(map_err!(Table))?;
            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let mut next_id = counters
                .get(NEXT_RECORD_ID)
                .map_err(map_err!(Read))?
                .map(|g| g.value())
                .unwrap_or(1);

            for new in batch {
                if new.document_number.trim().is_empty() {
                    report.skipped += 1;
                    continue;
                }
                // Inserts from earlier in the batch are already visible in
                // the index, so one lookup covers both dedupe rules.
                if docs
                    .get(new.document_number.as_str())
                    .map_err(map_err!(Read))?
                    .is_some()
                {
                    report.skipped += 1;
                    continue;
                }

                let record = new.into_record(next_id, unix_now());
                let value = serde_json::to_vec(&record).map_err(map_err!(Serialize))?;
                records
                    .insert(next_id, value.as_slice())
                    .map_err(map_err!(Write))?;
                docs.insert(record.document_number.as_str(), next_id)
                    .map_err(map_err!(Write))?;
                next_id += 1;
                report.created += 1;
            }
            counters
                .insert(NEXT_RECORD_ID, next_id)
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(created = report.created, skipped = report.skipped, "import finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::collections::HashSet;

    fn test_record(doc: &str, region: &str) -> NewRecord {
        NewRecord {
            name: None,
            document_type: "CPF".to_string(),
            document_number: doc.to_string(),
            region: region.to_string(),
            uf: None,
            status: None,
            financial_status: Some("ADIMPLENTE".to_string()),
            uc_connected: 1,
            uc_disconnected: 0,
            uc_suspended: 0,
            invoices_overdue: 0,
            invoices_open: 0,
            invoices_paid: 0,
            invoices_single_slip: 0,
            invoices_multi: 0,
            invoices_renegotiated: 0,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    fn region_filter(region: &str) -> CheckoutFilter {
        CheckoutFilter {
            region: Some(region.to_string()),
            ..Default::default()
        }
    }

    // ── CRUD ───────────────────────────────────────────────────────

    #[test]
    fn create_and_get_round_trip() {
        let store = RecordStore::open_in_memory().unwrap();
        let created = store.create(test_record("111", "NE")).unwrap();

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[test]
    fn create_assigns_sequential_ids() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        let b = store.create(test_record("222", "SE")).unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn create_rejects_duplicate_document_number() {
        let store = RecordStore::open_in_memory().unwrap();
        store.create(test_record("111", "NE")).unwrap();

        let err = store.create(test_record("111", "SE")).unwrap_err();
        assert!(matches!(err, StateError::Conflict(_)));
    }

    #[test]
    fn create_rejects_empty_document_number() {
        let store = RecordStore::open_in_memory().unwrap();
        let err = store.create(test_record("  ", "NE")).unwrap_err();
        assert!(matches!(err, StateError::Validation(_)));
    }

    #[test]
    fn get_nonexistent_returns_none() {
        let store = RecordStore::open_in_memory().unwrap();
        assert!(store.get(42).unwrap().is_none());
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let store = RecordStore::open_in_memory().unwrap();
        let created = store.create(test_record("111", "NE")).unwrap();

        let patch = RecordPatch {
            name: Some("Bruno Lima".to_string()),
            invoices_overdue: Some(5),
            ..Default::default()
        };
        let updated = store.update(created.id, &patch).unwrap();

        assert_eq!(updated.name.as_deref(), Some("Bruno Lima"));
        assert_eq!(updated.invoices_overdue, 5);
        assert_eq!(updated.region, "NE");
        assert_eq!(updated.document_number, "111");
        assert_eq!(updated.status, RecordStatus::Available);
    }

    #[test]
    fn update_missing_record_is_not_found() {
        let store = RecordStore::open_in_memory().unwrap();
        let err = store.update(7, &RecordPatch::default()).unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[test]
    fn delete_frees_document_number() {
        let store = RecordStore::open_in_memory().unwrap();
        let created = store.create(test_record("111", "NE")).unwrap();

        assert!(store.delete(created.id).unwrap());
        assert!(!store.delete(created.id).unwrap());

        // The document number can be used again after deletion.
        store.create(test_record("111", "SE")).unwrap();
    }

    #[test]
    fn delete_all_keeps_doc_index_consistent_under_concurrency() {
        // delete_all racing concurrent creates: whatever survives, the
        // doc index must agree with the records table. A wiped document
        // number is free again; a live record's number still conflicts.
        let store = RecordStore::open_in_memory().unwrap();
        for i in 0..8 {
            store.create(test_record(&format!("seed-{i}"), "NE")).unwrap();
        }

        let mut handles = Vec::new();
        {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.delete_all().unwrap();
            }));
        }
        for t in 0..4 {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                for i in 0..4 {
                    store
                        .create(test_record(&format!("new-{t}-{i}"), "SE"))
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        // Every live record keeps its uniqueness guarantee.
        let live = store.list(&ListFilter::default()).unwrap();
        for record in &live {
            let err = store
                .create(test_record(&record.document_number, "CO"))
                .unwrap_err();
            assert!(matches!(err, StateError::Conflict(_)));
        }

        // The seeds existed before delete_all started, so their numbers
        // were wiped together with their records and are free again.
        store.create(test_record("seed-0", "CO")).unwrap();
    }

    #[test]
    fn delete_all_empties_store_and_index() {
        let store = RecordStore::open_in_memory().unwrap();
        store.create(test_record("111", "NE")).unwrap();
        store.create(test_record("222", "SE")).unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.list(&ListFilter::default()).unwrap().is_empty());
        store.create(test_record("111", "NE")).unwrap();
    }

    // ── Listing ────────────────────────────────────────────────────

    #[test]
    fn list_filters_by_region_and_status() {
        let store = RecordStore::open_in_memory().unwrap();
        store.create(test_record("111", "NE")).unwrap();
        store.create(test_record("222", "SE")).unwrap();
        let c = store.create(test_record("333", "NE")).unwrap();
        store.release(c.id, RecordStatus::Blocked).unwrap();

        let ne = store
            .list(&ListFilter {
                region: Some("NE".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ne.len(), 2);

        let ne_available = store
            .list(&ListFilter {
                region: Some("NE".to_string()),
                status: Some(RecordStatus::Available),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ne_available.len(), 1);
        assert_eq!(ne_available[0].document_number, "111");
    }

    #[test]
    fn list_honors_skip_and_limit() {
        let store = RecordStore::open_in_memory().unwrap();
        for i in 0..5 {
            store.create(test_record(&format!("doc-{i}"), "NE")).unwrap();
        }

        let page = store
            .list(&ListFilter {
                skip: 1,
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].id, 2);
        assert_eq!(page[1].id, 3);
    }

    // ── Checkout allocator ─────────────────────────────────────────

    #[test]
    fn checkout_reserves_first_match_in_id_order() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        store.create(test_record("222", "NE")).unwrap();

        let reserved = store.checkout(&region_filter("NE"), "run-1").unwrap();
        assert_eq!(reserved.id, a.id);
        assert_eq!(reserved.status, RecordStatus::InUse);
        assert_eq!(reserved.last_used_by.as_deref(), Some("run-1"));
        assert!(reserved.last_used_at.is_some());

        // The stored copy reflects the reservation.
        let stored = store.get(a.id).unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::InUse);
    }

    #[test]
    fn checkout_no_match_mutates_nothing() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "SE")).unwrap();

        let err = store.checkout(&region_filter("NE"), "run-1").unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));

        let stored = store.get(a.id).unwrap().unwrap();
        assert_eq!(stored.status, RecordStatus::Available);
        assert!(stored.last_used_by.is_none());
    }

    #[test]
    fn checkout_skips_non_available_records() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        let b = store.create(test_record("222", "NE")).unwrap();
        store.release(a.id, RecordStatus::Blocked).unwrap();

        let reserved = store.checkout(&region_filter("NE"), "run-1").unwrap();
        assert_eq!(reserved.id, b.id);
    }

    #[test]
    fn region_scenario_walkthrough() {
        // A(NE, AVAILABLE), B(SE, AVAILABLE):
        //   checkout(NE) -> A, second checkout(NE) -> NotFound,
        //   release(A, CONSUMED) then checkout(NE) -> still NotFound.
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        store.create(test_record("222", "SE")).unwrap();

        let reserved = store.checkout(&region_filter("NE"), "run-1").unwrap();
        assert_eq!(reserved.id, a.id);
        assert_eq!(reserved.status, RecordStatus::InUse);

        let err = store.checkout(&region_filter("NE"), "run-2").unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));

        store.release(a.id, RecordStatus::Consumed).unwrap();
        let err = store.checkout(&region_filter("NE"), "run-3").unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[test]
    fn release_then_checkout_succeeds_only_for_available() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        store.checkout(&region_filter("NE"), "run-1").unwrap();

        for status in [RecordStatus::Consumed, RecordStatus::Blocked] {
            store.release(a.id, status).unwrap();
            assert!(store.checkout(&region_filter("NE"), "run-2").is_err());
        }

        store.release(a.id, RecordStatus::Available).unwrap();
        let reserved = store.checkout(&region_filter("NE"), "run-2").unwrap();
        assert_eq!(reserved.id, a.id);
    }

    #[test]
    fn release_is_idempotent_and_leaves_other_fields() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        let reserved = store.checkout(&region_filter("NE"), "run-1").unwrap();

        store.release(a.id, RecordStatus::Available).unwrap();
        let released = store.release(a.id, RecordStatus::Available).unwrap();

        assert_eq!(released.status, RecordStatus::Available);
        // Timestamps from the checkout survive the release untouched.
        assert_eq!(released.last_used_at, reserved.last_used_at);
        assert_eq!(released.last_used_by.as_deref(), Some("run-1"));
    }

    #[test]
    fn release_rejects_in_use_target() {
        let store = RecordStore::open_in_memory().unwrap();
        let a = store.create(test_record("111", "NE")).unwrap();
        let err = store.release(a.id, RecordStatus::InUse).unwrap_err();
        assert!(matches!(err, StateError::Validation(_)));
    }

    #[test]
    fn release_missing_record_is_not_found() {
        let store = RecordStore::open_in_memory().unwrap();
        let err = store.release(9, RecordStatus::Available).unwrap_err();
        assert!(matches!(err, StateError::NotFound(_)));
    }

    #[test]
    fn concurrent_checkouts_never_share_a_record() {
        // More callers than matching AVAILABLE records: every returned id
        // must be unique and the losers must see NotFound.
        let store = RecordStore::open_in_memory().unwrap();
        const RECORDS_N: usize = 4;
        const CALLERS: usize = 16;

        for i in 0..RECORDS_N {
            store.create(test_record(&format!("doc-{i}"), "NE")).unwrap();
        }

        let mut handles = Vec::new();
        for caller in 0..CALLERS {
            let store = store.clone();
            handles.push(std::thread::spawn(move || {
                store.checkout(&region_filter("NE"), &format!("run-{caller}"))
            }));
        }

        let mut won = Vec::new();
        let mut lost = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(record) => won.push(record.id),
                Err(StateError::NotFound(_)) => lost += 1,
                Err(other) => panic!("unexpected checkout error: {other}"),
            }
        }

        let unique: HashSet<_> = won.iter().copied().collect();
        assert_eq!(won.len(), RECORDS_N, "every record wins exactly once");
        assert_eq!(unique.len(), RECORDS_N, "no double allocation");
        assert_eq!(lost, CALLERS - RECORDS_N);
    }

    // ── Import ─────────────────────────────────────────────────────

    #[test]
    fn import_dedupes_within_batch_and_against_store() {
        let store = RecordStore::open_in_memory().unwrap();
        store.create(test_record("111", "NE")).unwrap();

        let report = store
            .import(vec![
                test_record("111", "NE"), // already stored
                test_record("222", "SE"),
                test_record("222", "S"), // duplicate within batch
                test_record("333", "CO"),
            ])
            .unwrap();

        assert_eq!(report, ImportReport { created: 2, skipped: 2 });
        assert_eq!(store.list(&ListFilter::default()).unwrap().len(), 3);

        // First occurrence wins within the batch.
        let stored = store
            .list(&ListFilter {
                region: Some("SE".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].document_number, "222");
    }

    #[test]
    fn reimport_skips_everything() {
        let store = RecordStore::open_in_memory().unwrap();
        let batch = vec![test_record("111", "NE"), test_record("222", "SE")];

        let first = store.import(batch.clone()).unwrap();
        assert_eq!(first, ImportReport { created: 2, skipped: 0 });

        let second = store.import(batch).unwrap();
        assert_eq!(second, ImportReport { created: 0, skipped: 2 });
    }

    #[test]
    fn import_skips_empty_document_numbers() {
        let store = RecordStore::open_in_memory().unwrap();
        let report = store
            .import(vec![test_record("", "NE"), test_record("111", "NE")])
            .unwrap();
        assert_eq!(report, ImportReport { created: 1, skipped: 1 });
    }

    // ── Persistence ────────────────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        let id = {
            let store = RecordStore::open(&db_path).unwrap();
            let created = store.create(test_record("111", "NE")).unwrap();
            store.checkout(&region_filter("NE"), "run-1").unwrap();
            created.id
        };

        // Reopen the same database file.
        let store = RecordStore::open(&db_path).unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::InUse);
        assert_eq!(record.last_used_by.as_deref(), Some("run-1"));

        // Id assignment continues past the reopened counter.
        let next = store.create(test_record("222", "SE")).unwrap();
        assert_eq!(next.id, id + 1);
    }
}
