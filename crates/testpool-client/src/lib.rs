//! testpool-client — convenience façade for test-automation consumers.
//!
//! Wraps a `RecordStore` handle with the checkout-use-release workflow test
//! fixtures need: grab a matching record, run the test against it, and put
//! it back (or mark it consumed/blocked) afterwards.
//!
//! The [`Lease`] guard covers the "release no matter what" case: it checks
//! a record out on creation and releases it back to AVAILABLE on drop, so a
//! panicking test still returns its record to the pool.

use tracing::{debug, warn};

use testpool_state::{
    CheckoutFilter, ListFilter, MetaValue, Record, RecordId, RecordPatch, RecordStatus,
    RecordStore, StateError, StateResult,
};

/// Metadata key the reason passed to [`PoolClient::block`] is stored under.
const BLOCK_REASON_KEY: &str = "block_reason";

/// Pool client bound to one consumer identity.
#[derive(Clone)]
pub struct PoolClient {
    store: RecordStore,
    consumer_id: String,
}

impl PoolClient {
    pub fn new(store: RecordStore, consumer_id: impl Into<String>) -> Self {
        Self {
            store,
            consumer_id: consumer_id.into(),
        }
    }

    /// Check out one AVAILABLE record matching the filter, reserving it for
    /// this consumer. `None` means the pool has nothing matching right now.
    pub fn get_available(&self, filter: &CheckoutFilter) -> StateResult<Option<Record>> {
        match self.store.checkout(filter, &self.consumer_id) {
            Ok(record) => {
                debug!(id = record.id, consumer = %self.consumer_id, "record reserved");
                Ok(Some(record))
            }
            Err(StateError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// List records matching a filter without reserving anything.
    pub fn search(&self, filter: &ListFilter) -> StateResult<Vec<Record>> {
        self.store.list(filter)
    }

    /// Reserve a specific record by id, marking it IN_USE regardless of its
    /// current status. Use [`PoolClient::get_available`] when any matching
    /// record will do; this is for pinning a known one.
    pub fn reserve(&self, id: RecordId) -> StateResult<Record> {
        let patch = RecordPatch {
            status: Some(RecordStatus::InUse),
            ..Default::default()
        };
        let record = self.store.update(id, &patch)?;
        debug!(id, consumer = %self.consumer_id, "record pinned");
        Ok(record)
    }

    /// Return a record to the pool (status AVAILABLE).
    pub fn release(&self, id: RecordId) -> StateResult<()> {
        self.store.release(id, RecordStatus::Available)?;
        Ok(())
    }

    /// Mark a record terminally consumed (its data was permanently altered
    /// in the system under test).
    pub fn consume(&self, id: RecordId) -> StateResult<()> {
        self.store.release(id, RecordStatus::Consumed)?;
        Ok(())
    }

    /// Block a record (bad data, problem detected). The reason, if given,
    /// lands in the record's metadata.
    pub fn block(&self, id: RecordId, reason: Option<&str>) -> StateResult<()> {
        if let Some(reason) = reason {
            let record = self
                .store
                .get(id)?
                .ok_or_else(|| StateError::NotFound(format!("record {id}")))?;
            let mut metadata = record.metadata;
            metadata.insert(
                BLOCK_REASON_KEY.to_string(),
                MetaValue::String(reason.to_string()),
            );
            let patch = RecordPatch {
                metadata: Some(metadata),
                ..Default::default()
            };
            self.store.update(id, &patch)?;
        }
        self.store.release(id, RecordStatus::Blocked)?;
        Ok(())
    }

    /// Scoped acquisition: check out a record now, release it when the
    /// returned guard drops. `None` when nothing matches.
    pub fn lease(&self, filter: &CheckoutFilter) -> StateResult<Option<Lease<'_>>> {
        Ok(self.get_available(filter)?.map(|record| Lease {
            client: self,
            record,
            settled: false,
        }))
    }
}

/// A checked-out record that releases itself back to AVAILABLE on drop,
/// regardless of how the enclosing scope exits. Call [`Lease::consume`] or
/// [`Lease::block`] to settle it differently.
pub struct Lease<'a> {
    client: &'a PoolClient,
    record: Record,
    settled: bool,
}

impl Lease<'_> {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn id(&self) -> RecordId {
        self.record.id
    }

    /// Settle the lease as CONSUMED instead of releasing.
    pub fn consume(mut self) -> StateResult<()> {
        self.settled = true;
        self.client.consume(self.record.id)
    }

    /// Settle the lease as BLOCKED instead of releasing.
    pub fn block(mut self, reason: Option<&str>) -> StateResult<()> {
        self.settled = true;
        self.client.block(self.record.id, reason)
    }
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        if let Err(err) = self.client.release(self.record.id) {
            warn!(id = self.record.id, %err, "failed to release leased record");
        }
    }
}
