//! Domain types for the test-data pool.
//!
//! A `Record` is one poolable test-data unit: a synthetic identity/account
//! with a document number, region, financial status, and usage counters.
//! All types are serializable to/from JSON for storage in redb tables and
//! for the REST surface.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Unique identifier for a pooled record.
pub type RecordId = u64;

// ── Record ─────────────────────────────────────────────────────────

/// One poolable test-data record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: RecordId,
    /// Holder name, when known.
    pub name: Option<String>,
    /// Document kind (e.g. CPF, CNPJ).
    pub document_type: String,
    /// Globally unique document number.
    pub document_number: String,
    /// Region code (e.g. NE, SE, S, N, CO).
    pub region: String,
    /// State code, when relevant.
    pub uf: Option<String>,
    pub status: RecordStatus,
    pub financial_status: Option<String>,
    /// Consumer-unit counts.
    pub uc_connected: u32,
    pub uc_disconnected: u32,
    pub uc_suspended: u32,
    /// Invoice counts by kind.
    pub invoices_overdue: u32,
    pub invoices_open: u32,
    pub invoices_paid: u32,
    pub invoices_single_slip: u32,
    pub invoices_multi: u32,
    pub invoices_renegotiated: u32,
    pub tags: Vec<String>,
    /// Open key-value bag for extra details. Values are restricted to a
    /// closed set of primitives so the schema stays checkable.
    pub metadata: BTreeMap<String, MetaValue>,
    /// Unix timestamp (seconds) when this record was created.
    pub created_at: u64,
    /// Unix timestamp of the last checkout, if any.
    pub last_used_at: Option<u64>,
    /// Consumer id of whoever holds (or last held) the reservation.
    pub last_used_by: Option<String>,
}

/// Lifecycle status of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Available,
    InUse,
    Consumed,
    Blocked,
}

/// Primitive metadata value (string, number, or boolean).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MetaValue {
    String(String),
    Number(f64),
    Bool(bool),
}

// ── Creation / update payloads ─────────────────────────────────────

/// Payload for creating a record (id and `created_at` are assigned by the
/// store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub name: Option<String>,
    pub document_type: String,
    pub document_number: String,
    pub region: String,
    #[serde(default)]
    pub uf: Option<String>,
    /// Initial status; defaults to AVAILABLE.
    #[serde(default)]
    pub status: Option<RecordStatus>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub uc_connected: u32,
    #[serde(default)]
    pub uc_disconnected: u32,
    #[serde(default)]
    pub uc_suspended: u32,
    #[serde(default)]
    pub invoices_overdue: u32,
    #[serde(default)]
    pub invoices_open: u32,
    #[serde(default)]
    pub invoices_paid: u32,
    #[serde(default)]
    pub invoices_single_slip: u32,
    #[serde(default)]
    pub invoices_multi: u32,
    #[serde(default)]
    pub invoices_renegotiated: u32,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetaValue>,
}

impl NewRecord {
    /// Materialize a full record with a store-assigned id and timestamp.
    pub fn into_record(self, id: RecordId, created_at: u64) -> Record {
        Record {
            id,
            name: self.name,
            document_type: self.document_type,
            document_number: self.document_number,
            region: self.region,
            uf: self.uf,
            status: self.status.unwrap_or(RecordStatus::Available),
            financial_status: self.financial_status,
            uc_connected: self.uc_connected,
            uc_disconnected: self.uc_disconnected,
            uc_suspended: self.uc_suspended,
            invoices_overdue: self.invoices_overdue,
            invoices_open: self.invoices_open,
            invoices_paid: self.invoices_paid,
            invoices_single_slip: self.invoices_single_slip,
            invoices_multi: self.invoices_multi,
            invoices_renegotiated: self.invoices_renegotiated,
            tags: self.tags,
            metadata: self.metadata,
            created_at,
            last_used_at: None,
            last_used_by: None,
        }
    }
}

/// Partial update for a record. Only present fields are applied; `id` and
/// `document_number` are immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordPatch {
    pub name: Option<String>,
    pub status: Option<RecordStatus>,
    pub financial_status: Option<String>,
    pub uc_connected: Option<u32>,
    pub uc_disconnected: Option<u32>,
    pub uc_suspended: Option<u32>,
    pub invoices_overdue: Option<u32>,
    pub invoices_open: Option<u32>,
    pub invoices_paid: Option<u32>,
    pub invoices_single_slip: Option<u32>,
    pub invoices_multi: Option<u32>,
    pub invoices_renegotiated: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<BTreeMap<String, MetaValue>>,
}

impl Record {
    /// Apply a partial update in place.
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(name) = &patch.name {
            self.name = Some(name.clone());
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(fs) = &patch.financial_status {
            self.financial_status = Some(fs.clone());
        }
        if let Some(v) = patch.uc_connected {
            self.uc_connected = v;
        }
        if let Some(v) = patch.uc_disconnected {
            self.uc_disconnected = v;
        }
        if let Some(v) = patch.uc_suspended {
            self.uc_suspended = v;
        }
        if let Some(v) = patch.invoices_overdue {
            self.invoices_overdue = v;
        }
        if let Some(v) = patch.invoices_open {
            self.invoices_open = v;
        }
        if let Some(v) = patch.invoices_paid {
            self.invoices_paid = v;
        }
        if let Some(v) = patch.invoices_single_slip {
            self.invoices_single_slip = v;
        }
        if let Some(v) = patch.invoices_multi {
            self.invoices_multi = v;
        }
        if let Some(v) = patch.invoices_renegotiated {
            self.invoices_renegotiated = v;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(metadata) = &patch.metadata {
            self.metadata = metadata.clone();
        }
    }
}

// ── Filters ────────────────────────────────────────────────────────

/// Consumer-unit status filter. Matches records with at least one UC in the
/// named state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UcStatus {
    Connected,
    Disconnected,
    Suspended,
}

impl UcStatus {
    pub fn matches(self, record: &Record) -> bool {
        match self {
            UcStatus::Connected => record.uc_connected > 0,
            UcStatus::Disconnected => record.uc_disconnected > 0,
            UcStatus::Suspended => record.uc_suspended > 0,
        }
    }
}

/// Checkout predicate. Absent fields are wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutFilter {
    pub region: Option<String>,
    pub uc_status: Option<UcStatus>,
    pub financial_status: Option<String>,
    /// The record must carry every listed tag.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl CheckoutFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(region) = &self.region {
            if record.region != *region {
                return false;
            }
        }
        if let Some(uc) = self.uc_status {
            if !uc.matches(record) {
                return false;
            }
        }
        if let Some(fs) = &self.financial_status {
            if record.financial_status.as_deref() != Some(fs.as_str()) {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|tag| record.tags.iter().any(|t| t == tag))
    }
}

/// Listing predicate plus pagination. Absent fields are wildcards.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListFilter {
    pub region: Option<String>,
    pub status: Option<RecordStatus>,
    pub uc_status: Option<UcStatus>,
    pub financial_status: Option<String>,
    pub document_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub skip: usize,
    pub limit: Option<usize>,
}

impl ListFilter {
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(region) = &self.region {
            if record.region != *region {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(uc) = self.uc_status {
            if !uc.matches(record) {
                return false;
            }
        }
        if let Some(fs) = &self.financial_status {
            if record.financial_status.as_deref() != Some(fs.as_str()) {
                return false;
            }
        }
        if let Some(dt) = &self.document_type {
            if record.document_type != *dt {
                return false;
            }
        }
        self.tags
            .iter()
            .all(|tag| record.tags.iter().any(|t| t == tag))
    }
}

// ── Import ─────────────────────────────────────────────────────────

/// Outcome of a bulk import.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportReport {
    /// Records inserted.
    pub created: u64,
    /// Items dropped as duplicates (within the batch or against the store).
    pub skipped: u64,
}
