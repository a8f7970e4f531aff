//! Core identifier types, on-disk record tags, and bounds configuration.

use serde::{Deserialize, Serialize};

// ── Identifiers ────────────────────────────────────────────────────

/// Metric identifier (opaque 32-bit encoding).
pub type MetricId = u32;

/// Instance-domain identifier (opaque 32-bit encoding).
pub type InDomId = u32;

/// Null sentinel for metric and instance-domain identifiers.
pub const NULL_ID: u32 = 0xffff_ffff;

/// "Whole context" sentinel for the instance field of a label set.
pub const NULL_INST: i32 = -1;

// ── On-disk record type tags ───────────────────────────────────────

/// Metric descriptor record.
pub const TAG_DESC: u32 = 1;
/// Instance-domain snapshot, legacy timestamp encoding.
pub const TAG_INDOM_V2: u32 = 2;
/// Label-set snapshot, legacy timestamp encoding.
pub const TAG_LABEL_V2: u32 = 3;
/// Help-text record (no timestamp).
pub const TAG_TEXT: u32 = 4;
/// Instance-domain snapshot, current timestamp encoding.
pub const TAG_INDOM: u32 = 5;
/// Reserved delta-encoded instance domain (decoded and discarded).
pub const TAG_INDOM_DELTA: u32 = 6;
/// Label-set snapshot, current timestamp encoding.
pub const TAG_LABEL: u32 = 7;

// ── Label types ────────────────────────────────────────────────────

pub const LABEL_CONTEXT: u32 = 1 << 0;
pub const LABEL_DOMAIN: u32 = 1 << 1;
pub const LABEL_INDOM: u32 = 1 << 2;
pub const LABEL_CLUSTER: u32 = 1 << 3;
pub const LABEL_ITEM: u32 = 1 << 4;
pub const LABEL_INSTANCES: u32 = 1 << 5;
/// Decorative bit, masked off before indexing.
pub const LABEL_COMPOUND: u32 = 1 << 6;
/// Decorative bit, masked off before indexing.
pub const LABEL_OPTIONAL: u32 = 1 << 7;

/// Strip the decorative label-type bits ahead of index lookups.
pub fn mask_label_type(ltype: u32) -> u32 {
    ltype & !(LABEL_COMPOUND | LABEL_OPTIONAL)
}

// ── Help-text types ────────────────────────────────────────────────

pub const TEXT_ONELINE: u32 = 1 << 0;
pub const TEXT_HELP: u32 = 1 << 1;
pub const TEXT_PMID: u32 = 1 << 2;
pub const TEXT_INDOM: u32 = 1 << 3;
/// Delivery hint, stripped before indexing.
pub const TEXT_DIRECT: u32 = 1 << 4;

// ── Value types and semantics ──────────────────────────────────────

pub const TYPE_32: i32 = 0;
pub const TYPE_U32: i32 = 1;
pub const TYPE_64: i32 = 2;
pub const TYPE_U64: i32 = 3;
pub const TYPE_FLOAT: i32 = 4;
pub const TYPE_DOUBLE: i32 = 5;
pub const TYPE_STRING: i32 = 6;

pub const SEM_COUNTER: i32 = 1;
pub const SEM_INSTANT: i32 = 3;
pub const SEM_DISCRETE: i32 = 4;

// ── Archive format version ─────────────────────────────────────────

/// On-disk layout version for the timestamped record types.
///
/// V2 records carry (sec: i32, usec: i32) timestamps; V3 records carry
/// (sec: i64, nsec: u32). Both coexist within one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Version {
    V2,
    V3,
}

// ── Bounds configuration ───────────────────────────────────────────

/// Historical ceiling on a label set's JSON payload, in bytes.
pub const MAX_LABEL_JSON: usize = 65536;

/// Historical ceiling on the number of labels in one label set.
pub const MAX_LABELS: usize = 254;

/// Corruption-detection ceilings consulted by the label decoder.
///
/// These are not semantic limits; a record exceeding either is treated
/// as corrupt and aborts the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaConfig {
    pub max_label_json: usize,
    pub max_labels: usize,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            max_label_json: MAX_LABEL_JSON,
            max_labels: MAX_LABELS,
        }
    }
}
