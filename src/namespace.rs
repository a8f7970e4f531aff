//! Seam to the external metric namespace tree.
//!
//! The loader registers every metric name attached to a descriptor
//! record; the namespace itself lives outside this crate. `NameTable`
//! is a minimal implementation so the store is usable stand-alone.

use std::collections::HashMap;

use crate::types::MetricId;

/// Receives metric-id → name registrations from the loader.
pub trait NameRegistry {
    /// Register one name for a metric. Implementations report
    /// duplicate names bound to differing metric ids themselves; the
    /// loader tolerates them silently.
    fn add_name(&mut self, pmid: MetricId, name: &str);
}

/// Flat name table: name → metric id, plus the reverse mapping.
#[derive(Debug, Default)]
pub struct NameTable {
    by_name: HashMap<String, MetricId>,
    by_pmid: HashMap<MetricId, Vec<String>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup_name(&self, name: &str) -> Option<MetricId> {
        self.by_name.get(name).copied()
    }

    pub fn names_of(&self, pmid: MetricId) -> &[String] {
        self.by_pmid.get(&pmid).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl NameRegistry for NameTable {
    fn add_name(&mut self, pmid: MetricId, name: &str) {
        if let Some(&existing) = self.by_name.get(name) {
            if existing != pmid {
                // Recoverable: keep the first binding so the rest of
                // the archive stays reachable.
                tracing::warn!(
                    "duplicate metric name {} maps to {:#x} and {:#x}",
                    name,
                    existing,
                    pmid
                );
            }
            return;
        }
        self.by_name.insert(name.to_string(), pmid);
        self.by_pmid.entry(pmid).or_default().push(name.to_string());
    }
}

/// Registry that drops all registrations; for callers that only want
/// the indexes.
#[derive(Debug, Default)]
pub struct NullRegistry;

impl NameRegistry for NullRegistry {
    fn add_name(&mut self, _pmid: MetricId, _name: &str) {}
}
