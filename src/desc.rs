//! Metric descriptors and the metric-id → descriptor index.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};
use crate::types::MetricId;
use crate::units::Units;

/// The schema of one metric: value type, semantics, owning instance
/// domain, and units. 20 bytes on disk, fields in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Desc {
    pub pmid: MetricId,
    pub typ: i32,
    pub indom: u32,
    pub sem: i32,
    pub units: Units,
}

/// Descriptor index. Redefinition of a metric is tolerated only when
/// every field matches the stored copy.
#[derive(Debug, Default)]
pub struct DescIndex {
    map: HashMap<MetricId, Desc>,
}

impl DescIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a descriptor, detecting conflicting redefinitions.
    ///
    /// A repeat of an identical descriptor is a no-op; a divergence in
    /// any field fails with the error naming the first field found to
    /// differ.
    pub fn add(&mut self, desc: &Desc) -> Result<()> {
        if let Some(old) = self.map.get(&desc.pmid) {
            if desc.typ != old.typ {
                return Err(MetaError::ConflictType(desc.pmid));
            }
            if desc.sem != old.sem {
                return Err(MetaError::ConflictSemantics(desc.pmid));
            }
            if desc.indom != old.indom {
                return Err(MetaError::ConflictInDom(desc.pmid));
            }
            if desc.units != old.units {
                return Err(MetaError::ConflictUnits(desc.pmid));
            }
            return Ok(());
        }
        self.map.insert(desc.pmid, *desc);
        Ok(())
    }

    pub fn lookup(&self, pmid: MetricId) -> Result<&Desc> {
        self.map.get(&pmid).ok_or(MetaError::NoDescriptor(pmid))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// All descriptors, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Desc> {
        self.map.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SEM_COUNTER, SEM_INSTANT, TYPE_DOUBLE, TYPE_FLOAT};

    fn base() -> Desc {
        Desc {
            pmid: 0x1,
            typ: TYPE_FLOAT,
            indom: 0x50,
            sem: SEM_INSTANT,
            units: Units::new(0, 1, 0, 0, 3, 0),
        }
    }

    #[test]
    fn test_add_and_lookup() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        assert_eq!(idx.lookup(0x1).unwrap(), &base());
        assert!(matches!(idx.lookup(0x2), Err(MetaError::NoDescriptor(0x2))));
    }

    #[test]
    fn test_identical_redefinition_ok() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        idx.add(&base()).unwrap();
        assert_eq!(idx.len(), 1);
    }

    #[test]
    fn test_conflict_type() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        let mut d = base();
        d.typ = TYPE_DOUBLE;
        assert!(matches!(idx.add(&d), Err(MetaError::ConflictType(0x1))));
    }

    #[test]
    fn test_conflict_semantics() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        let mut d = base();
        d.sem = SEM_COUNTER;
        assert!(matches!(idx.add(&d), Err(MetaError::ConflictSemantics(0x1))));
    }

    #[test]
    fn test_conflict_indom() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        let mut d = base();
        d.indom = 0x51;
        assert!(matches!(idx.add(&d), Err(MetaError::ConflictInDom(0x1))));
    }

    #[test]
    fn test_conflict_units_single_field() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        let mut d = base();
        d.units.scale_space = 1;
        assert!(matches!(idx.add(&d), Err(MetaError::ConflictUnits(0x1))));
    }

    #[test]
    fn test_conflict_leaves_original() {
        let mut idx = DescIndex::new();
        idx.add(&base()).unwrap();
        let mut d = base();
        d.typ = TYPE_DOUBLE;
        let _ = idx.add(&d);
        assert_eq!(idx.lookup(0x1).unwrap().typ, TYPE_FLOAT);
    }
}
