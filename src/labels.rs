//! Label index: two-level (type → identifier) chains of timestamped
//! label-set snapshots.
//!
//! Insertion keeps chains in decreasing timestamp order but performs
//! no deduplication; archives stitched from sub-archives repeat label
//! sets at the seams, and those duplicates are trimmed in one pass
//! after the whole stream has been consumed (`prune_duplicates`).

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};
use crate::timestamp::Timestamp;
use crate::two_level::TypeIdentMap;
use crate::types::{mask_label_type, LABEL_CONTEXT, NULL_ID};

/// One (name, value) annotation: offsets and lengths into the owning
/// set's JSON payload, plus flags. Five 32-bit fields on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: u32,
    pub namelen: u32,
    pub value: u32,
    pub valuelen: u32,
    pub flags: u32,
}

/// A set of labels for one instance (or the whole context, when
/// `inst` is the null-instance sentinel): the raw JSON payload and
/// the tuples indexing into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSet {
    pub inst: i32,
    pub json: String,
    pub labels: Vec<Label>,
}

/// All label sets observed for one (type, identifier) at one
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSnapshot {
    pub stamp: Timestamp,
    pub sets: Vec<LabelSet>,
}

/// Slice a name or value field out of a set's JSON payload. Out-of-
/// range tuples yield `None` and never match anything.
fn field(set: &LabelSet, off: u32, len: u32) -> Option<&[u8]> {
    set.json
        .as_bytes()
        .get(off as usize..off as usize + len as usize)
}

/// Semantic equality of two label sets: same instance, same label
/// count, and every (name, value) pair of one present byte-for-byte
/// in the other, order-independent. A name match with a differing
/// value settles the comparison immediately.
fn same_labelset(a: &LabelSet, b: &LabelSet) -> bool {
    if a.inst != b.inst || a.labels.len() != b.labels.len() {
        return false;
    }
    'outer: for l1 in &a.labels {
        for l2 in &b.labels {
            if l1.namelen != l2.namelen {
                continue;
            }
            let names = (
                field(a, l1.name, l1.namelen),
                field(b, l2.name, l2.namelen),
            );
            match names {
                (Some(n1), Some(n2)) if n1 == n2 => {}
                _ => continue,
            }
            if l1.valuelen != l2.valuelen {
                return false;
            }
            let values = (
                field(a, l1.value, l1.valuelen),
                field(b, l2.value, l2.valuelen),
            );
            match values {
                (Some(v1), Some(v2)) if v1 == v2 => continue 'outer,
                _ => return false,
            }
        }
        return false;
    }
    true
}

/// Label index over the two-level (masked type, identifier) map.
#[derive(Debug, Default)]
pub struct LabelIndex {
    map: TypeIdentMap<Vec<LabelSnapshot>>,
}

impl LabelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index key for a (type, identifier) pair: decorative type bits
    /// are stripped, and context-scoped labels collapse onto the null
    /// identifier whatever identifier the record carried.
    fn key(ltype: u32, ident: u32) -> (u32, u32) {
        let masked = mask_label_type(ltype);
        let ident = if masked == LABEL_CONTEXT { NULL_ID } else { ident };
        (masked, ident)
    }

    /// Insert a snapshot into its chain, keeping decreasing timestamp
    /// order. Equal-stamp snapshots chain behind existing ones;
    /// duplicates are not detected here.
    pub fn add(&mut self, ltype: u32, ident: u32, stamp: Timestamp, sets: Vec<LabelSet>) {
        let (typ, ident) = Self::key(ltype, ident);
        let chain = self.map.entry_or_default(typ, ident);
        let snap = LabelSnapshot { stamp, sets };
        let pos = chain
            .iter()
            .position(|n| n.stamp < snap.stamp)
            .unwrap_or(chain.len());
        chain.insert(pos, snap);
    }

    /// Label sets in effect at `tsp` (or newest). A chain whose every
    /// node is later than the requested time yields an empty slice.
    pub fn lookup(&self, ltype: u32, ident: u32, tsp: Option<&Timestamp>) -> Result<&[LabelSet]> {
        let (typ, ident) = Self::key(ltype, ident);
        let chain = self
            .map
            .get(typ, ident)
            .ok_or(MetaError::NoLabels(typ, ident))?;
        let node = match tsp {
            None => chain.first(),
            Some(t) => match chain.iter().find(|n| n.stamp <= *t) {
                Some(n) => Some(n),
                None => return Ok(&[]),
            },
        };
        Ok(node.map(|n| n.sets.as_slice()).unwrap_or(&[]))
    }

    /// Post-load duplicate trimming. For each adjacent (newer, older)
    /// pair in every chain, label sets in the newer node that are
    /// semantically equal to one in the older node are discarded; a
    /// newer node left with no sets is unlinked. The older copy is
    /// the carrier of truth at archive stitch points.
    ///
    /// Must run exactly once per archive load, after the stream is
    /// fully consumed.
    pub fn prune_duplicates(&mut self) {
        self.map.for_each_mut(|_, _, chain| {
            let mut i = 0;
            while i + 1 < chain.len() {
                let (head, tail) = chain.split_at_mut(i + 1);
                let newer = &mut head[i];
                let older = &tail[0];
                newer
                    .sets
                    .retain(|s| !older.sets.iter().any(|o| same_labelset(s, o)));
                if newer.sets.is_empty() {
                    chain.remove(i);
                } else {
                    i += 1;
                }
            }
        });
    }

    /// The full chain for a (type, identifier), head (newest) first.
    pub fn chain(&self, ltype: u32, ident: u32) -> Option<&[LabelSnapshot]> {
        let (typ, ident) = Self::key(ltype, ident);
        self.map.get(typ, ident).map(|c| c.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LABEL_COMPOUND, LABEL_ITEM, LABEL_OPTIONAL};

    fn ts(sec: i64) -> Timestamp {
        Timestamp::new(sec, 0)
    }

    /// Build a one-label set over a literal JSON payload.
    fn set(inst: i32, json: &str, name: &str, value: &str) -> LabelSet {
        let noff = json.find(name).expect("name in json") as u32;
        let voff = json.find(value).expect("value in json") as u32;
        LabelSet {
            inst,
            json: json.to_string(),
            labels: vec![Label {
                name: noff,
                namelen: name.len() as u32,
                value: voff,
                valuelen: value.len() as u32,
                flags: 0,
            }],
        }
    }

    fn host_set(inst: i32, host: &str) -> LabelSet {
        let json = format!(r#"{{"hostname":"{}"}}"#, host);
        set(inst, &json, "hostname", host)
    }

    #[test]
    fn test_decorative_bits_share_chain() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_ITEM, 5, ts(10), vec![host_set(1, "a")]);
        idx.add(
            LABEL_ITEM | LABEL_COMPOUND | LABEL_OPTIONAL,
            5,
            ts(20),
            vec![host_set(1, "b")],
        );
        assert_eq!(idx.chain(LABEL_ITEM, 5).unwrap().len(), 2);
        assert_eq!(
            idx.chain(LABEL_ITEM | LABEL_COMPOUND, 5).unwrap().len(),
            2
        );
    }

    #[test]
    fn test_context_labels_collapse_ident() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_CONTEXT, 123, ts(10), vec![host_set(-1, "a")]);
        idx.add(LABEL_CONTEXT, 456, ts(20), vec![host_set(-1, "b")]);
        // Both land under the null identifier.
        assert_eq!(idx.chain(LABEL_CONTEXT, 999).unwrap().len(), 2);
    }

    #[test]
    fn test_chain_order_and_lookup() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_ITEM, 1, ts(100), vec![host_set(1, "at100")]);
        idx.add(LABEL_ITEM, 1, ts(50), vec![host_set(1, "at50")]);
        idx.add(LABEL_ITEM, 1, ts(150), vec![host_set(1, "at150")]);

        let stamps: Vec<i64> = idx
            .chain(LABEL_ITEM, 1)
            .unwrap()
            .iter()
            .map(|n| n.stamp.sec)
            .collect();
        assert_eq!(stamps, vec![150, 100, 50]);

        let sets = idx.lookup(LABEL_ITEM, 1, Some(&ts(120))).unwrap();
        assert!(sets[0].json.contains("at100"));

        // Newest when unscoped.
        let sets = idx.lookup(LABEL_ITEM, 1, None).unwrap();
        assert!(sets[0].json.contains("at150"));

        // Earlier than everything: empty, not an error.
        assert!(idx.lookup(LABEL_ITEM, 1, Some(&ts(10))).unwrap().is_empty());

        assert!(matches!(
            idx.lookup(LABEL_ITEM, 2, None),
            Err(MetaError::NoLabels(..))
        ));
    }

    #[test]
    fn test_same_labelset_order_independent() {
        let json = r#"{"a":"1","b":"2"}"#;
        let mk = |order: [(&str, &str); 2]| {
            let mut labels = Vec::new();
            for (n, v) in order {
                labels.push(Label {
                    name: json.find(n).unwrap() as u32,
                    namelen: n.len() as u32,
                    value: json.find(v).unwrap() as u32,
                    valuelen: v.len() as u32,
                    flags: 0,
                });
            }
            LabelSet {
                inst: 7,
                json: json.to_string(),
                labels,
            }
        };
        let x = mk([("a", "1"), ("b", "2")]);
        let y = mk([("b", "2"), ("a", "1")]);
        assert!(same_labelset(&x, &y));
    }

    #[test]
    fn test_same_labelset_value_divergence() {
        assert!(!same_labelset(&host_set(1, "acme"), &host_set(1, "zinc")));
        assert!(same_labelset(&host_set(1, "acme"), &host_set(1, "acme")));
        // Different instance is never equal.
        assert!(!same_labelset(&host_set(1, "acme"), &host_set(2, "acme")));
    }

    #[test]
    fn test_prune_removes_newer_duplicate() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_ITEM, 1, ts(10), vec![host_set(1, "acme")]);
        // Stitch point: same set again, later.
        idx.add(LABEL_ITEM, 1, ts(20), vec![host_set(1, "acme")]);
        idx.prune_duplicates();

        let chain = idx.chain(LABEL_ITEM, 1).unwrap();
        assert_eq!(chain.len(), 1, "newer duplicate node must be unlinked");
        assert_eq!(chain[0].stamp, ts(10), "older copy is the carrier of truth");
    }

    #[test]
    fn test_prune_keeps_changed_sets() {
        let mut idx = LabelIndex::new();
        idx.add(
            LABEL_ITEM,
            1,
            ts(10),
            vec![host_set(1, "acme"), host_set(2, "zinc")],
        );
        idx.add(
            LABEL_ITEM,
            1,
            ts(20),
            vec![host_set(1, "acme"), host_set(2, "new")],
        );
        idx.prune_duplicates();

        let chain = idx.chain(LABEL_ITEM, 1).unwrap();
        assert_eq!(chain.len(), 2);
        // The repeated inst-1 set was elided from the newer node; the
        // changed inst-2 set survives.
        assert_eq!(chain[0].sets.len(), 1);
        assert_eq!(chain[0].sets[0].inst, 2);
        assert_eq!(chain[1].sets.len(), 2);
    }

    #[test]
    fn test_prune_cascades_down_chain() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_ITEM, 1, ts(10), vec![host_set(1, "acme")]);
        idx.add(LABEL_ITEM, 1, ts(20), vec![host_set(1, "acme")]);
        idx.add(LABEL_ITEM, 1, ts(30), vec![host_set(1, "acme")]);
        idx.prune_duplicates();
        assert_eq!(idx.chain(LABEL_ITEM, 1).unwrap().len(), 1);
        assert_eq!(idx.chain(LABEL_ITEM, 1).unwrap()[0].stamp, ts(10));
    }

    #[test]
    fn test_prune_only_adjacent_nodes() {
        let mut idx = LabelIndex::new();
        idx.add(LABEL_ITEM, 1, ts(10), vec![host_set(1, "acme")]);
        idx.add(LABEL_ITEM, 1, ts(20), vec![host_set(1, "other")]);
        // Same as the oldest again, but not adjacent to it.
        idx.add(LABEL_ITEM, 1, ts(30), vec![host_set(1, "acme")]);
        idx.prune_duplicates();
        // Only identical ones adjacent in time are duplicates.
        assert_eq!(idx.chain(LABEL_ITEM, 1).unwrap().len(), 3);
    }
}
