//! Instance-domain index: per-indom chains of timestamped instance
//! snapshots with duplicate suppression and time-scoped lookup.
//!
//! Chains are kept in decreasing timestamp order (head first) so that
//! "the snapshot in effect at time t" is the first node at or before
//! t. Multi-archive merges replay the same snapshots over and over;
//! insertion collapses those duplicates instead of growing the chain.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{MetaError, Result};
use crate::timestamp::Timestamp;
use crate::types::InDomId;

/// Indoms larger than this use a hash set to deduplicate the
/// archive-wide enumeration; smaller ones use a linear scan.
const HASH_THRESHOLD: usize = 16;

/// One instance-domain snapshot: the (id, name) membership of an
/// indom as of a timestamp. Instance ids are ascending after
/// normalization, and the arrays move in lockstep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InDomSnapshot {
    pub stamp: Timestamp,
    pub insts: Vec<i32>,
    pub names: Vec<String>,
}

impl InDomSnapshot {
    /// Semantic equality: same membership, position by position.
    /// Timestamps are deliberately not compared. Sorted instance
    /// lists make this a linear walk.
    fn same_instances(&self, other: &InDomSnapshot) -> bool {
        self.insts == other.insts && self.names == other.names
    }
}

/// Outcome of an indom insertion. `Duplicate` means the index kept an
/// existing equal snapshot and the caller's arrays were not adopted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndomStatus {
    Added,
    Duplicate,
}

/// Sort both arrays by ascending instance id, in lockstep. Insertion
/// sort: the input is frequently already sorted or nearly so, and the
/// dependent arrays rule out the standard sort routines.
fn sort_instances(insts: &mut [i32], names: &mut [String]) {
    for i in 1..insts.len() {
        let mut j = i;
        while j > 0 && insts[j] < insts[j - 1] {
            insts.swap(j, j - 1);
            names.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Does the queried name start with the candidate's head, the part of
/// the candidate before its first space? Supports instance names whose
/// canonical form carries a trailing description.
fn head_matches(name: &str, candidate: &str) -> bool {
    match candidate.split_once(' ') {
        Some((head, _)) => name.as_bytes().starts_with(head.as_bytes()),
        None => false,
    }
}

/// Instance-domain index: indom id → chain of snapshots in decreasing
/// timestamp order.
#[derive(Debug, Default)]
pub struct InDomIndex {
    map: HashMap<InDomId, Vec<InDomSnapshot>>,
}

impl InDomIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot, filtering out duplicates.
    ///
    /// The arrays are normalized (sorted ascending by instance id) and
    /// adopted on `Added`. When a semantically equal snapshot already
    /// exists in the same time slot, that copy is relocated to the
    /// head of the slot, the new arrays are dropped, and `Duplicate`
    /// is returned.
    pub fn add(
        &mut self,
        indom: InDomId,
        stamp: Timestamp,
        mut insts: Vec<i32>,
        mut names: Vec<String>,
    ) -> IndomStatus {
        debug_assert_eq!(insts.len(), names.len());
        sort_instances(&mut insts, &mut names);
        let snap = InDomSnapshot {
            stamp,
            insts,
            names,
        };

        let chain = self.map.entry(indom).or_default();
        let mut i = 0;
        loop {
            if i == chain.len() {
                chain.push(snap);
                return IndomStatus::Added;
            }
            match chain[i].stamp.cmp(&snap.stamp) {
                std::cmp::Ordering::Less => {
                    // Chain node is older; the new snapshot goes just
                    // before it to preserve decreasing order.
                    chain.insert(i, snap);
                    return IndomStatus::Added;
                }
                std::cmp::Ordering::Equal => {
                    // Scan the equal-stamp run for a duplicate.
                    let slot = i;
                    let mut j = slot;
                    while j < chain.len() && chain[j].stamp == snap.stamp {
                        if chain[j].same_instances(&snap) {
                            if j != slot {
                                // Newest-seen duplicate becomes the
                                // canonical head of its time slot.
                                let dup = chain.remove(j);
                                chain.insert(slot, dup);
                            }
                            return IndomStatus::Duplicate;
                        }
                        j += 1;
                    }
                    chain.insert(slot, snap);
                    return IndomStatus::Added;
                }
                std::cmp::Ordering::Greater => i += 1,
            }
        }
    }

    /// First snapshot at or before `tsp`, or the chain head when no
    /// time is given.
    fn search(&self, indom: InDomId, tsp: Option<&Timestamp>) -> Result<&InDomSnapshot> {
        let chain = self.map.get(&indom).ok_or(MetaError::NoInDom(indom))?;
        let snap = match tsp {
            None => chain.first(),
            Some(t) => chain.iter().find(|s| s.stamp <= *t),
        };
        snap.ok_or(MetaError::NoInDom(indom))
    }

    /// Instance ids and names in effect at `tsp` (or newest).
    pub fn get(&self, indom: InDomId, tsp: Option<&Timestamp>) -> Result<(&[i32], &[String])> {
        let snap = self.search(indom, tsp)?;
        Ok((&snap.insts, &snap.names))
    }

    /// Resolve an instance name to its id within the snapshot in
    /// effect at `tsp`. The exact-match pass runs to completion before
    /// the head-prefix fallback begins.
    pub fn lookup_instance(
        &self,
        indom: InDomId,
        tsp: Option<&Timestamp>,
        name: &str,
    ) -> Result<i32> {
        let snap = self.search(indom, tsp)?;
        for (i, cand) in snap.names.iter().enumerate() {
            if cand == name {
                return Ok(snap.insts[i]);
            }
        }
        for (i, cand) in snap.names.iter().enumerate() {
            if head_matches(name, cand) {
                return Ok(snap.insts[i]);
            }
        }
        Err(MetaError::NoInstance(indom))
    }

    /// Resolve an instance id to its name within the snapshot in
    /// effect at `tsp`.
    pub fn instance_name(
        &self,
        indom: InDomId,
        tsp: Option<&Timestamp>,
        inst: i32,
    ) -> Result<&str> {
        let snap = self.search(indom, tsp)?;
        for (i, &id) in snap.insts.iter().enumerate() {
            if id == inst {
                return Ok(&snap.names[i]);
            }
        }
        Err(MetaError::NoInstance(indom))
    }

    /// Resolve a name to an id across every snapshot ever observed for
    /// the indom: exact matches across the whole chain first, then the
    /// head-prefix fallback across the whole chain.
    pub fn lookup_instance_archive(&self, indom: InDomId, name: &str) -> Result<i32> {
        let chain = self.map.get(&indom).ok_or(MetaError::NoInDom(indom))?;
        for snap in chain {
            for (i, cand) in snap.names.iter().enumerate() {
                if cand == name {
                    return Ok(snap.insts[i]);
                }
            }
        }
        for snap in chain {
            for (i, cand) in snap.names.iter().enumerate() {
                if head_matches(name, cand) {
                    return Ok(snap.insts[i]);
                }
            }
        }
        Err(MetaError::NoInstance(indom))
    }

    /// Resolve an id to a name across every snapshot ever observed.
    pub fn instance_name_archive(&self, indom: InDomId, inst: i32) -> Result<&str> {
        let chain = self.map.get(&indom).ok_or(MetaError::NoInDom(indom))?;
        for snap in chain {
            for (i, &id) in snap.insts.iter().enumerate() {
                if id == inst {
                    return Ok(&snap.names[i]);
                }
            }
        }
        Err(MetaError::NoInstance(indom))
    }

    /// Union of all instances ever observed for the indom, newest
    /// snapshot first, first occurrence of each id wins. Chains whose
    /// largest snapshot exceeds the threshold deduplicate through a
    /// hash set; small chains use a linear scan.
    pub fn enumerate(&self, indom: InDomId) -> Result<(Vec<i32>, Vec<String>)> {
        let chain = self.map.get(&indom).ok_or(MetaError::NoInDom(indom))?;
        let big_indom = chain.iter().any(|s| s.insts.len() > HASH_THRESHOLD);

        let mut ids: Vec<i32> = Vec::new();
        let mut names: Vec<String> = Vec::new();
        let mut seen: HashSet<i32> = HashSet::new();
        for snap in chain {
            for (i, &id) in snap.insts.iter().enumerate() {
                let dup = if big_indom {
                    !seen.insert(id)
                } else {
                    ids.contains(&id)
                };
                if dup {
                    continue;
                }
                ids.push(id);
                names.push(snap.names[i].clone());
            }
        }
        Ok((ids, names))
    }

    /// The full chain for an indom, head (newest) first.
    pub fn chain(&self, indom: InDomId) -> Option<&[InDomSnapshot]> {
        self.map.get(&indom).map(|c| c.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
