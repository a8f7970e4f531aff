//! The metadata store: index ownership, the query surface, and the
//! write path.
//!
//! A store belongs to one archive context. The surrounding context
//! layer serializes access; nothing here takes locks. The write path
//! encodes a record, writes it to the caller's stream, and then
//! inserts it into the matching index so reads immediately observe
//! what was written.

use std::io::Write;

use crate::desc::{Desc, DescIndex};
use crate::error::{MetaError, Result};
use crate::indom::{InDomIndex, InDomSnapshot, IndomStatus};
use crate::labels::{LabelIndex, LabelSet, LabelSnapshot};
use crate::record;
use crate::text::TextIndex;
use crate::timestamp::Timestamp;
use crate::types::{InDomId, MetaConfig, MetricId, Version};

/// In-memory metadata store for one archive.
#[derive(Debug)]
pub struct MetaStore {
    version: Version,
    config: MetaConfig,
    pub(crate) descs: DescIndex,
    pub(crate) indoms: InDomIndex,
    pub(crate) labels: LabelIndex,
    pub(crate) text: TextIndex,
}

impl MetaStore {
    /// Create an empty store writing records in the given layout
    /// version. The reader side always accepts both versions.
    pub fn new(version: Version) -> Self {
        Self::with_config(version, MetaConfig::default())
    }

    pub fn with_config(version: Version, config: MetaConfig) -> Self {
        Self {
            version,
            config,
            descs: DescIndex::new(),
            indoms: InDomIndex::new(),
            labels: LabelIndex::new(),
            text: TextIndex::new(),
        }
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub(crate) fn config(&self) -> &MetaConfig {
        &self.config
    }

    // ── Insertion ──────────────────────────────────────────────────

    /// Add a descriptor; a redefinition must match field for field.
    pub fn add_desc(&mut self, desc: &Desc) -> Result<()> {
        self.descs.add(desc)
    }

    /// Add an instance-domain snapshot. `Duplicate` is a status, not
    /// an error: it tells the caller the index kept an existing equal
    /// snapshot and did not adopt the arrays.
    pub fn add_indom(
        &mut self,
        indom: InDomId,
        stamp: Timestamp,
        insts: Vec<i32>,
        names: Vec<String>,
    ) -> IndomStatus {
        self.indoms.add(indom, stamp, insts, names)
    }

    /// Add a label-set snapshot. Duplicates introduced by
    /// multi-archive merges are trimmed by the post-load pass, not
    /// here.
    pub fn add_labels(&mut self, ltype: u32, ident: u32, stamp: Timestamp, sets: Vec<LabelSet>) {
        self.labels.add(ltype, ident, stamp, sets)
    }

    /// Add help text; the newest observed value wins.
    pub fn add_text(&mut self, ttype: u32, ident: u32, text: &str) {
        self.text.add(ttype, ident, text)
    }

    // ── Query surface ──────────────────────────────────────────────

    pub fn lookup_desc(&self, pmid: MetricId) -> Result<&Desc> {
        self.descs.lookup(pmid)
    }

    /// Instance ids and names of an indom as of `tsp`, or the newest
    /// snapshot when `tsp` is `None`.
    pub fn lookup_indom(
        &self,
        indom: InDomId,
        tsp: Option<&Timestamp>,
    ) -> Result<(&[i32], &[String])> {
        self.indoms.get(indom, tsp)
    }

    pub fn lookup_instance_id(
        &self,
        indom: InDomId,
        tsp: Option<&Timestamp>,
        name: &str,
    ) -> Result<i32> {
        self.indoms.lookup_instance(indom, tsp, name)
    }

    pub fn lookup_instance_name(
        &self,
        indom: InDomId,
        tsp: Option<&Timestamp>,
        inst: i32,
    ) -> Result<&str> {
        self.indoms.instance_name(indom, tsp, inst)
    }

    /// Name → id across every snapshot ever observed for the indom.
    pub fn lookup_instance_id_archive(&self, indom: InDomId, name: &str) -> Result<i32> {
        self.indoms.lookup_instance_archive(indom, name)
    }

    /// Id → name across every snapshot ever observed for the indom.
    pub fn lookup_instance_name_archive(&self, indom: InDomId, inst: i32) -> Result<&str> {
        self.indoms.instance_name_archive(indom, inst)
    }

    pub fn lookup_label(
        &self,
        ltype: u32,
        ident: u32,
        tsp: Option<&Timestamp>,
    ) -> Result<&[LabelSet]> {
        self.labels.lookup(ltype, ident, tsp)
    }

    pub fn lookup_text(&self, ttype: u32, ident: u32) -> Result<&str> {
        self.text.lookup(ttype, ident)
    }

    /// Union of all instances ever observed for an indom.
    pub fn enumerate_indom(&self, indom: InDomId) -> Result<(Vec<i32>, Vec<String>)> {
        self.indoms.enumerate(indom)
    }

    /// All descriptors, for bulk dumps.
    pub fn descriptors(&self) -> impl Iterator<Item = &Desc> {
        self.descs.iter()
    }

    /// Full snapshot chain of an indom, newest first.
    pub fn indom_chain(&self, indom: InDomId) -> Option<&[InDomSnapshot]> {
        self.indoms.chain(indom)
    }

    /// Full snapshot chain for a label (type, identifier), newest
    /// first.
    pub fn label_chain(&self, ltype: u32, ident: u32) -> Option<&[LabelSnapshot]> {
        self.labels.chain(ltype, ident)
    }

    // ── Write path ─────────────────────────────────────────────────

    /// Write a descriptor record (with its metric names) and index
    /// the descriptor.
    pub fn put_desc<W: Write>(&mut self, w: &mut W, desc: &Desc, names: &[String]) -> Result<()> {
        let bytes = record::encode_desc(desc, names);
        w.write_all(&bytes).map_err(MetaError::IoWrite)?;
        self.descs.add(desc)
    }

    /// Write an instance-domain record and index the snapshot. The
    /// on-disk copy keeps the caller's array order; the indexed copy
    /// is normalized.
    pub fn put_indom<W: Write>(
        &mut self,
        w: &mut W,
        indom: InDomId,
        stamp: Timestamp,
        insts: Vec<i32>,
        names: Vec<String>,
    ) -> Result<IndomStatus> {
        let bytes = record::encode_indom(self.version, &stamp, indom, &insts, &names);
        w.write_all(&bytes).map_err(MetaError::IoWrite)?;
        Ok(self.indoms.add(indom, stamp, insts, names))
    }

    /// Write a label record and index the snapshot.
    pub fn put_label<W: Write>(
        &mut self,
        w: &mut W,
        ltype: u32,
        ident: u32,
        stamp: Timestamp,
        sets: Vec<LabelSet>,
    ) -> Result<()> {
        let bytes = record::encode_labels(self.version, &stamp, ltype, ident, &sets);
        w.write_all(&bytes).map_err(MetaError::IoWrite)?;
        self.labels.add(ltype, ident, stamp, sets);
        Ok(())
    }

    /// Write a help-text record; `cached` controls whether it is also
    /// indexed (pass-through writers skip the index).
    pub fn put_text<W: Write>(
        &mut self,
        w: &mut W,
        ttype: u32,
        ident: u32,
        text: &str,
        cached: bool,
    ) -> Result<()> {
        debug_assert!(
            ttype & (crate::types::TEXT_ONELINE | crate::types::TEXT_HELP) != 0
                && ttype & (crate::types::TEXT_PMID | crate::types::TEXT_INDOM) != 0,
            "help-text type must carry a class and an ident qualifier"
        );
        let bytes = record::encode_text(ttype, ident, text);
        w.write_all(&bytes).map_err(MetaError::IoWrite)?;
        if cached {
            self.text.add(ttype, ident, text);
        }
        Ok(())
    }
}
