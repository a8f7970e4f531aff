//! Record codec for the archive metadata log.
//!
//! Every on-disk record is length-framed:
//! ```text
//! Offset  Size  Field
//! 0       4     len: u32 BE (whole record, header and trailer included)
//! 4       4     type tag: u32 BE
//! 8       ...   payload
//! len-4   4     trailer: u32 BE, must equal len
//! ```
//! A record is valid only when the header length is positive and the
//! trailer repeats it. Clean EOF at a header boundary terminates a
//! load; a short read anywhere else is a framing error.

use crate::desc::Desc;
use crate::error::{MetaError, Result};
use crate::labels::{Label, LabelSet};
use crate::timestamp::Timestamp;
use crate::types::*;
use crate::units::Units;

/// Record header size: len + type tag.
pub const HEADER_SIZE: usize = 8;

/// Trailing length field size.
pub const TRAILER_SIZE: usize = 4;

/// Smallest framed record: header plus trailer, empty payload.
pub const MIN_RECORD_LEN: usize = HEADER_SIZE + TRAILER_SIZE;

// ── Record types ───────────────────────────────────────────────────

/// The closed set of on-disk record type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    Desc,
    InDomV2,
    LabelV2,
    Text,
    InDom,
    InDomDelta,
    Label,
}

impl RecordType {
    pub fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            TAG_DESC => Some(Self::Desc),
            TAG_INDOM_V2 => Some(Self::InDomV2),
            TAG_LABEL_V2 => Some(Self::LabelV2),
            TAG_TEXT => Some(Self::Text),
            TAG_INDOM => Some(Self::InDom),
            TAG_INDOM_DELTA => Some(Self::InDomDelta),
            TAG_LABEL => Some(Self::Label),
            _ => None,
        }
    }

    pub fn tag(self) -> u32 {
        match self {
            Self::Desc => TAG_DESC,
            Self::InDomV2 => TAG_INDOM_V2,
            Self::LabelV2 => TAG_LABEL_V2,
            Self::Text => TAG_TEXT,
            Self::InDom => TAG_INDOM,
            Self::InDomDelta => TAG_INDOM_DELTA,
            Self::Label => TAG_LABEL,
        }
    }
}

/// A decoded metadata record. Version-2 and current encodings of the
/// same record kind decode to the same variant.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaRecord {
    Desc {
        desc: Desc,
        names: Vec<String>,
    },
    InDom {
        stamp: Timestamp,
        indom: InDomId,
        insts: Vec<i32>,
        names: Vec<String>,
    },
    /// Reserved delta form; payload read and discarded.
    InDomDelta,
    Labels {
        stamp: Timestamp,
        ltype: u32,
        ident: u32,
        sets: Vec<LabelSet>,
    },
    Text {
        ttype: u32,
        ident: u32,
        text: String,
    },
    /// Unknown tag or malformed (non-fatal) record; payload consumed.
    Skip,
}

// ── Byte cursor ────────────────────────────────────────────────────

/// Bounds-checked cursor over one record payload.
pub(crate) struct Frame<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Frame<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        if self.remaining() < n {
            return Err(MetaError::RecordCorrupt(format!(
                "payload shorter than declared structure: wanted {} bytes, {} left",
                n,
                self.remaining()
            )));
        }
        let s = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    pub fn u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn i32(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    pub fn i64(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Timestamp in the encoding the record version dictates.
    pub fn stamp(&mut self, version: Version) -> Result<Timestamp> {
        match version {
            Version::V2 => {
                let sec = self.i32()?;
                let usec = self.i32()?;
                Ok(Timestamp::from_sec_usec(sec, usec))
            }
            Version::V3 => {
                let sec = self.i64()?;
                let nsec = self.u32()?;
                Ok(Timestamp::new(sec, nsec))
            }
        }
    }
}

fn utf8(bytes: &[u8], what: &str) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| MetaError::RecordCorrupt(format!("{} is not valid UTF-8", what)))
}

// ── Decoders ───────────────────────────────────────────────────────

/// Decode one payload according to its type tag. Unknown tags and
/// malformed text records come back as `MetaRecord::Skip`.
pub fn decode_record(tag: u32, payload: &[u8], cfg: &MetaConfig) -> Result<MetaRecord> {
    match RecordType::from_tag(tag) {
        Some(RecordType::Desc) => decode_desc(payload),
        Some(RecordType::InDom) => decode_indom(payload, Version::V3),
        Some(RecordType::InDomV2) => decode_indom(payload, Version::V2),
        Some(RecordType::Label) => decode_labels(payload, Version::V3, cfg),
        Some(RecordType::LabelV2) => decode_labels(payload, Version::V2, cfg),
        Some(RecordType::Text) => Ok(decode_text(payload)),
        Some(RecordType::InDomDelta) => Ok(MetaRecord::InDomDelta),
        None => {
            tracing::debug!("skipping unknown metadata record tag {}", tag);
            Ok(MetaRecord::Skip)
        }
    }
}

/// Descriptor payload: the 20-byte fixed structure, a name count, then
/// `count` length-prefixed names (not NUL-terminated on disk).
pub fn decode_desc(payload: &[u8]) -> Result<MetaRecord> {
    let mut f = Frame::new(payload);
    let pmid = f.u32()?;
    let typ = f.i32()?;
    let indom = f.u32()?;
    let sem = f.i32()?;
    let units = Units::unpack(f.u32()?);
    let desc = Desc {
        pmid,
        typ,
        indom,
        sem,
        units,
    };

    let numnames = f.u32()? as usize;
    // Each name needs at least its length prefix.
    if numnames > f.remaining() / 4 {
        return Err(MetaError::RecordCorrupt(format!(
            "descriptor claims {} names in {} bytes",
            numnames,
            f.remaining()
        )));
    }
    let mut names = Vec::with_capacity(numnames);
    for _ in 0..numnames {
        let len = f.u32()? as usize;
        names.push(utf8(f.take(len)?, "metric name")?);
    }
    Ok(MetaRecord::Desc { desc, names })
}

/// Instance-domain payload: timestamp (version-dependent), indom id,
/// instance count, `count` instance ids, `count` name offsets, then a
/// packed block of NUL-terminated names the offsets point into.
pub fn decode_indom(payload: &[u8], version: Version) -> Result<MetaRecord> {
    let mut f = Frame::new(payload);
    let stamp = f.stamp(version)?;
    let indom = f.u32()?;
    let ninst = f.i32()?;
    if ninst < 0 {
        return Err(MetaError::RecordCorrupt(format!(
            "negative instance count {} for indom {:#x}",
            ninst, indom
        )));
    }
    let ninst = ninst as usize;
    // ids + offsets, before the name block starts
    if ninst > f.remaining() / 8 {
        return Err(MetaError::RecordCorrupt(format!(
            "indom {:#x} claims {} instances in {} bytes",
            indom,
            ninst,
            f.remaining()
        )));
    }

    let mut insts = Vec::with_capacity(ninst);
    for _ in 0..ninst {
        insts.push(f.i32()?);
    }
    let mut offsets = Vec::with_capacity(ninst);
    for _ in 0..ninst {
        offsets.push(f.u32()? as usize);
    }

    let strsec = f.take(f.remaining())?;
    let mut names = Vec::with_capacity(ninst);
    for (i, &off) in offsets.iter().enumerate() {
        if off >= strsec.len() {
            return Err(MetaError::RecordCorrupt(format!(
                "name offset {} out of range for instance {} of indom {:#x}",
                off, insts[i], indom
            )));
        }
        let rest = &strsec[off..];
        let end = rest.iter().position(|&b| b == 0).ok_or_else(|| {
            MetaError::RecordCorrupt(format!(
                "unterminated instance name in indom {:#x}",
                indom
            ))
        })?;
        names.push(utf8(&rest[..end], "instance name")?);
    }
    Ok(MetaRecord::InDom {
        stamp,
        indom,
        insts,
        names,
    })
}

/// Fixed label tuple size on disk: five 32-bit fields.
const LABEL_TUPLE_SIZE: usize = 20;

/// Label payload: timestamp, label type, identifier, set count, then
/// per set (instance, json length, json bytes, label count, tuples).
pub fn decode_labels(payload: &[u8], version: Version, cfg: &MetaConfig) -> Result<MetaRecord> {
    let mut f = Frame::new(payload);
    let stamp = f.stamp(version)?;
    let ltype = f.u32()?;
    let ident = f.u32()?;
    let nsets = f.i32()?;
    if nsets < 0 || nsets as usize > f.remaining() / 12 + 1 {
        return Err(MetaError::RecordCorrupt(format!(
            "bad label set count {} for type {:#x} ident {:#x}",
            nsets, ltype, ident
        )));
    }

    let mut sets = Vec::with_capacity(nsets as usize);
    for _ in 0..nsets {
        let inst = f.i32()?;

        let jsonlen = f.i32()?;
        if jsonlen < 0 || jsonlen as usize > cfg.max_label_json {
            tracing::warn!("corrupt label set json: jsonlen={}", jsonlen);
            return Err(MetaError::RecordCorrupt(format!(
                "label json length {} outside 0..={}",
                jsonlen, cfg.max_label_json
            )));
        }
        let json = utf8(f.take(jsonlen as usize)?, "label json")?;

        let nlabels = f.i32()?;
        if nlabels < 0
            || nlabels as usize > cfg.max_labels
            || nlabels as usize * LABEL_TUPLE_SIZE > f.remaining()
        {
            tracing::warn!("corrupt label set: nlabels={}", nlabels);
            return Err(MetaError::RecordCorrupt(format!(
                "label count {} outside 0..={} or past record end",
                nlabels, cfg.max_labels
            )));
        }
        let mut labels = Vec::with_capacity(nlabels as usize);
        for _ in 0..nlabels {
            labels.push(Label {
                name: f.u32()?,
                namelen: f.u32()?,
                value: f.u32()?,
                valuelen: f.u32()?,
                flags: f.u32()?,
            });
        }
        sets.push(LabelSet { inst, json, labels });
    }
    Ok(MetaRecord::Labels {
        stamp,
        ltype,
        ident,
        sets,
    })
}

/// Text payload: type, identifier, NUL-terminated body. A record whose
/// type bits are inconsistent, or whose body is missing its terminator
/// or is not UTF-8, is skipped rather than failing the load.
pub fn decode_text(payload: &[u8]) -> MetaRecord {
    let mut f = Frame::new(payload);
    let (ttype, ident) = match (f.u32(), f.u32()) {
        (Ok(t), Ok(i)) => (t, i),
        _ => {
            tracing::warn!("short help-text record skipped");
            return MetaRecord::Skip;
        }
    };

    let class = ttype & (TEXT_ONELINE | TEXT_HELP);
    if class != TEXT_ONELINE && class != TEXT_HELP {
        tracing::warn!("bad help-text type {:#x} skipped", ttype);
        return MetaRecord::Skip;
    }
    let target = ttype & (TEXT_PMID | TEXT_INDOM);
    if target != TEXT_PMID && target != TEXT_INDOM {
        tracing::warn!("bad help-text ident qualifier {:#x} skipped", ttype);
        return MetaRecord::Skip;
    }

    let body = &payload[8..];
    let end = match body.iter().position(|&b| b == 0) {
        Some(e) => e,
        None => {
            tracing::warn!("unterminated help text for ident {:#x} skipped", ident);
            return MetaRecord::Skip;
        }
    };
    match std::str::from_utf8(&body[..end]) {
        Ok(s) => MetaRecord::Text {
            ttype,
            ident,
            text: s.to_string(),
        },
        Err(_) => {
            tracing::warn!("non-UTF-8 help text for ident {:#x} skipped", ident);
            MetaRecord::Skip
        }
    }
}

// ── Encoders ───────────────────────────────────────────────────────

/// Wrap a payload in the length-framed envelope. The trailer always
/// repeats the header length.
fn frame_record(tag: u32, payload: &[u8]) -> Vec<u8> {
    let len = (HEADER_SIZE + payload.len() + TRAILER_SIZE) as u32;
    let mut out = Vec::with_capacity(len as usize);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(&tag.to_be_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(&len.to_be_bytes());
    out
}

fn put_stamp(out: &mut Vec<u8>, stamp: &Timestamp, version: Version) {
    match version {
        Version::V2 => stamp.encode_v2(out),
        Version::V3 => stamp.encode_v3(out),
    }
}

/// Encode a descriptor record with its associated metric names.
pub fn encode_desc(desc: &Desc, names: &[String]) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&desc.pmid.to_be_bytes());
    p.extend_from_slice(&desc.typ.to_be_bytes());
    p.extend_from_slice(&desc.indom.to_be_bytes());
    p.extend_from_slice(&desc.sem.to_be_bytes());
    p.extend_from_slice(&desc.units.pack().to_be_bytes());
    p.extend_from_slice(&(names.len() as u32).to_be_bytes());
    for name in names {
        p.extend_from_slice(&(name.len() as u32).to_be_bytes());
        p.extend_from_slice(name.as_bytes());
    }
    frame_record(TAG_DESC, &p)
}

/// Encode an instance-domain snapshot record in the given layout
/// version. Arrays are written as supplied; normalization is the
/// index's concern.
pub fn encode_indom(
    version: Version,
    stamp: &Timestamp,
    indom: InDomId,
    insts: &[i32],
    names: &[String],
) -> Vec<u8> {
    debug_assert_eq!(insts.len(), names.len());
    let mut p = Vec::new();
    put_stamp(&mut p, stamp, version);
    p.extend_from_slice(&indom.to_be_bytes());
    p.extend_from_slice(&(insts.len() as i32).to_be_bytes());
    for &inst in insts {
        p.extend_from_slice(&inst.to_be_bytes());
    }
    let mut off = 0u32;
    for name in names {
        p.extend_from_slice(&off.to_be_bytes());
        off += name.len() as u32 + 1;
    }
    for name in names {
        p.extend_from_slice(name.as_bytes());
        p.push(0);
    }
    let tag = match version {
        Version::V2 => TAG_INDOM_V2,
        Version::V3 => TAG_INDOM,
    };
    frame_record(tag, &p)
}

/// Encode a label-set snapshot record in the given layout version.
pub fn encode_labels(
    version: Version,
    stamp: &Timestamp,
    ltype: u32,
    ident: u32,
    sets: &[LabelSet],
) -> Vec<u8> {
    let mut p = Vec::new();
    put_stamp(&mut p, stamp, version);
    p.extend_from_slice(&ltype.to_be_bytes());
    p.extend_from_slice(&ident.to_be_bytes());
    p.extend_from_slice(&(sets.len() as i32).to_be_bytes());
    for set in sets {
        p.extend_from_slice(&set.inst.to_be_bytes());
        p.extend_from_slice(&(set.json.len() as i32).to_be_bytes());
        p.extend_from_slice(set.json.as_bytes());
        p.extend_from_slice(&(set.labels.len() as i32).to_be_bytes());
        for l in &set.labels {
            p.extend_from_slice(&l.name.to_be_bytes());
            p.extend_from_slice(&l.namelen.to_be_bytes());
            p.extend_from_slice(&l.value.to_be_bytes());
            p.extend_from_slice(&l.valuelen.to_be_bytes());
            p.extend_from_slice(&l.flags.to_be_bytes());
        }
    }
    let tag = match version {
        Version::V2 => TAG_LABEL_V2,
        Version::V3 => TAG_LABEL,
    };
    frame_record(tag, &p)
}

/// Encode a help-text record. The body is NUL-terminated on disk.
pub fn encode_text(ttype: u32, ident: u32, text: &str) -> Vec<u8> {
    let mut p = Vec::new();
    p.extend_from_slice(&ttype.to_be_bytes());
    p.extend_from_slice(&ident.to_be_bytes());
    p.extend_from_slice(text.as_bytes());
    p.push(0);
    frame_record(TAG_TEXT, &p)
}
