//! Metadata loader: drive the record codec over a stream and dispatch
//! decoded records into the store's indexes.
//!
//! The metadata file starts with the archive's label block; the caller
//! supplies its size and the loader reads sequentially from there to
//! EOF. Clean EOF at a record boundary ends the load; short reads and
//! trailer mismatches are fatal framing errors. After EOF the
//! duplicate-label pruning pass runs and the stream is rewound to the
//! post-label-block offset for subsequent use.

use std::io::{Read, Seek, SeekFrom};

use crate::error::{MetaError, Result};
use crate::namespace::NameRegistry;
use crate::record::{decode_record, MetaRecord, HEADER_SIZE, MIN_RECORD_LEN, TRAILER_SIZE};
use crate::store::MetaStore;

#[derive(Debug)]
struct RecordHeader {
    len: u32,
    tag: u32,
}

/// Fill `buf`, retrying interrupted reads. EOF mid-buffer is a short
/// read.
fn read_fully<F: Read>(f: &mut F, buf: &mut [u8]) -> Result<()> {
    let mut got = 0;
    while got < buf.len() {
        match f.read(&mut buf[got..]) {
            Ok(0) => {
                return Err(MetaError::ShortRead {
                    wanted: buf.len(),
                    got,
                })
            }
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MetaError::IoRead(e)),
        }
    }
    Ok(())
}

/// Read the next record header. `None` means clean EOF at a record
/// boundary; any partial header is a framing error.
fn read_header<F: Read>(f: &mut F) -> Result<Option<RecordHeader>> {
    let mut buf = [0u8; HEADER_SIZE];
    let mut got = 0;
    while got < buf.len() {
        match f.read(&mut buf[got..]) {
            Ok(0) => break,
            Ok(n) => got += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(MetaError::IoRead(e)),
        }
    }
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_SIZE {
        return Err(MetaError::ShortRead {
            wanted: HEADER_SIZE,
            got,
        });
    }
    let len = i32::from_be_bytes(buf[0..4].try_into().unwrap());
    let tag = u32::from_be_bytes(buf[4..8].try_into().unwrap());
    if len < MIN_RECORD_LEN as i32 {
        return Err(MetaError::BadLength(len));
    }
    Ok(Some(RecordHeader {
        len: len as u32,
        tag,
    }))
}

impl MetaStore {
    /// Load the whole metadata stream into the store's indexes.
    ///
    /// `label_block_size` is the byte size of the archive's label
    /// block, supplied by the collaborator that parsed it; loading
    /// starts there. Metric names attached to descriptor records are
    /// registered with `names`.
    ///
    /// Whatever the outcome of the record loop, the duplicate-label
    /// pruning pass runs exactly once and the stream is rewound to
    /// the post-label-block offset. A load that sees no descriptor
    /// records reports the archive as empty.
    pub fn load<F: Read + Seek, N: NameRegistry>(
        &mut self,
        f: &mut F,
        label_block_size: u64,
        names: &mut N,
    ) -> Result<()> {
        f.seek(SeekFrom::Start(label_block_size))
            .map_err(MetaError::IoRead)?;

        let outcome = self.load_records(f, names);

        self.labels.prune_duplicates();
        f.seek(SeekFrom::Start(label_block_size))
            .map_err(MetaError::IoRead)?;

        let ndesc = outcome?;
        if ndesc == 0 {
            return Err(MetaError::EmptyArchive);
        }
        Ok(())
    }

    /// The record loop: header, payload, dispatch, trailer. Returns
    /// the number of descriptor records consumed.
    fn load_records<F: Read, N: NameRegistry>(
        &mut self,
        f: &mut F,
        names: &mut N,
    ) -> Result<usize> {
        let mut ndesc = 0usize;
        loop {
            let hdr = match read_header(f)? {
                Some(h) => h,
                None => return Ok(ndesc),
            };
            tracing::debug!("metadata record len={} tag={}", hdr.len, hdr.tag);

            let rlen = hdr.len as usize - HEADER_SIZE - TRAILER_SIZE;
            let mut payload = vec![0u8; rlen];
            read_fully(f, &mut payload)?;

            match decode_record(hdr.tag, &payload, self.config())? {
                MetaRecord::Desc {
                    desc,
                    names: metric_names,
                } => {
                    ndesc += 1;
                    self.descs.add(&desc)?;
                    for name in &metric_names {
                        names.add_name(desc.pmid, name);
                    }
                }
                MetaRecord::InDom {
                    stamp,
                    indom,
                    insts,
                    names: inst_names,
                } => {
                    // Snapshots without instances carry nothing worth
                    // indexing. Duplicate is a non-error status; the
                    // decoded arrays are simply dropped.
                    if !insts.is_empty() {
                        let _ = self.indoms.add(indom, stamp, insts, inst_names);
                    }
                }
                MetaRecord::Labels {
                    stamp,
                    ltype,
                    ident,
                    sets,
                } => {
                    self.labels.add(ltype, ident, stamp, sets);
                }
                MetaRecord::Text { ttype, ident, text } => {
                    self.text.add(ttype, ident, &text);
                }
                MetaRecord::InDomDelta | MetaRecord::Skip => {}
            }

            let mut tbuf = [0u8; TRAILER_SIZE];
            read_fully(f, &mut tbuf)?;
            let trailer = u32::from_be_bytes(tbuf);
            if trailer != hdr.len {
                return Err(MetaError::BadTrailer {
                    expected: hdr.len,
                    found: trailer,
                });
            }
        }
    }
}
