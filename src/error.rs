//! Error types for the archive metadata store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MetaError>;

#[derive(Error, Debug)]
pub enum MetaError {
    #[error("Metadata read failed: {0}")]
    IoRead(#[source] std::io::Error),

    #[error("Metadata write failed: {0}")]
    IoWrite(#[source] std::io::Error),

    #[error("Short read mid-record: wanted {wanted} bytes, got {got}")]
    ShortRead { wanted: usize, got: usize },

    #[error("Bad record length: {0}")]
    BadLength(i32),

    #[error("Record trailer {found} does not match header length {expected}")]
    BadTrailer { expected: u32, found: u32 },

    #[error("Corrupt record: {0}")]
    RecordCorrupt(String),

    #[error("Descriptor redefined with different type: metric {0:#x}")]
    ConflictType(u32),

    #[error("Descriptor redefined with different semantics: metric {0:#x}")]
    ConflictSemantics(u32),

    #[error("Descriptor redefined with different instance domain: metric {0:#x}")]
    ConflictInDom(u32),

    #[error("Descriptor redefined with different units: metric {0:#x}")]
    ConflictUnits(u32),

    #[error("No descriptor for metric {0:#x}")]
    NoDescriptor(u32),

    #[error("No instance domain {0:#x}")]
    NoInDom(u32),

    #[error("No instance in domain {0:#x}")]
    NoInstance(u32),

    #[error("No labels for type {0:#x} ident {1:#x}")]
    NoLabels(u32, u32),

    #[error("No help text for type {0:#x} ident {1:#x}")]
    NoText(u32, u32),

    #[error("Archive metadata contains no metric descriptors")]
    EmptyArchive,
}

impl MetaError {
    /// Get error code for wire protocol
    pub fn code(&self) -> &'static str {
        match self {
            MetaError::IoRead(_) => "IO_READ_FAILED",
            MetaError::IoWrite(_) => "IO_WRITE_FAILED",
            MetaError::ShortRead { .. } => "FRAMING_SHORT_READ",
            MetaError::BadLength(_) => "FRAMING_BAD_LENGTH",
            MetaError::BadTrailer { .. } => "FRAMING_BAD_TRAILER",
            MetaError::RecordCorrupt(_) => "RECORD_CORRUPT",
            MetaError::ConflictType(_) => "CONFLICT_TYPE",
            MetaError::ConflictSemantics(_) => "CONFLICT_SEM",
            MetaError::ConflictInDom(_) => "CONFLICT_INDOM",
            MetaError::ConflictUnits(_) => "CONFLICT_UNITS",
            MetaError::NoDescriptor(_) => "NO_DESCRIPTOR",
            MetaError::NoInDom(_) => "NO_INDOM",
            MetaError::NoInstance(_) => "NO_INSTANCE",
            MetaError::NoLabels(..) => "NO_LABELS",
            MetaError::NoText(..) => "NO_TEXT",
            MetaError::EmptyArchive => "EMPTY_ARCHIVE",
        }
    }
}
