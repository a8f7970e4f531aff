//! archmeta — in-memory metadata store for performance-metrics archives.
//!
//! Parses the binary, length-framed metadata log of an archive (metric
//! descriptors, instance domains, label sets, help text), indexes the
//! records into time-scoped lookup structures, elides the duplicates
//! that multi-archive merges produce, and writes new records back in
//! the versioned wire format.

pub mod error;
pub mod types;
pub mod timestamp;
pub mod units;
pub mod record;
pub mod desc;
pub mod indom;
pub mod labels;
pub mod text;
pub mod two_level;
pub mod namespace;
pub mod store;
mod loader;

pub use error::{MetaError, Result};
pub use types::{MetaConfig, Version, NULL_ID, NULL_INST};
pub use timestamp::Timestamp;
pub use units::Units;
pub use desc::Desc;
pub use indom::{InDomSnapshot, IndomStatus};
pub use labels::{Label, LabelSet};
pub use namespace::{NameRegistry, NameTable};
pub use store::MetaStore;
