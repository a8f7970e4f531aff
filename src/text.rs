//! Help-text index: (type, identifier) → newest observed text.

use crate::error::{MetaError, Result};
use crate::two_level::TypeIdentMap;
use crate::types::TEXT_DIRECT;

/// Help-text index. Operators correct help text over time; when an
/// identifier is seen again with different text, the newer copy
/// replaces the stored one.
#[derive(Debug, Default)]
pub struct TextIndex {
    map: TypeIdentMap<String>,
}

impl TextIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// The delivery-hint bit plays no part in indexing.
    fn key(ttype: u32) -> u32 {
        ttype & !TEXT_DIRECT
    }

    /// Store help text, replacing any previous value for the key.
    pub fn add(&mut self, ttype: u32, ident: u32, text: &str) {
        let typ = Self::key(ttype);
        match self.map.get_mut(typ, ident) {
            Some(existing) => {
                if existing != text {
                    *existing = text.to_string();
                }
            }
            None => self.map.insert(typ, ident, text.to_string()),
        }
    }

    pub fn lookup(&self, ttype: u32, ident: u32) -> Result<&str> {
        let typ = Self::key(ttype);
        self.map
            .get(typ, ident)
            .map(|s| s.as_str())
            .ok_or(MetaError::NoText(typ, ident))
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
