//! Global names: page ids that other help files may link to.

use std::collections::BTreeMap;
use std::io::Write;

use super::dictionary::{GlobalDictionary, WordKey};
use crate::error::Result;

/// Ids of headers marked `global`, kept in dictionary order.
#[derive(Debug, Default)]
pub struct GlobalNames {
    entries: BTreeMap<WordKey, u16>,
}

impl GlobalNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniqueness is enforced by the name map the same id also goes into.
    pub fn insert(&mut self, name: &str, toc: u16) {
        self.entries.insert(WordKey::new(name), toc);
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn length(&self) -> usize {
        self.entries.len() * 4
    }

    pub fn write<W: Write>(&self, out: &mut W, dict: &GlobalDictionary) -> Result<()> {
        for key in self.entries.keys() {
            out.write_all(&dict.id_of_key(key)?.to_le_bytes())?;
        }
        for toc in self.entries.values() {
            out.write_all(&toc.to_le_bytes())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_in_dictionary_order() {
        let mut dict = GlobalDictionary::new();
        dict.insert("setup");
        dict.insert("api");
        dict.convert().unwrap();

        let mut names = GlobalNames::new();
        names.insert("setup", 5);
        names.insert("api", 2);
        let mut out = Vec::new();
        names.write(&mut out, &dict).unwrap();
        assert_eq!(out, vec![0, 0, 1, 0, 2, 0, 5, 0]);
        assert_eq!(out.len(), names.length());
    }
}
