//! Resource id and name maps from references to table of contents entries.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::Write;

use super::dictionary::{GlobalDictionary, WordKey};
use crate::error::{Error, Result};

/// `res=` number to TOC index.
#[derive(Debug, Default)]
pub struct ResourceMap {
    entries: BTreeMap<u16, u16>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`Error::DuplicateResource`] if `res` is already mapped.
    pub fn insert(&mut self, res: u16, toc: u16) -> Result<()> {
        match self.entries.entry(res) {
            Entry::Occupied(_) => Err(Error::DuplicateResource(res)),
            Entry::Vacant(slot) => {
                slot.insert(toc);
                Ok(())
            }
        }
    }

    pub fn get(&self, res: u16) -> Result<u16> {
        self.entries
            .get(&res)
            .copied()
            .ok_or(Error::UnknownResource(res))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Byte length of the section.
    pub fn length(&self) -> usize {
        self.entries.len() * 4
    }

    /// All keys, then all values, in key order.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        for res in self.entries.keys() {
            out.write_all(&res.to_le_bytes())?;
        }
        for toc in self.entries.values() {
            out.write_all(&toc.to_le_bytes())?;
        }
        Ok(())
    }
}

/// `id=` / `name=` text to TOC index.
///
/// Keys are dictionary words; the section stores their dictionary ids.
#[derive(Debug, Default)]
pub struct NameMap {
    entries: BTreeMap<WordKey, u16>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`Error::DuplicateId`] if `name` is already mapped.
    pub fn insert(&mut self, name: &str, toc: u16) -> Result<()> {
        match self.entries.entry(WordKey::new(name)) {
            Entry::Occupied(_) => Err(Error::DuplicateId(name.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(toc);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<u16> {
        self.entries
            .get(&WordKey::new(name))
            .copied()
            .ok_or_else(|| Error::UnknownId(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn length(&self) -> usize {
        self.entries.len() * 4
    }

    /// Dictionary ids of every key, then every TOC index.
    ///
    /// Keys share the dictionary's collation, so the ids come out ascending.
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
