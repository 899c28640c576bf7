//! Synonym definitions from `:isyn`.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::{Seek, Write};

use crate::error::{Error, Result};
use crate::util::{encode_truncated, to_u16, to_u32};

#[derive(Debug, Clone, Default)]
pub struct Synonym {
    pub words: Vec<String>,
    /// Stream offset of the written record; zero until written.
    offset: u32,
}

impl Synonym {
    pub fn new(words: Vec<String>) -> Self {
        Self { words, offset: 0 }
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    fn encoded_words(&self) -> Vec<Vec<u8>> {
        self.words
            .iter()
            .map(|w| encode_truncated(w, u8::MAX as usize - 1).0)
            .collect()
    }

    /// `u16` record size, then each word with a length prefix that counts
    /// itself.
    fn length(&self) -> usize {
        2 + self.encoded_words().iter().map(|w| w.len() + 1).sum::<usize>()
    }
}

/// `root=` key to synonym.
#[derive(Debug, Default)]
pub struct SynonymTable {
    entries: BTreeMap<String, Synonym>,
}

impl SynonymTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails with [`Error::DuplicateSynonym`] if `key` is already defined.
    pub fn insert(&mut self, key: &str, synonym: Synonym) -> Result<()> {
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(_) => Err(Error::DuplicateSynonym(key.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(synonym);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &str) -> Result<&Synonym> {
        self.entries
            .get(key)
            .ok_or_else(|| Error::UnknownSynonym(key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn length(&self) -> usize {
        self.entries.values().map(Synonym::length).sum()
    }

    /// Write every synonym and remember where each one landed, so index
    /// entries written afterwards can point at them.
    pub fn write<W: Write + Seek>(&mut self, out: &mut W) -> Result<()> {
        for synonym in self.entries.values_mut() {
            synonym.offset = to_u32(out.stream_position()?);
            let words = synonym.encoded_words();
            out.write_all(&to_u16(synonym.length()).to_le_bytes())?;
            for word in words {
                out.write_all(&[(word.len() + 1) as u8])?;
                out.write_all(&word)?;
            }
        }
        Ok(())
    }
}
