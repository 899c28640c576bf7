//! Index entries (`:i1`, `:i2`) and index commands (`:icmd`).

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::io::Write;

use super::synonym::SynonymTable;
use crate::error::{Error, Result};
use crate::util::{encode_truncated, to_u16};

const FLAG_SECONDARY: u8 = 0x02;
const FLAG_GLOBAL: u8 = 0x40;
const FLAG_SYNONYMS: u8 = 0x80;

const MAX_TEXT_BYTES: usize = u8::MAX as usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryEntry {
    pub text: String,
    pub page: u16,
}

/// A primary index entry and the secondary entries attached to it.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub text: String,
    /// Page that defined the entry.
    pub page: u16,
    pub global: bool,
    /// Synonym keys from `roots=`.
    pub roots: Vec<String>,
    pub secondaries: Vec<SecondaryEntry>,
    sort_key: String,
}

impl IndexEntry {
    pub fn new(text: impl Into<String>, page: u16) -> Self {
        let text = text.into();
        Self {
            sort_key: text.to_lowercase(),
            text,
            page,
            global: false,
            roots: Vec::new(),
            secondaries: Vec::new(),
        }
    }

    pub fn with_global(mut self, global: bool) -> Self {
        self.global = global;
        self
    }

    pub fn with_roots(mut self, roots: Vec<String>) -> Self {
        self.roots = roots;
        self
    }

    pub fn secondary_count(&self) -> usize {
        self.secondaries.len()
    }

    /// Write the entry followed by its secondaries. Returns bytes written.
    ///
    /// Each record is `u8 text length, u8 flags, u8 synonym count, u16 page,
    /// text, u32 synonym offsets`.
    fn write<W: Write>(&self, out: &mut W, synonyms: &SynonymTable) -> Result<usize> {
        let offsets = self
            .roots
            .iter()
            .map(|key| synonyms.get(key).map(|s| s.offset()))
            .collect::<Result<Vec<_>>>()?;

        let mut flags = 0;
        if self.global {
            flags |= FLAG_GLOBAL;
        }
        if !offsets.is_empty() {
            flags |= FLAG_SYNONYMS;
        }
        let mut written = write_record(out, &self.text, flags, self.page, &offsets)?;
        for secondary in &self.secondaries {
            written += write_record(out, &secondary.text, FLAG_SECONDARY, secondary.page, &[])?;
        }
        Ok(written)
    }
}

fn write_record<W: Write>(
    out: &mut W,
    text: &str,
    flags: u8,
    page: u16,
    synonyms: &[u32],
) -> Result<usize> {
    let (bytes, _) = encode_truncated(text, MAX_TEXT_BYTES);
    out.write_all(&[bytes.len() as u8, flags, synonyms.len().min(255) as u8])?;
    out.write_all(&page.to_le_bytes())?;
    out.write_all(&bytes)?;
    for offset in synonyms.iter().take(255) {
        out.write_all(&offset.to_le_bytes())?;
    }
    Ok(5 + bytes.len() + synonyms.len().min(255) * 4)
}

/// An `:icmd` entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct IndexCommand {
    sort_key: String,
    pub text: String,
    pub page: u16,
}

impl IndexCommand {
    pub fn new(text: impl Into<String>, page: u16) -> Self {
        let text = text.into();
        Self {
            sort_key: text.to_lowercase(),
            text,
            page,
        }
    }

    /// `u16 page, u8 text length, text`.
    fn write<W: Write>(&self, out: &mut W) -> Result<usize> {
        let (bytes, _) = encode_truncated(&self.text, MAX_TEXT_BYTES);
        out.write_all(&self.page.to_le_bytes())?;
        out.write_all(&[bytes.len() as u8])?;
        out.write_all(&bytes)?;
        Ok(3 + bytes.len())
    }
}

/// All index entries and index commands of the document.
#[derive(Debug, Default)]
pub struct IndexTable {
    entries: Vec<IndexEntry>,
    commands: Vec<IndexCommand>,
    /// `id=` of primary entries, to their position before sorting.
    ids: BTreeMap<String, usize>,
}

impl IndexTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a primary entry. Returns its position, valid until [`sort`](Self::sort).
    pub fn add_entry(&mut self, entry: IndexEntry, id: Option<&str>) -> Result<usize> {
        let position = self.entries.len();
        if let Some(id) = id {
            match self.ids.entry(id.to_string()) {
                Entry::Occupied(_) => return Err(Error::DuplicateIndexId(id.to_string())),
                Entry::Vacant(slot) => {
                    slot.insert(position);
                }
            }
        }
        self.entries.push(entry);
        Ok(position)
    }

    pub fn add_command(&mut self, command: IndexCommand) {
        self.commands.push(command);
    }

    /// Attach a secondary entry to the primary entry with id `refid`.
    pub fn add_secondary(&mut self, refid: &str, secondary: SecondaryEntry) -> Result<()> {
        let position = *self
            .ids
            .get(refid)
            .ok_or_else(|| Error::UnknownIndexId(refid.to_string()))?;
        if let Some(entry) = self.entries.get_mut(position) {
            entry.secondaries.push(secondary);
        }
        Ok(())
    }

    pub fn entry(&self, position: usize) -> Option<&IndexEntry> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn commands(&self) -> &[IndexCommand] {
        &self.commands
    }

    /// Sort entries and commands by key. Entry ids no longer apply after
    /// this.
    pub fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            a.sort_key
                .cmp(&b.sort_key)
                .then_with(|| a.text.cmp(&b.text))
        });
        self.commands.sort();
        self.ids.clear();
    }

    /// Record positions of the entries defined on each page, indexed by
    /// page.
    ///
    /// Positions count records as [`write_entries`](Self::write_entries)
    /// lays them out: each primary entry followed by its secondaries. A
    /// secondary belongs to the page that defined it, not to its primary's.
    pub fn positions_by_page(&self, page_count: usize) -> Vec<Vec<u16>> {
        let mut out = vec![Vec::new(); page_count];
        let pages = self
            .entries
            .iter()
            .flat_map(|e| std::iter::once(e.page).chain(e.secondaries.iter().map(|s| s.page)));
        for (record, page) in pages.enumerate() {
            if let Some(list) = out.get_mut(page as usize) {
                list.push(to_u16(record));
            }
        }
        out
    }

    /// Primary plus secondary entries.
    pub fn entry_count(&self) -> usize {
        self.entries.iter().map(|e| 1 + e.secondary_count()).sum()
    }

    pub fn global_count(&self) -> usize {
        self.entries.iter().filter(|e| e.global).count()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    /// Write every entry. Returns the section size.
    pub fn write_entries<W: Write>(&self, out: &mut W, synonyms: &SynonymTable) -> Result<usize> {
        let mut size = 0;
        for entry in &self.entries {
            size += entry.write(out, synonyms)?;
        }
        Ok(size)
    }

    /// Write every command. Returns the section size.
    pub fn write_commands<W: Write>(&self, out: &mut W) -> Result<usize> {
        let mut size = 0;
        for command in &self.commands {
            size += command.write(out)?;
        }
        Ok(size)
    }
}
