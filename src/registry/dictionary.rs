//! The global dictionary and its full-text search records.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;

use crate::error::{Error, Result};
use crate::util::{encode_truncated, to_u16};

/// Most words a compiled file can hold.
pub const MAX_WORDS: usize = 16_000;

/// Longest word, in encoded bytes. The length prefix counts itself.
const MAX_WORD_BYTES: usize = 254;

/// Sort key for dictionary words: case-folded text first, exact text second.
///
/// The key holds the word as it is stored on disk: encoded to the file's
/// code page and cut to `MAX_WORD_BYTES`, then read back. Words that
/// store the same bytes share one key. Words that differ only in case are
/// distinct entries that sort next to each other.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct WordKey {
    folded: String,
    text: String,
}

impl WordKey {
    pub fn new(text: &str) -> Self {
        let text = stored_form(text);
        Self {
            folded: text.to_lowercase(),
            text,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// How the pages containing one word are recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FtsEncoding {
    /// The word appears on no page.
    None = 0,
    /// The word appears on every page.
    All = 1,
    /// A list of 16-bit page indices.
    List = 3,
    /// One bit per page, lowest page in the low bit of the first byte.
    Bitmap = 5,
}

#[derive(Debug, Clone)]
struct FtsRecord {
    encoding: FtsEncoding,
    data: Vec<u8>,
}

impl FtsRecord {
    fn for_pages(pages: &BTreeSet<u16>, page_count: usize) -> Self {
        if pages.is_empty() {
            return Self {
                encoding: FtsEncoding::None,
                data: Vec::new(),
            };
        }
        if pages.len() == page_count {
            return Self {
                encoding: FtsEncoding::All,
                data: Vec::new(),
            };
        }
        let list_len = pages.len() * 2;
        let bitmap_len = page_count.div_ceil(8);
        if list_len <= bitmap_len {
            let data = pages.iter().flat_map(|p| p.to_le_bytes()).collect();
            Self {
                encoding: FtsEncoding::List,
                data,
            }
        } else {
            let mut data = vec![0u8; bitmap_len];
            for &page in pages {
                data[page as usize / 8] |= 1 << (page % 8);
            }
            Self {
                encoding: FtsEncoding::Bitmap,
                data,
            }
        }
    }

    /// Size of the record with a one-byte size field.
    fn narrow_len(&self) -> usize {
        2 + self.data.len()
    }

    fn len(&self, wide: bool) -> usize {
        self.narrow_len() + usize::from(wide)
    }

    fn write<W: Write>(&self, out: &mut W, wide: bool) -> std::io::Result<()> {
        let len = self.len(wide);
        if wide {
            out.write_all(&to_u16(len).to_le_bytes())?;
        } else {
            out.write_all(&[len as u8])?;
        }
        out.write_all(&[self.encoding as u8])?;
        out.write_all(&self.data)
    }
}

/// Every distinct word of the document.
///
/// Words are inserted while parsing. [`convert`](Self::convert) numbers
/// them by their position in collation order; ids are not available
/// before that.
#[derive(Debug, Default)]
pub struct GlobalDictionary {
    words: BTreeMap<WordKey, Option<u16>>,
    /// Word text by id, filled by `convert`.
    by_id: Vec<String>,
    /// Pages each word appears on, by id.
    pages: Vec<BTreeSet<u16>>,
    fts: Vec<FtsRecord>,
    fts_wide: bool,
}

impl GlobalDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `text` if no word with the same stored form is present.
    pub fn insert(&mut self, text: &str) {
        let key = WordKey::new(text);
        if key.text != text {
            tracing::trace!("word {text:?} stored as {:?}", key.text);
        }
        if !self.words.contains_key(&key) {
            self.words.insert(key, None);
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.words.contains_key(&WordKey::new(text))
    }

    /// Number of distinct words.
    pub fn size(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Assign ids `0..n` in collation order and reset page marks.
    pub fn convert(&mut self) -> Result<()> {
        if self.words.len() > MAX_WORDS {
            return Err(Error::DocumentTooLarge(self.words.len()));
        }
        self.by_id.clear();
        for (n, (key, id)) in self.words.iter_mut().enumerate() {
            *id = Some(n as u16);
            self.by_id.push(key.text.clone());
        }
        self.pages = vec![BTreeSet::new(); self.by_id.len()];
        tracing::debug!("numbered {} dictionary words", self.by_id.len());
        Ok(())
    }

    /// Id of `text`; fails if the word is unknown or not yet numbered.
    pub fn id_of(&self, text: &str) -> Result<u16> {
        self.words
            .get(&WordKey::new(text))
            .copied()
            .flatten()
            .ok_or_else(|| Error::UnknownWord(text.to_string()))
    }

    pub fn id_of_key(&self, key: &WordKey) -> Result<u16> {
        self.words
            .get(key)
            .copied()
            .flatten()
            .ok_or_else(|| Error::UnknownWord(key.text.clone()))
    }

    pub fn word(&self, id: u16) -> Option<&str> {
        self.by_id.get(id as usize).map(String::as_str)
    }

    /// Record that word `id` appears on page `page`.
    pub fn mark_page(&mut self, id: u16, page: u16) {
        if let Some(pages) = self.pages.get_mut(id as usize) {
            pages.insert(page);
        }
    }

    pub fn pages_of(&self, id: u16) -> Option<&BTreeSet<u16>> {
        self.pages.get(id as usize)
    }

    /// Byte length of the dictionary section.
    pub fn length(&self) -> usize {
        self.words
            .keys()
            .map(|k| 1 + encoded_word(&k.text).len())
            .sum()
    }

    /// Write every word in id order, each prefixed by its length.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        for key in self.words.keys() {
            let bytes = encoded_word(&key.text);
            out.write_all(&[(bytes.len() + 1) as u8])?;
            out.write_all(&bytes)?;
        }
        Ok(())
    }

    /// Build one search record per word. Returns whether the records need
    /// 16-bit size fields.
    pub fn build_fts(&mut self, page_count: usize) -> bool {
        self.fts = self
            .pages
            .iter()
            .map(|pages| FtsRecord::for_pages(pages, page_count))
            .collect();
        self.fts_wide = self.fts.iter().any(|r| r.narrow_len() > u8::MAX as usize);
        tracing::debug!(
            "built {} search records (wide: {})",
            self.fts.len(),
            self.fts_wide
        );
        self.fts_wide
    }

    pub fn fts_length(&self) -> usize {
        self.fts.iter().map(|r| r.len(self.fts_wide)).sum()
    }

    pub fn has_fts(&self) -> bool {
        !self.fts.is_empty()
    }

    pub fn write_fts<W: Write>(&self, out: &mut W) -> Result<()> {
        for record in &self.fts {
            record.write(out, self.fts_wide)?;
        }
        Ok(())
    }
}

fn encoded_word(text: &str) -> Vec<u8> {
    encode_truncated(text, MAX_WORD_BYTES).0
}

/// `text` after a trip through the on-disk encoding.
fn stored_form(text: &str) -> String {
    if text.is_ascii() && text.len() <= MAX_WORD_BYTES {
        return text.to_string();
    }
    let bytes = encoded_word(text);
    encoding_rs::WINDOWS_1252
        .decode_without_bom_handling(&bytes)
        .0
        .into_owned()
}
