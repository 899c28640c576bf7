//! Table cells, serialized apart from the page that holds the table.

use std::io::{Seek, Write};

use crate::error::Result;
use crate::registry::GlobalDictionary;
use crate::tree::{LinearItem, encode_body, local_dictionary};
use crate::util::{to_u16, to_u32};

/// Text recorded for a cell while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellText {
    Word(String),
    Space,
    Newline,
}

#[derive(Debug)]
pub struct Cell {
    index: usize,
    /// Page holding the table.
    page: u16,
    text: Vec<CellText>,
    local_dict: Vec<u16>,
    body: Vec<u8>,
}

impl Cell {
    pub fn new(index: usize, page: u16) -> Self {
        Self {
            index,
            page,
            text: Vec::new(),
            local_dict: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn page(&self) -> u16 {
        self.page
    }

    pub fn push_word(&mut self, word: impl Into<String>) {
        self.text.push(CellText::Word(word.into()));
    }

    /// Append a space unless the cell is empty or already ends in one.
    pub fn push_space(&mut self) {
        if !matches!(self.text.last(), None | Some(CellText::Space)) {
            self.text.push(CellText::Space);
        }
    }

    pub fn push_newline(&mut self) {
        self.text.push(CellText::Newline);
    }

    pub fn text(&self) -> &[CellText] {
        &self.text
    }

    pub fn local_dictionary(&self) -> &[u16] {
        &self.local_dict
    }

    /// Resolve words against the numbered dictionary and encode the body.
    pub fn build(&mut self, dict: &mut GlobalDictionary) -> Result<()> {
        let mut items = Vec::with_capacity(self.text.len());
        for text in &self.text {
            items.push(match text {
                CellText::Word(w) => {
                    let id = dict.id_of(w)?;
                    dict.mark_page(id, self.page);
                    LinearItem::Word(id)
                }
                CellText::Space => LinearItem::Space,
                CellText::Newline => LinearItem::Newline,
            });
        }
        self.local_dict = local_dictionary(&items);
        self.body = encode_body(&items, &self.local_dict);
        Ok(())
    }

    /// Serialized length: `u16 dictionary count, u16 ids, u16 body length,
    /// body`.
    pub fn length(&self) -> usize {
        4 + self.local_dict.len() * 2 + self.body.len()
    }

    /// Write the cell. Returns the stream offset it starts at.
    pub fn write<W: Write + Seek>(&self, out: &mut W) -> Result<u32> {
        let offset = to_u32(out.stream_position()?);
        out.write_all(&to_u16(self.local_dict.len()).to_le_bytes())?;
        for id in &self.local_dict {
            out.write_all(&id.to_le_bytes())?;
        }
        out.write_all(&to_u16(self.body.len()).to_le_bytes())?;
        out.write_all(&self.body)?;
        Ok(offset)
    }
}
