//! Linearized page content and its byte encoding.
//!
//! Encoded text uses one byte per word when the word's local dictionary
//! index fits below the control codes:
//!
//! | byte   | meaning                                   |
//! |--------|-------------------------------------------|
//! | < 0xFA | word, local dictionary index              |
//! | 0xFA   | paragraph                                 |
//! | 0xFB   | word, 16-bit local index follows          |
//! | 0xFD   | newline                                   |
//! | 0xFE   | space                                     |
//! | 0xFF   | escape: length, code, data                |

pub const PARAGRAPH: u8 = 0xFA;
pub const WIDE_WORD: u8 = 0xFB;
pub const NEWLINE: u8 = 0xFD;
pub const SPACE: u8 = 0xFE;
pub const ESCAPE: u8 = 0xFF;

/// Largest local index that is written as a single byte.
const MAX_NARROW: usize = PARAGRAPH as usize - 1;

/// One unit of linearized content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinearItem {
    /// Global dictionary id.
    Word(u16),
    Space,
    Newline,
    Paragraph,
    Escape(Escape),
}

/// A formatting or reference instruction embedded in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Escape {
    pub code: u8,
    pub data: Vec<u8>,
}

impl Escape {
    pub const LIST_BEGIN: u8 = 0x01;
    pub const LIST_END: u8 = 0x02;
    pub const LIST_ITEM: u8 = 0x03;
    pub const TABLE_BEGIN: u8 = 0x04;
    pub const TABLE_END: u8 = 0x05;
    pub const ROW: u8 = 0x06;
    pub const CELL: u8 = 0x07;
    pub const IMAGE: u8 = 0x08;
    pub const LINK: u8 = 0x09;
    pub const EXTERNAL_LINK: u8 = 0x0A;
    pub const LINK_END: u8 = 0x0B;
    pub const HIGHLIGHT: u8 = 0x0C;
    pub const FONT: u8 = 0x0D;
    pub const PREFORMAT_BEGIN: u8 = 0x0E;
    pub const PREFORMAT_END: u8 = 0x0F;
    pub const HIDE_BEGIN: u8 = 0x10;
    pub const HIDE_END: u8 = 0x11;
    pub const NOTE: u8 = 0x12;

    pub fn new(code: u8) -> Self {
        Self {
            code,
            data: Vec::new(),
        }
    }

    pub fn with_u8(mut self, v: u8) -> Self {
        self.data.push(v);
        self
    }

    pub fn with_u16(mut self, v: u16) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn with_u32(mut self, v: u32) -> Self {
        self.data.extend_from_slice(&v.to_le_bytes());
        self
    }

    fn encode(&self, out: &mut Vec<u8>) {
        out.push(ESCAPE);
        // length counts the code byte and the data
        out.push((self.data.len() + 1) as u8);
        out.push(self.code);
        out.extend_from_slice(&self.data);
    }
}

/// Encode `items` against `local`, the sorted global ids of the page's
/// local dictionary.
///
/// Words missing from `local` are skipped; callers build `local` from the
/// same items.
pub fn encode_body(items: &[LinearItem], local: &[u16]) -> Vec<u8> {
    let mut out = Vec::with_capacity(items.len() * 2);
    for item in items {
        match item {
            LinearItem::Word(id) => {
                let Ok(index) = local.binary_search(id) else {
                    continue;
                };
                if index <= MAX_NARROW {
                    out.push(index as u8);
                } else {
                    out.push(WIDE_WORD);
                    out.extend_from_slice(&(index as u16).to_le_bytes());
                }
            }
            LinearItem::Space => out.push(SPACE),
            LinearItem::Newline => out.push(NEWLINE),
            LinearItem::Paragraph => out.push(PARAGRAPH),
            LinearItem::Escape(esc) => esc.encode(&mut out),
        }
    }
    out
}

/// Sorted, deduplicated global ids of every word in `items`.
pub fn local_dictionary(items: &[LinearItem]) -> Vec<u16> {
    let mut ids: Vec<u16> = items
        .iter()
        .filter_map(|item| match item {
            LinearItem::Word(id) => Some(*id),
            _ => None,
        })
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_words_and_controls() {
        let items = vec![
            LinearItem::Word(40),
            LinearItem::Space,
            LinearItem::Word(7),
            LinearItem::Newline,
            LinearItem::Paragraph,
        ];
        let local = local_dictionary(&items);
        assert_eq!(local, vec![7, 40]);
        assert_eq!(encode_body(&items, &local), vec![1, SPACE, 0, NEWLINE, PARAGRAPH]);
    }

    #[test]
    fn test_encode_escape() {
        let items = vec![LinearItem::Escape(Escape::new(Escape::CELL).with_u16(0x0102))];
        assert_eq!(encode_body(&items, &[]), vec![ESCAPE, 3, Escape::CELL, 0x02, 0x01]);
    }

    #[test]
    fn test_wide_word_index() {
        let items: Vec<_> = (0..300u16).map(LinearItem::Word).collect();
        let local = local_dictionary(&items);
        let body = encode_body(&items[299..], &local);
        assert_eq!(body, vec![WIDE_WORD, 43, 1]); // 299 = 0x012B
    }
}
