//! The string table: `:docprof` strings such as `dll=` and `objectname=`.

use std::io::Write;

use super::Section;
use crate::error::Result;
use crate::util::encode_truncated;

#[derive(Debug, Default)]
pub struct StringTable {
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `text`. Returns its position.
    pub fn add(&mut self, text: impl Into<String>) -> usize {
        self.strings.push(text.into());
        self.strings.len() - 1
    }

    pub fn get(&self, position: usize) -> Option<&str> {
        self.strings.get(position).map(String::as_str)
    }

    fn encoded(text: &str) -> Vec<u8> {
        encode_truncated(text, u8::MAX as usize - 1).0
    }
}

impl Section for StringTable {
    fn size(&self) -> usize {
        self.strings.len()
    }

    fn length(&self) -> usize {
        self.strings.iter().map(|s| Self::encoded(s).len() + 1).sum()
    }

    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        for text in &self.strings {
            let bytes = Self::encoded(text);
            out.write_all(&[(bytes.len() + 1) as u8])?;
            out.write_all(&bytes)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strings_are_length_prefixed() {
        let mut table = StringTable::new();
        assert_eq!(table.add("help.dll"), 0);
        assert_eq!(table.add("Obj"), 1);
        let mut out = Vec::new();
        table.write_to(&mut out).unwrap();
        assert_eq!(out.len(), table.length());
        assert_eq!(&out[..2], &[9, b'h']);
        assert_eq!(table.get(1), Some("Obj"));
    }
}
