//! External help files named by `:link database=`.

use std::collections::BTreeMap;
use std::io::Write;

use super::Section;
use crate::error::Result;
use crate::util::encode_truncated;

/// Distinct database names, numbered by position once converted.
#[derive(Debug, Default)]
pub struct ExternalFiles {
    files: BTreeMap<String, Option<u16>>,
}

impl ExternalFiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str) {
        self.files.entry(name.to_string()).or_insert(None);
    }

    /// Number every file in name order.
    pub fn convert(&mut self) {
        for (n, index) in self.files.values_mut().enumerate() {
            *index = Some(n as u16);
        }
    }

    /// Index of `name`, once converted.
    pub fn index_of(&self, name: &str) -> Option<u16> {
        self.files.get(name).copied().flatten()
    }

    fn encoded(name: &str) -> Vec<u8> {
        encode_truncated(name, u8::MAX as usize - 1).0
    }
}

impl Section for ExternalFiles {
    fn size(&self) -> usize {
        self.files.len()
    }

    fn length(&self) -> usize {
        self.files.keys().map(|n| Self::encoded(n).len() + 1).sum()
    }

    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        for name in self.files.keys() {
            let bytes = Self::encoded(name);
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
    fn test_convert_numbers_by_name() {
        let mut files = ExternalFiles::new();
        files.insert("zoo.hlp");
        files.insert("app.hlp");
        files.insert("zoo.hlp");
        assert_eq!(files.index_of("app.hlp"), None);
        files.convert();
        assert_eq!(files.index_of("app.hlp"), Some(0));
        assert_eq!(files.index_of("zoo.hlp"), Some(1));
        assert_eq!(files.size(), 2);
        assert_eq!(files.length(), 16);
    }
}
