//! The font table.

use std::io::Write;

use super::Section;
use crate::error::{Error, Result};
use crate::util::encode_truncated;

/// Most fonts a compiled file can name, including the default.
pub const MAX_FONTS: usize = 14;

const FACE_NAME_LEN: usize = 33;

/// Length of one serialized entry.
pub const FONT_ENTRY_LEN: usize = FACE_NAME_LEN + 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontEntry {
    pub face_name: String,
    pub height: u16,
    pub width: u16,
    pub codepage: u16,
}

impl FontEntry {
    pub fn new(face_name: impl Into<String>, height: u16, width: u16, codepage: u16) -> Self {
        Self {
            face_name: face_name.into(),
            height,
            width,
            codepage,
        }
    }

    /// Fixed-width font used for `:xmp` and `:cgraphic` text.
    pub fn default_for(codepage: u16) -> Self {
        Self::new("System Monospaced", 16, 8, codepage)
    }

    /// Parse a `size=HxW` value.
    pub fn parse_size(value: &str) -> Option<(u16, u16)> {
        let (h, w) = value.split_once(['x', 'X'])?;
        Some((h.trim().parse().ok()?, w.trim().parse().ok()?))
    }

    fn write(&self, out: &mut dyn Write) -> Result<()> {
        let mut face = [0u8; FACE_NAME_LEN];
        let (bytes, _) = encode_truncated(&self.face_name, FACE_NAME_LEN - 1);
        face[..bytes.len()].copy_from_slice(&bytes);
        out.write_all(&face)?;
        out.write_all(&self.height.to_le_bytes())?;
        out.write_all(&self.width.to_le_bytes())?;
        out.write_all(&self.codepage.to_le_bytes())?;
        Ok(())
    }
}

/// Fonts referenced by `:font` tags. Entry 0 is always the default font.
#[derive(Debug)]
pub struct FontTable {
    fonts: Vec<FontEntry>,
}

impl FontTable {
    pub fn new(codepage: u16) -> Self {
        Self {
            fonts: vec![FontEntry::default_for(codepage)],
        }
    }

    /// Index of `font`, adding it if new.
    pub fn add(&mut self, font: FontEntry) -> Result<u8> {
        if let Some(index) = self.fonts.iter().position(|f| *f == font) {
            return Ok(index as u8);
        }
        if self.fonts.len() >= MAX_FONTS {
            return Err(Error::TooManyFonts(MAX_FONTS));
        }
        self.fonts.push(font);
        Ok((self.fonts.len() - 1) as u8)
    }

    pub fn get(&self, index: u8) -> Option<&FontEntry> {
        self.fonts.get(index as usize)
    }
}

impl Section for FontTable {
    fn size(&self) -> usize {
        self.fonts.len()
    }

    fn length(&self) -> usize {
        self.fonts.len() * FONT_ENTRY_LEN
    }

    fn write_to(&self, out: &mut dyn Write) -> Result<()> {
        for font in &self.fonts {
            font.write(out)?;
        }
        Ok(())
    }
}
