//! Primary and extended header records.
//!
//! Both are fixed size. The writer emits a zeroed placeholder first and
//! overwrites it once every section offset is known.

use std::io::Write;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::util::{decode_text, encode_truncated};

pub const MAGIC: &[u8; 3] = b"HSP";
pub const HEADER_LEN: usize = 155;
pub const EXT_HEADER_LEN: usize = 64;

pub const FLAG_INF: u8 = 0x01;
pub const FLAG_HELP: u8 = 0x10;

/// Bit of `search_offset` set when full-text records use 16-bit sizes.
pub const SEARCH_WIDE: u32 = 0x8000_0000;

const VERSION: (u8, u8) = (2, 2);
const TITLE_LEN: usize = 48;
const HEADER_RESERVED: usize = 12;
const EXT_RESERVED: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpfHeader {
    pub flags: u8,
    pub header_size: u16,
    pub version: (u8, u8),
    pub toc_count: u16,
    pub toc_offset: u32,
    pub toc_size: u32,
    pub toc_table_offset: u32,
    pub res_count: u16,
    pub res_offset: u32,
    pub name_count: u16,
    pub name_offset: u32,
    pub index_count: u16,
    pub index_offset: u32,
    pub index_size: u32,
    pub icmd_count: u16,
    pub icmd_offset: u32,
    pub icmd_size: u32,
    /// Bit 31 is [`SEARCH_WIDE`].
    pub search_offset: u32,
    pub search_size: u32,
    pub cell_count: u16,
    pub cell_table_offset: u32,
    pub dict_size: u32,
    pub dict_count: u16,
    pub dict_offset: u32,
    pub image_offset: u32,
    pub max_local_dict: u8,
    pub nls_offset: u32,
    pub nls_size: u32,
    pub ext_offset: u32,
    pub title: String,
}

impl IpfHeader {
    pub fn new(flags: u8, title: &str) -> Self {
        Self {
            flags,
            header_size: HEADER_LEN as u16,
            version: VERSION,
            title: title.to_string(),
            ..Self::default()
        }
    }

    pub fn is_inf(&self) -> bool {
        self.flags & FLAG_INF != 0
    }

    pub fn search_is_wide(&self) -> bool {
        self.search_offset & SEARCH_WIDE != 0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(HEADER_LEN);
        b.extend_from_slice(MAGIC);
        b.push(self.flags);
        b.extend_from_slice(&self.header_size.to_le_bytes());
        b.push(self.version.0);
        b.push(self.version.1);
        b.extend_from_slice(&self.toc_count.to_le_bytes());
        b.extend_from_slice(&self.toc_offset.to_le_bytes());
        b.extend_from_slice(&self.toc_size.to_le_bytes());
        b.extend_from_slice(&self.toc_table_offset.to_le_bytes());
        b.extend_from_slice(&self.res_count.to_le_bytes());
        b.extend_from_slice(&self.res_offset.to_le_bytes());
        b.extend_from_slice(&self.name_count.to_le_bytes());
        b.extend_from_slice(&self.name_offset.to_le_bytes());
        b.extend_from_slice(&self.index_count.to_le_bytes());
        b.extend_from_slice(&self.index_offset.to_le_bytes());
        b.extend_from_slice(&self.index_size.to_le_bytes());
        b.extend_from_slice(&self.icmd_count.to_le_bytes());
        b.extend_from_slice(&self.icmd_offset.to_le_bytes());
        b.extend_from_slice(&self.icmd_size.to_le_bytes());
        b.extend_from_slice(&self.search_offset.to_le_bytes());
        b.extend_from_slice(&self.search_size.to_le_bytes());
        b.extend_from_slice(&self.cell_count.to_le_bytes());
        b.extend_from_slice(&self.cell_table_offset.to_le_bytes());
        b.extend_from_slice(&self.dict_size.to_le_bytes());
        b.extend_from_slice(&self.dict_count.to_le_bytes());
        b.extend_from_slice(&self.dict_offset.to_le_bytes());
        b.extend_from_slice(&self.image_offset.to_le_bytes());
        b.push(self.max_local_dict);
        b.extend_from_slice(&self.nls_offset.to_le_bytes());
        b.extend_from_slice(&self.nls_size.to_le_bytes());
        b.extend_from_slice(&self.ext_offset.to_le_bytes());
        b.extend_from_slice(&[0u8; HEADER_RESERVED]);
        let mut title = [0u8; TITLE_LEN];
        let (bytes, _) = encode_truncated(&self.title, TITLE_LEN - 1);
        title[..bytes.len()].copy_from_slice(&bytes);
        b.extend_from_slice(&title);
        b
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::InvalidHeader("header too short"));
        }
        if &data[0..3] != MAGIC {
            return Err(Error::InvalidHeader("missing HSP signature"));
        }
        let mut r = Reader::new(&data[3..]);
        let header = Self {
            flags: r.u8(),
            header_size: r.u16(),
            version: (r.u8(), r.u8()),
            toc_count: r.u16(),
            toc_offset: r.u32(),
            toc_size: r.u32(),
            toc_table_offset: r.u32(),
            res_count: r.u16(),
            res_offset: r.u32(),
            name_count: r.u16(),
            name_offset: r.u32(),
            index_count: r.u16(),
            index_offset: r.u32(),
            index_size: r.u32(),
            icmd_count: r.u16(),
            icmd_offset: r.u32(),
            icmd_size: r.u32(),
            search_offset: r.u32(),
            search_size: r.u32(),
            cell_count: r.u16(),
            cell_table_offset: r.u32(),
            dict_size: r.u32(),
            dict_count: r.u16(),
            dict_offset: r.u32(),
            image_offset: r.u32(),
            max_local_dict: r.u8(),
            nls_offset: r.u32(),
            nls_size: r.u32(),
            ext_offset: r.u32(),
            title: {
                r.skip(HEADER_RESERVED);
                let raw = r.bytes(TITLE_LEN);
                let end = raw.iter().position(|&c| c == 0).unwrap_or(raw.len());
                decode_text(&raw[..end], Some("windows-1252")).into_owned()
            },
        };
        Ok(header)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IpfExtHeader {
    pub font_count: u16,
    pub font_offset: u32,
    pub db_count: u16,
    pub db_offset: u32,
    pub db_size: u32,
    pub gname_count: u16,
    pub gname_offset: u32,
    pub strings_offset: u32,
    pub strings_size: u32,
    pub child_offset: u32,
    pub child_size: u32,
    pub global_index_count: u16,
    pub ctrl_offset: u32,
    pub ctrl_size: u32,
}

impl IpfExtHeader {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut b = Vec::with_capacity(EXT_HEADER_LEN);
        b.extend_from_slice(&self.font_count.to_le_bytes());
        b.extend_from_slice(&self.font_offset.to_le_bytes());
        b.extend_from_slice(&self.db_count.to_le_bytes());
        b.extend_from_slice(&self.db_offset.to_le_bytes());
        b.extend_from_slice(&self.db_size.to_le_bytes());
        b.extend_from_slice(&self.gname_count.to_le_bytes());
        b.extend_from_slice(&self.gname_offset.to_le_bytes());
        b.extend_from_slice(&self.strings_offset.to_le_bytes());
        b.extend_from_slice(&self.strings_size.to_le_bytes());
        b.extend_from_slice(&self.child_offset.to_le_bytes());
        b.extend_from_slice(&self.child_size.to_le_bytes());
        b.extend_from_slice(&self.global_index_count.to_le_bytes());
        b.extend_from_slice(&self.ctrl_offset.to_le_bytes());
        b.extend_from_slice(&self.ctrl_size.to_le_bytes());
        b.extend_from_slice(&[0u8; EXT_RESERVED]);
        b
    }

    pub fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&self.to_bytes())?;
        Ok(())
    }

    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < EXT_HEADER_LEN {
            return Err(Error::InvalidHeader("extended header too short"));
        }
        let mut r = Reader::new(data);
        Ok(Self {
            font_count: r.u16(),
            font_offset: r.u32(),
            db_count: r.u16(),
            db_offset: r.u32(),
            db_size: r.u32(),
            gname_count: r.u16(),
            gname_offset: r.u32(),
            strings_offset: r.u32(),
            strings_size: r.u32(),
            child_offset: r.u32(),
            child_size: r.u32(),
            global_index_count: r.u16(),
            ctrl_offset: r.u32(),
            ctrl_size: r.u32(),
        })
    }
}

/// Sequential little-endian reads over a slice already checked for length.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, n: usize) -> &'a [u8] {
        let end = (self.pos + n).min(self.data.len());
        let slice = &self.data[self.pos.min(end)..end];
        self.pos = end;
        slice
    }

    fn skip(&mut self, n: usize) {
        self.bytes(n);
    }

    fn u8(&mut self) -> u8 {
        self.bytes(1).first().copied().unwrap_or(0)
    }

    fn u16(&mut self) -> u16 {
        match self.bytes(2) {
            [a, b] => u16::from_le_bytes([*a, *b]),
            _ => 0,
        }
    }

    fn u32(&mut self) -> u32 {
        match self.bytes(4) {
            [a, b, c, d] => u32::from_le_bytes([*a, *b, *c, *d]),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_sizes() {
        assert_eq!(IpfHeader::new(FLAG_HELP, "t").to_bytes().len(), HEADER_LEN);
        assert_eq!(IpfExtHeader::default().to_bytes().len(), EXT_HEADER_LEN);
    }

    #[test]
    fn test_header_parse() {
        let mut header = IpfHeader::new(FLAG_INF, "Reference Manual");
        header.toc_count = 3;
        header.toc_offset = 0x1234;
        header.search_offset = 0x200 | SEARCH_WIDE;
        header.max_local_dict = 42;
        header.ext_offset = 999;
        let parsed = IpfHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed, header);
        assert!(parsed.is_inf());
        assert!(parsed.search_is_wide());
    }

    #[test]
    fn test_title_is_cut_to_slot() {
        let header = IpfHeader::new(FLAG_HELP, &"x".repeat(80));
        let parsed = IpfHeader::parse(&header.to_bytes()).unwrap();
        assert_eq!(parsed.title.len(), TITLE_LEN - 1);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = IpfHeader::new(FLAG_HELP, "").to_bytes();
        bytes[0] = b'X';
        assert!(matches!(IpfHeader::parse(&bytes), Err(Error::InvalidHeader(_))));
        assert!(IpfHeader::parse(&bytes[..10]).is_err());
    }

    #[test]
    fn test_ext_header_parse() {
        let ext = IpfExtHeader {
            font_count: 2,
            font_offset: 500,
            child_size: 12,
            ctrl_size: 40,
            ..Default::default()
        };
        assert_eq!(IpfExtHeader::parse(&ext.to_bytes()).unwrap(), ext);
    }
}
