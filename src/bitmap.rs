//! Bitmap images for `:artwork` and their temporary staging store.
//!
//! Images are resolved during the build, long before the image section is
//! written, so each one is compressed into a temporary file right away and
//! copied into the output later.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::ZlibEncoder;
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::util::to_u32;

const FILE_HEADER_LEN: usize = 14;
const CORE_HEADER_LEN: u32 = 12;
const COMPRESSION_ZLIB: u8 = 1;

/// A decoded-enough BMP: dimensions plus the raw file.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub width: u16,
    pub height: u16,
    pub bits_per_pixel: u16,
    data: Vec<u8>,
}

impl Bitmap {
    /// Read and check the bitmap at `path`.
    ///
    /// A missing file surfaces as an [`Error::Io`] with `NotFound`, so path
    /// searches can move on to the next directory.
    pub fn open(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(data, path)
    }

    pub fn from_bytes(data: Vec<u8>, path: &Path) -> Result<Self> {
        let invalid = |reason| Error::InvalidBitmap {
            path: path.to_path_buf(),
            reason,
        };
        if data.len() < FILE_HEADER_LEN + 4 || &data[0..2] != b"BM" {
            return Err(invalid("missing BM signature"));
        }
        let info_len = read_u32(&data, FILE_HEADER_LEN).ok_or_else(|| invalid("truncated header"))?;

        let (width, height, bits_per_pixel) = if info_len == CORE_HEADER_LEN {
            let width = read_u16(&data, 18).ok_or_else(|| invalid("truncated header"))?;
            let height = read_u16(&data, 20).ok_or_else(|| invalid("truncated header"))?;
            let bpp = read_u16(&data, 24).ok_or_else(|| invalid("truncated header"))?;
            (u32::from(width), u32::from(height), bpp)
        } else if info_len >= 40 {
            let width = read_u32(&data, 18).ok_or_else(|| invalid("truncated header"))?;
            let height = read_u32(&data, 22).ok_or_else(|| invalid("truncated header"))?;
            let bpp = read_u16(&data, 28).ok_or_else(|| invalid("truncated header"))?;
            // bottom-up bitmaps have a positive height, top-down a negative one
            (width, (height as i32).unsigned_abs(), bpp)
        } else {
            return Err(invalid("unsupported header"));
        };

        if !matches!(bits_per_pixel, 1 | 4 | 8 | 24) {
            return Err(invalid("unsupported color depth"));
        }
        let (Ok(width), Ok(height)) = (u16::try_from(width), u16::try_from(height)) else {
            return Err(invalid("image too large"));
        };
        if width == 0 || height == 0 {
            return Err(invalid("empty image"));
        }

        Ok(Self {
            width,
            height,
            bits_per_pixel,
            data,
        })
    }

    /// Serialize as a compressed image record.
    ///
    /// Layout: `"BM"`, `u32` original size, `u16` width, `u16` height, `u16`
    /// bits per pixel, `u8` compression, `u32` compressed size, data.
    pub fn to_record(&self) -> io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::new(6));
        encoder.write_all(&self.data)?;
        let compressed = encoder.finish()?;

        let mut record = Vec::with_capacity(17 + compressed.len());
        record.extend_from_slice(b"BM");
        record.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        record.extend_from_slice(&self.width.to_le_bytes());
        record.extend_from_slice(&self.height.to_le_bytes());
        record.extend_from_slice(&self.bits_per_pixel.to_le_bytes());
        record.push(COMPRESSION_ZLIB);
        record.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        record.extend_from_slice(&compressed);
        Ok(record)
    }
}

fn read_u16(data: &[u8], at: usize) -> Option<u16> {
    data.get(at..at + 2).map(|b| u16::from_le_bytes([b[0], b[1]]))
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Compressed images staged in a temporary file.
///
/// The file is removed when the store is dropped, whether the compile
/// finished or failed.
#[derive(Debug)]
pub struct BitmapStore {
    file: NamedTempFile,
    /// Image name to offset within the store.
    offsets: BTreeMap<String, u32>,
    len: u64,
}

impl BitmapStore {
    pub fn new() -> Result<Self> {
        let file = NamedTempFile::new()?;
        tracing::debug!("staging images in {}", file.path().display());
        Ok(Self {
            file,
            offsets: BTreeMap::new(),
            len: 0,
        })
    }

    /// Append `bitmap` under `name`. Returns its offset within the store.
    pub fn stage(&mut self, name: &str, bitmap: &Bitmap) -> Result<u32> {
        let record = bitmap.to_record()?;
        let offset = to_u32(self.len);
        self.file.as_file_mut().write_all(&record)?;
        self.len += record.len() as u64;
        self.offsets.insert(name.to_string(), offset);
        Ok(offset)
    }

    pub fn offset(&self, name: &str) -> Option<u32> {
        self.offsets.get(name).copied()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn path(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Copy every staged image to `out`. Returns the number of bytes copied.
    pub fn copy_to<W: Write>(&mut self, out: &mut W) -> Result<u64> {
        let file = self.file.as_file_mut();
        file.flush()?;
        file.seek(SeekFrom::Start(0))?;
        let copied = io::copy(&mut io::Read::take(&mut *file, self.len), out)?;
        file.seek(SeekFrom::End(0))?;
        Ok(copied)
    }
}
