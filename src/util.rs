//! Text conversion and search-path helpers.

use std::borrow::Cow;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Decode bytes to a string, handling various encodings.
///
/// This function:
/// 1. First tries UTF-8 (handles BOM automatically via encoding_rs)
/// 2. If malformed, tries the hint encoding
/// 3. Falls back to Windows-1252 (common in old IPF sources)
///
/// Uses `Cow<str>` to avoid allocation when the input is valid UTF-8.
pub fn decode_text<'a>(bytes: &'a [u8], hint_encoding: Option<&str>) -> Cow<'a, str> {
    let (result, _encoding, malformed) = encoding_rs::UTF_8.decode(bytes);

    if !malformed {
        return result;
    }

    if let Some(name) = hint_encoding
        && let Some(encoding) = encoding_rs::Encoding::for_label(name.as_bytes())
    {
        let (result, _, _) = encoding.decode(bytes);
        return result;
    }

    let (result, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
    result
}

/// Encode text into the single-byte code page stored in compiled files.
///
/// Characters with no mapping are replaced by `?` rather than the numeric
/// character references encoding_rs produces.
pub fn encode_text(text: &str) -> Cow<'_, [u8]> {
    if text.is_ascii() {
        return Cow::Borrowed(text.as_bytes());
    }
    let mut out = Vec::with_capacity(text.len());
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(c.encode_utf8(&mut buf));
        if unmappable {
            out.push(b'?');
        } else {
            out.extend_from_slice(&bytes);
        }
    }
    Cow::Owned(out)
}

/// Encode `text` and cut it to at most `max` bytes.
///
/// Returns the bytes and whether anything was cut.
pub fn encode_truncated(text: &str, max: usize) -> (Vec<u8>, bool) {
    let mut bytes = encode_text(text).into_owned();
    let truncated = bytes.len() > max;
    bytes.truncate(max);
    (bytes, truncated)
}

/// Try `name` in each directory of `dirs`, in order.
///
/// `open` is called with each candidate path. A `NotFound` failure moves on
/// to the next directory; any other failure is returned at once. When every
/// candidate is missing the result is [`Error::FileNotFound`]. An empty
/// search list means the current directory.
pub fn resolve_in_path<T, F>(dirs: &[PathBuf], name: &str, mut open: F) -> Result<(T, PathBuf)>
where
    F: FnMut(&Path) -> Result<T>,
{
    let current = [PathBuf::from(".")];
    let dirs = if dirs.is_empty() { &current[..] } else { dirs };
    let mut searched = Vec::with_capacity(dirs.len());

    for dir in dirs {
        let candidate = dir.join(name);
        match open(&candidate) {
            Ok(value) => return Ok((value, candidate)),
            Err(Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(path = %candidate.display(), "not found, trying next directory");
                searched.push(candidate);
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::FileNotFound {
        name: name.to_string(),
        searched,
    })
}

/// Saturating conversion used for counts that were already range checked.
pub(crate) fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Saturating conversion for stream offsets and section sizes.
pub(crate) fn to_u32(n: u64) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_and_fallback() {
        assert_eq!(decode_text("héllo".as_bytes(), None), "héllo");
        // 0xE9 is 'é' in Windows-1252 and invalid as UTF-8
        assert_eq!(decode_text(b"caf\xE9", None), "café");
    }

    #[test]
    fn test_encode_text() {
        assert_eq!(&*encode_text("plain"), b"plain");
        assert_eq!(&*encode_text("café"), b"caf\xE9");
        assert_eq!(&*encode_text("日"), b"?");
    }

    #[test]
    fn test_encode_truncated() {
        let (bytes, cut) = encode_truncated("abcdef", 4);
        assert_eq!(bytes, b"abcd");
        assert!(cut);
        let (bytes, cut) = encode_truncated("ab", 4);
        assert_eq!(bytes, b"ab");
        assert!(!cut);
    }

    #[test]
    fn test_resolve_in_path_falls_through_not_found() {
        let dirs = vec![PathBuf::from("first"), PathBuf::from("second")];
        let (value, path) = resolve_in_path(&dirs, "x.ipf", |p| {
            if p.starts_with("first") {
                Err(io::Error::from(io::ErrorKind::NotFound).into())
            } else {
                Ok(7)
            }
        })
        .unwrap();
        assert_eq!(value, 7);
        assert_eq!(path, Path::new("second").join("x.ipf"));
    }

    #[test]
    fn test_resolve_in_path_reports_all_candidates() {
        let dirs = vec![PathBuf::from("a"), PathBuf::from("b")];
        let err = resolve_in_path::<(), _>(&dirs, "gone.bmp", |_| {
            Err(io::Error::from(io::ErrorKind::NotFound).into())
        })
        .unwrap_err();
        match err {
            Error::FileNotFound { name, searched } => {
                assert_eq!(name, "gone.bmp");
                assert_eq!(searched.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_resolve_in_path_stops_on_other_errors() {
        let dirs = vec![PathBuf::from("a"), PathBuf::from("b")];
        let mut calls = 0;
        let err = resolve_in_path::<(), _>(&dirs, "x", |_| {
            calls += 1;
            Err(io::Error::from(io::ErrorKind::PermissionDenied).into())
        })
        .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(calls, 1);
    }
}
