//! Section serialization and header back-patching.

use std::io::{Seek, SeekFrom, Write};

use super::Document;
use super::build::MAX_PAGES;
use super::header::{FLAG_HELP, FLAG_INF, HEADER_LEN, IpfExtHeader, IpfHeader, SEARCH_WIDE};
use crate::error::{Error, Result};
use crate::options::OutputKind;
use crate::registry::Section;
use crate::util::{to_u16, to_u32};

const MAX_INDEX_ENTRIES: usize = u16::MAX as usize;
const MAX_CELLS: usize = u16::MAX as usize;

fn position<W: Seek>(out: &mut W) -> Result<u32> {
    Ok(to_u32(out.stream_position()?))
}

/// Write `section` if it has entries. Returns its offset, or zero when it
/// was skipped.
fn write_section<W: Write + Seek>(out: &mut W, section: &dyn Section, name: &str) -> Result<u32> {
    if section.size() == 0 {
        return Ok(0);
    }
    let offset = position(out)?;
    section.write_to(out)?;
    debug_assert_eq!((position(out)? - offset) as usize, section.length());
    tracing::debug!("{name}: {} entries at {offset:#x}", section.size());
    Ok(offset)
}

impl Document {
    pub(super) fn run_write<W: Write + Seek>(&mut self, out: &mut W) -> Result<(IpfHeader, IpfExtHeader)> {
        if self.pages.len() > MAX_PAGES {
            return Err(Error::TooManyPages(self.pages.len()));
        }
        if self.index.entry_count() > MAX_INDEX_ENTRIES {
            return Err(Error::IndexTooLarge(self.index.entry_count()));
        }
        if self.cells.len() > MAX_CELLS {
            return Err(Error::TooManyCells(self.cells.len()));
        }

        let inf = self.options.output_kind == OutputKind::Inf;
        let mut header = IpfHeader::new(if inf { FLAG_INF } else { FLAG_HELP }, &self.title);
        let mut ext = IpfExtHeader::default();

        let start = out.stream_position()?;
        out.write_all(&[0u8; HEADER_LEN])?;

        if !self.resources.is_empty() {
            header.res_offset = position(out)?;
            header.res_count = to_u16(self.resources.len());
            self.resources.write(out)?;
        }

        if !inf && !self.names.is_empty() {
            header.name_offset = position(out)?;
            header.name_count = to_u16(self.names.len());
            self.names.write(out, &self.dictionary)?;
        }

        if self.global_names.size() > 0 {
            ext.gname_offset = position(out)?;
            ext.gname_count = to_u16(self.global_names.size());
            self.global_names.write(out, &self.dictionary)?;
        }

        if let Some(store) = self.bitmaps.as_mut()
            && !store.is_empty()
        {
            header.image_offset = position(out)?;
            store.copy_to(out)?;
        }

        header.toc_offset = position(out)?;
        header.toc_count = to_u16(self.pages.len());
        let mut toc_offsets = Vec::with_capacity(self.pages.len());
        for page in &mut self.pages {
            toc_offsets.push(page.write(out)?);
        }
        header.toc_size = position(out)? - header.toc_offset;
        header.toc_table_offset = position(out)?;
        for offset in &toc_offsets {
            out.write_all(&offset.to_le_bytes())?;
        }
        header.max_local_dict = self
            .pages
            .iter()
            .map(|p| p.local_dictionary().len())
            .max()
            .unwrap_or(0)
            .min(u8::MAX as usize) as u8;

        // index entries point at synonym records
        if !self.synonyms.is_empty() {
            self.synonyms.write(out)?;
        }

        if self.index.entry_count() > 0 {
            header.index_offset = position(out)?;
            header.index_count = to_u16(self.index.entry_count());
            header.index_size = to_u32(self.index.write_entries(out, &self.synonyms)? as u64);
            ext.global_index_count = to_u16(self.index.global_count());
        }

        if self.index.command_count() > 0 {
            header.icmd_offset = position(out)?;
            header.icmd_count = to_u16(self.index.command_count());
            header.icmd_size = to_u32(self.index.write_commands(out)? as u64);
        }

        header.nls_offset = write_section(out, &self.nls, "nls")?;
        header.nls_size = to_u32(self.nls.length() as u64);

        ext.strings_offset = write_section(out, &self.strings, "strings")?;
        if ext.strings_offset != 0 {
            ext.strings_size = to_u32(self.strings.length() as u64);
        }

        ext.db_offset = write_section(out, &self.external, "external files")?;
        if ext.db_offset != 0 {
            ext.db_count = to_u16(self.external.size());
            ext.db_size = to_u32(self.external.length() as u64);
        }

        ext.font_offset = write_section(out, &self.fonts, "fonts")?;
        ext.font_count = to_u16(self.fonts.size());

        ext.ctrl_offset = write_section(out, &self.controls, "controls")?;
        if ext.ctrl_offset != 0 {
            ext.ctrl_size = to_u32(self.controls.length() as u64);
        }

        header.dict_offset = position(out)?;
        header.dict_count = to_u16(self.dictionary.size());
        header.dict_size = to_u32(self.dictionary.length() as u64);
        self.dictionary.write(out)?;

        if self.dictionary.has_fts() {
            let offset = position(out)?;
            header.search_offset = if self.fts_wide { offset | SEARCH_WIDE } else { offset };
            header.search_size = to_u32(self.dictionary.fts_length() as u64);
            self.dictionary.write_fts(out)?;
        }

        if !self.cells.is_empty() {
            let mut cell_offsets = Vec::with_capacity(self.cells.len());
            for cell in &self.cells {
                cell_offsets.push(cell.write(out)?);
            }
            header.cell_table_offset = position(out)?;
            header.cell_count = to_u16(self.cells.len());
            for offset in &cell_offsets {
                out.write_all(&offset.to_le_bytes())?;
            }
        }

        let child_offset = position(out)?;
        let mut child_size = 0;
        for page in &self.pages {
            child_size += page.write_children(out)?;
        }
        if child_size > 0 {
            ext.child_offset = child_offset;
            ext.child_size = child_size;
        }

        header.ext_offset = position(out)?;
        ext.write(out)?;

        let end = out.stream_position()?;
        out.seek(SeekFrom::Start(start))?;
        header.write(out)?;
        out.seek(SeekFrom::Start(end))?;
        out.flush()?;

        tracing::debug!(
            "wrote {} bytes: {} pages, {} words, {} cells",
            end - start,
            header.toc_count,
            header.dict_count,
            header.cell_count
        );
        Ok((header, ext))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::lexer::{FileOpener, Tag, TagId, TokenKind, VecSource};
    use crate::options::CompileOptions;

    fn compile(body: Vec<TokenKind>, options: CompileOptions) -> (Document, Vec<u8>) {
        let mut tokens = vec![TokenKind::tag(TagId::Userdoc)];
        tokens.extend(body);
        tokens.push(TokenKind::tag(TagId::Euserdoc));
        let mut out = Cursor::new(Vec::new());
        let doc = super::super::compile(
            Box::new(VecSource::new("t.ipf", tokens)),
            &FileOpener,
            options,
            &mut out,
        )
        .unwrap();
        (doc, out.into_inner())
    }

    fn heading(tag: Tag, title: &str) -> Vec<TokenKind> {
        vec![TokenKind::Tag(tag), TokenKind::text(title), TokenKind::newline()]
    }

    #[test]
    fn test_header_is_back_patched() {
        let (doc, bytes) = compile(heading(Tag::new(TagId::Heading(1)), "Only"), CompileOptions::default());
        let header = IpfHeader::parse(&bytes).unwrap();
        assert_eq!(&header, doc.header().unwrap());
        assert_eq!(header.toc_count, 1);
        assert_eq!(header.toc_offset as usize, HEADER_LEN);
        assert_eq!(header.res_offset, 0);
        assert_eq!(header.name_offset, 0);
        assert_eq!(header.index_offset, 0);
        assert_eq!(header.search_offset, 0);
        assert!(header.dict_count > 0);
        assert_eq!(header.ext_offset as usize + 64, bytes.len());
    }

    #[test]
    fn test_toc_offset_table() {
        let mut body = heading(Tag::new(TagId::Heading(1)), "One");
        body.extend(heading(Tag::new(TagId::Heading(2)), "Two"));
        let (doc, bytes) = compile(body, CompileOptions::default());
        let header = doc.header().unwrap();
        let table = header.toc_table_offset as usize;
        let first = u32::from_le_bytes(bytes[table..table + 4].try_into().unwrap());
        let second = u32::from_le_bytes(bytes[table + 4..table + 8].try_into().unwrap());
        assert_eq!(first, header.toc_offset);
        assert_eq!(second, header.toc_offset + doc.pages()[0].toc_size());
        assert_eq!(header.toc_size, doc.pages()[0].toc_size() + doc.pages()[1].toc_size());
    }

    #[test]
    fn test_inf_omits_name_map() {
        let body = heading(Tag::new(TagId::Heading(1)).with_attr("id", "top"), "Top");
        let (help, _) = compile(body.clone(), CompileOptions::default());
        assert_eq!(help.header().unwrap().name_count, 1);
        assert_ne!(help.header().unwrap().name_offset, 0);

        let (inf, _) = compile(
            body,
            CompileOptions::default().with_output_kind(OutputKind::Inf),
        );
        let header = inf.header().unwrap();
        assert!(header.is_inf());
        assert_eq!((header.name_count, header.name_offset), (0, 0));
    }

    #[test]
    fn test_cells_and_resources() {
        let mut body = heading(Tag::new(TagId::Heading(1)).with_attr("res", "100"), "Grid");
        body.extend([
            TokenKind::tag(TagId::Table),
            TokenKind::tag(TagId::Row),
            TokenKind::tag(TagId::C),
            TokenKind::text("cell"),
            TokenKind::tag(TagId::Etable),
        ]);
        let (doc, bytes) = compile(body, CompileOptions::default());
        let header = doc.header().unwrap();
        assert_eq!(header.res_count, 1);
        assert_eq!(header.res_offset as usize, HEADER_LEN);
        assert_eq!(&bytes[HEADER_LEN..HEADER_LEN + 4], &[100, 0, 0, 0]);
        assert_eq!(header.cell_count, 1);
        let table = header.cell_table_offset as usize;
        let cell = u32::from_le_bytes(bytes[table..table + 4].try_into().unwrap()) as usize;
        assert_eq!(cell + doc.cells()[0].length(), table);
    }

    #[test]
    fn test_search_section_follows_dictionary() {
        let (doc, _) = compile(
            heading(Tag::new(TagId::Heading(1)), "Find me"),
            CompileOptions::default().with_searchable(true),
        );
        let header = doc.header().unwrap();
        assert!(!header.search_is_wide());
        assert_eq!(header.search_offset, header.dict_offset + header.dict_size);
        assert!(header.search_size > 0);
    }

    #[test]
    fn test_extended_header_counts() {
        let (doc, bytes) = compile(heading(Tag::new(TagId::Heading(1)), "Fonts"), CompileOptions::default());
        let header = doc.header().unwrap();
        let ext = IpfExtHeader::parse(&bytes[header.ext_offset as usize..]).unwrap();
        assert_eq!(&ext, doc.ext_header().unwrap());
        assert_eq!(ext.font_count, 1);
        assert_ne!(ext.font_offset, 0);
        assert_eq!((ext.db_offset, ext.ctrl_offset, ext.child_offset), (0, 0, 0));
    }
}
