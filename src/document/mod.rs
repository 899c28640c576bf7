//! The compilation unit.
//!
//! A [`Document`] owns every page, every cell and every registry. It moves
//! through [`Phase`]s in one direction only:
//!
//! ```text
//! Empty --parse--> Parsing --build--> Built --write--> Written
//! ```
//!
//! ```no_run
//! use ipfc::{CompileOptions, Document, FileOpener, Scanner};
//!
//! let text = std::fs::read_to_string("guide.ipf")?;
//! let mut doc = Document::new(CompileOptions::from_env());
//! doc.parse(Box::new(Scanner::new("guide.ipf", text)), &FileOpener)?;
//! doc.build()?;
//! let mut out = std::fs::File::create("guide.hlp")?;
//! doc.write(&mut out)?;
//! # Ok::<(), ipfc::Error>(())
//! ```

mod build;
pub mod header;
mod write;

use std::collections::BTreeSet;
use std::fmt;
use std::io::{Seek, Write};

use crate::bitmap::BitmapStore;
use crate::cell::Cell;
use crate::error::{Diagnostic, Error, Result};
use crate::lexer::{SourceOpener, TokenSource};
use crate::options::CompileOptions;
use crate::page::Page;
use crate::parser::Parser;
use crate::registry::{
    Controls, ExternalFiles, FontTable, GlobalDictionary, GlobalNames, IndexTable, NameMap, Nls,
    ResourceMap, StringTable, SynonymTable,
};

pub use header::{IpfExtHeader, IpfHeader};

/// Deepest heading level shown in the contents unless `:docprof toc=`
/// says otherwise.
pub const DEFAULT_TOC_LEVEL: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Parsing,
    Built,
    Written,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Empty => "empty",
            Phase::Parsing => "parsing",
            Phase::Built => "built",
            Phase::Written => "written",
        };
        f.write_str(name)
    }
}

#[derive(Debug)]
pub struct Document {
    options: CompileOptions,
    phase: Phase,
    /// Set once `parse` has run to completion without error.
    parse_complete: bool,

    pub(crate) title: String,
    pub(crate) max_level: u8,
    pub(crate) pages: Vec<Page>,
    pub(crate) cells: Vec<Cell>,

    pub(crate) dictionary: GlobalDictionary,
    pub(crate) resources: ResourceMap,
    pub(crate) names: NameMap,
    pub(crate) global_names: GlobalNames,
    pub(crate) synonyms: SynonymTable,
    pub(crate) index: IndexTable,
    pub(crate) external: ExternalFiles,
    pub(crate) controls: Controls,
    pub(crate) fonts: FontTable,
    pub(crate) nls: Nls,
    pub(crate) strings: StringTable,
    /// Label words emitted at each `:note`.
    pub(crate) note_label: Vec<String>,
    /// Distinct `:artwork` names, resolved by the build.
    pub(crate) bitmap_names: BTreeSet<String>,
    bitmaps: Option<BitmapStore>,
    fts_wide: bool,

    pub(crate) diagnostics: Vec<Diagnostic>,
    header: Option<IpfHeader>,
    ext_header: Option<IpfExtHeader>,
}

impl Document {
    pub fn new(options: CompileOptions) -> Self {
        let nls = Nls::new(&options.locale);
        let note_label = nls.note.split_whitespace().map(str::to_string).collect();
        Self {
            fonts: FontTable::new(nls.codepage),
            nls,
            note_label,
            options,
            phase: Phase::Empty,
            parse_complete: false,
            title: String::new(),
            max_level: DEFAULT_TOC_LEVEL,
            pages: Vec::new(),
            cells: Vec::new(),
            dictionary: GlobalDictionary::new(),
            resources: ResourceMap::new(),
            names: NameMap::new(),
            global_names: GlobalNames::new(),
            synonyms: SynonymTable::new(),
            index: IndexTable::new(),
            external: ExternalFiles::new(),
            controls: Controls::new(),
            strings: StringTable::new(),
            bitmap_names: BTreeSet::new(),
            bitmaps: None,
            fts_wide: false,
            diagnostics: Vec::new(),
            header: None,
            ext_header: None,
        }
    }

    fn expect_phase(&self, operation: &'static str, phase: Phase) -> Result<()> {
        if self.phase != phase {
            return Err(Error::PhaseOrder {
                operation,
                phase: self.phase,
            });
        }
        Ok(())
    }

    /// Read the whole token stream into pages and registries.
    ///
    /// `opener` supplies the sources for `.im` files.
    pub fn parse(&mut self, source: Box<dyn TokenSource>, opener: &dyn SourceOpener) -> Result<()> {
        self.expect_phase("parse", Phase::Empty)?;
        self.phase = Phase::Parsing;
        tracing::debug!("parsing {}", source.name());
        Parser::new(self, source, opener).run()?;
        self.parse_complete = true;
        Ok(())
    }

    /// Run the whole-document transforms. Only valid after a successful
    /// [`parse`](Self::parse).
    pub fn build(&mut self) -> Result<()> {
        self.expect_phase("build", Phase::Parsing)?;
        if !self.parse_complete {
            return Err(Error::PhaseOrder {
                operation: "build",
                phase: self.phase,
            });
        }
        self.run_build()?;
        self.phase = Phase::Built;
        Ok(())
    }

    /// Serialize the document. The header is written first as a
    /// placeholder and rewritten once every section is in place.
    pub fn write<W: Write + Seek>(&mut self, out: &mut W) -> Result<()> {
        self.expect_phase("write", Phase::Built)?;
        let (header, ext_header) = self.run_write(out)?;
        self.header = Some(header);
        self.ext_header = Some(ext_header);
        self.bitmaps = None;
        self.phase = Phase::Written;
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// `:title.` text.
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn dictionary(&self) -> &GlobalDictionary {
        &self.dictionary
    }

    pub fn index(&self) -> &IndexTable {
        &self.index
    }

    pub fn nls(&self) -> &Nls {
        &self.nls
    }

    /// Problems reported while parsing.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Staged images, between build and write.
    pub fn bitmap_store(&self) -> Option<&BitmapStore> {
        self.bitmaps.as_ref()
    }

    /// Whether full-text records use 16-bit sizes.
    pub fn search_is_wide(&self) -> bool {
        self.fts_wide
    }

    /// The header as written; `None` before [`write`](Self::write).
    pub fn header(&self) -> Option<&IpfHeader> {
        self.header.as_ref()
    }

    pub fn ext_header(&self) -> Option<&IpfExtHeader> {
        self.ext_header.as_ref()
    }
}

/// Parse, build and write in one go.
pub fn compile<W: Write + Seek>(
    source: Box<dyn TokenSource>,
    opener: &dyn SourceOpener,
    options: CompileOptions,
    out: &mut W,
) -> Result<Document> {
    let mut doc = Document::new(options);
    doc.parse(source, opener)?;
    doc.build()?;
    doc.write(out)?;
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::lexer::{FileOpener, TagId, TokenKind, VecSource};

    fn source(tokens: Vec<TokenKind>) -> Box<dyn TokenSource> {
        Box::new(VecSource::new("t.ipf", tokens))
    }

    fn minimal() -> Vec<TokenKind> {
        vec![
            TokenKind::tag(TagId::Userdoc),
            TokenKind::tag(TagId::Heading(1)),
            TokenKind::text("Welcome"),
            TokenKind::newline(),
            TokenKind::text("Hello"),
            TokenKind::tag(TagId::Euserdoc),
        ]
    }

    #[test]
    fn test_phases_advance() {
        let mut doc = Document::new(CompileOptions::default());
        assert_eq!(doc.phase(), Phase::Empty);
        doc.parse(source(minimal()), &FileOpener).unwrap();
        assert_eq!(doc.phase(), Phase::Parsing);
        doc.build().unwrap();
        assert_eq!(doc.phase(), Phase::Built);
        doc.write(&mut Cursor::new(Vec::new())).unwrap();
        assert_eq!(doc.phase(), Phase::Written);
        assert!(doc.header().is_some());
    }

    #[test]
    fn test_write_before_build() {
        let mut doc = Document::new(CompileOptions::default());
        doc.parse(source(minimal()), &FileOpener).unwrap();
        let err = doc.write(&mut Cursor::new(Vec::new())).unwrap_err();
        assert!(matches!(
            err,
            Error::PhaseOrder {
                operation: "write",
                phase: Phase::Parsing
            }
        ));
    }

    #[test]
    fn test_build_after_failed_parse() {
        let mut doc = Document::new(CompileOptions::default());
        assert!(doc.parse(source(vec![]), &FileOpener).is_err());
        assert!(matches!(doc.build(), Err(Error::PhaseOrder { .. })));
    }

    #[test]
    fn test_parse_twice() {
        let mut doc = Document::new(CompileOptions::default());
        doc.parse(source(minimal()), &FileOpener).unwrap();
        assert!(matches!(
            doc.parse(source(minimal()), &FileOpener),
            Err(Error::PhaseOrder { operation: "parse", .. })
        ));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(
            Error::PhaseOrder {
                operation: "build",
                phase: Phase::Empty
            }
            .to_string(),
            "build called while the document is empty"
        );
    }
}
