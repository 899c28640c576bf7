//! End-to-end compile tests.
//!
//! Sources are written as IPF text and run through the default scanner,
//! or built as token lists when the shape of the stream matters.

use std::fs;
use std::io::Cursor;
use std::path::PathBuf;

use ipfc::lexer::{Tag, TagId};
use ipfc::{
    CompileOptions, Document, Error, FileOpener, IpfExtHeader, IpfHeader, OutputKind, Phase,
    Scanner, Severity, TokenKind, VecSource, compile,
};
use tempfile::TempDir;

fn compile_text(text: &str, options: CompileOptions) -> Result<(Document, Vec<u8>), Error> {
    let mut out = Cursor::new(Vec::new());
    let doc = compile(
        Box::new(Scanner::new("test.ipf", text)),
        &FileOpener,
        options,
        &mut out,
    )?;
    Ok((doc, out.into_inner()))
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes(bytes[at..at + 4].try_into().unwrap())
}

/// Parse and build a token stream, stopping before write.
fn built(body: Vec<TokenKind>) -> Document {
    let mut tokens = vec![TokenKind::tag(TagId::Userdoc)];
    tokens.extend(body);
    tokens.push(TokenKind::tag(TagId::Euserdoc));
    let mut doc = Document::new(CompileOptions::default());
    doc.parse(Box::new(VecSource::new("limits.ipf", tokens)), &FileOpener)
        .unwrap();
    doc.build().unwrap();
    doc
}

/// `(text, page)` of every record in the index section.
fn index_records(bytes: &[u8], header: &IpfHeader) -> Vec<(String, u16)> {
    let mut at = header.index_offset as usize;
    let mut records = Vec::new();
    for _ in 0..header.index_count {
        let len = bytes[at] as usize;
        let synonyms = bytes[at + 2] as usize;
        let page = u16::from_le_bytes([bytes[at + 3], bytes[at + 4]]);
        let text = String::from_utf8(bytes[at + 5..at + 5 + len].to_vec()).unwrap();
        records.push((text, page));
        at += 5 + len + synonyms * 4;
    }
    assert_eq!(at, (header.index_offset + header.index_size) as usize);
    records
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_single_page_document() {
    let (doc, bytes) = compile_text(
        ":userdoc.\n:h1.Getting Started\nWelcome to the guide.\n:euserdoc.\n",
        CompileOptions::default(),
    )
    .unwrap();

    let header = IpfHeader::parse(&bytes).unwrap();
    assert_eq!(header.toc_count, 1);
    assert_eq!(header.res_offset, 0);
    assert_eq!(header.name_offset, 0);
    assert_eq!(header.index_offset, 0);
    assert_eq!(header.icmd_offset, 0);
    assert!(header.dict_count > 0);
    assert!(header.dict_size > 0);
    assert!(doc.dictionary().contains("Getting"));
    assert_eq!(doc.phase(), Phase::Written);
    assert!(doc.diagnostics().is_empty());
}

#[test]
fn test_duplicate_resource_fails_before_write() {
    let text = ":userdoc.\n:h1 res=7.One\n:h1 res=7.Two\n:euserdoc.\n";
    let mut doc = Document::new(CompileOptions::default());
    let err = doc
        .parse(Box::new(Scanner::new("dup.ipf", text)), &FileOpener)
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateResource(7)));
    assert_eq!(err.severity(), Severity::Duplicate);
    assert!(matches!(doc.build(), Err(Error::PhaseOrder { .. })));
}

#[test]
fn test_too_many_pages() {
    let mut tokens = vec![TokenKind::tag(TagId::Userdoc)];
    for _ in 0..65_536 {
        tokens.push(TokenKind::tag(TagId::Heading(1)));
        tokens.push(TokenKind::text("Page"));
        tokens.push(TokenKind::newline());
    }
    tokens.push(TokenKind::tag(TagId::Euserdoc));

    let mut out = Cursor::new(Vec::new());
    let err = compile(
        Box::new(VecSource::new("big.ipf", tokens)),
        &FileOpener,
        CompileOptions::default(),
        &mut out,
    )
    .unwrap_err();
    assert!(matches!(err, Error::TooManyPages(65_536)));
    assert!(err.is_fatal());
}

#[test]
fn test_too_many_index_entries() {
    let mut body = vec![
        TokenKind::tag(TagId::Heading(1)),
        TokenKind::text("Index"),
        TokenKind::newline(),
    ];
    for _ in 0..65_536 {
        body.push(TokenKind::tag(TagId::I1));
        body.push(TokenKind::text("Entry"));
        body.push(TokenKind::newline());
    }
    let mut doc = built(body);
    let err = doc.write(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(matches!(err, Error::IndexTooLarge(65_536)));
    assert!(err.is_fatal());
    assert!(doc.header().is_none());
}

#[test]
fn test_too_many_cells() {
    let mut body = vec![
        TokenKind::tag(TagId::Heading(1)),
        TokenKind::text("Grid"),
        TokenKind::newline(),
        TokenKind::tag(TagId::Table),
        TokenKind::tag(TagId::Row),
    ];
    for _ in 0..65_536 {
        body.push(TokenKind::tag(TagId::C));
        body.push(TokenKind::text("x"));
    }
    body.push(TokenKind::tag(TagId::Etable));
    let mut doc = built(body);
    assert_eq!(doc.cells().len(), 65_536);
    let err = doc.write(&mut Cursor::new(Vec::new())).unwrap_err();
    assert!(matches!(err, Error::TooManyCells(65_536)));
    assert!(err.is_fatal());
    assert!(doc.header().is_none());
}

#[test]
fn test_imbed_found_in_second_directory() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    fs::write(
        second.path().join("chapter.ipf"),
        ":h2.Imbedded Chapter\nText from the imbedded file.\n",
    )
    .unwrap();

    let options = CompileOptions::default().with_imbed_path(vec![
        first.path().to_path_buf(),
        second.path().to_path_buf(),
    ]);
    let text = ":userdoc.\n:h1.Main\nIntro.\n.im chapter.ipf\n:euserdoc.\n";
    let (doc, _) = compile_text(text, options).unwrap();
    assert_eq!(doc.pages().len(), 2);
    assert_eq!(doc.pages()[1].title(), "Imbedded Chapter");
}

#[test]
fn test_imbed_missing_everywhere() {
    let dir = TempDir::new().unwrap();
    let options = CompileOptions::default().with_imbed_path(vec![dir.path().to_path_buf()]);
    let text = ":userdoc.\n:h1.Main\n.im nowhere.ipf\n:euserdoc.\n";
    match compile_text(text, options) {
        Err(Error::FileNotFound { name, searched }) => {
            assert_eq!(name, "nowhere.ipf");
            assert_eq!(searched, vec![dir.path().join("nowhere.ipf")]);
        }
        other => panic!("unexpected result {:?}", other.map(|_| ())),
    }
}

// ============================================================================
// Section layout
// ============================================================================

#[test]
fn test_sections_follow_their_offsets() {
    let text = "\
:userdoc.
:title.Section Layout
:h1 res=1 id=first.First
See :link reftype=hd res=2.the second page:elink..
:i1 id=idx.Layout
:h1 res=2 id=second.Second
:table cols='10 10'.
:row.
:c.a
:c.b
:etable.
:euserdoc.
";
    let (doc, bytes) = compile_text(text, CompileOptions::default()).unwrap();
    let header = doc.header().unwrap();

    assert_eq!(header.title, "Section Layout");
    assert_eq!(header.toc_offset as usize, {
        // resources, then names, come first
        155 + 8 + 8
    });
    assert_eq!(header.res_offset, 155);
    assert_eq!(header.res_count, 2);
    assert_eq!(header.name_offset, 163);
    assert_eq!(header.name_count, 2);

    for (n, page) in doc.pages().iter().enumerate() {
        let entry = u32_at(&bytes, header.toc_table_offset as usize + n * 4);
        assert_eq!(u32_at(&bytes, entry as usize), page.toc_size());
    }
    assert_eq!(header.index_count, 1);
    assert_ne!(header.index_offset, 0);
    assert_eq!(header.cell_count, 2);

    let ext = IpfExtHeader::parse(&bytes[header.ext_offset as usize..]).unwrap();
    assert_eq!(header.ext_offset as usize + 64, bytes.len());
    assert_eq!(ext.gname_offset, 0);
    assert_eq!(ext.font_count, 1);
}

#[test]
fn test_local_index_points_at_own_records() {
    let text = "\
:userdoc.
:h1.Alpha
:i1 id=a.Apples
:i2 refid=a.Green
:h1.Beta
:i1.Bananas
:i2 refid=a.Yellow
:euserdoc.
";
    let (doc, bytes) = compile_text(text, CompileOptions::default()).unwrap();
    let header = doc.header().unwrap();
    let records = index_records(&bytes, header);
    assert_eq!(
        records,
        vec![
            ("Apples".to_string(), 0),
            ("Green".to_string(), 0),
            ("Yellow".to_string(), 1),
            ("Bananas".to_string(), 1),
        ]
    );

    assert_eq!(doc.pages()[0].local_index(), &[0, 1]);
    assert_eq!(doc.pages()[1].local_index(), &[2, 3]);
    for (n, page) in doc.pages().iter().enumerate() {
        for &position in page.local_index() {
            assert_eq!(records[position as usize].1 as usize, n);
        }
    }
}

#[test]
fn test_empty_sections_have_zero_offsets() {
    let (doc, _) = compile_text(":userdoc.\n:h1.Plain\nText.\n:euserdoc.\n", CompileOptions::default()).unwrap();
    let ext = doc.ext_header().unwrap();
    assert_eq!(ext.db_offset, 0);
    assert_eq!(ext.strings_offset, 0);
    assert_eq!(ext.ctrl_offset, 0);
    assert_eq!(ext.child_offset, 0);
    assert_eq!(ext.gname_offset, 0);
}

#[test]
fn test_inf_output_omits_name_map() {
    let text = ":userdoc.\n:h1 id=top.Top\nBody.\n:euserdoc.\n";
    let (doc, bytes) = compile_text(
        text,
        CompileOptions::default().with_output_kind(OutputKind::Inf),
    )
    .unwrap();
    let header = IpfHeader::parse(&bytes).unwrap();
    assert!(header.is_inf());
    assert_eq!(header.name_count, 0);
    assert_eq!(header.name_offset, 0);
    assert_eq!(&header, doc.header().unwrap());
}

#[test]
fn test_searchable_output() {
    let (doc, bytes) = compile_text(
        ":userdoc.\n:h1.Search\nfind these words\n:euserdoc.\n",
        CompileOptions::default().with_searchable(true),
    )
    .unwrap();
    let header = IpfHeader::parse(&bytes).unwrap();
    assert_eq!(header.search_offset & !0x8000_0000, header.dict_offset + header.dict_size);
    assert_eq!(header.search_is_wide(), doc.search_is_wide());
}

// ============================================================================
// Errors and diagnostics
// ============================================================================

#[test]
fn test_misplaced_tags_are_diagnostics() {
    let text = "junk\n:userdoc.\n:h1.Page\nText\n:euserdoc.\ntrailing\n";
    let (doc, _) = compile_text(text, CompileOptions::default()).unwrap();
    assert_eq!(doc.diagnostics().len(), 2);
}

#[test]
fn test_unknown_reference_is_reference_error() {
    let text = ":userdoc.\n:h1.Page\n:link reftype=hd refid=missing.x:elink.\n:euserdoc.\n";
    let err = compile_text(text, CompileOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnknownId(_)));
    assert_eq!(err.severity(), Severity::Reference);
}

#[test]
fn test_missing_body() {
    let err = compile_text(":userdoc.\n", CompileOptions::default()).unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof));
}

#[test]
fn test_image_missing_from_search_path() {
    let dir = TempDir::new().unwrap();
    let options = CompileOptions::default().with_image_path(vec![PathBuf::from(dir.path())]);
    let text = ":userdoc.\n:h1.Art\n:artwork name='logo.bmp'.\n:euserdoc.\n";
    let err = compile_text(text, options).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
}

#[test]
fn test_token_stream_with_footnote() {
    let tokens = vec![
        TokenKind::tag(TagId::Userdoc),
        TokenKind::Tag(Tag::new(TagId::Heading(1)).with_attr("res", "1")),
        TokenKind::text("Main"),
        TokenKind::newline(),
        TokenKind::Tag(Tag::new(TagId::Link).with_attr("reftype", "fn").with_attr("refid", "note1")),
        TokenKind::text("see"),
        TokenKind::tag(TagId::Elink),
        TokenKind::Tag(Tag::new(TagId::Fn).with_attr("id", "note1")),
        TokenKind::text("Footnote"),
        TokenKind::tag(TagId::Efn),
        TokenKind::tag(TagId::Euserdoc),
    ];
    let mut out = Cursor::new(Vec::new());
    let doc = compile(
        Box::new(VecSource::new("fn.ipf", tokens)),
        &FileOpener,
        CompileOptions::default(),
        &mut out,
    )
    .unwrap();
    assert_eq!(doc.pages().len(), 2);
    assert!(doc.pages()[0].is_visible());
    assert!(!doc.pages()[1].is_visible());
    assert!(doc.pages()[1].is_footnote());
}
