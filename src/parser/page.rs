//! Builds the element tree of one heading or footnote page.

use super::Parser;
use crate::cell::Cell;
use crate::error::{DiagnosticKind, Result};
use crate::lexer::{Command, Position, Tag, TagId, Token, TokenKind};
use crate::page::Page;
use crate::registry::{FontEntry, IndexCommand, IndexEntry, Synonym};
use crate::tree::{Element, ElementId, ElementTree, Header, Link, LinkTarget, ListKind};
use crate::util::{encode_text, to_u16};

/// Longest title a TOC entry holds.
const MAX_TITLE_LEN: usize = 255;

pub(super) struct PageBuilder<'p, 'a> {
    parser: &'p mut Parser<'a>,
    page: usize,
    tree: ElementTree,
    /// Open containers, innermost last.
    open: Vec<ElementId>,
    /// Cell receiving text, while inside `:c`.
    cell: Option<usize>,
    footnote: bool,
}

impl<'p, 'a> PageBuilder<'p, 'a> {
    /// Register the root tag's attributes and capture its title line.
    pub(super) fn start(parser: &'p mut Parser<'a>, tag: Tag, position: Position) -> Result<Self> {
        let page = parser.doc.pages.len();
        let toc = to_u16(page);

        let (root, footnote) = match tag.id {
            TagId::Heading(level) => {
                if let Some(value) = tag.attr("res") {
                    match value.trim().parse::<u16>() {
                        Ok(res) => parser.doc.resources.insert(res, toc)?,
                        Err(_) => parser.diagnostic(
                            position.clone(),
                            DiagnosticKind::MissingAttribute {
                                tag: tag.id.to_string(),
                                attribute: "res",
                            },
                        ),
                    }
                }
                for attribute in ["id", "name"] {
                    if let Some(name) = tag.attr(attribute) {
                        parser.doc.dictionary.insert(name);
                        parser.doc.names.insert(name, toc)?;
                        if tag.has_flag("global") {
                            parser.doc.global_names.insert(name, toc);
                        }
                    }
                }

                let title = parser.capture_line(true);
                if encode_text(&title).len() > MAX_TITLE_LEN {
                    parser.diagnostic(position.clone(), DiagnosticKind::TitleTruncated);
                }
                let mut header = Header::new(level, title);
                header.hidden = tag.has_flag("hide");
                (Element::Header(header), false)
            }
            _ => {
                if let Some(id) = tag.attr("id") {
                    parser.doc.dictionary.insert(id);
                    parser.doc.names.insert(id, toc)?;
                }
                (Element::Footnote, true)
            }
        };

        let mut tree = ElementTree::new(root, position.clone());
        if let Some(group) = tag.attr("ctrlrefid") {
            tree.append(tree.root(), Element::ControlRef(group.to_string()), position);
        }

        Ok(Self {
            parser,
            page,
            tree,
            open: Vec::new(),
            cell: None,
            footnote,
        })
    }

    /// Consume the page body. Returns the token that ended it.
    pub(super) fn parse(mut self) -> Result<Token> {
        loop {
            let Token { kind, position } = self.parser.next();
            match kind {
                TokenKind::End => {
                    self.finish();
                    return Ok(Token {
                        kind: TokenKind::End,
                        position,
                    });
                }
                TokenKind::Tag(tag) => match tag.id {
                    TagId::Heading(_) | TagId::Fn | TagId::Euserdoc => {
                        self.finish();
                        return Ok(Token {
                            kind: TokenKind::Tag(tag),
                            position,
                        });
                    }
                    TagId::Efn if self.footnote => {
                        let parser = self.finish();
                        return Ok(parser.next());
                    }
                    _ => self.tag(tag, position)?,
                },
                TokenKind::Text(text) => self.text(text, position),
                TokenKind::Whitespace { newline } => self.whitespace(newline, position),
                TokenKind::Command(command) => self.command(command, position)?,
            }
        }
    }

    fn finish(self) -> &'p mut Parser<'a> {
        tracing::trace!(page = self.page, nodes = self.tree.len(), "page parsed");
        self.parser.doc.pages.push(Page::new(self.page, self.tree));
        self.parser
    }

    fn parent(&self) -> ElementId {
        self.open.last().copied().unwrap_or_else(|| self.tree.root())
    }

    fn append(&mut self, element: Element, position: Position) -> ElementId {
        let parent = self.parent();
        self.tree.append(parent, element, position)
    }

    fn open(&mut self, element: Element, position: Position) {
        let id = self.append(element, position);
        self.open.push(id);
    }

    /// Innermost open container matching `pred`, as a depth in `open`.
    fn find_open(&self, pred: impl Fn(&Element) -> bool) -> Option<usize> {
        self.open
            .iter()
            .rposition(|&id| self.tree.element(id).is_some_and(&pred))
    }

    /// Close the innermost container matching `pred` and everything
    /// opened inside it.
    fn close(&mut self, tag: &TagId, position: Position, pred: impl Fn(&Element) -> bool) {
        match self.find_open(pred) {
            Some(depth) => {
                self.open.truncate(depth);
                if self.find_open(|e| matches!(e, Element::Row)).is_none() {
                    self.cell = None;
                }
            }
            None => self
                .parser
                .diagnostic(position, DiagnosticKind::UnmatchedEndTag(tag.to_string())),
        }
    }

    fn in_preformat(&self) -> bool {
        self.find_open(|e| matches!(e, Element::Lines | Element::Example | Element::Figure))
            .is_some()
    }

    fn missing(&mut self, tag: &Tag, attribute: &'static str, position: Position) {
        self.parser.diagnostic(
            position,
            DiagnosticKind::MissingAttribute {
                tag: tag.id.to_string(),
                attribute,
            },
        );
    }

    fn misplaced(&mut self, tag: &Tag, position: Position) {
        self.parser
            .diagnostic(position, DiagnosticKind::TagContext(tag.id.to_string()));
    }

    fn tag(&mut self, tag: Tag, position: Position) -> Result<()> {
        let toc = to_u16(self.page);
        match &tag.id {
            TagId::P => {
                self.cell = None;
                self.append(Element::Paragraph, position);
            }
            TagId::Ul => self.open(Element::List(ListKind::Unordered), position),
            TagId::Ol => self.open(Element::List(ListKind::Ordered), position),
            TagId::Sl => self.open(Element::List(ListKind::Simple), position),
            TagId::Eul => self.close(&tag.id, position, |e| {
                matches!(e, Element::List(ListKind::Unordered))
            }),
            TagId::Eol => self.close(&tag.id, position, |e| {
                matches!(e, Element::List(ListKind::Ordered))
            }),
            TagId::Esl => self.close(&tag.id, position, |e| {
                matches!(e, Element::List(ListKind::Simple))
            }),
            TagId::Li => match self.find_open(|e| matches!(e, Element::List(_))) {
                Some(depth) => {
                    self.open.truncate(depth + 1);
                    self.open(Element::ListItem, position);
                }
                None => self.misplaced(&tag, position),
            },
            TagId::Table => {
                let columns = tag
                    .attr("cols")
                    .map(|cols| cols.split_whitespace().count())
                    .unwrap_or(1)
                    .clamp(1, u8::MAX as usize) as u8;
                self.cell = None;
                self.open(Element::Table { columns }, position);
            }
            TagId::Row => match self.find_open(|e| matches!(e, Element::Table { .. })) {
                Some(depth) => {
                    self.open.truncate(depth + 1);
                    self.cell = None;
                    self.open(Element::Row, position);
                }
                None => self.misplaced(&tag, position),
            },
            TagId::C => match self.find_open(|e| matches!(e, Element::Row)) {
                Some(depth) => {
                    self.open.truncate(depth + 1);
                    let index = self.parser.doc.cells.len();
                    self.parser.doc.cells.push(Cell::new(index, toc));
                    self.append(Element::CellRef(index), position);
                    self.cell = Some(index);
                }
                None => self.misplaced(&tag, position),
            },
            TagId::Etable => {
                self.close(&tag.id, position, |e| matches!(e, Element::Table { .. }));
                self.cell = None;
            }
            TagId::Fig => self.open(Element::Figure, position),
            TagId::Efig => self.close(&tag.id, position, |e| matches!(e, Element::Figure)),
            TagId::Figcap => {
                self.append(Element::Caption, position);
            }
            TagId::Artwork => match tag.attr("name") {
                Some(name) => {
                    self.parser.doc.bitmap_names.insert(name.to_string());
                    self.append(
                        Element::Artwork {
                            name: name.to_string(),
                        },
                        position,
                    );
                }
                None => self.missing(&tag, "name", position),
            },
            TagId::Link => self.link(&tag, position),
            TagId::Elink => self.close(&tag.id, position, |e| matches!(e, Element::Link(_))),
            TagId::Hp(level) => self.open(Element::Highlight(*level), position),
            TagId::Ehp(level) => {
                let level = *level;
                self.close(&tag.id, position, |e| matches!(e, Element::Highlight(l) if *l == level))
            }
            TagId::Hide => self.open(Element::Hide, position),
            TagId::Ehide => self.close(&tag.id, position, |e| matches!(e, Element::Hide)),
            TagId::Lines => self.open(Element::Lines, position),
            TagId::Elines => self.close(&tag.id, position, |e| matches!(e, Element::Lines)),
            TagId::Xmp => self.open(Element::Example, position),
            TagId::Exmp => self.close(&tag.id, position, |e| matches!(e, Element::Example)),
            TagId::Note => {
                let doc = &mut *self.parser.doc;
                for word in &doc.note_label {
                    doc.dictionary.insert(word);
                }
                self.append(Element::Note, position);
            }
            TagId::Font => self.font(&tag, position)?,
            TagId::I1 => {
                let text = self.parser.capture_line(false);
                let roots = tag
                    .attr("roots")
                    .map(|r| r.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default();
                let entry = IndexEntry::new(text, toc)
                    .with_global(tag.has_flag("global"))
                    .with_roots(roots);
                let at = self.parser.doc.index.add_entry(entry, tag.attr("id"))?;
                self.append(Element::IndexMarker(at), position);
            }
            TagId::I2 => {
                let text = self.parser.capture_line(false);
                match tag.attr("refid") {
                    Some(refid) => {
                        self.append(
                            Element::SecondaryIndex {
                                refid: refid.to_string(),
                                text,
                            },
                            position,
                        );
                    }
                    None => self.missing(&tag, "refid", position),
                }
            }
            TagId::Icmd => {
                let text = self.parser.capture_line(false);
                self.parser.doc.index.add_command(IndexCommand::new(text, toc));
            }
            TagId::Isyn => {
                let words = self.parser.capture_line(false);
                match tag.attr("root") {
                    Some(root) => {
                        let words = words.split_whitespace().map(str::to_string).collect();
                        self.parser.doc.synonyms.insert(root, Synonym::new(words))?;
                    }
                    None => self.missing(&tag, "root", position),
                }
            }
            _ => self.misplaced(&tag, position),
        }
        Ok(())
    }

    fn link(&mut self, tag: &Tag, position: Position) {
        let reftype = tag.attr("reftype").unwrap_or("hd");
        let target = if let Some(res) = tag.attr("res").and_then(|r| r.trim().parse().ok()) {
            LinkTarget::Resource(res)
        } else if let Some(refid) = tag.attr("refid") {
            LinkTarget::Id(refid.to_string())
        } else {
            let attribute = if reftype.eq_ignore_ascii_case("fn") { "refid" } else { "res" };
            self.missing(tag, attribute, position);
            return;
        };

        let database = tag.attr("database").map(str::to_string);
        if let Some(database) = &database {
            let doc = &mut *self.parser.doc;
            doc.external.insert(database);
            if let LinkTarget::Id(refid) = &target {
                doc.dictionary.insert(refid);
            }
        }
        let link = Link {
            target,
            database,
            child_window: tag.has_flag("split"),
        };
        self.open(Element::Link(link), position);
    }

    fn font(&mut self, tag: &Tag, position: Position) -> Result<()> {
        let Some(face) = tag.attr("facename") else {
            self.missing(tag, "facename", position);
            return Ok(());
        };
        let index = if face.eq_ignore_ascii_case("default") {
            0
        } else {
            let (height, width) = tag
                .attr("size")
                .and_then(FontEntry::parse_size)
                .unwrap_or((0, 0));
            let codepage = tag
                .attr("codepage")
                .and_then(|c| c.trim().parse().ok())
                .unwrap_or(self.parser.doc.nls.codepage);
            self.parser
                .doc
                .fonts
                .add(FontEntry::new(face, height, width, codepage))?
        };
        self.append(Element::Font(index), position);
        Ok(())
    }

    fn text(&mut self, text: String, position: Position) {
        self.parser.doc.dictionary.insert(&text);
        if let Some(cell) = self.cell {
            self.parser.doc.cells[cell].push_word(text);
            return;
        }
        let punctuation = text.chars().count() == 1 && !text.chars().all(char::is_alphanumeric);
        let element = if punctuation {
            Element::Punctuation(text)
        } else {
            Element::Text(text)
        };
        self.append(element, position);
    }

    fn whitespace(&mut self, newline: bool, position: Position) {
        let preformat = self.in_preformat();
        if let Some(cell) = self.cell {
            let cell = &mut self.parser.doc.cells[cell];
            if newline && preformat {
                cell.push_newline();
            } else {
                cell.push_space();
            }
            return;
        }
        if newline && preformat {
            self.append(Element::Break, position);
            return;
        }
        // collapse runs and drop leading space
        let parent = self.parent();
        let last = self.tree.get(parent).map(|n| n.last_child);
        match last.and_then(|id| self.tree.element(id)) {
            None | Some(Element::Space | Element::Break | Element::Paragraph) => {}
            Some(_) => {
                self.append(Element::Space, position);
            }
        }
    }

    fn command(&mut self, command: Command, position: Position) -> Result<()> {
        match command {
            Command::Comment => {}
            Command::Break => match self.cell {
                Some(cell) => self.parser.doc.cells[cell].push_newline(),
                None => {
                    self.append(Element::Break, position);
                }
            },
            Command::Imbed(name) => {
                self.parser.imbed(&name)?;
                self.append(Element::Imbed(name), position);
            }
            Command::Other(name) => self
                .parser
                .diagnostic(position, DiagnosticKind::CommandNotDefined(name)),
        }
        Ok(())
    }
}
