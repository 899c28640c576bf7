//! Pages: one per heading or footnote, each becoming a table of contents
//! entry.

use std::io::{Seek, Write};

use crate::bitmap::BitmapStore;
use crate::error::{Error, Result};
use crate::registry::{
    Controls, ExternalFiles, GlobalDictionary, IndexTable, NO_GROUP, NameMap, ResourceMap,
    SecondaryEntry, SynonymTable,
};
use crate::tree::{
    Element, ElementTree, Escape, LinearItem, LinkTarget, Visit, encode_body, local_dictionary,
};
use crate::util::{encode_truncated, to_u16, to_u32};

const FLAG_VISIBLE: u8 = 0x01;
const FLAG_FOOTNOTE: u8 = 0x02;
const FLAG_CHILDREN: u8 = 0x04;

const LINK_CHILD_WINDOW: u8 = 0x01;
const EXTERNAL_BY_RESOURCE: u8 = 0;
const EXTERNAL_BY_ID: u8 = 1;

/// Registries a page reads (and a few it extends) while linearizing.
pub struct LinearizeContext<'a> {
    pub dictionary: &'a mut GlobalDictionary,
    pub resources: &'a ResourceMap,
    pub names: &'a NameMap,
    pub external: &'a ExternalFiles,
    pub bitmaps: Option<&'a BitmapStore>,
    pub index: &'a mut IndexTable,
    pub synonyms: &'a SynonymTable,
    /// Label words emitted for `:note`.
    pub note_label: &'a [String],
}

#[derive(Debug)]
pub struct Page {
    index: usize,
    tree: ElementTree,
    level: u8,
    title: String,
    visible: bool,
    control_group: Option<u16>,
    /// Pages opened as child windows from this one.
    children: Vec<u16>,
    items: Vec<LinearItem>,
    local_dict: Vec<u16>,
    local_index: Vec<u16>,
    cells: Vec<u16>,
    body: Vec<u8>,
    toc_size: u32,
}

impl Page {
    pub fn new(index: usize, tree: ElementTree) -> Self {
        Self {
            index,
            tree,
            level: 1,
            title: String::new(),
            visible: false,
            control_group: None,
            children: Vec::new(),
            items: Vec::new(),
            local_dict: Vec::new(),
            local_index: Vec::new(),
            cells: Vec::new(),
            body: Vec::new(),
            toc_size: 0,
        }
    }

    /// Position in the page list; also the TOC index.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn toc_index(&self) -> u16 {
        to_u16(self.index)
    }

    pub fn tree(&self) -> &ElementTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut ElementTree {
        &mut self.tree
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_footnote(&self) -> bool {
        matches!(self.tree.element(self.tree.root()), Some(Element::Footnote))
    }

    pub fn children(&self) -> &[u16] {
        &self.children
    }

    pub fn items(&self) -> &[LinearItem] {
        &self.items
    }

    pub fn local_dictionary(&self) -> &[u16] {
        &self.local_dict
    }

    pub fn local_index(&self) -> &[u16] {
        &self.local_index
    }

    pub fn cells(&self) -> &[u16] {
        &self.cells
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Size of the written TOC entry; zero before [`write`](Self::write).
    pub fn toc_size(&self) -> u32 {
        self.toc_size
    }

    /// Take level, title and visibility from the root and resolve the
    /// header's control group.
    pub fn build_toc(&mut self, max_level: u8, controls: &Controls) -> Result<()> {
        let root = self.tree.root();
        match self.tree.element(root) {
            Some(Element::Header(header)) => {
                self.level = header.level;
                self.title = header.title.clone();
                self.visible = !header.hidden && header.level <= max_level;
            }
            _ => {
                self.level = 1;
                self.visible = false;
            }
        }
        for child in self.tree.children(root) {
            if let Some(Element::ControlRef(name)) = self.tree.element(child) {
                self.control_group = Some(controls.group_index(name)?);
            }
        }
        Ok(())
    }

    /// Flatten the tree in document order, resolving links, images and
    /// index references.
    pub fn linearize(&mut self, ctx: &mut LinearizeContext<'_>) -> Result<()> {
        let mut lin = Linearizer {
            ctx,
            page: self.toc_index(),
            items: Vec::new(),
            cells: Vec::new(),
            children: Vec::new(),
        };
        self.tree.walk(&mut |visit, _, node| match visit {
            Visit::Enter => lin.enter(&node.element),
            Visit::Leave => {
                lin.leave(&node.element);
                Ok(())
            }
        })?;

        lin.children.sort_unstable();
        lin.children.dedup();
        self.items = lin.items;
        self.cells = lin.cells;
        self.children = lin.children;
        Ok(())
    }

    /// Sorted index positions of the entries defined on this page.
    pub fn build_index(&mut self, positions: Vec<u16>) {
        self.local_index = positions;
    }

    pub fn build_local_dictionary(&mut self) {
        self.local_dict = local_dictionary(&self.items);
        self.body = encode_body(&self.items, &self.local_dict);
    }

    fn encoded_title(&self) -> Vec<u8> {
        encode_truncated(&self.title, u8::MAX as usize).0
    }

    /// Length of the TOC entry.
    pub fn length(&self) -> usize {
        4 + 1
            + 1
            + 2
            + 1
            + self.encoded_title().len()
            + 2
            + self.local_dict.len() * 2
            + 2
            + self.local_index.len() * 2
            + 2
            + self.cells.len() * 2
            + 4
            + self.body.len()
    }

    /// Write the TOC entry. Returns the offset it starts at.
    pub fn write<W: Write + Seek>(&mut self, out: &mut W) -> Result<u32> {
        let offset = to_u32(out.stream_position()?);
        let size = to_u32(self.length() as u64);
        let title = self.encoded_title();

        let mut flags = 0;
        if self.visible {
            flags |= FLAG_VISIBLE;
        }
        if self.is_footnote() {
            flags |= FLAG_FOOTNOTE;
        }
        if !self.children.is_empty() {
            flags |= FLAG_CHILDREN;
        }

        out.write_all(&size.to_le_bytes())?;
        out.write_all(&[flags, self.level])?;
        out.write_all(&self.control_group.unwrap_or(NO_GROUP).to_le_bytes())?;
        out.write_all(&[title.len() as u8])?;
        out.write_all(&title)?;
        write_u16_list(out, &self.local_dict)?;
        write_u16_list(out, &self.local_index)?;
        write_u16_list(out, &self.cells)?;
        out.write_all(&to_u32(self.body.len() as u64).to_le_bytes())?;
        out.write_all(&self.body)?;

        self.toc_size = size;
        Ok(offset)
    }

    /// Write this page's child-window record, if it has children. Returns
    /// the bytes written.
    ///
    /// Record: `u16 size, u16 parent TOC index, u16 child TOC indices`.
    pub fn write_children<W: Write>(&self, out: &mut W) -> Result<u32> {
        if self.children.is_empty() {
            return Ok(0);
        }
        let size = 4 + self.children.len() * 2;
        out.write_all(&to_u16(size).to_le_bytes())?;
        out.write_all(&self.toc_index().to_le_bytes())?;
        for child in &self.children {
            out.write_all(&child.to_le_bytes())?;
        }
        Ok(size as u32)
    }
}

fn write_u16_list<W: Write>(out: &mut W, values: &[u16]) -> Result<()> {
    out.write_all(&to_u16(values.len()).to_le_bytes())?;
    for v in values {
        out.write_all(&v.to_le_bytes())?;
    }
    Ok(())
}

struct Linearizer<'c, 'a> {
    ctx: &'c mut LinearizeContext<'a>,
    page: u16,
    items: Vec<LinearItem>,
    cells: Vec<u16>,
    children: Vec<u16>,
}

impl Linearizer<'_, '_> {
    fn word(&mut self, text: &str) -> Result<()> {
        let id = self.ctx.dictionary.id_of(text)?;
        self.ctx.dictionary.mark_page(id, self.page);
        self.items.push(LinearItem::Word(id));
        Ok(())
    }

    fn escape(&mut self, escape: Escape) {
        self.items.push(LinearItem::Escape(escape));
    }

    fn enter(&mut self, element: &Element) -> Result<()> {
        match element {
            Element::Header(_) | Element::Footnote | Element::ControlRef(_) | Element::Imbed(_) => {}
            Element::ListItem => self.escape(Escape::new(Escape::LIST_ITEM)),
            Element::Text(word) | Element::Punctuation(word) => self.word(word)?,
            Element::Space => self.items.push(LinearItem::Space),
            Element::Break | Element::Caption => self.items.push(LinearItem::Newline),
            Element::Paragraph => self.items.push(LinearItem::Paragraph),
            Element::List(kind) => self.escape(Escape::new(Escape::LIST_BEGIN).with_u8(kind.code())),
            Element::Table { columns } => {
                self.escape(Escape::new(Escape::TABLE_BEGIN).with_u8(*columns))
            }
            Element::Row => self.escape(Escape::new(Escape::ROW)),
            Element::CellRef(cell) => {
                let cell = to_u16(*cell);
                self.cells.push(cell);
                self.escape(Escape::new(Escape::CELL).with_u16(cell));
            }
            Element::Figure | Element::Lines | Element::Example => {
                self.escape(Escape::new(Escape::PREFORMAT_BEGIN))
            }
            Element::Artwork { name } => {
                let offset = self
                    .ctx
                    .bitmaps
                    .and_then(|store| store.offset(name))
                    .ok_or_else(|| Error::FileNotFound {
                        name: name.clone(),
                        searched: Vec::new(),
                    })?;
                self.escape(Escape::new(Escape::IMAGE).with_u32(offset));
            }
            Element::Link(link) => {
                if let Some(database) = &link.database {
                    let file = self.ctx.external.index_of(database).unwrap_or(0);
                    let (kind, value) = match &link.target {
                        LinkTarget::Resource(res) => (EXTERNAL_BY_RESOURCE, *res),
                        LinkTarget::Id(id) => (EXTERNAL_BY_ID, self.ctx.dictionary.id_of(id)?),
                    };
                    self.escape(
                        Escape::new(Escape::EXTERNAL_LINK)
                            .with_u16(file)
                            .with_u8(kind)
                            .with_u16(value),
                    );
                } else {
                    let toc = match &link.target {
                        LinkTarget::Resource(res) => self.ctx.resources.get(*res)?,
                        LinkTarget::Id(id) => self.ctx.names.get(id)?,
                    };
                    let mut flags = 0;
                    if link.child_window {
                        flags |= LINK_CHILD_WINDOW;
                        self.children.push(toc);
                    }
                    self.escape(Escape::new(Escape::LINK).with_u16(toc).with_u8(flags));
                }
            }
            Element::Highlight(level) => self.escape(Escape::new(Escape::HIGHLIGHT).with_u8(*level)),
            Element::Hide => self.escape(Escape::new(Escape::HIDE_BEGIN)),
            Element::Note => {
                self.escape(Escape::new(Escape::NOTE));
                let label = self.ctx.note_label;
                for word in label {
                    self.word(word)?;
                    self.items.push(LinearItem::Space);
                }
            }
            Element::Font(index) => self.escape(Escape::new(Escape::FONT).with_u8(*index)),
            Element::IndexMarker(position) => {
                if let Some(entry) = self.ctx.index.entry(*position) {
                    for root in &entry.roots {
                        self.ctx.synonyms.get(root)?;
                    }
                }
            }
            Element::SecondaryIndex { refid, text } => {
                let secondary = SecondaryEntry {
                    text: text.clone(),
                    page: self.page,
                };
                self.ctx.index.add_secondary(refid, secondary)?;
            }
        }
        Ok(())
    }

    fn leave(&mut self, element: &Element) {
        match element {
            Element::List(_) => self.escape(Escape::new(Escape::LIST_END)),
            Element::Table { .. } => self.escape(Escape::new(Escape::TABLE_END)),
            Element::Figure | Element::Lines | Element::Example => {
                self.escape(Escape::new(Escape::PREFORMAT_END))
            }
            Element::Link(_) => self.escape(Escape::new(Escape::LINK_END)),
            Element::Highlight(_) => self.escape(Escape::new(Escape::HIGHLIGHT).with_u8(0)),
            Element::Hide => self.escape(Escape::new(Escape::HIDE_END)),
            _ => {}
        }
    }
}
