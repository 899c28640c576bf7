//! Page element trees and their linear form.

mod arena;
pub mod linear;

pub use arena::{ChildrenIter, ElementId, ElementNode, ElementTree, Visit};
pub use linear::{Escape, LinearItem, encode_body, local_dictionary};

/// A node of a page tree.
///
/// The set is closed: the parser only ever builds these variants.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Root of a header page.
    Header(Header),
    /// Root of a footnote page.
    Footnote,
    /// A word.
    Text(String),
    /// A punctuation character.
    Punctuation(String),
    Space,
    /// `.br`
    Break,
    /// `:p.`
    Paragraph,
    List(ListKind),
    ListItem,
    Table { columns: u8 },
    Row,
    /// A table cell; the text lives in the document's cell list.
    CellRef(usize),
    Figure,
    Caption,
    Artwork { name: String },
    Link(Link),
    Highlight(u8),
    Hide,
    Lines,
    Example,
    Note,
    /// Switch to the font at this index of the font table.
    Font(u8),
    /// Where a primary index entry (`:i1`) was defined; the entry itself is
    /// stored by the document.
    IndexMarker(usize),
    /// `:i2 refid=...` waiting to be attached to its primary entry.
    SecondaryIndex { refid: String, text: String },
    /// `ctrlrefid` of the enclosing header.
    ControlRef(String),
    /// A `.im` processed inside this page.
    Imbed(String),
}

impl Element {
    /// Name used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Element::Header(_) => "heading",
            Element::Footnote => ":fn",
            Element::Text(_) => "text",
            Element::Punctuation(_) => "punctuation",
            Element::Space => "space",
            Element::Break => ".br",
            Element::Paragraph => ":p",
            Element::List(ListKind::Unordered) => ":ul",
            Element::List(ListKind::Ordered) => ":ol",
            Element::List(ListKind::Simple) => ":sl",
            Element::ListItem => ":li",
            Element::Table { .. } => ":table",
            Element::Row => ":row",
            Element::CellRef(_) => ":c",
            Element::Figure => ":fig",
            Element::Caption => ":figcap",
            Element::Artwork { .. } => ":artwork",
            Element::Link(_) => ":link",
            Element::Highlight(_) => ":hp",
            Element::Hide => ":hide",
            Element::Lines => ":lines",
            Element::Example => ":xmp",
            Element::Note => ":note",
            Element::Font(_) => ":font",
            Element::IndexMarker(_) => ":i1",
            Element::SecondaryIndex { .. } => ":i2",
            Element::ControlRef(_) => "ctrlrefid",
            Element::Imbed(_) => ".im",
        }
    }
}

/// Heading data needed for the table of contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// 1 through 6.
    pub level: u8,
    pub title: String,
    /// `hide` attribute: keep the page out of the contents.
    pub hidden: bool,
}

impl Header {
    pub fn new(level: u8, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Unordered,
    Ordered,
    Simple,
}

impl ListKind {
    pub fn code(self) -> u8 {
        match self {
            ListKind::Unordered => 1,
            ListKind::Ordered => 2,
            ListKind::Simple => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// `res=`
    Resource(u16),
    /// `refid=`
    Id(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub target: LinkTarget,
    /// Another help file holding the target.
    pub database: Option<String>,
    /// `auto split`: open the target as a child window of this page.
    pub child_window: bool,
}
