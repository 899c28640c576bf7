//! Token model consumed by the parser.
//!
//! The parser pulls tokens one at a time from a [`TokenSource`]. Sources
//! for imbedded files are produced by a [`SourceOpener`]; the default
//! [`FileOpener`] reads the file from disk and scans it with [`Scanner`].

mod scanner;

use std::fmt;
use std::io;
use std::path::Path;
use std::rc::Rc;

pub use scanner::Scanner;

use crate::util::decode_text;

/// Where a token starts in its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub source: Rc<str>,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(source: &str, line: u32, column: u32) -> Self {
        Self {
            source: Rc::from(source),
            line,
            column,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}:{})", self.source, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Tag(Tag),
    /// A word or a single punctuation character.
    Text(String),
    Command(Command),
    Whitespace { newline: bool },
    End,
}

impl TokenKind {
    /// Shorthand for a tag without attributes.
    pub fn tag(id: TagId) -> Self {
        TokenKind::Tag(Tag::new(id))
    }

    pub fn text(text: impl Into<String>) -> Self {
        TokenKind::Text(text.into())
    }

    pub fn space() -> Self {
        TokenKind::Whitespace { newline: false }
    }

    pub fn newline() -> Self {
        TokenKind::Whitespace { newline: true }
    }
}

/// A markup tag such as `:h1 res=001.`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: TagId,
    /// Attribute names are lower case; flags have an empty value.
    pub attributes: Vec<(String, String)>,
}

impl Tag {
    pub fn new(id: TagId) -> Self {
        Self {
            id,
            attributes: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attributes.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    pub fn with_flag(self, name: &str) -> Self {
        self.with_attr(name, "")
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }
}

/// Every tag the compiler knows about.
///
/// End tags are separate variants, matching the markup (`:ul.` ... `:eul.`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagId {
    Userdoc,
    Euserdoc,
    Title,
    Docprof,
    Ctrldef,
    Ectrldef,
    Pbutton,
    Ctrl,
    /// `:h1` through `:h6`.
    Heading(u8),
    Fn,
    Efn,
    P,
    Ul,
    Eul,
    Ol,
    Eol,
    Sl,
    Esl,
    Li,
    Table,
    Etable,
    Row,
    C,
    Fig,
    Efig,
    Figcap,
    Artwork,
    Link,
    Elink,
    /// `:hp1` through `:hp9`.
    Hp(u8),
    Ehp(u8),
    Hide,
    Ehide,
    Lines,
    Elines,
    Xmp,
    Exmp,
    Note,
    Font,
    I1,
    I2,
    Icmd,
    Isyn,
    Unknown(String),
}

impl TagId {
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_ascii_lowercase();
        match lower.as_str() {
            "userdoc" => TagId::Userdoc,
            "euserdoc" => TagId::Euserdoc,
            "title" => TagId::Title,
            "docprof" => TagId::Docprof,
            "ctrldef" => TagId::Ctrldef,
            "ectrldef" => TagId::Ectrldef,
            "pbutton" => TagId::Pbutton,
            "ctrl" => TagId::Ctrl,
            "fn" => TagId::Fn,
            "efn" => TagId::Efn,
            "p" => TagId::P,
            "ul" => TagId::Ul,
            "eul" => TagId::Eul,
            "ol" => TagId::Ol,
            "eol" => TagId::Eol,
            "sl" => TagId::Sl,
            "esl" => TagId::Esl,
            "li" => TagId::Li,
            "table" => TagId::Table,
            "etable" => TagId::Etable,
            "row" => TagId::Row,
            "c" => TagId::C,
            "fig" => TagId::Fig,
            "efig" => TagId::Efig,
            "figcap" => TagId::Figcap,
            "artwork" => TagId::Artwork,
            "link" => TagId::Link,
            "elink" => TagId::Elink,
            "hide" => TagId::Hide,
            "ehide" => TagId::Ehide,
            "lines" => TagId::Lines,
            "elines" => TagId::Elines,
            "xmp" => TagId::Xmp,
            "exmp" => TagId::Exmp,
            "note" => TagId::Note,
            "font" => TagId::Font,
            "i1" => TagId::I1,
            "i2" => TagId::I2,
            "icmd" => TagId::Icmd,
            "isyn" => TagId::Isyn,
            _ => numbered_tag(&lower).unwrap_or(TagId::Unknown(lower)),
        }
    }
}

fn numbered_tag(name: &str) -> Option<TagId> {
    let digit = |s: &str, max: u8| {
        let n = s.parse::<u8>().ok()?;
        (s.len() == 1 && (1..=max).contains(&n)).then_some(n)
    };
    if let Some(rest) = name.strip_prefix("ehp") {
        return digit(rest, 9).map(TagId::Ehp);
    }
    if let Some(rest) = name.strip_prefix("hp") {
        return digit(rest, 9).map(TagId::Hp);
    }
    if let Some(rest) = name.strip_prefix('h') {
        return digit(rest, 6).map(TagId::Heading);
    }
    None
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TagId::Heading(n) => return write!(f, ":h{n}"),
            TagId::Hp(n) => return write!(f, ":hp{n}"),
            TagId::Ehp(n) => return write!(f, ":ehp{n}"),
            TagId::Unknown(name) => return write!(f, ":{name}"),
            TagId::Userdoc => "userdoc",
            TagId::Euserdoc => "euserdoc",
            TagId::Title => "title",
            TagId::Docprof => "docprof",
            TagId::Ctrldef => "ctrldef",
            TagId::Ectrldef => "ectrldef",
            TagId::Pbutton => "pbutton",
            TagId::Ctrl => "ctrl",
            TagId::Fn => "fn",
            TagId::Efn => "efn",
            TagId::P => "p",
            TagId::Ul => "ul",
            TagId::Eul => "eul",
            TagId::Ol => "ol",
            TagId::Eol => "eol",
            TagId::Sl => "sl",
            TagId::Esl => "esl",
            TagId::Li => "li",
            TagId::Table => "table",
            TagId::Etable => "etable",
            TagId::Row => "row",
            TagId::C => "c",
            TagId::Fig => "fig",
            TagId::Efig => "efig",
            TagId::Figcap => "figcap",
            TagId::Artwork => "artwork",
            TagId::Link => "link",
            TagId::Elink => "elink",
            TagId::Hide => "hide",
            TagId::Ehide => "ehide",
            TagId::Lines => "lines",
            TagId::Elines => "elines",
            TagId::Xmp => "xmp",
            TagId::Exmp => "exmp",
            TagId::Note => "note",
            TagId::Font => "font",
            TagId::I1 => "i1",
            TagId::I2 => "i2",
            TagId::Icmd => "icmd",
            TagId::Isyn => "isyn",
        };
        write!(f, ":{name}")
    }
}

/// A control-word line such as `.im other.ipf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `.*`
    Comment,
    /// `.br`
    Break,
    /// `.im name`
    Imbed(String),
    Other(String),
}

/// A pull-based stream of tokens.
///
/// After the last real token a source keeps returning [`TokenKind::End`].
pub trait TokenSource {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    fn next_token(&mut self) -> Token;
}

/// Opens the token source for an imbedded file.
pub trait SourceOpener {
    /// Fails with [`io::ErrorKind::NotFound`] when `path` does not exist.
    fn open(&self, path: &Path) -> io::Result<Box<dyn TokenSource>>;
}

/// Reads files from disk and scans them with [`Scanner`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FileOpener;

impl SourceOpener for FileOpener {
    fn open(&self, path: &Path) -> io::Result<Box<dyn TokenSource>> {
        let bytes = std::fs::read(path)?;
        let text = decode_text(&bytes, None).into_owned();
        Ok(Box::new(Scanner::new(path.display().to_string(), text)))
    }
}

/// A source over a prepared list of tokens.
///
/// Positions are synthetic: token `n` is reported at line `n + 1`.
pub struct VecSource {
    name: Rc<str>,
    tokens: std::vec::IntoIter<TokenKind>,
    line: u32,
}

impl VecSource {
    pub fn new(name: &str, tokens: Vec<TokenKind>) -> Self {
        Self {
            name: Rc::from(name),
            tokens: tokens.into_iter(),
            line: 0,
        }
    }
}

impl TokenSource for VecSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_token(&mut self) -> Token {
        self.line += 1;
        let kind = self.tokens.next().unwrap_or(TokenKind::End);
        Token {
            kind,
            position: Position {
                source: Rc::clone(&self.name),
                line: self.line,
                column: 1,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_names() {
        assert_eq!(TagId::from_name("H3"), TagId::Heading(3));
        assert_eq!(TagId::from_name("h7"), TagId::Unknown("h7".into()));
        assert_eq!(TagId::from_name("hp2"), TagId::Hp(2));
        assert_eq!(TagId::from_name("ehp9"), TagId::Ehp(9));
        assert_eq!(TagId::from_name("euserdoc"), TagId::Euserdoc);
        assert_eq!(TagId::from_name("bogus"), TagId::Unknown("bogus".into()));
        assert_eq!(TagId::Heading(2).to_string(), ":h2");
        assert_eq!(TagId::Etable.to_string(), ":etable");
    }

    #[test]
    fn test_tag_attributes() {
        let tag = Tag::new(TagId::Heading(1))
            .with_attr("RES", "12")
            .with_flag("hide");
        assert_eq!(tag.attr("res"), Some("12"));
        assert!(tag.has_flag("hide"));
        assert!(!tag.has_flag("global"));
    }

    #[test]
    fn test_vec_source_ends() {
        let mut src = VecSource::new("mem", vec![TokenKind::text("a")]);
        assert_eq!(src.next_token().kind, TokenKind::text("a"));
        assert_eq!(src.next_token().kind, TokenKind::End);
        assert_eq!(src.next_token().kind, TokenKind::End);
    }
}
