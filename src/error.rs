//! Error types for ipfc operations.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::lexer::Position;

/// Errors that abort a compilation.
///
/// Every variant belongs to one of three severities (see [`Severity`]).
/// All of them currently stop the pipeline; the classification lets a
/// caller report reference and duplicate problems differently from
/// I/O or format-limit failures.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no document body: missing :userdoc. or :euserdoc. tag")]
    NoDocumentBody,

    #[error("document is too small: it contains no pages or no text")]
    DocumentTooSmall,

    #[error("document is too large: {0} dictionary words (limit 16000)")]
    DocumentTooLarge(usize),

    #[error("unexpected end of input before the document body")]
    UnexpectedEof,

    #[error("no visible table of contents entries")]
    NoVisiblePages,

    #[error("too many table of contents entries: {0} (limit 65535)")]
    TooManyPages(usize),

    #[error("index is too large: {0} entries (limit 65535)")]
    IndexTooLarge(usize),

    #[error("too many cells: {0} (limit 65535)")]
    TooManyCells(usize),

    #[error("too many fonts (limit {0})")]
    TooManyFonts(usize),

    #[error("file not found: {name} (searched {} location(s))", searched.len())]
    FileNotFound { name: String, searched: Vec<PathBuf> },

    #[error("invalid bitmap {path}: {reason}")]
    InvalidBitmap { path: PathBuf, reason: &'static str },

    #[error("word not in dictionary: {0}")]
    UnknownWord(String),

    #[error("{operation} called while the document is {phase}")]
    PhaseOrder {
        operation: &'static str,
        phase: crate::document::Phase,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(&'static str),

    #[error("no page has resource id {0}")]
    UnknownResource(u16),

    #[error("no page has id or name '{0}'")]
    UnknownId(String),

    #[error("no index entry has id '{0}'")]
    UnknownIndexId(String),

    #[error("synonym '{0}' is not defined")]
    UnknownSynonym(String),

    #[error("control '{0}' is not defined")]
    UnknownControl(String),

    #[error("resource id {0} is defined more than once")]
    DuplicateResource(u16),

    #[error("id or name '{0}' is defined more than once")]
    DuplicateId(String),

    #[error("index id '{0}' is defined more than once")]
    DuplicateIndexId(String),

    #[error("synonym '{0}' is defined more than once")]
    DuplicateSynonym(String),

    #[error("control '{0}' is defined more than once")]
    DuplicateControl(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// How bad an [`Error`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// I/O failures, format limits, broken document structure.
    Fatal,
    /// A cross-reference with no matching target.
    Reference,
    /// A key defined more than once.
    Duplicate,
}

impl Error {
    pub fn severity(&self) -> Severity {
        match self {
            Error::UnknownResource(_)
            | Error::UnknownId(_)
            | Error::UnknownIndexId(_)
            | Error::UnknownSynonym(_)
            | Error::UnknownControl(_) => Severity::Reference,
            Error::DuplicateResource(_)
            | Error::DuplicateId(_)
            | Error::DuplicateIndexId(_)
            | Error::DuplicateSynonym(_)
            | Error::DuplicateControl(_) => Severity::Duplicate,
            _ => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

/// A recoverable problem found while parsing.
///
/// Diagnostics are logged and counted; parsing carries on after them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub position: Position,
    pub kind: DiagnosticKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Text or tags before `:userdoc.`
    HeadText,
    /// A tag or command that is not allowed where it appears.
    TagContext(String),
    /// Text after `:euserdoc.`
    TailText,
    /// A command other than `.*`, `.br` or `.im`.
    CommandNotDefined(String),
    /// An end tag with no matching open tag.
    UnmatchedEndTag(String),
    /// A title longer than its fixed-width slot.
    TitleTruncated,
    /// A tag missing an attribute it needs.
    MissingAttribute {
        tag: String,
        attribute: &'static str,
    },
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::HeadText => write!(f, "only comments are allowed before :userdoc."),
            DiagnosticKind::TagContext(tag) => write!(f, "'{tag}' is not allowed here"),
            DiagnosticKind::TailText => write!(f, "text after :euserdoc. is ignored"),
            DiagnosticKind::CommandNotDefined(cmd) => write!(f, "undefined command '.{cmd}'"),
            DiagnosticKind::UnmatchedEndTag(tag) => write!(f, "end tag '{tag}' has no open tag"),
            DiagnosticKind::TitleTruncated => write!(f, "title is too long and was truncated"),
            DiagnosticKind::MissingAttribute { tag, attribute } => {
                write!(f, "'{tag}' requires the '{attribute}' attribute")
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.position, self.kind)
    }
}
