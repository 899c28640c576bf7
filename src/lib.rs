//! # ipfc
//!
//! A compiler for IPF tagged markup. It turns an IPF source into the
//! binary help (`.hlp`) or book (`.inf`) format read by the OS/2 help
//! viewer.
//!
//! ## Pipeline
//!
//! - a [`TokenSource`] yields tags, text, commands and whitespace
//! - [`Document::parse`] builds one element tree per heading or footnote
//!   and fills the registries (dictionary, resource and name maps, index,
//!   synonyms, fonts, controls, ...)
//! - [`Document::build`] numbers the dictionary, stages images, flattens
//!   each page and builds the local tables and optional full-text search
//!   records
//! - [`Document::write`] serializes every section and back-patches the
//!   header
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::fs::File;
//! use ipfc::{CompileOptions, FileOpener, Scanner, compile};
//!
//! let text = std::fs::read_to_string("guide.ipf")?;
//! let mut out = File::create("guide.hlp")?;
//! let doc = compile(
//!     Box::new(Scanner::new("guide.ipf", text)),
//!     &FileOpener,
//!     CompileOptions::from_env().with_searchable(true),
//!     &mut out,
//! )?;
//! println!("{} pages", doc.pages().len());
//! # Ok::<(), ipfc::Error>(())
//! ```

pub mod bitmap;
pub mod cell;
pub mod document;
pub mod error;
pub mod lexer;
pub mod options;
pub mod page;
pub(crate) mod parser;
pub mod registry;
pub mod tree;
pub mod util;

pub use document::{Document, IpfExtHeader, IpfHeader, Phase, compile};
pub use error::{Diagnostic, DiagnosticKind, Error, Result, Severity};
pub use lexer::{FileOpener, Scanner, SourceOpener, Token, TokenKind, TokenSource, VecSource};
pub use options::{CompileOptions, OutputKind};
