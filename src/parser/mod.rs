//! Turns a token stream into pages and registry entries.
//!
//! The document is read in four zones:
//!
//! 1. before `:userdoc.`: comments only
//! 2. the profile: `:title.`, `:docprof.` and `:ctrldef.` up to the first
//!    heading or footnote
//! 3. the body: one page per heading or footnote, up to `:euserdoc.`
//! 4. the tail: whitespace and comments only
//!
//! Misplaced tags and text are reported as [`Diagnostic`]s and skipped.
//! A missing body or an early end of input stops the parse.

mod page;
mod profile;

use crate::document::Document;
use crate::error::{Diagnostic, DiagnosticKind, Error, Result};
use crate::lexer::{Command, Position, SourceOpener, TagId, Token, TokenKind, TokenSource};
use crate::registry::MAX_WORDS;
use crate::util::resolve_in_path;

use page::PageBuilder;

pub(crate) struct Parser<'a> {
    doc: &'a mut Document,
    opener: &'a dyn SourceOpener,
    /// Innermost (most recently imbedded) source last.
    inputs: Vec<Box<dyn TokenSource>>,
    pending: Option<Token>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        doc: &'a mut Document,
        source: Box<dyn TokenSource>,
        opener: &'a dyn SourceOpener,
    ) -> Self {
        Self {
            doc,
            opener,
            inputs: vec![source],
            pending: None,
        }
    }

    /// Next token from the innermost source. Exhausted imbedded sources
    /// are dropped and reading resumes in the one that imbedded them.
    fn next(&mut self) -> Token {
        if let Some(tok) = self.pending.take() {
            return tok;
        }
        loop {
            let Some(source) = self.inputs.last_mut() else {
                return Token {
                    kind: TokenKind::End,
                    position: Position::new("", 0, 0),
                };
            };
            let tok = source.next_token();
            if tok.kind == TokenKind::End && self.inputs.len() > 1 {
                if let Some(done) = self.inputs.pop() {
                    tracing::debug!("finished imbedded file {}", done.name());
                }
                continue;
            }
            return tok;
        }
    }

    /// Hand `tok` back; the next call to `next` returns it.
    fn push_back(&mut self, tok: Token) {
        self.pending = Some(tok);
    }

    fn diagnostic(&mut self, position: Position, kind: DiagnosticKind) {
        let diagnostic = Diagnostic { position, kind };
        tracing::warn!("{diagnostic}");
        self.doc.diagnostics.push(diagnostic);
    }

    /// Read words up to the end of the line. The terminating newline is
    /// consumed; a tag or command ending the line early is left for the
    /// caller.
    fn capture_line(&mut self, register_words: bool) -> String {
        let mut text = String::new();
        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::Text(word) => {
                    if register_words {
                        self.doc.dictionary.insert(&word);
                    }
                    text.push_str(&word);
                }
                TokenKind::Whitespace { newline: false } => {
                    if !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                }
                TokenKind::Whitespace { newline: true } => break,
                _ => {
                    self.push_back(tok);
                    break;
                }
            }
        }
        let trimmed = text.trim_end().len();
        text.truncate(trimmed);
        text
    }

    /// Splice the file `name`, found on the imbed path, into the input.
    fn imbed(&mut self, name: &str) -> Result<()> {
        let opener = self.opener;
        let (source, path) = resolve_in_path(&self.doc.options().imbed_path, name, |path| {
            opener.open(path).map_err(Error::from)
        })?;
        tracing::debug!("imbedding {}", path.display());
        self.inputs.push(source);
        Ok(())
    }

    /// A command outside a page.
    fn command(&mut self, command: Command, position: Position) -> Result<()> {
        match command {
            Command::Comment => {}
            Command::Imbed(name) => self.imbed(&name)?,
            Command::Break => {
                self.diagnostic(position, DiagnosticKind::TagContext(".br".to_string()))
            }
            Command::Other(name) => {
                self.diagnostic(position, DiagnosticKind::CommandNotDefined(name))
            }
        }
        Ok(())
    }

    pub(crate) fn run(&mut self) -> Result<()> {
        self.preamble()?;
        let first = self.profile()?;
        self.body(first)?;
        self.tail();

        let words = self.doc.dictionary.size();
        if words == 0 {
            return Err(Error::DocumentTooSmall);
        }
        if words > MAX_WORDS {
            return Err(Error::DocumentTooLarge(words));
        }
        tracing::debug!(
            "parsed {} pages, {} cells, {} words",
            self.doc.pages.len(),
            self.doc.cells.len(),
            words
        );
        Ok(())
    }

    fn preamble(&mut self) -> Result<()> {
        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::End => return Err(Error::NoDocumentBody),
                TokenKind::Tag(tag) if tag.id == TagId::Userdoc => return Ok(()),
                TokenKind::Command(Command::Comment) | TokenKind::Whitespace { .. } => {}
                _ => self.diagnostic(tok.position, DiagnosticKind::HeadText),
            }
        }
    }

    /// Returns the heading or footnote tag that opens the body.
    fn profile(&mut self) -> Result<Token> {
        loop {
            let Token { kind, position } = self.next();
            match kind {
                TokenKind::End => return Err(Error::UnexpectedEof),
                TokenKind::Tag(tag) => match tag.id {
                    TagId::Title => profile::title(self, position),
                    TagId::Docprof => profile::docprof(self, &tag),
                    TagId::Ctrldef => profile::ctrldef(self)?,
                    TagId::Heading(_) | TagId::Fn => {
                        return Ok(Token {
                            kind: TokenKind::Tag(tag),
                            position,
                        });
                    }
                    TagId::Euserdoc => return Err(Error::DocumentTooSmall),
                    other => self.diagnostic(position, DiagnosticKind::TagContext(other.to_string())),
                },
                TokenKind::Command(command) => self.command(command, position)?,
                TokenKind::Whitespace { .. } => {}
                TokenKind::Text(text) => self.diagnostic(position, DiagnosticKind::TagContext(text)),
            }
        }
    }

    fn body(&mut self, first: Token) -> Result<()> {
        let mut tok = first;
        loop {
            let Token { kind, position } = tok;
            match kind {
                TokenKind::End => return Err(Error::NoDocumentBody),
                TokenKind::Tag(tag) => match tag.id {
                    TagId::Heading(_) | TagId::Fn => {
                        tok = PageBuilder::start(self, tag, position)?.parse()?;
                        continue;
                    }
                    TagId::Euserdoc => return Ok(()),
                    other => self.diagnostic(position, DiagnosticKind::TagContext(other.to_string())),
                },
                TokenKind::Command(command) => self.command(command, position)?,
                TokenKind::Whitespace { .. } => {}
                TokenKind::Text(text) => self.diagnostic(position, DiagnosticKind::TagContext(text)),
            }
            tok = self.next();
        }
    }

    fn tail(&mut self) {
        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::End => return,
                TokenKind::Whitespace { .. } | TokenKind::Command(Command::Comment) => {}
                _ => self.diagnostic(tok.position, DiagnosticKind::TailText),
            }
        }
    }
}
