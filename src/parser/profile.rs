//! Tags allowed between `:userdoc.` and the first page.

use super::Parser;
use crate::error::{DiagnosticKind, Error, Result};
use crate::lexer::{Command, Position, Tag, TagId, TokenKind};
use crate::registry::Button;
use crate::util::encode_text;

/// Longest document title the header holds.
pub(crate) const MAX_DOC_TITLE_LEN: usize = 47;

/// `:title.` text runs to the end of the line.
pub(super) fn title(parser: &mut Parser<'_>, position: Position) {
    let title = parser.capture_line(false);
    if encode_text(&title).len() > MAX_DOC_TITLE_LEN {
        parser.diagnostic(position, DiagnosticKind::TitleTruncated);
    }
    parser.doc.title = title;
}

/// `:docprof.`: deepest heading level shown in the contents, plus strings
/// for the help manager.
pub(super) fn docprof(parser: &mut Parser<'_>, tag: &Tag) {
    if let Some(toc) = tag.attr("toc") {
        let level = toc
            .chars()
            .filter_map(|c| c.to_digit(10))
            .filter(|d| (1..=6).contains(d))
            .max();
        if let Some(level) = level {
            parser.doc.max_level = level as u8;
        }
    }
    for attribute in ["dll", "objectname", "objectinfo"] {
        if let Some(value) = tag.attr(attribute) {
            parser.doc.strings.add(value);
        }
    }
}

/// `:ctrldef.` up to `:ectrldef.`: push buttons and control groups.
pub(super) fn ctrldef(parser: &mut Parser<'_>) -> Result<()> {
    loop {
        let tok = parser.next();
        match tok.kind {
            TokenKind::End => return Err(Error::UnexpectedEof),
            TokenKind::Tag(tag) => match tag.id {
                TagId::Ectrldef => return Ok(()),
                TagId::Pbutton => pbutton(parser, &tag, tok.position)?,
                TagId::Ctrl => ctrl(parser, &tag, tok.position)?,
                _ => parser.diagnostic(tok.position, DiagnosticKind::TagContext(tag.id.to_string())),
            },
            TokenKind::Whitespace { .. } | TokenKind::Command(Command::Comment) => {}
            TokenKind::Command(command) => parser.command(command, tok.position)?,
            TokenKind::Text(text) => parser.diagnostic(tok.position, DiagnosticKind::TagContext(text)),
        }
    }
}

fn require<'t>(
    parser: &mut Parser<'_>,
    tag: &'t Tag,
    attribute: &'static str,
    position: &Position,
) -> Option<&'t str> {
    let value = tag.attr(attribute);
    if value.is_none() {
        parser.diagnostic(
            position.clone(),
            DiagnosticKind::MissingAttribute {
                tag: tag.id.to_string(),
                attribute,
            },
        );
    }
    value
}

fn pbutton(parser: &mut Parser<'_>, tag: &Tag, position: Position) -> Result<()> {
    let Some(id) = require(parser, tag, "id", &position) else {
        return Ok(());
    };
    let Some(res) = require(parser, tag, "res", &position) else {
        return Ok(());
    };
    let Ok(res) = res.trim().parse::<u16>() else {
        parser.diagnostic(
            position,
            DiagnosticKind::MissingAttribute {
                tag: tag.id.to_string(),
                attribute: "res",
            },
        );
        return Ok(());
    };
    let button = Button {
        id: id.to_string(),
        res,
        text: tag.attr("text").unwrap_or(id).to_string(),
    };
    parser.doc.controls.add_button(button)?;
    Ok(())
}

fn ctrl(parser: &mut Parser<'_>, tag: &Tag, position: Position) -> Result<()> {
    let Some(id) = require(parser, tag, "ctrlid", &position) else {
        return Ok(());
    };
    let buttons: Vec<&str> = tag
        .attr("controls")
        .map(|c| c.split_whitespace().collect())
        .unwrap_or_default();
    parser
        .doc
        .controls
        .add_group(id, &buttons, tag.has_flag("coverpage"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::lexer::{SourceOpener, TokenSource, VecSource};
    use crate::options::CompileOptions;

    struct NoFiles;

    impl SourceOpener for NoFiles {
        fn open(&self, _: &std::path::Path) -> std::io::Result<Box<dyn TokenSource>> {
            Err(std::io::ErrorKind::NotFound.into())
        }
    }

    fn parse(profile: Vec<TokenKind>) -> (Document, Result<()>) {
        let mut tokens = vec![TokenKind::tag(TagId::Userdoc)];
        tokens.extend(profile);
        tokens.extend([
            TokenKind::tag(TagId::Heading(1)),
            TokenKind::text("Page"),
            TokenKind::newline(),
            TokenKind::tag(TagId::Euserdoc),
        ]);
        let mut doc = Document::new(CompileOptions::default());
        let result = Parser::new(&mut doc, Box::new(VecSource::new("t.ipf", tokens)), &NoFiles).run();
        (doc, result)
    }

    #[test]
    fn test_title_and_docprof() {
        let (doc, result) = parse(vec![
            TokenKind::tag(TagId::Title),
            TokenKind::text("User"),
            TokenKind::space(),
            TokenKind::text("Guide"),
            TokenKind::newline(),
            TokenKind::Tag(
                Tag::new(TagId::Docprof)
                    .with_attr("toc", "1234")
                    .with_attr("dll", "helper"),
            ),
        ]);
        result.unwrap();
        assert_eq!(doc.title, "User Guide");
        assert_eq!(doc.max_level, 4);
        assert_eq!(doc.strings.get(0), Some("helper"));
    }

    #[test]
    fn test_long_document_title() {
        let (doc, result) = parse(vec![
            TokenKind::tag(TagId::Title),
            TokenKind::text("t".repeat(60)),
            TokenKind::newline(),
        ]);
        result.unwrap();
        assert_eq!(doc.diagnostics[0].kind, DiagnosticKind::TitleTruncated);
    }

    #[test]
    fn test_ctrldef() {
        let (doc, result) = parse(vec![
            TokenKind::tag(TagId::Ctrldef),
            TokenKind::Tag(
                Tag::new(TagId::Pbutton)
                    .with_attr("id", "prev")
                    .with_attr("res", "8")
                    .with_attr("text", "Previous"),
            ),
            TokenKind::Tag(
                Tag::new(TagId::Ctrl)
                    .with_attr("ctrlid", "nav")
                    .with_attr("controls", "prev")
                    .with_flag("coverpage"),
            ),
            TokenKind::tag(TagId::Ectrldef),
        ]);
        result.unwrap();
        assert_eq!(doc.controls.button_index("prev").unwrap(), 0);
        assert_eq!(doc.controls.group_index("nav").unwrap(), 0);
    }

    #[test]
    fn test_ctrl_with_unknown_button() {
        let (_, result) = parse(vec![
            TokenKind::tag(TagId::Ctrldef),
            TokenKind::Tag(
                Tag::new(TagId::Ctrl)
                    .with_attr("ctrlid", "nav")
                    .with_attr("controls", "missing"),
            ),
            TokenKind::tag(TagId::Ectrldef),
        ]);
        assert!(matches!(result, Err(Error::UnknownControl(_))));
    }

    #[test]
    fn test_unterminated_ctrldef() {
        let mut doc = Document::new(CompileOptions::default());
        let tokens = vec![TokenKind::tag(TagId::Userdoc), TokenKind::tag(TagId::Ctrldef)];
        let result = Parser::new(&mut doc, Box::new(VecSource::new("t.ipf", tokens)), &NoFiles).run();
        assert!(matches!(result, Err(Error::UnexpectedEof)));
    }
}
