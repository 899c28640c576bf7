//! A small scanner for IPF source text.
//!
//! Recognizes tags (`:name attr=value.`), control words at the start of a
//! line (`.*`, `.br`, `.im name`), a handful of symbols (`&colon.` etc.),
//! words, single punctuation characters and whitespace runs.

use std::rc::Rc;

use memchr::memchr;

use super::{Command, Position, Tag, TagId, Token, TokenKind, TokenSource};

pub struct Scanner {
    name: Rc<str>,
    text: String,
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
}

impl Scanner {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        let name: String = name.into();
        Self {
            name: Rc::from(name.as_str()),
            text: text.into(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.text[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn position(&self) -> Position {
        Position {
            source: Rc::clone(&self.name),
            line: self.line,
            column: self.column,
        }
    }

    /// Consume the rest of the current line, including its newline.
    fn rest_of_line(&mut self) -> String {
        let bytes = &self.text.as_bytes()[self.pos..];
        let len = memchr(b'\n', bytes).unwrap_or(bytes.len());
        let line = self.text[self.pos..self.pos + len].trim_end_matches('\r').to_string();
        self.pos += len;
        self.column += line.chars().count() as u32;
        if self.peek() == Some('\n') {
            self.bump();
        }
        line
    }

    fn scan_command(&mut self) -> TokenKind {
        self.bump(); // '.'
        let line = self.rest_of_line();
        self.at_line_start = true;
        if line.starts_with('*') {
            return TokenKind::Command(Command::Comment);
        }
        let mut parts = line.splitn(2, char::is_whitespace);
        let word = parts.next().unwrap_or("").to_ascii_lowercase();
        let arg = parts.next().unwrap_or("").trim();
        match word.as_str() {
            "br" => TokenKind::Command(Command::Break),
            "im" => TokenKind::Command(Command::Imbed(unquote(arg).to_string())),
            _ => TokenKind::Command(Command::Other(word)),
        }
    }

    fn scan_name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c.to_ascii_lowercase());
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn scan_tag(&mut self) -> TokenKind {
        self.bump(); // ':'
        let name = self.scan_name();
        let mut tag = Tag::new(TagId::from_name(&name));
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.bump();
            }
            match self.peek() {
                None => break,
                Some('.') => {
                    self.bump();
                    break;
                }
                Some(c) if c.is_ascii_alphanumeric() => {
                    let attr = self.scan_name();
                    let value = if self.peek() == Some('=') {
                        self.bump();
                        self.scan_value()
                    } else {
                        String::new()
                    };
                    tag.attributes.push((attr, value));
                }
                Some(_) => {
                    // Stray character inside a tag; skip it.
                    self.bump();
                }
            }
        }
        TokenKind::Tag(tag)
    }

    fn scan_value(&mut self) -> String {
        let mut value = String::new();
        match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                while let Some(c) = self.bump() {
                    if c == quote {
                        break;
                    }
                    value.push(c);
                }
            }
            _ => {
                while let Some(c) = self.peek() {
                    if c.is_whitespace() || c == '.' {
                        break;
                    }
                    value.push(c);
                    self.bump();
                }
            }
        }
        value
    }

    fn scan_symbol(&mut self) -> TokenKind {
        let start = self.pos;
        self.bump(); // '&'
        let name = self.scan_name();
        if self.peek() == Some('.')
            && let Some(c) = symbol(&name)
        {
            self.bump();
            return TokenKind::Text(c.to_string());
        }
        TokenKind::Text(self.text[start..self.pos].to_string())
    }

    fn scan_whitespace(&mut self) -> TokenKind {
        let mut newline = false;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            if c == '\n' {
                newline = true;
                self.bump();
                // A control word may start the next line.
                if self.peek() == Some('.') {
                    break;
                }
            } else {
                self.bump();
            }
        }
        self.at_line_start = newline;
        TokenKind::Whitespace { newline }
    }

    fn scan_word(&mut self) -> TokenKind {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                word.push(c);
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Text(word)
    }
}

fn unquote(s: &str) -> &str {
    s.trim_matches(|c| c == '\'' || c == '"')
}

fn symbol(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "colon" => Some(':'),
        "period" => Some('.'),
        "apos" => Some('\''),
        "lbrk" => Some('['),
        "rbrk" => Some(']'),
        _ => None,
    }
}

impl TokenSource for Scanner {
    fn name(&self) -> &str {
        &self.name
    }

    fn next_token(&mut self) -> Token {
        let position = self.position();
        let Some(c) = self.peek() else {
            return Token {
                kind: TokenKind::End,
                position,
            };
        };
        let line_start = std::mem::replace(&mut self.at_line_start, false);
        let kind = match c {
            '.' if line_start => self.scan_command(),
            ':' if self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic()) => self.scan_tag(),
            '&' if self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic()) => self.scan_symbol(),
            c if c.is_whitespace() => self.scan_whitespace(),
            c if c.is_alphanumeric() || c == '_' => self.scan_word(),
            _ => {
                self.bump();
                TokenKind::Text(c.to_string())
            }
        };
        Token { kind, position }
    }
}
