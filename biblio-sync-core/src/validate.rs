//! BibTeX syntax validation.
//!
//! [`BibtexValidator`] accepts the usual BibTeX surface syntax:
//!
//! - free text between entries is ignored (it is comment text to BibTeX);
//! - `@type{ ... }` or `@type( ... )`, with the closing delimiter matching;
//! - `@comment` bodies only need balanced braces;
//! - `@preamble` holds one value, `@string` one `name = value` pair;
//! - every other type holds a citation key followed by `, name = value`
//!   fields, with an optional trailing comma;
//! - values are `{braced}`, `"quoted"`, numbers or macro names, joined by `#`.
//!
//! Only syntax is checked. Field names, entry types and macro references are
//! not interpreted, and the content is never decoded: BibTeX is byte
//! oriented, so Latin-1 and other legacy encodings validate like ASCII.

use crate::contract::{BibFile, BibSummary, ValidationError, Validator};

#[derive(Debug, Clone, Copy, Default)]
pub struct BibtexValidator;

impl BibtexValidator {
    pub fn new() -> Self {
        Self
    }
}

impl Validator for BibtexValidator {
    fn validate(&self, file: &BibFile) -> Result<BibSummary, ValidationError> {
        let entries = Parser::new(&file.content).parse()?;
        Ok(BibSummary { entries })
    }
}

type ParseResult<T> = Result<T, ValidationError>;

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    /// Returns the number of citable entries.
    fn parse(mut self) -> ParseResult<usize> {
        let mut entries = 0;
        while let Some(offset) = self.src[self.pos..].iter().position(|&b| b == b'@') {
            self.pos += offset + 1;
            if self.entry()? {
                entries += 1;
            }
        }
        Ok(entries)
    }

    /// Parses one entry after its `@`; true when it is a citable entry.
    fn entry(&mut self) -> ParseResult<bool> {
        self.skip_ws();
        let kind = self
            .ident()
            .ok_or_else(|| self.error("expected entry type after '@'"))?
            .to_ascii_lowercase();
        let kind = String::from_utf8_lossy(&kind).into_owned();
        self.skip_ws();
        let close = match self.peek() {
            Some(b'{') => b'}',
            Some(b'(') => b')',
            _ => return Err(self.error(format!("expected '{{' or '(' after @{kind}"))),
        };
        self.pos += 1;

        match kind.as_str() {
            "comment" => {
                self.comment_body(close)?;
                Ok(false)
            }
            "preamble" => {
                self.skip_ws();
                self.value()?;
                self.skip_ws();
                self.expect(close, "to close @preamble")?;
                Ok(false)
            }
            "string" => {
                self.skip_ws();
                self.field()?;
                self.skip_ws();
                self.expect(close, "to close @string")?;
                Ok(false)
            }
            _ => {
                self.citation(close)?;
                Ok(true)
            }
        }
    }

    fn comment_body(&mut self, close: u8) -> ParseResult<()> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(b) = self.bump() {
            match b {
                b'{' => depth += 1,
                b'}' if depth == 0 => {
                    if close == b'}' {
                        return Ok(());
                    }
                    return Err(self.error_at(self.pos - 1, "unbalanced '}' in @comment"));
                }
                b'}' => depth -= 1,
                b')' if depth == 0 && close == b')' => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_at(start, "unterminated @comment"))
    }

    fn citation(&mut self, close: u8) -> ParseResult<()> {
        self.skip_ws();
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_whitespace() || b == close || b == b',' {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.error("missing citation key"));
        }

        loop {
            self.skip_ws();
            match self.peek() {
                Some(b) if b == close => {
                    self.pos += 1;
                    return Ok(());
                }
                Some(b',') => {
                    self.pos += 1;
                    self.skip_ws();
                    if self.peek() == Some(close) {
                        self.pos += 1;
                        return Ok(());
                    }
                    self.field()?;
                }
                Some(b) => {
                    return Err(self.error(format!(
                        "expected ',' or '{}', found '{}'",
                        close as char, b as char
                    )))
                }
                None => {
                    return Err(self.error(format!(
                        "unexpected end of file, entry is missing its closing '{}'",
                        close as char
                    )))
                }
            }
        }
    }

    /// `name = value`
    fn field(&mut self) -> ParseResult<()> {
        let name = self
            .ident()
            .ok_or_else(|| self.error("expected field name"))?;
        self.skip_ws();
        let context = format!("after field '{}'", String::from_utf8_lossy(name));
        self.expect(b'=', &context)?;
        self.skip_ws();
        self.value()
    }

    fn value(&mut self) -> ParseResult<()> {
        loop {
            self.part()?;
            self.skip_ws();
            if self.peek() != Some(b'#') {
                return Ok(());
            }
            self.pos += 1;
            self.skip_ws();
        }
    }

    fn part(&mut self) -> ParseResult<()> {
        match self.peek() {
            Some(b'{') => {
                self.pos += 1;
                self.braced()
            }
            Some(b'"') => {
                self.pos += 1;
                self.quoted()
            }
            Some(b) if b.is_ascii_digit() => {
                while matches!(self.peek(), Some(d) if d.is_ascii_digit()) {
                    self.pos += 1;
                }
                Ok(())
            }
            Some(_) => self
                .ident()
                .map(|_| ())
                .ok_or_else(|| self.error("expected a value")),
            None => Err(self.error("expected a value, found end of file")),
        }
    }

    fn braced(&mut self) -> ParseResult<()> {
        let open = self.pos - 1;
        let mut depth = 1usize;
        while let Some(b) = self.bump() {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(());
                    }
                }
                _ => {}
            }
        }
        Err(self.error_at(open, "unbalanced braces: '{' is never closed"))
    }

    fn quoted(&mut self) -> ParseResult<()> {
        let open = self.pos - 1;
        let mut depth = 0usize;
        while let Some(b) = self.bump() {
            match b {
                b'{' => depth += 1,
                b'}' if depth == 0 => {
                    return Err(self.error_at(self.pos - 1, "unbalanced '}' inside quoted value"))
                }
                b'}' => depth -= 1,
                b'"' if depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_at(open, "unterminated quoted value"))
    }

    fn ident(&mut self) -> Option<&'a [u8]> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b':' | b'.' | b'+' | b'/') {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start || self.src[start].is_ascii_digit() {
            self.pos = start;
            return None;
        }
        Some(&self.src[start..self.pos])
    }

    fn expect(&mut self, want: u8, context: &str) -> ParseResult<()> {
        match self.peek() {
            Some(b) if b == want => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected '{}' {context}, found '{}'",
                want as char, b as char
            ))),
            None => Err(self.error(format!(
                "expected '{}' {context}, found end of file",
                want as char
            ))),
        }
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(b) if b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn error(&self, message: impl Into<String>) -> ValidationError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, pos: usize, message: impl Into<String>) -> ValidationError {
        let end = pos.min(self.src.len());
        let line = 1 + self.src[..end].iter().filter(|&&b| b == b'\n').count();
        ValidationError::Syntax {
            line,
            message: message.into(),
        }
    }
}
