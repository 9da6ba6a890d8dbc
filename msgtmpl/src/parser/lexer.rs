use std::ops::Range;

use crate::parser::error::{ParseError, ParseErrorKind};

/// A placeholder as written: `${NAME}`, `&{NAME}`, `${LIST.FIELD}` or `&{LIST.FIELD}`.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Placeholder {
    pub name: String,
    pub field: Option<String>,
    pub span: Range<usize>,
}

/// Byte cursor over the raw text of one post.
pub(crate) struct Cursor<'a> {
    source: &'a str,
    pos: usize,
    post: u32,
}

impl<'a> Cursor<'a> {
    pub fn new(source: &'a str, pos: usize, post: u32) -> Self {
        Cursor { source, pos, post }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.source.len()
    }

    pub fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    pub fn peek(&self, s: &str) -> bool {
        self.rest().starts_with(s)
    }

    pub fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    /// Advance past `len` bytes. Callers only pass lengths of text they have
    /// just matched, so the cursor stays on a char boundary.
    pub fn bump(&mut self, len: usize) {
        self.pos = (self.pos + len).min(self.source.len());
    }

    /// Consume one char and return it.
    pub fn next_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn error(&self, kind: ParseErrorKind, span: Range<usize>) -> ParseError {
        ParseError::new(kind, self.post, span)
    }

    /// Error located at the current position.
    pub fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        let end = self
            .peek_char()
            .map_or(self.pos, |c| self.pos + c.len_utf8());
        self.error(kind, self.pos..end)
    }

    /// Skip spaces, tabs and carriage returns.
    pub fn skip_blanks(&mut self) {
        while let Some(c) = self.peek_char() {
            if is_blank(c) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// If the rest of the current line is blank, consume it including the
    /// newline and return true. Otherwise leave the cursor untouched.
    pub fn skip_line_end(&mut self) -> bool {
        let rest = self.rest();
        let blank_len = rest.find(|c: char| !is_blank(c)).unwrap_or(rest.len());
        match rest[blank_len..].chars().next() {
            Some('\n') => {
                self.pos += blank_len + 1;
                true
            }
            None => {
                self.pos += blank_len;
                true
            }
            Some(_) => false,
        }
    }

    /// Whether an uppercase keyword starts here as a whole word.
    /// `IF` and `LOOP` must be followed by a blank; `CONTINUE`, `NOT` and
    /// `THEN` by anything that cannot continue an identifier.
    pub fn at_keyword(&self, keyword: &str) -> bool {
        if !self.peek(keyword) {
            return false;
        }
        let before = self.source[..self.pos].chars().next_back();
        if before.is_some_and(is_ident_char) {
            return false;
        }
        let after = self.source[self.pos + keyword.len()..].chars().next();
        match keyword {
            "IF" | "LOOP" => after.is_some_and(is_blank),
            _ => !after.is_some_and(is_ident_char),
        }
    }

    /// `IF` or `LOOP` opening a structure: the keyword, then a placeholder
    /// (after `NOT` for IF). Otherwise the word is ordinary text.
    pub fn at_structure(&self, keyword: &str) -> bool {
        if !self.at_keyword(keyword) {
            return false;
        }
        let mut ahead = Cursor::new(self.source, self.pos + keyword.len(), self.post);
        ahead.skip_blanks();
        if keyword == "IF" && ahead.at_keyword("NOT") {
            ahead.bump("NOT".len());
            ahead.skip_blanks();
        }
        ahead.at_placeholder()
    }

    pub fn at_placeholder(&self) -> bool {
        self.peek("${") || self.peek("&{")
    }

    /// Read a placeholder. The cursor must be at `${` or `&{`.
    pub fn placeholder(&mut self) -> Result<Placeholder, ParseError> {
        let start = self.pos;
        self.bump(2);
        let rest = self.rest();
        let Some(close) = rest.find(['}', '\n']).filter(|&i| rest[i..].starts_with('}')) else {
            return Err(self.error(ParseErrorKind::UnterminatedPlaceholder, start..start + 2));
        };
        let content = rest[..close].trim();
        self.bump(close + 1);
        let span = start..self.pos;

        let invalid = || ParseError::new(
            ParseErrorKind::InvalidPlaceholder(content.to_string()),
            self.post,
            span.clone(),
        );

        let mut segments = content.split('.');
        let name = segments.next().unwrap_or_default();
        let field = segments.next();
        if segments.next().is_some() || !is_identifier(name) {
            return Err(invalid());
        }
        if let Some(field) = field {
            if !is_identifier(field) {
                return Err(invalid());
            }
        }

        Ok(Placeholder {
            name: name.to_string(),
            field: field.map(str::to_string),
            span,
        })
    }

    /// Read a `"quoted"` string. The cursor must be at the opening quote.
    pub fn quoted(&mut self) -> Result<(String, Range<usize>), ParseError> {
        let start = self.pos;
        self.bump(1);
        let rest = self.rest();
        match rest.find(['"', '\n']).filter(|&i| rest[i..].starts_with('"')) {
            Some(close) => {
                let value = rest[..close].to_string();
                self.bump(close + 1);
                Ok((value, start..self.pos))
            }
            None => Err(self.error(ParseErrorKind::UnterminatedString, start..start + 1)),
        }
    }
}

pub(crate) fn is_blank(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r')
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_ident_char)
}
