use std::fmt;
use std::ops::Range;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};

/// What went wrong while parsing a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("missing block name header `[Name]`")]
    MissingHeader,
    #[error("invalid block name `{0}`")]
    InvalidBlockName(String),
    #[error("unterminated placeholder")]
    UnterminatedPlaceholder,
    #[error("invalid placeholder name `{0}`")]
    InvalidPlaceholder(String),
    #[error("expected {expected} {context}")]
    Expected {
        expected: &'static str,
        context: &'static str,
    },
    #[error("unterminated quoted string")]
    UnterminatedString,
    #[error("`}}` does not close any IF or LOOP")]
    UnbalancedClose,
    #[error("{0} is never closed")]
    Unclosed(&'static str),
    #[error("CONTINUE outside of a LOOP")]
    ContinueOutsideLoop,
    #[error("LOOP must name a list, found `{0}`")]
    LoopOverField(String),
    #[error("line repeats over both `{first}` and `{second}`")]
    AmbiguousRepetition { first: String, second: String },
}

/// A fatal error in one template block, located in its post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    /// Block name, once the header has been read.
    pub block: Option<String>,
    /// Number of the post holding the block.
    pub post: u32,
    /// Byte span within the post text.
    pub span: Range<usize>,
    pub notes: Vec<String>,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, post: u32, span: Range<usize>) -> Self {
        ParseError {
            kind,
            block: None,
            post,
            span,
            notes: Vec::new(),
        }
    }

    pub fn with_block(mut self, block: impl Into<String>) -> Self {
        self.block = Some(block.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    /// Convert to a codespan-reporting Diagnostic for display.
    /// `file_id` must refer to the post text in the caller's file database.
    pub fn to_diagnostic<FileId: Copy>(&self, file_id: FileId) -> Diagnostic<FileId> {
        Diagnostic::new(Severity::Error)
            .with_message(self.to_string())
            .with_labels(vec![Label::primary(file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.block {
            Some(name) => write!(f, "block [{}] (post {}): {}", name, self.post, self.kind),
            None => write!(f, "post {}: {}", self.post, self.kind),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
