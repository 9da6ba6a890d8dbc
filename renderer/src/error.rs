use std::fmt;
use std::ops::Range;
use std::path::PathBuf;

use msgtmpl::parser::ParseError;

/// What kind of name a template used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefKind {
    Scalar,
    Predicate,
    Collection,
    Field,
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RefKind::Scalar => "reference",
            RefKind::Predicate => "predicate",
            RefKind::Collection => "list",
            RefKind::Field => "field",
        };
        f.write_str(s)
    }
}

/// Failure to resolve one reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown {kind} `{name}` for schema version {version}")]
    Unknown {
        kind: RefKind,
        name: String,
        version: &'static str,
    },
    #[error("`{name}` needs a {binding} in scope, but none is bound here")]
    Unbound {
        name: String,
        binding: &'static str,
    },
    #[error("`{name}` is only meaningful inside a LOOP or a repeated line")]
    OutsideLoop { name: String },
}

/// A failed rendering pass, located in the template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("block [{block}] (post {post}): {source}")]
pub struct RenderError {
    pub block: String,
    pub post: u32,
    /// Byte span of the failing reference in the post text.
    pub span: Range<usize>,
    #[source]
    pub source: ResolveError,
}

/// Problems with the delivery-run data itself.
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("unsupported schema version `{0}` (expected 2-0-0 or 3-0-0)")]
    UnsupportedVersion(String),
    #[error("invalid delivery run: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Problems obtaining a template.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no template posts found in {origin}")]
    Empty { origin: String },
    #[error("{} template post(s) failed to parse", .0.len())]
    Parse(Vec<ParseError>),
}
