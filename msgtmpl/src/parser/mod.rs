pub mod error;
mod lexer;
mod structural;

pub use error::{ParseError, ParseErrorKind};

use crate::block::{Block, Post};

/// Names the parser needs to know about the reference vocabulary.
#[derive(Debug, Clone)]
pub struct Syntax {
    /// Lists whose `LIST.FIELD` placeholders name a single run-wide
    /// structure rather than a collection. Matched case-insensitively.
    pub struct_names: Vec<String>,
    /// Collections that a bare `${Name}` refers to as a whole. `Driver` and
    /// `BackupDriver` are left out: bare, they are the driver's and the backup
    /// driver's user names.
    pub list_names: Vec<String>,
}

impl Syntax {
    pub fn is_struct(&self, name: &str) -> bool {
        self.struct_names
            .iter()
            .any(|s| s.eq_ignore_ascii_case(name))
    }

    pub fn is_list(&self, name: &str) -> bool {
        self.list_names.iter().any(|s| s.eq_ignore_ascii_case(name))
    }
}

impl Default for Syntax {
    fn default() -> Self {
        let names = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Syntax {
            struct_names: names(&["OnCallOpsManager"]),
            list_names: names(&[
                "Consumer",
                "Pickup",
                "Itinerary",
                "SplitRestaurant",
                "AlternateMeals",
                "AlternateGroceries",
            ]),
        }
    }
}

/// Parser entry point.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    syntax: Syntax,
}

impl Parser {
    pub fn new() -> Self {
        Parser::default()
    }

    pub fn with_syntax(syntax: Syntax) -> Self {
        Parser { syntax }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    /// Parse one post into a named block.
    pub fn parse_block(&self, post: &Post) -> Result<Block, ParseError> {
        let (name, body_start) = parse_header(&post.raw, post.number)?;
        let body = structural::parse_body(&post.raw, body_start, post.number, &self.syntax)
            .map_err(|err| err.with_block(name.clone()))?;
        Ok(Block {
            name,
            post: post.number,
            body,
            raw: post.raw.clone(),
        })
    }
}

/// Find the first `[Name]` header. Returns the normalized name and the byte
/// offset where the body starts (after the header line).
fn parse_header(raw: &str, post: u32) -> Result<(String, usize), ParseError> {
    let missing = |span| {
        ParseError::new(ParseErrorKind::MissingHeader, post, span)
            .with_note("a template post starts with its block name in brackets, e.g. `[Pickups]`")
    };

    let open = raw.find('[').ok_or_else(|| missing(0..0))?;
    let close = raw[open..]
        .find(']')
        .map(|i| open + i)
        .ok_or_else(|| missing(open..open + 1))?;

    let inner = &raw[open + 1..close];
    let valid = inner
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'));
    let name = normalize_block_name(inner);
    if !valid || name.is_empty() {
        return Err(ParseError::new(
            ParseErrorKind::InvalidBlockName(inner.to_string()),
            post,
            open..close + 1,
        ));
    }

    // The rest of the header line belongs to the header.
    let after = close + 1;
    let body_start = raw[after..]
        .find('\n')
        .filter(|&i| raw[after..after + i].trim().is_empty())
        .map_or(after, |i| after + i + 1);

    Ok((name, body_start))
}

/// Normalize block name: strip leading/trailing whitespace, collapse interior whitespace.
fn normalize_block_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_name_and_body_offset() {
        let raw = "intro [ Driver  Pickups ]\nbody";
        let (name, start) = parse_header(raw, 4).unwrap();
        assert_eq!(name, "Driver Pickups");
        assert_eq!(&raw[start..], "body");
    }

    #[test]
    fn text_on_header_line_is_body() {
        let raw = "[A] hello";
        let (_, start) = parse_header(raw, 1).unwrap();
        assert_eq!(&raw[start..], " hello");
    }

    #[test]
    fn missing_and_invalid_headers() {
        let err = parse_header("no header here", 9).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingHeader);
        assert_eq!(err.post, 9);

        let err = parse_header("[unclosed", 9).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::MissingHeader);

        let err = parse_header("[a.b]", 9).unwrap_err();
        assert_eq!(err.kind, ParseErrorKind::InvalidBlockName("a.b".into()));

        let err = parse_header("[   ]", 9).unwrap_err();
        assert!(matches!(err.kind, ParseErrorKind::InvalidBlockName(_)));
    }

    #[test]
    fn struct_names_are_case_insensitive() {
        let syntax = Syntax::default();
        assert!(syntax.is_struct("oncallopsmanager"));
        assert!(!syntax.is_struct("Consumer"));
        assert!(syntax.is_list("consumer"));
        assert!(!syntax.is_list("Driver"));
    }
}
