pub mod topic;

use crate::element::Element;

/// Raw text of one forum post, as fetched from the template topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Post {
    /// Sequence number of the post within its topic.
    pub number: u32,
    pub raw: String,
}

impl Post {
    pub fn new(number: u32, raw: impl Into<String>) -> Self {
        Post {
            number,
            raw: raw.into(),
        }
    }
}

/// A named template unit parsed from one post.
#[derive(Debug, Clone)]
pub struct Block {
    /// Name from the `[Name]` header, whitespace-normalized.
    pub name: String,
    /// Number of the post the block was parsed from.
    pub post: u32,
    /// Top-level element sequence.
    pub body: Vec<Element>,
    /// The post text, kept for diagnostics.
    pub raw: String,
}

impl Block {
    /// `[Comment]` blocks are loaded but never rendered.
    pub fn is_comment(&self) -> bool {
        self.name.eq_ignore_ascii_case("comment")
    }
}
