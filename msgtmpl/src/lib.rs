pub mod block;
pub mod element;
pub mod parser;

use crate::block::{Block, Post};
use crate::parser::{ParseError, Parser};

/// A parsed message template: one block per post, in post order.
#[derive(Debug, Clone, Default)]
pub struct Template {
    pub blocks: Vec<Block>,
}

impl Template {
    /// Parse every post. All failing posts are reported, not just the first.
    pub fn parse(posts: &[Post], parser: &Parser) -> Result<Template, Vec<ParseError>> {
        let mut blocks = Vec::with_capacity(posts.len());
        let mut errors = Vec::new();

        for post in posts {
            match parser.parse_block(post) {
                Ok(block) => blocks.push(block),
                Err(err) => errors.push(err),
            }
        }

        if errors.is_empty() {
            Ok(Template { blocks })
        } else {
            Err(errors)
        }
    }

    /// Blocks that take part in rendering, i.e. everything but `[Comment]`.
    pub fn renderable(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|block| !block.is_comment())
    }

    /// Case-insensitive block lookup.
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|block| block.name.eq_ignore_ascii_case(name))
    }
}
