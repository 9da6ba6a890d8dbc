//! Where template posts come from.

use std::fs;
use std::path::{Path, PathBuf};

use msgtmpl::Template;
use msgtmpl::block::Post;
use msgtmpl::block::topic::split_posts;
use msgtmpl::parser::Parser;
use tracing::{debug, trace};

use crate::error::LoadError;

/// A supplier of template posts.
pub trait TemplateSource {
    /// The posts, ordered by post number.
    fn posts(&self) -> Result<Vec<Post>, LoadError>;

    /// Human-readable origin, for messages.
    fn describe(&self) -> String;
}

/// Posts held in memory, e.g. built by a test or fetched elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    posts: Vec<Post>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Add a post numbered after the last one.
    pub fn push(&mut self, raw: impl Into<String>) -> &mut Self {
        let number = self.posts.last().map_or(1, |post| post.number + 1);
        self.posts.push(Post::new(number, raw));
        self
    }

    pub fn insert(&mut self, post: Post) -> &mut Self {
        self.posts.push(post);
        self
    }
}

impl TemplateSource for MemorySource {
    fn posts(&self) -> Result<Vec<Post>, LoadError> {
        let mut posts = self.posts.clone();
        posts.sort_by_key(|post| post.number);
        Ok(posts)
    }

    fn describe(&self) -> String {
        "in-memory posts".to_string()
    }
}

/// Posts on disk: either a topic file with `-- post N --` markers, or a
/// directory of `<N>.txt` files.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(path: &Path) -> Result<String, LoadError> {
        fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn directory_posts(&self) -> Result<Vec<Post>, LoadError> {
        let io = |source| LoadError::Io {
            path: self.path.clone(),
            source,
        };
        let mut posts = Vec::new();
        for entry in fs::read_dir(&self.path).map_err(io)? {
            let path = entry.map_err(io)?.path();
            let number = path
                .extension()
                .filter(|ext| ext.eq_ignore_ascii_case("txt"))
                .and_then(|_| path.file_stem())
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u32>().ok());
            match number {
                Some(number) => posts.push(Post::new(number, Self::read(&path)?)),
                None => trace!(path = %path.display(), "skipping non-post file"),
            }
        }
        posts.sort_by_key(|post| post.number);
        Ok(posts)
    }
}

impl TemplateSource for FileSource {
    fn posts(&self) -> Result<Vec<Post>, LoadError> {
        if self.path.is_dir() {
            self.directory_posts()
        } else {
            Ok(split_posts(&Self::read(&self.path)?))
        }
    }

    fn describe(&self) -> String {
        format!("`{}`", self.path.display())
    }
}

/// Fetch and parse a template. Every failing post is reported.
pub fn load_template(source: &dyn TemplateSource, parser: &Parser) -> Result<Template, LoadError> {
    let posts = source.posts()?;
    if posts.is_empty() {
        return Err(LoadError::Empty {
            origin: source.describe(),
        });
    }
    debug!(origin = %source.describe(), posts = posts.len(), "loaded template posts");
    Template::parse(&posts, parser).map_err(LoadError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_numbers_posts_in_order() {
        let mut source = MemorySource::new();
        source.push("[A]\na\n").push("[B]\nb\n");
        source.insert(Post::new(10, "[C]\nc\n"));
        let numbers: Vec<u32> = source.posts().unwrap().iter().map(|p| p.number).collect();
        assert_eq!(numbers, vec![1, 2, 10]);
    }

    #[test]
    fn empty_source_is_an_error() {
        let err = load_template(&MemorySource::new(), &Parser::new()).unwrap_err();
        assert!(matches!(err, LoadError::Empty { .. }));
    }

    #[test]
    fn parse_failures_are_all_collected() {
        let mut source = MemorySource::new();
        source.push("[A]\n}\n").push("[B]\nok\n").push("no header\n");
        match load_template(&source, &Parser::new()) {
            Err(LoadError::Parse(errors)) => {
                let posts: Vec<u32> = errors.iter().map(|e| e.post).collect();
                assert_eq!(posts, vec![1, 3]);
            }
            other => panic!("expected parse errors, got {:?}", other),
        }
    }
}
