//! Splitting a saved topic into its posts.
//!
//! A topic file holds several posts, each introduced by a marker line of the
//! form `-- post 12 --`. Text before the first marker is ignored. A file with
//! no marker at all is a single post numbered 1.

use crate::block::Post;

/// Split topic text into posts.
pub fn split_posts(text: &str) -> Vec<Post> {
    let mut posts = Vec::new();
    let mut current: Option<(u32, String)> = None;
    let mut saw_marker = false;

    for line in text.split_inclusive('\n') {
        if let Some(number) = parse_marker(line) {
            saw_marker = true;
            if let Some((n, raw)) = current.take() {
                posts.push(Post::new(n, raw));
            }
            current = Some((number, String::new()));
        } else if let Some((_, raw)) = current.as_mut() {
            raw.push_str(line);
        }
    }

    if let Some((n, raw)) = current {
        posts.push(Post::new(n, raw));
    }

    if !saw_marker && !text.trim().is_empty() {
        posts.push(Post::new(1, text));
    }
    posts
}

/// Recognize `-- post N --`, tolerating surrounding whitespace.
fn parse_marker(line: &str) -> Option<u32> {
    let inner = line.trim().strip_prefix("--")?.strip_suffix("--")?;
    let number = inner.trim().strip_prefix("post")?;
    number.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_markers() {
        let text = "preamble\n-- post 3 --\n[A]\nhello\n-- post 7 --\n[B]\nbye\n";
        let posts = split_posts(text);
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], Post::new(3, "[A]\nhello\n"));
        assert_eq!(posts[1], Post::new(7, "[B]\nbye\n"));
    }

    #[test]
    fn unmarked_text_is_post_one() {
        let posts = split_posts("[Only]\nbody\n");
        assert_eq!(posts, vec![Post::new(1, "[Only]\nbody\n")]);
    }

    #[test]
    fn empty_topic_has_no_posts() {
        assert!(split_posts("  \n").is_empty());
    }

    #[test]
    fn malformed_marker_is_body_text() {
        let posts = split_posts("-- post x --\n[A]\n");
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].number, 1);
    }
}
