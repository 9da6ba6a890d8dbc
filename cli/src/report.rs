use std::collections::HashMap;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use msgtmpl::block::Post;
use msgtmpl::parser::ParseError;
use renderer::RenderError;

/// Codespan file database keyed by template origin and post number. Spans
/// are offsets into a single post, so every post is its own file.
pub struct Reporter {
    files: SimpleFiles<String, String>,
    ids: HashMap<(String, u32), usize>,
    writer: StandardStream,
    config: term::Config,
}

impl Reporter {
    pub fn new(no_color: bool) -> Self {
        let color_choice = if no_color {
            ColorChoice::Never
        } else {
            ColorChoice::Auto
        };
        Reporter {
            files: SimpleFiles::new(),
            ids: HashMap::new(),
            writer: StandardStream::stderr(color_choice),
            config: term::Config::default(),
        }
    }

    pub fn add_posts(&mut self, origin: &str, posts: &[Post]) {
        for post in posts {
            let name = format!("{} (post {})", origin, post.number);
            let id = self.files.add(name, post.raw.clone());
            self.ids.insert((origin.to_string(), post.number), id);
        }
    }

    fn file_id(&self, origin: &str, post: u32) -> Option<usize> {
        self.ids.get(&(origin.to_string(), post)).copied()
    }

    fn emit(&self, diagnostic: &Diagnostic<usize>) {
        let _ = term::emit_to_write_style(
            &mut self.writer.lock(),
            &self.config,
            &self.files,
            diagnostic,
        );
    }

    pub fn parse_errors(&self, origin: &str, errors: &[ParseError]) {
        for error in errors {
            match self.file_id(origin, error.post) {
                Some(id) => self.emit(&error.to_diagnostic(id)),
                None => eprintln!("parse error: {}", error),
            }
        }
    }

    pub fn render_error(&self, origin: &str, error: &RenderError) {
        match self.file_id(origin, error.post) {
            Some(id) => {
                let diagnostic = Diagnostic::new(Severity::Error)
                    .with_message(error.to_string())
                    .with_labels(vec![
                        Label::primary(id, error.span.clone()).with_message(error.source.to_string()),
                    ]);
                self.emit(&diagnostic);
            }
            None => eprintln!("render error: {}", error),
        }
    }
}
