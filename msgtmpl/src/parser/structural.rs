use crate::element::{Conditional, Element, FieldReference, Loop, Predicate, Reference};
use crate::parser::Syntax;
use crate::parser::error::{ParseError, ParseErrorKind};
use crate::parser::lexer::{Cursor, Placeholder, is_blank};

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Parse a block body starting at byte `start` of `source` into its
/// top-level element sequence.
pub(crate) fn parse_body(
    source: &str,
    start: usize,
    post: u32,
    syntax: &Syntax,
) -> Result<Vec<Element>, ParseError> {
    let mut state = BodyState::new(Cursor::new(source, start, post), post, syntax);
    state.run()?;
    state.finalize()
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct BodyState<'a> {
    cursor: Cursor<'a>,
    syntax: &'a Syntax,
    post: u32,
    /// The block's own top-level sequence.
    body: Frame,
    /// Open IF and LOOP scopes; the top is where new elements go.
    scope_stack: Vec<Frame>,
    /// Text not yet turned into elements.
    pending: String,
    /// Nothing but blanks since the last line boundary.
    line_blank: bool,
    /// List driving the current source line, for un-looped `LIST.FIELD`
    /// placeholders. Shared by every open scope so that an inline IF cannot
    /// bring in a second list.
    line_list: Option<String>,
}

struct Frame {
    kind: FrameKind,
    elements: Vec<Element>,
    span_start: usize,
}

enum FrameKind {
    Body,
    Conditional { polarity: bool, predicate: Predicate },
    Loop { list: Reference },
}

impl FrameKind {
    fn describe(&self) -> &'static str {
        match self {
            FrameKind::Body => "block",
            FrameKind::Conditional { .. } => "IF",
            FrameKind::Loop { .. } => "LOOP",
        }
    }
}

impl Frame {
    fn into_element(self, span_end: usize) -> Option<Element> {
        let span = self.span_start..span_end;
        match self.kind {
            FrameKind::Body => None,
            FrameKind::Conditional {
                polarity,
                predicate,
            } => Some(Element::Conditional(Conditional {
                polarity,
                predicate,
                body: self.elements,
                span,
            })),
            FrameKind::Loop { list } => Some(Element::Loop(Loop {
                list,
                body: self.elements,
                span,
            })),
        }
    }
}

impl<'a> BodyState<'a> {
    fn new(cursor: Cursor<'a>, post: u32, syntax: &'a Syntax) -> Self {
        let span_start = cursor.pos();
        BodyState {
            cursor,
            syntax,
            post,
            body: Frame {
                kind: FrameKind::Body,
                elements: Vec::new(),
                span_start,
            },
            scope_stack: Vec::new(),
            pending: String::new(),
            line_blank: true,
            line_list: None,
        }
    }

    fn run(&mut self) -> Result<(), ParseError> {
        while !self.cursor.eof() {
            if self.cursor.at_placeholder() {
                self.flush_text()?;
                let placeholder = self.cursor.placeholder()?;
                let element = self.reference(placeholder);
                self.push(element)?;
                self.line_blank = false;
            } else if self.cursor.peek("}") {
                self.close_scope()?;
            } else if self.cursor.at_structure("IF") {
                self.open_conditional()?;
            } else if self.cursor.at_structure("LOOP") {
                self.open_loop()?;
            } else if self.cursor.at_keyword("CONTINUE") {
                self.continue_iteration()?;
            } else if let Some(c) = self.cursor.next_char() {
                self.pending.push(c);
                if c == '\n' {
                    self.line_blank = true;
                } else if !is_blank(c) {
                    self.line_blank = false;
                }
            }
        }
        Ok(())
    }

    fn finalize(mut self) -> Result<Vec<Element>, ParseError> {
        self.flush_text()?;

        if let Some(open) = self.scope_stack.pop() {
            let span = open.span_start..self.cursor.pos();
            return Err(self
                .cursor
                .error(ParseErrorKind::Unclosed(open.kind.describe()), span)
                .with_note("every `{` opened by IF or LOOP needs a matching `}`"));
        }

        Ok(self.body.elements)
    }

    // -----------------------------------------------------------------------
    // Elements
    // -----------------------------------------------------------------------

    fn reference(&self, placeholder: Placeholder) -> Element {
        let Placeholder { name, field, span } = placeholder;
        match field {
            None if self.syntax.is_list(&name) => Element::ListNameRef(Reference { name, span }),
            None => Element::SimpleRef(Reference { name, span }),
            Some(field) => {
                let reference = FieldReference {
                    list: name,
                    field,
                    span,
                };
                if self.syntax.is_struct(&reference.list) {
                    Element::StructRef(reference)
                } else {
                    Element::ListRef(reference)
                }
            }
        }
    }

    fn in_loop(&self) -> bool {
        self.scope_stack
            .iter()
            .any(|frame| matches!(frame.kind, FrameKind::Loop { .. }))
    }

    /// Append to the innermost open scope, tracking which list drives the
    /// current line when no loop is open.
    fn push(&mut self, element: Element) -> Result<(), ParseError> {
        if let (Element::ListRef(reference), false) = (&element, self.in_loop()) {
            match &self.line_list {
                Some(first) if !reference.is_over(first) => {
                    return Err(ParseError::new(
                        ParseErrorKind::AmbiguousRepetition {
                            first: first.clone(),
                            second: reference.list.clone(),
                        },
                        self.post,
                        reference.span.clone(),
                    )
                    .with_note("wrap the line in a LOOP to choose which list repeats it"));
                }
                Some(_) => {}
                None => self.line_list = Some(reference.list.clone()),
            }
        }

        if element.ends_line() {
            self.line_list = None;
        }
        let frame = self.scope_stack.last_mut().unwrap_or(&mut self.body);
        frame.elements.push(element);
        Ok(())
    }

    /// Turn pending text into one text element per line.
    fn flush_text(&mut self) -> Result<(), ParseError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let text = std::mem::take(&mut self.pending);
        for line in text.split_inclusive('\n') {
            self.push(Element::Text(line.to_string()))?;
        }
        Ok(())
    }

    /// Drop trailing spaces and tabs from pending text.
    fn trim_pending(&mut self) {
        let keep = self.pending.trim_end_matches([' ', '\t', '\r']).len();
        self.pending.truncate(keep);
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// `IF [NOT] <ref> [== "text"] THEN {`
    fn open_conditional(&mut self) -> Result<(), ParseError> {
        if self.line_blank {
            self.trim_pending();
        }
        self.flush_text()?;
        let start = self.cursor.pos();
        self.cursor.bump("IF".len());
        self.cursor.skip_blanks();

        let mut polarity = true;
        if self.cursor.at_keyword("NOT") {
            self.cursor.bump("NOT".len());
            self.cursor.skip_blanks();
            polarity = false;
        }

        if !self.cursor.at_placeholder() {
            return Err(self.cursor.error_here(ParseErrorKind::Expected {
                expected: "a placeholder",
                context: "after IF",
            }));
        }
        let placeholder = self.cursor.placeholder()?;
        let subject = Box::new(self.reference(placeholder));
        self.cursor.skip_blanks();

        let predicate = if self.cursor.peek("==") {
            self.cursor.bump(2);
            self.cursor.skip_blanks();
            if !self.cursor.peek("\"") {
                return Err(self.cursor.error_here(ParseErrorKind::Expected {
                    expected: "a quoted string",
                    context: "after `==`",
                }));
            }
            let (value, _) = self.cursor.quoted()?;
            self.cursor.skip_blanks();
            Predicate::Equals {
                subject,
                operand: Box::new(Element::QuotedString(value)),
            }
        } else {
            Predicate::Test(subject)
        };

        if !self.cursor.at_keyword("THEN") {
            return Err(self.cursor.error_here(ParseErrorKind::Expected {
                expected: "THEN",
                context: "after the IF condition",
            }));
        }
        self.cursor.bump("THEN".len());
        self.cursor.skip_blanks();
        self.expect_open_brace("after THEN")?;

        self.scope_stack.push(Frame {
            kind: FrameKind::Conditional {
                polarity,
                predicate,
            },
            elements: Vec::new(),
            span_start: start,
        });
        Ok(())
    }

    /// `LOOP &{List} {`
    fn open_loop(&mut self) -> Result<(), ParseError> {
        if self.line_blank {
            self.trim_pending();
        }
        self.flush_text()?;
        let start = self.cursor.pos();
        self.cursor.bump("LOOP".len());
        self.cursor.skip_blanks();

        if !self.cursor.at_placeholder() {
            return Err(self.cursor.error_here(ParseErrorKind::Expected {
                expected: "a list placeholder",
                context: "after LOOP",
            }));
        }
        let placeholder = self.cursor.placeholder()?;
        if let Some(field) = &placeholder.field {
            return Err(self.cursor.error(
                ParseErrorKind::LoopOverField(format!("{}.{}", placeholder.name, field)),
                placeholder.span,
            ));
        }
        let list = Reference {
            name: placeholder.name,
            span: placeholder.span,
        };
        self.cursor.skip_blanks();
        self.expect_open_brace("after the LOOP list")?;

        self.scope_stack.push(Frame {
            kind: FrameKind::Loop { list },
            elements: Vec::new(),
            span_start: start,
        });
        Ok(())
    }

    fn expect_open_brace(&mut self, context: &'static str) -> Result<(), ParseError> {
        if !self.cursor.peek("{") {
            return Err(self.cursor.error_here(ParseErrorKind::Expected {
                expected: "`{`",
                context,
            }));
        }
        self.cursor.bump(1);
        self.cursor.skip_blanks();
        if self.cursor.skip_line_end() {
            self.line_blank = true;
        }
        Ok(())
    }

    fn close_scope(&mut self) -> Result<(), ParseError> {
        let at = self.cursor.pos();
        if self.scope_stack.is_empty() {
            return Err(self
                .cursor
                .error(ParseErrorKind::UnbalancedClose, at..at + 1));
        }

        let own_line = self.line_blank;
        self.trim_pending();
        self.flush_text()?;
        self.cursor.bump(1);

        if let Some(element) = self
            .scope_stack
            .pop()
            .and_then(|frame| frame.into_element(self.cursor.pos()))
        {
            self.push(element)?;
        }

        if own_line && self.cursor.skip_line_end() {
            self.line_blank = true;
        } else {
            self.line_blank = false;
        }
        Ok(())
    }

    fn continue_iteration(&mut self) -> Result<(), ParseError> {
        let start = self.cursor.pos();
        let span = start..start + "CONTINUE".len();
        if !self.in_loop() {
            return Err(self
                .cursor
                .error(ParseErrorKind::ContinueOutsideLoop, span)
                .with_note("CONTINUE only has a meaning inside a LOOP body"));
        }

        let own_line = self.line_blank;
        if own_line {
            self.trim_pending();
        }
        self.flush_text()?;
        self.cursor.bump("CONTINUE".len());
        self.push(Element::Continue(span))?;

        if own_line && self.cursor.skip_line_end() {
            self.line_blank = true;
        } else {
            self.line_blank = false;
        }
        Ok(())
    }
}
