use std::ops::Range;

/// A single node of a parsed block.
/// Conditional and Loop own their bodies; the tree never shares nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Literal text. Holds at most one newline, and only as its last character.
    Text(String),
    /// `${Name}`: a scalar resolved against the current context.
    SimpleRef(Reference),
    /// `${List}`: a collection named without a field. Renders as its size.
    ListNameRef(Reference),
    /// `${List.Field}` over a collection.
    ListRef(FieldReference),
    /// `${Struct.Field}` over a single run-wide structure.
    StructRef(FieldReference),
    /// `"text"`: a comparison operand. Never emitted.
    QuotedString(String),
    Conditional(Conditional),
    Loop(Loop),
    /// Stops the current loop iteration.
    Continue(Range<usize>),
}

/// A simple placeholder name together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub name: String,
    pub span: Range<usize>,
}

/// A dotted placeholder, `LIST.FIELD`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReference {
    pub list: String,
    pub field: String,
    pub span: Range<usize>,
}

impl FieldReference {
    /// Case-insensitive comparison of the list part.
    pub fn is_over(&self, list: &str) -> bool {
        self.list.eq_ignore_ascii_case(list)
    }
}

/// `IF <predicate> THEN { body }` or `IF NOT <predicate> THEN { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditional {
    /// The predicate value that makes the body render: `true` for `IF`,
    /// `false` for `IF NOT`.
    pub polarity: bool,
    pub predicate: Predicate,
    pub body: Vec<Element>,
    pub span: Range<usize>,
}

/// The gating expression of a conditional.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// A reference evaluated as a boolean.
    Test(Box<Element>),
    /// A reference resolved as a scalar and compared with a quoted string.
    Equals {
        subject: Box<Element>,
        operand: Box<Element>,
    },
}

impl Predicate {
    /// The reference the predicate is about.
    pub fn subject(&self) -> &Element {
        match self {
            Predicate::Test(subject) => subject,
            Predicate::Equals { subject, .. } => subject,
        }
    }
}

/// `LOOP &{List} { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Loop {
    pub list: Reference,
    pub body: Vec<Element>,
    pub span: Range<usize>,
}

impl Element {
    /// Byte span of the element in its post, when it has one.
    pub fn span(&self) -> Option<&Range<usize>> {
        match self {
            Element::SimpleRef(r) | Element::ListNameRef(r) => Some(&r.span),
            Element::ListRef(r) | Element::StructRef(r) => Some(&r.span),
            Element::Conditional(c) => Some(&c.span),
            Element::Loop(l) => Some(&l.span),
            Element::Continue(span) => Some(span),
            Element::Text(_) | Element::QuotedString(_) => None,
        }
    }

    /// True for an element that finishes a source line: newline-terminated
    /// text, or an IF/LOOP whose body does.
    pub fn ends_line(&self) -> bool {
        match self {
            Element::Text(text) => text.ends_with('\n'),
            Element::Conditional(c) => c.body.last().is_some_and(Element::ends_line),
            Element::Loop(l) => l.body.last().is_some_and(Element::ends_line),
            _ => false,
        }
    }
}

/// Split a sequence into source lines. Every line but possibly the last ends
/// with a newline-terminated text element.
pub fn lines(elements: &[Element]) -> impl Iterator<Item = &[Element]> {
    elements.split_inclusive(Element::ends_line)
}

/// The list name driving an un-looped line: the first `LIST.FIELD`
/// placeholder on the line, including those inside an inline IF.
pub fn repetition_list(line: &[Element]) -> Option<&FieldReference> {
    line.iter().find_map(|element| match element {
        Element::ListRef(r) => Some(r),
        Element::Conditional(c) if lines(&c.body).count() <= 1 => repetition_list(&c.body),
        _ => None,
    })
}
