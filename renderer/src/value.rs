use std::borrow::Cow;
use std::fmt;

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value<'run> {
    Text(Cow<'run, str>),
    Number(u32),
    Boolean(bool),
}

impl<'run> Value<'run> {
    pub fn text(s: &'run str) -> Self {
        Value::Text(Cow::Borrowed(s))
    }

    pub fn owned(s: String) -> Self {
        Value::Text(Cow::Owned(s))
    }

    /// Truth as seen by `IF`: non-blank text, a non-zero count, or `true`.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Text(s) => !s.trim().is_empty(),
            Value::Number(n) => *n > 0,
            Value::Boolean(b) => *b,
        }
    }

    /// `IF ref == "text"`: trimmed, ASCII case-insensitive.
    pub fn matches(&self, operand: &str) -> bool {
        match self {
            Value::Text(s) => s.trim().eq_ignore_ascii_case(operand.trim()),
            other => other.to_string().eq_ignore_ascii_case(operand.trim()),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Boolean(_) => "boolean",
        }
    }
}

impl fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<bool> for Value<'_> {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<u32> for Value<'_> {
    fn from(n: u32) -> Self {
        Value::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::text("  ").is_truthy());
        assert!(Value::text("x").is_truthy());
        assert!(!Value::Number(0).is_truthy());
        assert!(Value::Number(2).is_truthy());
        assert!(!Value::Boolean(false).is_truthy());
    }

    #[test]
    fn equality_ignores_case_and_padding() {
        assert!(Value::text("Veggie ").matches("veggie"));
        assert!(Value::Number(3).matches("3"));
        assert!(Value::Boolean(true).matches("TRUE"));
        assert!(!Value::text("halal").matches("veggie"));
    }
}
