//! Placeholder scanner for `{{expr}}` syntax
//!
//! A placeholder is `{{`, one or more characters that are neither `{` nor `}`,
//! then `}}`. Whitespace inside the braces is part of the expression.

use std::ops::Range;

/// A placeholder found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    /// The expression between the braces, untrimmed.
    pub expr: String,

    /// Byte range of the whole token, braces included.
    pub span: Range<usize>,
}

impl Placeholder {
    /// The token text, `{{expr}}`.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{{{{{}}}}}", self.expr)
    }
}

/// Scans `input` left to right and returns every placeholder.
///
/// # Examples
///
/// ```
/// use relay_application::variable_resolver::parse_placeholders;
///
/// let found = parse_placeholders("{{host}}/users/{{ id }}");
/// assert_eq!(found.len(), 2);
/// assert_eq!(found[0].expr, "host");
/// assert_eq!(found[1].expr, " id ");
/// ```
#[must_use]
pub fn parse_placeholders(input: &str) -> Vec<Placeholder> {
    let bytes = input.as_bytes();
    let mut found = Vec::new();
    let mut i = 0;

    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            let start = i + 2;
            let mut end = start;
            while end < bytes.len() && bytes[end] != b'{' && bytes[end] != b'}' {
                end += 1;
            }
            let closed = end + 1 < bytes.len() && bytes[end] == b'}' && bytes[end + 1] == b'}';
            if closed && end > start {
                found.push(Placeholder {
                    expr: input[start..end].to_string(),
                    span: i..end + 2,
                });
                i = end + 2;
                continue;
            }
        }
        i += 1;
    }

    found
}

/// Returns true if `input` contains at least one placeholder.
#[must_use]
pub fn has_placeholders(input: &str) -> bool {
    input.contains("{{") && !parse_placeholders(input).is_empty()
}
