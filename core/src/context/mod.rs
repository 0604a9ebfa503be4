//! Speculative classification of a partially typed tag expression.
//!
//! The entry point is [`classify`]: given a document and a cursor byte offset
//! it finds the tag the cursor sits in and reports what kind of token the
//! user is typing there. Malformed input is never an error, it simply yields
//! no context.

mod cursor;
mod parser;

#[cfg(test)]
mod cursor_test;

pub use cursor::Cursor;
pub use parser::{ContextParser, MAX_NESTING};

pub(crate) use cursor::{is_ident_continue, is_quote, is_sigil, IDENTIFIER, NUMBER, SHORTHAND, VARIABLE_HEAD};

use serde::{Deserialize, Serialize};

pub const TAG_OPEN: &str = "{%";
pub const TAG_CLOSE: &str = "%}";

/// The attribute bound to a bare positional value, e.g. `{% if $flag %}`.
pub const PRIMARY_ATTRIBUTE: &str = "primary";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContextKind {
    TagOrFunctionName,
    AttributeNameOrValue,
    AttributeName,
    AttributeValue,
    Variable,
    FunctionName,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionContext {
    pub kind: ContextKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
}

impl CompletionContext {
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            tag_name: None,
            attribute_name: None,
        }
    }

    pub fn with_tag(mut self, tag_name: Option<&str>) -> Self {
        self.tag_name = tag_name.map(str::to_string);
        self
    }

    pub fn with_attribute(mut self, attribute_name: Option<&str>) -> Self {
        self.attribute_name = attribute_name.map(str::to_string);
        self
    }
}

/// Result of parsing one syntactic unit of a tag fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    /// The cursor point was found and classified; stop scanning.
    Completion(CompletionContext),
    /// The unit parsed cleanly; keep scanning.
    Skip,
    /// The unit is malformed; abandon the fragment.
    Error,
}

impl ParseOutcome {
    pub fn completion(kind: ContextKind, tag_name: Option<&str>, attribute_name: Option<&str>) -> Self {
        Self::Completion(
            CompletionContext::new(kind)
                .with_tag(tag_name)
                .with_attribute(attribute_name),
        )
    }

    pub fn into_context(self) -> Option<CompletionContext> {
        match self {
            Self::Completion(ctx) => Some(ctx),
            Self::Skip | Self::Error => None,
        }
    }
}

/// Byte offset of the tag-open marker enclosing `offset`, if the tag is still
/// open at that point.
pub fn find_tag_start(text: &str, offset: usize) -> Option<usize> {
    let end = floor_char_boundary(text, offset);
    let before = &text[..end];
    let start = before.rfind(TAG_OPEN)?;
    if closes_outside_quotes(&before[start + TAG_OPEN.len()..]) {
        return None;
    }
    Some(start)
}

/// Whether `inner` holds a `%}` that is not part of a quoted string.
fn closes_outside_quotes(inner: &str) -> bool {
    let mut quote: Option<char> = None;
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match quote {
            Some(q) if c == '\\' && chars.peek() == Some(&q) => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if is_quote(c) => quote = Some(c),
            None if c == '%' && chars.peek() == Some(&'}') => return true,
            None => {}
        }
    }
    false
}

/// Classify the cursor position `offset` (bytes) within `text`.
pub fn classify(text: &str, offset: usize) -> Option<CompletionContext> {
    let end = floor_char_boundary(text, offset);
    let start = find_tag_start(text, end)?;
    ContextParser::new(&text[start..end]).parse_tag()
}

fn floor_char_boundary(text: &str, offset: usize) -> usize {
    let mut end = offset.min(text.len());
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    end
}
