//! Tag-level document engine: scanning, validation and formatting.
//!
//! Text between tags is opaque. Each `{% ... %}` region is parsed into a
//! [`Tag`] or, when malformed, recorded as a [`SyntaxError`] node so the rest
//! of the document still scans.

mod format;
mod scan;
mod tag;
mod validate;

#[cfg(test)]
mod validate_test;

pub use format::{format, FormatError};
pub use validate::{validate, Level, LinePosition, Location, ValidationMessage};

use std::fmt;

use serde::Serialize;

/// Half-open byte range `[start, end)` into the document source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Inclusive of `end`, so a cursor just after a token still hits it.
    pub fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}..{}", self.message, self.span.start, self.span.end)
    }
}

impl std::error::Error for SyntaxError {}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(Span),
    Tag(Tag),
    Error(SyntaxError),
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Self::Text(span) => *span,
            Self::Tag(tag) => tag.span,
            Self::Error(err) => err.span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagKind {
    /// `{% name ... %}`, expects a matching close.
    Open,
    /// `{% name ... /%}`
    SelfClosing,
    /// `{% /name %}`
    Close,
    /// `{% $var %}` or `{% fn(...) %}`
    Interpolation(ValueNode),
    /// `{% .class #id key=value %}` with no tag name.
    Annotation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    pub kind: TagKind,
    pub name: Option<String>,
    pub name_span: Option<Span>,
    pub attributes: Vec<Attribute>,
    /// Whole tag including delimiters.
    pub span: Span,
}

impl Tag {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Attribute whose name or value span contains `offset`.
    pub fn attribute_at(&self, offset: usize) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name_span.is_some_and(|s| s.contains(offset)) || a.value.span.contains(offset))
    }

    /// Every value written in the tag, interpolated value first.
    pub fn values(&self) -> impl Iterator<Item = &ValueNode> {
        let interpolated = match &self.kind {
            TagKind::Interpolation(value) => Some(value),
            _ => None,
        };
        interpolated.into_iter().chain(self.attributes.iter().map(|a| &a.value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeForm {
    /// Bare positional value bound to `primary`.
    Primary,
    /// `name=value`
    Pair,
    /// `.name`, sugar for `class`.
    Class,
    /// `#name`, sugar for `id`.
    Id,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    /// Only `name=value` attributes have a written name.
    pub name_span: Option<Span>,
    pub value: ValueNode,
    pub form: AttributeForm,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueNode {
    pub value: Value,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Number as written.
    Number(String),
    String(String),
    Array(Vec<ValueNode>),
    Object(Vec<(String, ValueNode)>),
    Variable(Variable),
    Function(FunctionCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub sigil: char,
    pub name: String,
    pub accessors: Vec<Accessor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accessor {
    Field(String),
    Index(Box<ValueNode>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub name_span: Span,
    pub args: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<String>,
    pub value: ValueNode,
}

impl ValueNode {
    /// The innermost function call whose name span contains `offset`.
    pub fn function_at(&self, offset: usize) -> Option<&FunctionCall> {
        if !self.span.contains(offset) {
            return None;
        }
        match &self.value {
            Value::Function(call) => {
                if call.name_span.contains(offset) {
                    return Some(call);
                }
                call.args.iter().find_map(|arg| arg.value.function_at(offset))
            }
            Value::Array(items) => items.iter().find_map(|item| item.function_at(offset)),
            Value::Object(entries) => entries.iter().find_map(|(_, item)| item.function_at(offset)),
            _ => None,
        }
    }

    /// Every variable reference in this value, outermost first.
    pub fn variables(&self) -> Vec<(&Variable, Span)> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<(&'a Variable, Span)>) {
        match &self.value {
            Value::Variable(var) => {
                out.push((var, self.span));
                for accessor in &var.accessors {
                    if let Accessor::Index(index) = accessor {
                        index.collect_variables(out);
                    }
                }
            }
            Value::Function(call) => call.args.iter().for_each(|arg| arg.value.collect_variables(out)),
            Value::Array(items) => items.iter().for_each(|item| item.collect_variables(out)),
            Value::Object(entries) => entries.iter().for_each(|(_, item)| item.collect_variables(out)),
            _ => {}
        }
    }

    /// Plain data when the value holds no variables or calls.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        use serde_json::Value as Json;
        Some(match &self.value {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(raw) => serde_json::from_str(raw).ok()?,
            Value::String(s) => Json::String(s.clone()),
            Value::Array(items) => Json::Array(items.iter().map(ValueNode::to_json).collect::<Option<_>>()?),
            Value::Object(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| v.to_json().map(|v| (k.clone(), v)))
                    .collect::<Option<_>>()?,
            ),
            Value::Variable(_) | Value::Function(_) => return None,
        })
    }
}

/// A scanned document.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
    line_starts: Vec<usize>,
}

impl Document {
    pub fn parse(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            source: source.to_string(),
            nodes: scan::scan(source),
            line_starts,
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Tag(tag) => Some(tag),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &SyntaxError> {
        self.nodes.iter().filter_map(|n| match n {
            Node::Error(err) => Some(err),
            _ => None,
        })
    }

    /// The tag whose span contains `offset`.
    pub fn tag_at(&self, offset: usize) -> Option<&Tag> {
        self.tags().find(|t| t.span.contains(offset))
    }

    /// Zero-based line and UTF-16 column of a byte offset.
    pub fn position(&self, offset: usize) -> LinePosition {
        let offset = offset.min(self.source.len());
        let line = self.line_starts.partition_point(|&start| start <= offset).saturating_sub(1);
        let line_start = self.line_starts[line];
        let mut end = offset;
        while !self.source.is_char_boundary(end) {
            end -= 1;
        }
        let character = self.source[line_start..end].encode_utf16().count();
        LinePosition {
            line: line as u32,
            character: character as u32,
        }
    }

    pub fn location(&self, span: Span) -> Location {
        Location {
            start: self.position(span.start),
            end: self.position(span.end),
        }
    }

    pub fn text(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }
}
