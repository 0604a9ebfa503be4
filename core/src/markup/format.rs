use std::fmt::{self, Write};

use crate::context::IDENTIFIER;

use super::{Accessor, AttributeForm, Document, Node, Span, Tag, TagKind, Value, ValueNode};

/// Formatting refuses documents that contain malformed tags.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot format document: {}", self.message)
    }
}

impl std::error::Error for FormatError {}

/// Re-emit every tag in canonical spacing. Text between tags is copied as is.
pub fn format(document: &Document) -> Result<String, FormatError> {
    let mut out = String::with_capacity(document.source().len());
    for node in document.nodes() {
        match node {
            Node::Text(span) => out.push_str(document.text(*span)),
            Node::Tag(tag) => write_tag(&mut out, tag),
            Node::Error(err) => {
                return Err(FormatError {
                    message: err.message.clone(),
                    span: err.span,
                })
            }
        }
    }
    Ok(out)
}

fn write_tag(out: &mut String, tag: &Tag) {
    out.push_str("{% ");
    let name = tag.name.as_deref().unwrap_or_default();
    match &tag.kind {
        TagKind::Close => {
            out.push('/');
            out.push_str(name);
        }
        TagKind::Interpolation(value) => write_value(out, value),
        TagKind::Open | TagKind::SelfClosing | TagKind::Annotation => {
            let mut parts = Vec::with_capacity(tag.attributes.len() + 1);
            if !name.is_empty() {
                parts.push(name.to_string());
            }
            for attribute in &tag.attributes {
                let mut part = String::new();
                match attribute.form {
                    AttributeForm::Primary => write_value(&mut part, &attribute.value),
                    AttributeForm::Pair => {
                        part.push_str(&attribute.name);
                        part.push('=');
                        write_value(&mut part, &attribute.value);
                    }
                    AttributeForm::Class | AttributeForm::Id => {
                        part.push(if attribute.form == AttributeForm::Class { '.' } else { '#' });
                        if let Value::String(s) = &attribute.value.value {
                            part.push_str(s);
                        }
                    }
                }
                parts.push(part);
            }
            out.push_str(&parts.join(" "));
            if tag.kind == TagKind::SelfClosing {
                out.push_str(" /");
            }
        }
    }
    out.push_str(" %}");
}

fn write_value(out: &mut String, node: &ValueNode) {
    match &node.value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Number(raw) => out.push_str(raw),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(entries) => {
            out.push('{');
            for (i, (key, item)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if is_plain_key(key) {
                    out.push_str(key);
                } else {
                    write_string(out, key);
                }
                out.push_str(": ");
                write_value(out, item);
            }
            out.push('}');
        }
        Value::Variable(var) => {
            out.push(var.sigil);
            out.push_str(&var.name);
            for accessor in &var.accessors {
                match accessor {
                    Accessor::Field(field) => {
                        out.push('.');
                        out.push_str(field);
                    }
                    Accessor::Index(index) => {
                        out.push('[');
                        write_value(out, index);
                        out.push(']');
                    }
                }
            }
        }
        Value::Function(call) => {
            out.push_str(&call.name);
            out.push('(');
            for (i, arg) in call.args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                if let Some(name) = &arg.name {
                    out.push_str(name);
                    out.push('=');
                }
                write_value(out, &arg.value);
            }
            out.push(')');
        }
    }
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    out.push_str(&s.replace('"', "\\\""));
    out.push('"');
}

fn is_plain_key(key: &str) -> bool {
    IDENTIFIER.find(key).is_some_and(|m| m.end() == key.len())
}
