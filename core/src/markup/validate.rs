use serde::Serialize;
use serde_json::Value as Json;

use crate::schema::{AttributeDefinition, AttributeType, SchemaSnapshot, TagDefinition};

use super::{Attribute, Document, Node, Span, Tag, TagKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Critical,
    Error,
    Warning,
    Info,
    Debug,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinePosition {
    pub line: u32,
    pub character: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Location {
    pub start: LinePosition,
    pub end: LinePosition,
}

/// One finding from [`validate`]. At least one of `range` and `location` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationMessage {
    pub id: String,
    pub level: Level,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Span>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
}

impl ValidationMessage {
    fn at(id: &str, level: Level, message: String, range: Span) -> Self {
        Self {
            id: id.to_string(),
            level,
            message,
            range: Some(range),
            location: None,
        }
    }

    fn located(id: &str, level: Level, message: String, location: Location) -> Self {
        Self {
            id: id.to_string(),
            level,
            message,
            range: None,
            location: Some(location),
        }
    }
}

/// Check a scanned document against `schema`.
pub fn validate(document: &Document, schema: &SchemaSnapshot) -> Vec<ValidationMessage> {
    let mut out = Vec::new();
    let mut open: Vec<&Tag> = Vec::new();

    for node in document.nodes() {
        match node {
            Node::Text(_) => {}
            Node::Error(err) => out.push(ValidationMessage::at(
                "syntax-error",
                Level::Critical,
                err.message.clone(),
                err.span,
            )),
            Node::Tag(tag) => {
                check_variables(tag, schema, &mut out);
                match (&tag.kind, tag.name.as_deref()) {
                    (TagKind::Open | TagKind::SelfClosing, Some(name)) => {
                        let definition = schema.tag(name);
                        match definition {
                            Some(def) => check_attributes(tag, def, &mut out),
                            None => out.push(ValidationMessage::at(
                                "tag-undefined",
                                Level::Error,
                                format!("Undefined tag: '{name}'"),
                                tag.name_span.unwrap_or(tag.span),
                            )),
                        }
                        let self_closing = definition.is_some_and(|d| d.self_closing);
                        if tag.kind == TagKind::Open && !self_closing {
                            open.push(tag);
                        }
                    }
                    (TagKind::Close, Some(name)) => {
                        match open.iter().rposition(|t| t.name.as_deref() == Some(name)) {
                            Some(index) => {
                                for unclosed in open.drain(index..).skip(1) {
                                    out.push(missing_closing(document, unclosed));
                                }
                            }
                            None => out.push(ValidationMessage::located(
                                "missing-opening",
                                Level::Critical,
                                format!("Node '{name}' is missing opening"),
                                document.location(tag.span),
                            )),
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    for unclosed in open {
        out.push(missing_closing(document, unclosed));
    }
    out
}

fn missing_closing(document: &Document, tag: &Tag) -> ValidationMessage {
    ValidationMessage::located(
        "missing-closing",
        Level::Critical,
        format!("Node '{}' is missing closing", tag.name.as_deref().unwrap_or_default()),
        document.location(tag.span),
    )
}

fn check_attributes(tag: &Tag, definition: &TagDefinition, out: &mut Vec<ValidationMessage>) {
    for attribute in &tag.attributes {
        let Some(def) = definition.attribute(&attribute.name) else {
            if attribute.name == "class" || attribute.name == "id" {
                continue;
            }
            out.push(ValidationMessage::at(
                "attribute-undefined",
                Level::Error,
                format!("Invalid attribute: '{}'", attribute.name),
                attribute.name_span.unwrap_or(attribute.value.span),
            ));
            continue;
        };
        if let Some(message) = check_value(attribute, def) {
            out.push(ValidationMessage::at(
                "attribute-value-invalid",
                Level::Error,
                message,
                attribute.value.span,
            ));
        }
    }

    for (name, def) in &definition.attributes {
        if def.required && tag.attribute(name).is_none() {
            out.push(ValidationMessage::at(
                "attribute-missing-required",
                Level::Error,
                format!("Missing required attribute: '{name}'"),
                tag.span,
            ));
        }
    }
}

/// Literal values only; anything holding a variable or call is unchecked.
fn check_value(attribute: &Attribute, def: &AttributeDefinition) -> Option<String> {
    let value = attribute.value.to_json()?;
    if value.is_null() {
        return None;
    }

    if let Some(matches) = &def.matches {
        if matches.contains(&value) {
            return None;
        }
        let allowed: Vec<String> = matches.iter().map(Json::to_string).collect();
        return Some(format!(
            "Attribute '{}' must match one of {}",
            attribute.name,
            allowed.join(", ")
        ));
    }

    let declared = def.declared_type?;
    let fits = match declared {
        AttributeType::String => value.is_string(),
        AttributeType::Number => value.is_number(),
        AttributeType::Boolean => value.is_boolean(),
        AttributeType::Array => value.is_array(),
        AttributeType::Object => value.is_object(),
    };
    (!fits).then(|| format!("Attribute '{}' must be type of '{}'", attribute.name, declared))
}

fn check_variables(tag: &Tag, schema: &SchemaSnapshot, out: &mut Vec<ValidationMessage>) {
    if schema.variables.is_empty() {
        return;
    }
    for value in tag.values() {
        for (variable, span) in value.variables() {
            if variable.sigil == '$' && !schema.variables.contains_key(&variable.name) {
                out.push(ValidationMessage::at(
                    "variable-undefined",
                    Level::Warning,
                    format!("Undefined variable: '{}'", variable.name),
                    span,
                ));
            }
        }
    }
}
