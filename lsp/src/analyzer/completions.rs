use markdoc_ls_core::context::{CompletionContext, ContextKind};
use markdoc_ls_core::schema::SchemaSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_lsp::lsp_types::{CompletionItem, CompletionItemKind, Documentation, InsertTextFormat};
use tracing::debug;

use super::documentation::{
    attribute_detail, attribute_documentation, attribute_insert_text, function_detail, function_documentation,
    markdown, tag_detail, tag_documentation,
};

const KEYWORDS: [&str; 3] = ["null", "true", "false"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionType {
    Tag,
    Attribute,
    Function,
    Value,
    Variable,
}

/// Carried on every candidate so resolve needs no state from the list request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionData {
    #[serde(rename = "type")]
    pub kind: CompletionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute_name: Option<String>,
}

impl CompletionData {
    fn new(kind: CompletionType) -> Self {
        Self {
            kind,
            tag_name: None,
            attribute_name: None,
        }
    }

    fn into_value(self) -> Option<Value> {
        serde_json::to_value(self).ok()
    }
}

/// Candidates for a classified cursor position.
pub fn complete(schema: &SchemaSnapshot, context: &CompletionContext) -> Vec<CompletionItem> {
    let tag_name = context.tag_name.as_deref();
    match context.kind {
        ContextKind::TagOrFunctionName => {
            let mut items = tags(schema);
            items.extend(functions(schema));
            items
        }
        ContextKind::AttributeNameOrValue | ContextKind::AttributeName => {
            tag_name.map(|tag| attributes(schema, tag)).unwrap_or_default()
        }
        ContextKind::AttributeValue => {
            let declared = tag_name
                .zip(context.attribute_name.as_deref())
                .and_then(|(tag, attr)| schema.attribute(tag, attr))
                .and_then(|attr| attr.matches.as_ref());
            match declared {
                Some(matches) => values(matches, context),
                None => {
                    let mut items = keywords();
                    items.extend(functions(schema));
                    items
                }
            }
        }
        ContextKind::Variable => variables(schema),
        ContextKind::FunctionName => functions(schema),
    }
}

/// Fill in detail, documentation and insert text. Items whose definition is
/// gone are returned unchanged.
pub fn resolve(schema: &SchemaSnapshot, item: CompletionItem) -> CompletionItem {
    let Some(data) = item
        .data
        .clone()
        .and_then(|value| serde_json::from_value::<CompletionData>(value).ok())
    else {
        debug!("completion item '{}' carries no usable data", item.label);
        return item;
    };

    match data.kind {
        CompletionType::Tag => match schema.tag(&item.label) {
            Some(tag) => CompletionItem {
                detail: Some(tag_detail(tag)),
                documentation: Some(Documentation::MarkupContent(markdown(tag_documentation(tag)))),
                insert_text: Some(tag.name.clone()),
                ..item
            },
            None => item,
        },
        CompletionType::Function => match schema.function(&item.label) {
            Some(func) => CompletionItem {
                detail: Some(function_detail(func)),
                documentation: Some(Documentation::MarkupContent(markdown(function_documentation(func)))),
                insert_text: Some(format!("{}($0)", func.name)),
                insert_text_format: Some(InsertTextFormat::SNIPPET),
                ..item
            },
            None => item,
        },
        CompletionType::Attribute => {
            let found = data
                .tag_name
                .as_deref()
                .and_then(|tag| schema.attribute(tag, &item.label));
            match found {
                Some(attr) => CompletionItem {
                    detail: Some(attribute_detail(attr)),
                    documentation: Some(Documentation::MarkupContent(markdown(attribute_documentation(attr)))),
                    insert_text: Some(attribute_insert_text(attr)),
                    insert_text_format: Some(InsertTextFormat::SNIPPET),
                    ..item
                },
                None => item,
            }
        }
        CompletionType::Value | CompletionType::Variable => item,
    }
}

fn tags(schema: &SchemaSnapshot) -> Vec<CompletionItem> {
    schema
        .tag_names()
        .map(|name| item(name, CompletionItemKind::CLASS, CompletionData::new(CompletionType::Tag)))
        .collect()
}

fn functions(schema: &SchemaSnapshot) -> Vec<CompletionItem> {
    schema
        .function_names()
        .map(|name| {
            item(
                name,
                CompletionItemKind::FUNCTION,
                CompletionData::new(CompletionType::Function),
            )
        })
        .collect()
}

fn attributes(schema: &SchemaSnapshot, tag_name: &str) -> Vec<CompletionItem> {
    let Some(tag) = schema.tag(tag_name) else {
        return Vec::new();
    };
    tag.attributes
        .keys()
        .map(|name| {
            let data = CompletionData {
                tag_name: Some(tag_name.to_string()),
                ..CompletionData::new(CompletionType::Attribute)
            };
            item(name, CompletionItemKind::FIELD, data)
        })
        .collect()
}

fn values(matches: &[Value], context: &CompletionContext) -> Vec<CompletionItem> {
    matches
        .iter()
        .map(|value| {
            let (label, insert) = match value {
                Value::String(s) => (s.clone(), Value::String(s.clone()).to_string()),
                other => (other.to_string(), other.to_string()),
            };
            let data = CompletionData {
                kind: CompletionType::Value,
                tag_name: context.tag_name.clone(),
                attribute_name: context.attribute_name.clone(),
            };
            CompletionItem {
                insert_text: Some(insert),
                ..item(&label, CompletionItemKind::VALUE, data)
            }
        })
        .collect()
}

fn keywords() -> Vec<CompletionItem> {
    KEYWORDS
        .iter()
        .map(|kw| item(kw, CompletionItemKind::KEYWORD, CompletionData::new(CompletionType::Value)))
        .collect()
}

fn variables(schema: &SchemaSnapshot) -> Vec<CompletionItem> {
    schema
        .variable_names()
        .map(|name| {
            item(
                name,
                CompletionItemKind::VARIABLE,
                CompletionData::new(CompletionType::Variable),
            )
        })
        .collect()
}

fn item(label: &str, kind: CompletionItemKind, data: CompletionData) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        data: data.into_value(),
        ..Default::default()
    }
}
