//! Tag, node and function definitions for a project, and the registry that
//! loads and swaps them.

pub mod builtins;
mod compile;
mod layout;
mod merge;
mod registry;

#[cfg(test)]
mod snapshot_test;

pub use compile::{CommandCompiler, CompileError, ModuleCompiler, LOADER_SCRIPT};
pub use layout::{detect, Layout, ModuleKind, SchemaModule, EXTENSIONS, MODULE_ORDER, ROOT_MODULE, SCHEMA_DIR};
pub use merge::{deep_merge, merge_config};
pub use registry::{build_value, SchemaRegistry};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Closed set of attribute types understood by completion and validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AttributeType {
    String,
    Number,
    Boolean,
    Array,
    Object,
}

impl AttributeType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(Self::String),
            "Number" => Some(Self::Number),
            "Boolean" => Some(Self::Boolean),
            "Array" => Some(Self::Array),
            "Object" => Some(Self::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Number => "Number",
            Self::Boolean => "Boolean",
            Self::Array => "Array",
            Self::Object => "Object",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeDefinition {
    pub name: String,
    pub declared_type: Option<AttributeType>,
    pub default: Option<Value>,
    /// Allowed values, in declaration order.
    pub matches: Option<Vec<Value>>,
    pub description: Option<String>,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagDefinition {
    pub name: String,
    pub attributes: BTreeMap<String, AttributeDefinition>,
    pub render: Option<String>,
    pub description: Option<String>,
    pub self_closing: bool,
}

impl TagDefinition {
    pub fn attribute(&self, name: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub language: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub signature: Option<String>,
    pub description: Option<String>,
    pub examples: Vec<Example>,
}

/// One immutable, fully merged schema.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaSnapshot {
    pub tags: BTreeMap<String, TagDefinition>,
    pub nodes: BTreeMap<String, TagDefinition>,
    pub functions: BTreeMap<String, FunctionDefinition>,
    pub variables: BTreeMap<String, Value>,
    pub partials: BTreeMap<String, Value>,
    /// Files that contributed to this snapshot.
    pub sources: Vec<PathBuf>,
    pub generation: u64,
}

impl SchemaSnapshot {
    /// Snapshot of the built-in catalogue alone.
    pub fn builtin() -> Self {
        Self::from_value(&builtins::catalogue(), Vec::new())
    }

    /// Convert merged plain data into typed definitions.
    ///
    /// Conversion is lenient: entries that are not objects are skipped and
    /// unknown attribute types are dropped.
    pub fn from_value(value: &Value, sources: Vec<PathBuf>) -> Self {
        let section = |key: &str| value.get(key).and_then(Value::as_object);

        let tags = section("tags").map(tag_definitions).unwrap_or_default();
        let nodes = section("nodes").map(tag_definitions).unwrap_or_default();
        let functions = section("functions").map(function_definitions).unwrap_or_default();
        let variables = section("variables").map(plain_entries).unwrap_or_default();
        let partials = section("partials").map(plain_entries).unwrap_or_default();

        Self {
            tags,
            nodes,
            functions,
            variables,
            partials,
            sources,
            generation: 0,
        }
    }

    pub fn tag(&self, name: &str) -> Option<&TagDefinition> {
        self.tags.get(name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.get(name)
    }

    pub fn attribute(&self, tag_name: &str, attribute_name: &str) -> Option<&AttributeDefinition> {
        self.tag(tag_name)?.attribute(attribute_name)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}

fn tag_definitions(map: &Map<String, Value>) -> BTreeMap<String, TagDefinition> {
    let mut out = BTreeMap::new();
    for (name, entry) in map {
        let Some(obj) = entry.as_object() else {
            debug!("skipping non-object schema entry '{}'", name);
            continue;
        };
        let attributes = obj
            .get("attributes")
            .and_then(Value::as_object)
            .map(|attrs| {
                attrs
                    .iter()
                    .filter_map(|(attr_name, attr)| {
                        attribute_definition(attr_name, attr).map(|def| (attr_name.clone(), def))
                    })
                    .collect()
            })
            .unwrap_or_default();
        out.insert(
            name.clone(),
            TagDefinition {
                name: name.clone(),
                attributes,
                render: string_field(obj, "render"),
                description: string_field(obj, "description"),
                self_closing: obj.get("selfClosing").and_then(Value::as_bool).unwrap_or(false),
            },
        );
    }
    out
}

fn attribute_definition(name: &str, value: &Value) -> Option<AttributeDefinition> {
    let Some(obj) = value.as_object() else {
        debug!("skipping non-object attribute '{}'", name);
        return None;
    };
    Some(AttributeDefinition {
        name: name.to_string(),
        declared_type: obj.get("type").and_then(Value::as_str).and_then(AttributeType::from_name),
        default: obj.get("default").filter(|v| !v.is_null()).cloned(),
        matches: obj.get("matches").and_then(Value::as_array).cloned(),
        description: string_field(obj, "description"),
        required: obj.get("required").and_then(Value::as_bool).unwrap_or(false),
    })
}

fn function_definitions(map: &Map<String, Value>) -> BTreeMap<String, FunctionDefinition> {
    let mut out = BTreeMap::new();
    for (name, entry) in map {
        let Some(obj) = entry.as_object() else {
            debug!("skipping non-object function '{}'", name);
            continue;
        };
        let doc = builtins::function_doc(name);
        let examples = obj
            .get("examples")
            .and_then(Value::as_array)
            .map(|items| items.iter().filter_map(example).collect())
            .or_else(|| doc.map(|d| d.examples.clone()))
            .unwrap_or_default();
        out.insert(
            name.clone(),
            FunctionDefinition {
                name: name.clone(),
                signature: string_field(obj, "signature").or_else(|| doc.and_then(|d| d.signature.clone())),
                description: string_field(obj, "description"),
                examples,
            },
        );
    }
    out
}

fn example(value: &Value) -> Option<Example> {
    match value {
        Value::String(content) => Some(Example {
            language: "markdoc".to_string(),
            content: content.clone(),
        }),
        Value::Object(obj) => Some(Example {
            language: string_field(obj, "language").unwrap_or_else(|| "markdoc".to_string()),
            content: string_field(obj, "content")?,
        }),
        _ => None,
    }
}

fn plain_entries(map: &Map<String, Value>) -> BTreeMap<String, Value> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}
