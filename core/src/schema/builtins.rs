//! Built-in catalogue and documentation bundled into the binary.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::error;

use super::Example;

static CATALOGUE: Lazy<Value> = Lazy::new(|| match serde_json::from_str(include_str!("../../data/builtins.json")) {
    Ok(value) => value,
    Err(e) => {
        error!("bundled builtins.json is invalid: {}", e);
        Value::Object(Map::new())
    }
});

static DOCS: Lazy<BuiltinDocs> = Lazy::new(|| {
    match serde_json::from_str(include_str!("../../data/builtin-docs.json")) {
        Ok(docs) => docs,
        Err(e) => {
            error!("bundled builtin-docs.json is invalid: {}", e);
            BuiltinDocs::default()
        }
    }
});

#[derive(Debug, Clone, Default, Deserialize)]
struct BuiltinDocs {
    #[serde(default)]
    tags: BTreeMap<String, Documentation>,
    #[serde(default)]
    functions: BTreeMap<String, Documentation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Documentation {
    #[serde(default)]
    pub signature: Option<String>,
    pub help: String,
    #[serde(default)]
    pub examples: Vec<Example>,
}

/// The `tags`, `nodes` and `functions` sections every schema starts from.
pub fn catalogue() -> Value {
    CATALOGUE.clone()
}

pub fn tag_doc(name: &str) -> Option<&'static Documentation> {
    DOCS.tags.get(name)
}

pub fn function_doc(name: &str) -> Option<&'static Documentation> {
    DOCS.functions.get(name)
}
