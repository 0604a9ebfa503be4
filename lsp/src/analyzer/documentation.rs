use markdoc_ls_core::schema::{builtins, AttributeDefinition, AttributeType, Example, FunctionDefinition, TagDefinition};
use serde_json::Value;
use tower_lsp::lsp_types::{MarkupContent, MarkupKind};

pub fn tag_detail(tag: &TagDefinition) -> String {
    match &tag.render {
        Some(render) => format!("{} : {}", tag.name, render),
        None => tag.name.clone(),
    }
}

pub fn attribute_detail(attr: &AttributeDefinition) -> String {
    match attr.declared_type {
        Some(ty) => format!("{} : {}", attr.name, ty),
        None => attr.name.clone(),
    }
}

pub fn function_detail(func: &FunctionDefinition) -> String {
    func.signature.clone().unwrap_or_else(|| format!("{}()", func.name))
}

/// Built-in help wins over the project description.
pub fn tag_documentation(tag: &TagDefinition) -> String {
    if let Some(doc) = builtins::tag_doc(&tag.name) {
        return with_examples(&doc.help, &doc.examples);
    }
    match &tag.description {
        Some(description) => description.clone(),
        None => format!("No documentation available for tag `{}`.", tag.name),
    }
}

pub fn function_documentation(func: &FunctionDefinition) -> String {
    if let Some(doc) = builtins::function_doc(&func.name) {
        return with_examples(&doc.help, &doc.examples);
    }
    match &func.description {
        Some(description) => with_examples(description, &func.examples),
        None if !func.examples.is_empty() => with_examples("", &func.examples),
        None => format!("No documentation available for function `{}`.", func.name),
    }
}

pub fn attribute_documentation(attr: &AttributeDefinition) -> String {
    let mut parts = Vec::new();
    if let Some(description) = &attr.description {
        parts.push(description.clone());
    }
    if let Some(matches) = attr.matches.as_ref().filter(|m| !m.is_empty()) {
        let allowed: Vec<String> = matches.iter().map(display_value).collect();
        parts.push(format!("Should be {}", disjunction(&allowed)));
    }
    if parts.is_empty() {
        return format!("No documentation available for attribute `{}`.", attr.name);
    }
    parts.join("\n\n")
}

/// `a`, `a or b`, `a, b, or c`
pub fn disjunction(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {}", init.join(", "), last),
    }
}

/// Snippet inserted for an attribute name, with a placeholder shaped by its type.
pub fn attribute_insert_text(attr: &AttributeDefinition) -> String {
    let default = attr.default.as_ref();
    let value = match attr.declared_type {
        Some(AttributeType::String) => match default.and_then(Value::as_str) {
            Some(text) => format!("\"{}\"", escape_snippet(text)),
            None => "\"$0\"".to_string(),
        },
        Some(AttributeType::Array) => "[$0]".to_string(),
        Some(AttributeType::Object) => "{$0}".to_string(),
        Some(AttributeType::Boolean) => default.map_or_else(|| "false".to_string(), literal),
        Some(AttributeType::Number) => default.map_or_else(|| "0".to_string(), literal),
        None => default.map_or_else(|| "$0".to_string(), literal),
    };
    format!("{}={}", attr.name, value)
}

/// Read-only popup shared by hover and resolved completions.
pub fn render_content(detail: &str, documentation: &str) -> MarkupContent {
    MarkupContent {
        kind: MarkupKind::Markdown,
        value: ["```markdoc", detail, "```", "---", documentation].join("\n"),
    }
}

pub fn markdown(value: String) -> MarkupContent {
    MarkupContent {
        kind: MarkupKind::Markdown,
        value,
    }
}

fn with_examples(help: &str, examples: &[Example]) -> String {
    let mut out = help.to_string();
    for example in examples {
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(&format!("```{}\n{}\n```", example.language, example.content));
    }
    out
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn literal(value: &Value) -> String {
    escape_snippet(&value.to_string())
}

fn escape_snippet(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '$' | '}' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
