use markdoc_ls_core::markup::{Document, Span};
use markdoc_ls_core::schema::SchemaSnapshot;
use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent};

use super::documentation::{
    attribute_detail, attribute_documentation, function_detail, function_documentation, render_content, tag_detail,
    tag_documentation,
};
use super::diagnostics::to_range;

/// Documentation for the tag name, attribute name or function name under
/// `offset` (bytes).
pub fn hover(schema: &SchemaSnapshot, document: &Document, offset: usize) -> Option<Hover> {
    let (content, span) = hover_content(schema, document, offset)?;
    Some(Hover {
        contents: HoverContents::Markup(content),
        range: Some(to_range(document.location(span))),
    })
}

fn hover_content(schema: &SchemaSnapshot, document: &Document, offset: usize) -> Option<(MarkupContent, Span)> {
    let tag = document.tag_at(offset)?;

    if let (Some(name), Some(span)) = (tag.name.as_deref(), tag.name_span) {
        if span.contains(offset) {
            let def = schema.tag(name)?;
            return Some((render_content(&tag_detail(def), &tag_documentation(def)), span));
        }
    }

    if let Some(attribute) = tag.attribute_at(offset) {
        if let Some(span) = attribute.name_span.filter(|s| s.contains(offset)) {
            let def = schema.attribute(tag.name.as_deref()?, &attribute.name)?;
            return Some((render_content(&attribute_detail(def), &attribute_documentation(def)), span));
        }
    }

    let call = tag.values().find_map(|value| value.function_at(offset))?;
    let def = schema.function(&call.name)?;
    Some((
        render_content(&function_detail(def), &function_documentation(def)),
        call.name_span,
    ))
}
