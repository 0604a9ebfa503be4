use super::*;
use markdoc_ls_core::context::{CompletionContext, ContextKind};
use markdoc_ls_core::markup::{Level, LinePosition, Location, Span, ValidationMessage};
use markdoc_ls_core::schema::{builtins, deep_merge};
use serde_json::json;
use tower_lsp::lsp_types::{
    CompletionItemKind, DiagnosticSeverity, Documentation, HoverContents, InsertTextFormat, NumberOrString, Position,
    Range,
};

fn create_analyzer() -> MarkdocAnalyzer {
    let mut value = builtins::catalogue();
    deep_merge(
        &mut value,
        json!({
            "tags": {
                "callout": {
                    "render": "Callout",
                    "description": "Highlighted aside.",
                    "attributes": {
                        "type": {"type": "String", "matches": ["note", "warning", "danger"], "description": "Kind of callout."},
                        "title": {"type": "String", "default": "Note"},
                        "collapsed": {"type": "Boolean"},
                        "width": {"type": "Number", "default": 3},
                        "items": {"type": "Array"},
                        "meta": {"type": "Object"},
                        "anything": {}
                    }
                }
            },
            "functions": {"upper": {"signature": "upper(text)", "description": "Uppercase a string."}},
            "variables": {"user": {"name": "Ada"}, "flags": {}}
        }),
    );
    MarkdocAnalyzer::new(Arc::new(SchemaSnapshot::from_value(&value, Vec::new())))
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

fn complete_at_end(analyzer: &MarkdocAnalyzer, text: &str) -> Vec<CompletionItem> {
    analyzer.completions(text, text.len())
}

fn doc_value(item: &CompletionItem) -> &str {
    match &item.documentation {
        Some(Documentation::MarkupContent(content)) => &content.value,
        other => panic!("expected markdown documentation, got {other:?}"),
    }
}

#[test]
fn test_tag_or_function_name_lists_both() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "Intro\n{% ");
    let schema = analyzer.schema();
    assert_eq!(items.len(), schema.tags.len() + schema.functions.len());
    let callout = items.iter().find(|i| i.label == "callout").unwrap();
    assert_eq!(callout.kind, Some(CompletionItemKind::CLASS));
    assert_eq!(callout.data, Some(json!({"type": "tag"})));
    let upper = items.iter().find(|i| i.label == "upper").unwrap();
    assert_eq!(upper.kind, Some(CompletionItemKind::FUNCTION));
    assert!(labels(&items).contains(&"equals"));
}

#[test]
fn test_attribute_names_for_known_tag() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% callout ");
    assert_eq!(
        labels(&items),
        vec!["anything", "collapsed", "items", "meta", "title", "type", "width"]
    );
    assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::FIELD)));
    assert_eq!(items[0].data, Some(json!({"type": "attribute", "tagName": "callout"})));

    let typed = complete_at_end(&analyzer, "{% callout ti");
    assert_eq!(typed.len(), 7);
    assert!(complete_at_end(&analyzer, "{% banner ").is_empty());
}

#[test]
fn test_value_completion_uses_matches() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% callout type=");
    assert_eq!(labels(&items), vec!["note", "warning", "danger"]);
    let inserts: Vec<_> = items.iter().map(|i| i.insert_text.as_deref().unwrap()).collect();
    assert_eq!(inserts, vec!["\"note\"", "\"warning\"", "\"danger\""]);
    assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::VALUE)));
}

#[test]
fn test_value_completion_without_matches() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% callout title=");
    let names = labels(&items);
    assert_eq!(&names[..3], &["null", "true", "false"]);
    assert_eq!(items[0].kind, Some(CompletionItemKind::KEYWORD));
    assert_eq!(names.len(), 3 + analyzer.schema().functions.len());
    assert!(names.contains(&"upper"));
}

#[test]
fn test_variable_and_function_name_contexts() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% callout title=$");
    assert_eq!(labels(&items), vec!["flags", "user"]);
    assert!(items.iter().all(|i| i.kind == Some(CompletionItemKind::VARIABLE)));

    let items = complete_at_end(&analyzer, "{% callout title=u");
    assert_eq!(items.len(), analyzer.schema().functions.len());
}

#[test]
fn test_no_completions_outside_tags() {
    let analyzer = create_analyzer();
    assert!(complete_at_end(&analyzer, "plain text").is_empty());
    assert!(complete_at_end(&analyzer, "{% callout %} after").is_empty());
    assert!(complete_at_end(&analyzer, "{% callout a=10f ").is_empty());
}

#[test]
fn test_completion_data_round_trips_through_context() {
    let schema = create_analyzer();
    let context = CompletionContext::new(ContextKind::AttributeValue)
        .with_tag(Some("callout"))
        .with_attribute(Some("type"));
    let items = complete(schema.schema(), &context);
    let data: CompletionData = serde_json::from_value(items[0].data.clone().unwrap()).unwrap();
    assert_eq!(data.kind, CompletionType::Value);
    assert_eq!(data.tag_name.as_deref(), Some("callout"));
    assert_eq!(data.attribute_name.as_deref(), Some("type"));
}

#[test]
fn test_resolve_tag() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% ");

    let callout = items.iter().find(|i| i.label == "callout").cloned().unwrap();
    let resolved = analyzer.resolve(callout);
    assert_eq!(resolved.detail.as_deref(), Some("callout : Callout"));
    assert_eq!(doc_value(&resolved), "Highlighted aside.");
    assert_eq!(resolved.insert_text.as_deref(), Some("callout"));

    // Built-in documentation wins and carries examples.
    let if_tag = items.iter().find(|i| i.label == "if").cloned().unwrap();
    let resolved = analyzer.resolve(if_tag);
    assert_eq!(resolved.detail.as_deref(), Some("if"));
    assert!(doc_value(&resolved).starts_with("Conditionally render content."));
    assert!(doc_value(&resolved).contains("```markdoc\n{% if $flags.showBanner %}"));
}

#[test]
fn test_resolve_function() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% ");

    let upper = items.iter().find(|i| i.label == "upper").cloned().unwrap();
    let resolved = analyzer.resolve(upper);
    assert_eq!(resolved.detail.as_deref(), Some("upper(text)"));
    assert_eq!(doc_value(&resolved), "Uppercase a string.");
    assert_eq!(resolved.insert_text.as_deref(), Some("upper($0)"));
    assert_eq!(resolved.insert_text_format, Some(InsertTextFormat::SNIPPET));

    let equals = items.iter().find(|i| i.label == "equals").cloned().unwrap();
    let resolved = analyzer.resolve(equals);
    assert_eq!(resolved.detail.as_deref(), Some("equals(a, b)"));
}

#[test]
fn test_resolve_attribute_insert_text() {
    let analyzer = create_analyzer();
    let items = complete_at_end(&analyzer, "{% callout ");
    let resolved: Vec<_> = items.into_iter().map(|i| analyzer.resolve(i)).collect();
    let insert = |name: &str| {
        resolved
            .iter()
            .find(|i| i.label == name)
            .and_then(|i| i.insert_text.clone())
            .unwrap()
    };
    assert_eq!(insert("type"), "type=\"$0\"");
    assert_eq!(insert("title"), "title=\"Note\"");
    assert_eq!(insert("collapsed"), "collapsed=false");
    assert_eq!(insert("width"), "width=3");
    assert_eq!(insert("items"), "items=[$0]");
    assert_eq!(insert("meta"), "meta={$0}");
    assert_eq!(insert("anything"), "anything=$0");

    let kind = resolved.iter().find(|i| i.label == "type").unwrap();
    assert_eq!(kind.detail.as_deref(), Some("type : String"));
    assert_eq!(
        doc_value(kind),
        "Kind of callout.\n\nShould be note, warning, or danger"
    );
    assert_eq!(kind.insert_text_format, Some(InsertTextFormat::SNIPPET));
}

#[test]
fn test_resolve_returns_unknown_items_unchanged() {
    let analyzer = create_analyzer();
    let gone = CompletionItem {
        label: "vanished".to_string(),
        data: Some(json!({"type": "tag"})),
        ..Default::default()
    };
    assert_eq!(analyzer.resolve(gone.clone()), gone);

    let no_data = CompletionItem {
        label: "callout".to_string(),
        ..Default::default()
    };
    assert_eq!(analyzer.resolve(no_data.clone()), no_data);

    let orphan_attribute = CompletionItem {
        label: "type".to_string(),
        data: Some(json!({"type": "attribute", "tagName": "banner"})),
        ..Default::default()
    };
    assert_eq!(analyzer.resolve(orphan_attribute.clone()), orphan_attribute);
}

#[test]
fn test_disjunction() {
    let words = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    assert_eq!(disjunction(&words(&[])), "");
    assert_eq!(disjunction(&words(&["a"])), "a");
    assert_eq!(disjunction(&words(&["a", "b"])), "a or b");
    assert_eq!(disjunction(&words(&["a", "b", "c"])), "a, b, or c");
}

fn hover_text(analyzer: &MarkdocAnalyzer, source: &str, needle: &str) -> Option<(String, Range)> {
    let result = analyzer.analyze(source);
    let offset = source.find(needle).unwrap() + 1;
    let hover = analyzer.hover(&result.document, offset)?;
    match hover.contents {
        HoverContents::Markup(content) => Some((content.value, hover.range.unwrap())),
        other => panic!("unexpected hover contents {other:?}"),
    }
}

#[test]
fn test_hover_tag_attribute_and_function() {
    let analyzer = create_analyzer();
    let source = "{% callout type=\"note\" title=upper(\"x\") %}\nbody\n{% /callout %}";

    let (text, range) = hover_text(&analyzer, source, "callout").unwrap();
    assert_eq!(text, "```markdoc\ncallout : Callout\n```\n---\nHighlighted aside.");
    assert_eq!(range, Range::new(Position::new(0, 3), Position::new(0, 10)));

    let (text, _) = hover_text(&analyzer, source, "type").unwrap();
    assert!(text.starts_with("```markdoc\ntype : String\n```\n---\nKind of callout."));

    let (text, range) = hover_text(&analyzer, source, "upper").unwrap();
    assert!(text.contains("upper(text)"));
    assert_eq!(range.start, Position::new(0, 29));
}

#[test]
fn test_hover_misses() {
    let analyzer = create_analyzer();
    let source = "text {% banner x=1 %} {% callout type=\"note\" %}";
    assert!(hover_text(&analyzer, source, "text").is_none());
    assert!(hover_text(&analyzer, source, "banner").is_none());
    assert!(hover_text(&analyzer, source, "\"note\"").is_none());
}

#[test]
fn test_severity_table() {
    assert_eq!(severity(Level::Critical), DiagnosticSeverity::ERROR);
    assert_eq!(severity(Level::Error), DiagnosticSeverity::ERROR);
    assert_eq!(severity(Level::Warning), DiagnosticSeverity::WARNING);
    assert_eq!(severity(Level::Info), DiagnosticSeverity::INFORMATION);
    assert_eq!(severity(Level::Debug), DiagnosticSeverity::INFORMATION);
}

#[test]
fn test_diagnostic_positions() {
    let document = markup::Document::parse("one\ntwo {% x %}");
    let ranged = ValidationMessage {
        id: "tag-undefined".to_string(),
        level: Level::Error,
        message: "Undefined tag: 'x'".to_string(),
        range: Some(Span::new(8, 15)),
        location: Some(Location {
            start: LinePosition { line: 9, character: 9 },
            end: LinePosition { line: 9, character: 9 },
        }),
    };
    let diagnostic = to_diagnostic(&document, &ranged).unwrap();
    assert_eq!(diagnostic.range, Range::new(Position::new(1, 4), Position::new(1, 11)));
    assert_eq!(diagnostic.code, Some(NumberOrString::String("tag-undefined".to_string())));
    assert_eq!(diagnostic.source.as_deref(), Some(DIAGNOSTIC_SOURCE));

    let located = ValidationMessage {
        range: None,
        level: Level::Info,
        ..ranged.clone()
    };
    let diagnostic = to_diagnostic(&document, &located).unwrap();
    assert_eq!(diagnostic.range.start, Position::new(9, 9));
    assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::INFORMATION));

    let nowhere = ValidationMessage {
        range: None,
        location: None,
        ..ranged
    };
    assert!(to_diagnostic(&document, &nowhere).is_none());
}

#[test]
fn test_analyze_reports_schema_errors() {
    let analyzer = create_analyzer();
    let result = analyzer.analyze("{% callout type=\"loud\" %}\n{% banner /%}\n{% $nobody %}");
    let codes: Vec<_> = result
        .diagnostics
        .iter()
        .map(|d| match &d.code {
            Some(NumberOrString::String(code)) => code.as_str(),
            _ => "",
        })
        .collect();
    assert_eq!(
        codes,
        vec!["attribute-value-invalid", "tag-undefined", "variable-undefined", "missing-closing"]
    );
    assert_eq!(result.diagnostics[0].severity, Some(DiagnosticSeverity::ERROR));
    assert_eq!(result.diagnostics[2].severity, Some(DiagnosticSeverity::WARNING));
}
