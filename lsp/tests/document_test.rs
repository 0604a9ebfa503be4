use markdoc_ls::analyzer::MarkdocAnalyzer;
use tower_lsp::lsp_types::{HoverContents, NumberOrString, Position, Range};

#[test]
fn test_diagnostic_columns_are_utf16() {
    let analyzer = MarkdocAnalyzer::builtin();
    let result = analyzer.analyze("héllo 😀 {% nope /%}");
    assert_eq!(result.diagnostics.len(), 1);
    let diagnostic = &result.diagnostics[0];
    assert_eq!(diagnostic.code, Some(NumberOrString::String("tag-undefined".to_string())));
    assert_eq!(diagnostic.range, Range::new(Position::new(0, 12), Position::new(0, 16)));
}

#[test]
fn test_unbalanced_tags() {
    let analyzer = MarkdocAnalyzer::builtin();
    let result = analyzer.analyze("{% if $a %}\nopen\n{% /table %}");
    let messages: Vec<_> = result.diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["Node 'table' is missing opening", "Node 'if' is missing closing"]);
    assert_eq!(result.diagnostics[1].range, Range::new(Position::new(0, 0), Position::new(0, 11)));
}

#[test]
fn test_syntax_error_is_reported_once() {
    let analyzer = MarkdocAnalyzer::builtin();
    let result = analyzer.analyze("before {% if $a\nafter");
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Expected closing tag delimiter `%}`");
    assert_eq!(result.diagnostics[0].range.start, Position::new(0, 7));
}

#[test]
fn test_hover_on_builtin_tag() {
    let analyzer = MarkdocAnalyzer::builtin();
    let result = analyzer.analyze("{% if $a %}y{% /if %}");
    let hover = analyzer.hover(&result.document, 4).unwrap();
    let HoverContents::Markup(content) = hover.contents else {
        panic!("expected markdown hover");
    };
    assert!(content.value.starts_with("```markdoc\nif\n```\n---\nConditionally render content."));
    assert_eq!(hover.range, Some(Range::new(Position::new(0, 3), Position::new(0, 5))));
}
