#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::markup::{validate, Document, Level, LinePosition, Span, ValidationMessage};
    use crate::schema::SchemaSnapshot;

    fn schema() -> SchemaSnapshot {
        SchemaSnapshot::from_value(
            &json!({
                "tags": {
                    "callout": {
                        "attributes": {
                            "type": {"type": "String", "matches": ["note", "warning"]},
                            "title": {"type": "String", "required": true},
                            "collapsed": {"type": "Boolean"},
                            "width": {"type": "Number"},
                            "items": {"type": "Array"},
                            "anything": {}
                        }
                    },
                    "if": {"attributes": {"primary": {"type": "Object"}}},
                    "else": {"selfClosing": true, "attributes": {"primary": {"type": "Object"}}},
                    "partial": {"selfClosing": true, "attributes": {"file": {"type": "String"}}}
                },
                "functions": {"equals": {}}
            }),
            Vec::new(),
        )
    }

    fn run(source: &str) -> Vec<ValidationMessage> {
        validate(&Document::parse(source), &schema())
    }

    fn ids(source: &str) -> Vec<String> {
        run(source).into_iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_valid_document() {
        let source = "# Title\n{% callout type=\"note\" title=\"Hi\" width=2 items=[1] .wide #top %}\nBody\n{% /callout %}";
        assert!(run(source).is_empty(), "{:?}", run(source));
    }

    #[test]
    fn test_syntax_error_is_critical_with_range() {
        let messages = run("text {% callout a=10f %}");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "syntax-error");
        assert_eq!(messages[0].level, Level::Critical);
        assert_eq!(messages[0].range, Some(Span::new(5, 24)));
        assert!(messages[0].location.is_none());
    }

    #[test]
    fn test_undefined_tag() {
        let messages = run("{% banner /%}");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "tag-undefined");
        assert_eq!(messages[0].level, Level::Error);
        assert_eq!(messages[0].message, "Undefined tag: 'banner'");
        assert_eq!(messages[0].range, Some(Span::new(3, 9)));
    }

    #[test]
    fn test_undefined_tag_skips_attribute_checks() {
        assert_eq!(ids("{% banner x=1 /%}"), vec!["tag-undefined"]);
    }

    #[test]
    fn test_attribute_rules() {
        let messages = run("{% callout title=\"t\" colour=\"red\" /%}");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "attribute-undefined");
        assert_eq!(messages[0].message, "Invalid attribute: 'colour'");
        assert_eq!(messages[0].range, Some(Span::new(21, 27)));

        let messages = run("{% callout /%}");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "attribute-missing-required");
        assert_eq!(messages[0].message, "Missing required attribute: 'title'");
        assert_eq!(messages[0].range, Some(Span::new(0, 14)));
    }

    #[test]
    fn test_attribute_value_shapes() {
        let messages = run("{% callout title=1 collapsed=\"no\" items={} /%}");
        let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "Attribute 'title' must be type of 'String'",
                "Attribute 'collapsed' must be type of 'Boolean'",
                "Attribute 'items' must be type of 'Array'",
            ]
        );
        assert!(messages.iter().all(|m| m.id == "attribute-value-invalid"));
    }

    #[test]
    fn test_attribute_value_matches() {
        let messages = run("{% callout title=\"t\" type=\"danger\" /%}");
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].message,
            "Attribute 'type' must match one of \"note\", \"warning\""
        );
    }

    #[test]
    fn test_unchecked_values() {
        for source in [
            "{% callout title=$title /%}",
            "{% callout title=equals(1, 2) /%}",
            "{% callout title=null /%}",
            "{% callout title=\"t\" anything=[1, {a: 2}] /%}",
        ] {
            assert!(run(source).is_empty(), "{source:?}: {:?}", run(source));
        }
    }

    #[test]
    fn test_missing_closing_uses_location() {
        let messages = run("{% callout title=\"t\" %}\nbody");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "missing-closing");
        assert_eq!(messages[0].level, Level::Critical);
        assert_eq!(messages[0].message, "Node 'callout' is missing closing");
        assert!(messages[0].range.is_none());
        let location = messages[0].location.unwrap();
        assert_eq!(location.start, LinePosition { line: 0, character: 0 });
        assert_eq!(location.end, LinePosition { line: 0, character: 23 });
    }

    #[test]
    fn test_missing_opening() {
        let messages = run("text\n{% /callout %}");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "missing-opening");
        assert_eq!(messages[0].location.unwrap().start, LinePosition { line: 1, character: 0 });
    }

    #[test]
    fn test_interleaved_tags() {
        // Closing the outer tag reports the inner one as unclosed.
        assert_eq!(
            ids("{% if $a %}{% callout title=\"t\" %}{% /if %}"),
            vec!["missing-closing"]
        );
        assert!(ids("{% if $a %}{% callout title=\"t\" %}{% /callout %}{% /if %}").is_empty());
    }

    #[test]
    fn test_self_closing_schema_tags_need_no_close() {
        assert!(ids("{% if $a %}yes{% else %}no{% /if %}").is_empty());
        assert!(ids("{% partial file=\"a.md\" %}").is_empty());
    }

    #[test]
    fn test_variables_checked_only_when_declared() {
        assert!(ids("{% $missing %}").is_empty());

        let schema = SchemaSnapshot::from_value(
            &json!({"tags": {}, "variables": {"user": {"name": "Ada"}}}),
            Vec::new(),
        );
        let messages = validate(&Document::parse("{% $user.name %} {% $other %} {% @ctx %}"), &schema);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, "variable-undefined");
        assert_eq!(messages[0].level, Level::Warning);
        assert_eq!(messages[0].message, "Undefined variable: 'other'");
    }

    #[test]
    fn test_level_serializes_lowercase() {
        let message = &run("{% banner /%}")[0];
        let value = serde_json::to_value(message).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["range"], json!({"start": 3, "end": 9}));
        assert!(value.get("location").is_none());
    }
}
