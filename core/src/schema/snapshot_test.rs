#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::schema::{builtins, AttributeType, SchemaSnapshot};

    #[test]
    fn test_builtin_catalogue() {
        let snapshot = SchemaSnapshot::builtin();
        for tag in ["if", "else", "table", "partial", "slot"] {
            assert!(snapshot.tag(tag).is_some(), "missing builtin tag {tag}");
        }
        for func in ["and", "or", "not", "equals", "default", "debug"] {
            assert!(snapshot.function(func).is_some(), "missing builtin function {func}");
        }
        assert!(snapshot.nodes.contains_key("heading"));
        assert!(snapshot.variables.is_empty());
        assert_eq!(snapshot.generation, 0);
    }

    #[test]
    fn test_builtin_docs_enrich_functions() {
        let snapshot = SchemaSnapshot::builtin();
        let equals = snapshot.function("equals").unwrap();
        assert_eq!(equals.signature.as_deref(), Some("equals(a, b)"));
        assert!(!equals.examples.is_empty());
        assert!(builtins::tag_doc("if").is_some());
        assert!(builtins::tag_doc("callout").is_none());
    }

    #[test]
    fn test_partial_is_self_closing() {
        let snapshot = SchemaSnapshot::builtin();
        let partial = snapshot.tag("partial").unwrap();
        assert!(partial.self_closing);
        assert!(partial.attribute("file").unwrap().required);
    }

    #[test]
    fn test_typed_conversion() {
        let value = json!({
            "tags": {
                "callout": {
                    "render": "Callout",
                    "description": "A callout box",
                    "attributes": {
                        "type": {"type": "String", "default": "note", "matches": ["note", "warning"]},
                        "count": {"type": "Number", "required": true},
                        "custom": {"type": "PartialFile"},
                        "pattern": {"type": "String", "matches": "^[a-z]+$"}
                    }
                }
            },
            "variables": {"user": {"name": "x"}}
        });
        let snapshot = SchemaSnapshot::from_value(&value, Vec::new());
        let callout = snapshot.tag("callout").unwrap();
        assert_eq!(callout.render.as_deref(), Some("Callout"));
        assert_eq!(callout.description.as_deref(), Some("A callout box"));

        let kind = callout.attribute("type").unwrap();
        assert_eq!(kind.declared_type, Some(AttributeType::String));
        assert_eq!(kind.default, Some(json!("note")));
        assert_eq!(kind.matches, Some(vec![json!("note"), json!("warning")]));

        assert!(callout.attribute("count").unwrap().required);
        assert_eq!(callout.attribute("custom").unwrap().declared_type, None);
        assert_eq!(callout.attribute("pattern").unwrap().matches, None);
        assert_eq!(snapshot.variable_names().collect::<Vec<_>>(), vec!["user"]);
    }

    #[test]
    fn test_non_object_entries_are_skipped() {
        let value = json!({
            "tags": {"good": {}, "bad": true},
            "functions": {"fn": {}, "broken": 3}
        });
        let snapshot = SchemaSnapshot::from_value(&value, Vec::new());
        assert_eq!(snapshot.tag_names().collect::<Vec<_>>(), vec!["good"]);
        assert_eq!(snapshot.function_names().collect::<Vec<_>>(), vec!["fn"]);
    }

    #[test]
    fn test_project_function_signature_overrides_builtin_doc() {
        let value = json!({"functions": {"equals": {"signature": "equals(left, right)", "description": "custom"}}});
        let snapshot = SchemaSnapshot::from_value(&value, Vec::new());
        let equals = snapshot.function("equals").unwrap();
        assert_eq!(equals.signature.as_deref(), Some("equals(left, right)"));
        assert_eq!(equals.description.as_deref(), Some("custom"));
    }
}
