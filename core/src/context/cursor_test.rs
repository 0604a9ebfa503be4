#[cfg(test)]
mod tests {
    use crate::context::Cursor;
    use crate::context::cursor::IDENTIFIER;

    #[test]
    fn test_eof_and_ends_after() {
        let mut cursor = Cursor::new("lorem epsum");
        assert!(!cursor.eof());
        assert!(cursor.ends_after(11));
        cursor.parse_token(&IDENTIFIER);
        assert!(cursor.ends_after(6));
        cursor.consume_whitespace();
        cursor.parse_token(&IDENTIFIER);
        assert!(cursor.eof());
        assert!(!cursor.ends_after(0));
    }

    #[test]
    fn test_peek_nth() {
        let cursor = Cursor::new("lorem epsum");
        assert_eq!(cursor.peek(), Some('l'));
        assert_eq!(cursor.peek_nth(6), Some('e'));
        assert_eq!(cursor.peek_nth(40), None);
    }

    #[test]
    fn test_consume_all_kinds_of_whitespace() {
        let mut cursor = Cursor::new(" \n\t\t");
        cursor.consume_whitespace();
        assert!(cursor.eof());
    }

    #[test]
    fn test_parse_string_double_quote_with_escape() {
        let mut cursor = Cursor::new("\"lorem epsum \\\" \n dolor\" sit");
        let body = cursor.parse_string();
        assert_eq!(body, Some("lorem epsum \\\" \n dolor"));
        assert!(cursor.ends_after(4));
    }

    #[test]
    fn test_parse_string_single_quote_ignores_other_escapes() {
        let mut cursor = Cursor::new("'lorem epsum \\' \\\" \n dolor' sit");
        let body = cursor.parse_string();
        assert_eq!(body, Some("lorem epsum \\' \\\" \n dolor"));
        assert!(cursor.ends_after(4));
    }

    #[test]
    fn test_unterminated_string_resets_position() {
        let mut cursor = Cursor::new("\"never closed");
        assert_eq!(cursor.parse_string(), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_parse_pair_nested_brackets() {
        let mut cursor = Cursor::new(r#"{ name: "John", age: 999, meta: { favorites: [10,23,45] }} extra"#);
        let pair = cursor.parse_pair('{', '}');
        assert_eq!(pair, Some(r#"{ name: "John", age: 999, meta: { favorites: [10,23,45] }}"#));
        assert!(cursor.ends_after(6));
    }

    #[test]
    fn test_parse_pair_skips_brackets_in_strings() {
        let mut cursor = Cursor::new(r#"{ a: "}" }"#);
        assert!(cursor.parse_pair('{', '}').is_some());
        assert!(cursor.eof());
    }

    #[test]
    fn test_unbalanced_pair_resets_position() {
        let mut cursor = Cursor::new("[1, [2, 3]");
        assert_eq!(cursor.parse_pair('[', ']'), None);
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_keyword_requires_word_boundary() {
        assert_eq!(Cursor::new("true ").parse_keyword("true"), Some("true"));
        assert_eq!(Cursor::new("true").parse_keyword("true"), Some("true"));
        assert_eq!(Cursor::new("trueish").parse_keyword("true"), None);
    }
}
