use crate::context::{
    is_ident_continue, is_quote, is_sigil, Cursor, IDENTIFIER, NUMBER, PRIMARY_ATTRIBUTE, SHORTHAND, VARIABLE_HEAD,
};

use super::{
    Accessor, Argument, Attribute, AttributeForm, FunctionCall, Span, SyntaxError, Tag, TagKind, Value, ValueNode,
    Variable,
};

const KEYWORDS: [&str; 3] = ["null", "true", "false"];

/// Parse the text between `{%` and `%}`. `base` is the byte offset of
/// `inner` within the document.
pub(super) fn parse_tag(inner: &str, base: usize, span: Span) -> Result<Tag, SyntaxError> {
    TagParser {
        cursor: Cursor::new(inner),
        base,
    }
    .parse(span)
}

struct TagParser<'a> {
    cursor: Cursor<'a>,
    base: usize,
}

impl<'a> TagParser<'a> {
    fn parse(mut self, span: Span) -> Result<Tag, SyntaxError> {
        self.cursor.consume_whitespace();
        let Some(lead) = self.cursor.peek() else {
            return Err(self.error("Empty tag"));
        };

        if lead == '/' {
            self.cursor.bump();
            let (name, name_span) = self.identifier("Expected tag name after `/`")?;
            self.cursor.consume_whitespace();
            if !self.cursor.eof() {
                return Err(self.error("Unexpected content in closing tag"));
            }
            return Ok(Tag {
                kind: TagKind::Close,
                name: Some(name),
                name_span: Some(name_span),
                attributes: Vec::new(),
                span,
            });
        }

        if is_sigil(lead) || self.at_call() {
            let value = self.value()?;
            self.finish()?;
            return Ok(Tag {
                kind: TagKind::Interpolation(value),
                name: None,
                name_span: None,
                attributes: Vec::new(),
                span,
            });
        }

        if lead == '.' || lead == '#' || self.at_pair() {
            let (attributes, _) = self.slots(false)?;
            return Ok(Tag {
                kind: TagKind::Annotation,
                name: None,
                name_span: None,
                attributes,
                span,
            });
        }

        let (name, name_span) = self.identifier("Expected tag name")?;
        if self.cursor.peek().is_some_and(|c| !c.is_whitespace() && c != '/') {
            return Err(self.error(format!("Unexpected character after tag name '{name}'")));
        }
        let (attributes, self_closing) = self.slots(true)?;
        Ok(Tag {
            kind: if self_closing {
                TagKind::SelfClosing
            } else {
                TagKind::Open
            },
            name: Some(name),
            name_span: Some(name_span),
            attributes,
            span,
        })
    }

    /// Attribute slots up to the end of the tag. Returns whether a trailing
    /// `/` marked the tag self-closing.
    fn slots(&mut self, allow_primary: bool) -> Result<(Vec<Attribute>, bool), SyntaxError> {
        let mut attributes = Vec::new();
        let mut first = allow_primary;
        loop {
            self.cursor.consume_whitespace();
            let Some(lead) = self.cursor.peek() else {
                return Ok((attributes, false));
            };
            if lead == '/' {
                return self.finish().map(|closing| (attributes, closing));
            }

            if lead == '.' || lead == '#' {
                let start = self.offset();
                let token = self
                    .cursor
                    .parse_token(&SHORTHAND)
                    .ok_or_else(|| self.error("Expected a class or id name"))?;
                let (name, form) = if lead == '.' {
                    ("class", AttributeForm::Class)
                } else {
                    ("id", AttributeForm::Id)
                };
                attributes.push(Attribute {
                    name: name.to_string(),
                    name_span: None,
                    value: ValueNode {
                        value: Value::String(token[1..].to_string()),
                        span: Span::new(start, self.offset()),
                    },
                    form,
                });
            } else if first && self.at_bare_value() {
                let value = self.value()?;
                attributes.push(Attribute {
                    name: PRIMARY_ATTRIBUTE.to_string(),
                    name_span: None,
                    value,
                    form: AttributeForm::Primary,
                });
            } else {
                let (name, name_span) = self.identifier("Expected attribute name")?;
                if self.cursor.peek() != Some('=') {
                    return Err(self.error(format!("Expected `=` after attribute '{name}'")));
                }
                self.cursor.bump();
                let value = self.value()?;
                if attributes.iter().any(|a: &Attribute| a.name == name) {
                    return Err(SyntaxError::new(format!("Duplicate attribute '{name}'"), name_span));
                }
                attributes.push(Attribute {
                    name,
                    name_span: Some(name_span),
                    value,
                    form: AttributeForm::Pair,
                });
            }
            first = false;

            if self.cursor.peek().is_some_and(|c| !c.is_whitespace() && c != '/') {
                return Err(self.error("Expected whitespace between attributes"));
            }
        }
    }

    /// Consume an optional trailing `/` and require the end of the tag.
    fn finish(&mut self) -> Result<bool, SyntaxError> {
        self.cursor.consume_whitespace();
        let closing = self.cursor.peek() == Some('/');
        if closing {
            self.cursor.bump();
            self.cursor.consume_whitespace();
        }
        if !self.cursor.eof() {
            return Err(self.error("Unexpected content at end of tag"));
        }
        Ok(closing)
    }

    fn value(&mut self) -> Result<ValueNode, SyntaxError> {
        let start = self.offset();
        let Some(lead) = self.cursor.peek() else {
            return Err(self.error("Expected a value"));
        };

        let value = match lead {
            '[' => self.array()?,
            '{' => self.object()?,
            c if is_sigil(c) => Value::Variable(self.variable()?),
            c if is_quote(c) => Value::String(self.string()?),
            c if c.is_ascii_digit() || c == '-' => {
                let raw = self
                    .cursor
                    .parse_token(&NUMBER)
                    .ok_or_else(|| self.error("Invalid number"))?;
                if self.cursor.expect(is_ident_continue) {
                    return Err(self.error(format!("Invalid number '{raw}'")));
                }
                Value::Number(raw.to_string())
            }
            c if c.is_ascii_alphabetic() => {
                if let Some(keyword) = KEYWORDS.iter().find_map(|kw| self.cursor.parse_keyword(kw)) {
                    match keyword {
                        "null" => Value::Null,
                        "true" => Value::Bool(true),
                        _ => Value::Bool(false),
                    }
                } else {
                    Value::Function(self.call()?)
                }
            }
            _ => return Err(self.error(format!("Unexpected character '{lead}'"))),
        };

        Ok(ValueNode {
            value,
            span: Span::new(start, self.offset()),
        })
    }

    fn string(&mut self) -> Result<String, SyntaxError> {
        let quote = self.cursor.peek().unwrap_or('"');
        let body = self
            .cursor
            .parse_string()
            .ok_or_else(|| self.error("Unterminated string"))?;
        let escaped = format!("\\{quote}");
        Ok(body.replace(&escaped, &quote.to_string()))
    }

    fn variable(&mut self) -> Result<Variable, SyntaxError> {
        let head = self
            .cursor
            .parse_token(&VARIABLE_HEAD)
            .ok_or_else(|| self.error("Expected variable name"))?;
        let mut chars = head.chars();
        let sigil = chars.next().unwrap_or('$');
        let mut variable = Variable {
            sigil,
            name: chars.as_str().to_string(),
            accessors: Vec::new(),
        };

        loop {
            match self.cursor.peek() {
                Some('.') => {
                    self.cursor.bump();
                    let (field, _) = self.identifier("Expected field name after `.`")?;
                    variable.accessors.push(Accessor::Field(field));
                }
                Some('[') => {
                    self.cursor.bump();
                    self.cursor.consume_whitespace();
                    let index = self.value()?;
                    if !matches!(index.value, Value::Number(_) | Value::String(_) | Value::Variable(_)) {
                        return Err(SyntaxError::new("Invalid index expression", index.span));
                    }
                    self.cursor.consume_whitespace();
                    if self.cursor.peek() != Some(']') {
                        return Err(self.error("Expected `]`"));
                    }
                    self.cursor.bump();
                    variable.accessors.push(Accessor::Index(Box::new(index)));
                }
                _ => return Ok(variable),
            }
        }
    }

    fn call(&mut self) -> Result<FunctionCall, SyntaxError> {
        let (name, name_span) = self.identifier("Expected function name")?;
        if self.cursor.peek() != Some('(') {
            return Err(SyntaxError::new(
                format!("Expected `(` after '{name}'; bare words are not values"),
                name_span,
            ));
        }
        self.cursor.bump();

        let mut args = Vec::new();
        self.separated(')', |p| {
            let named = if p.at_pair() {
                let (arg_name, _) = p.identifier("Expected parameter name")?;
                p.cursor.bump();
                Some(arg_name)
            } else {
                None
            };
            let value = p.value()?;
            args.push(Argument { name: named, value });
            Ok(())
        })?;

        Ok(FunctionCall { name, name_span, args })
    }

    fn array(&mut self) -> Result<Value, SyntaxError> {
        self.cursor.bump();
        let mut items = Vec::new();
        self.separated(']', |p| {
            items.push(p.value()?);
            Ok(())
        })?;
        Ok(Value::Array(items))
    }

    fn object(&mut self) -> Result<Value, SyntaxError> {
        self.cursor.bump();
        let mut entries = Vec::new();
        self.separated('}', |p| {
            let key = if p.cursor.expect(is_quote) {
                p.string()?
            } else {
                p.identifier("Expected object key")?.0
            };
            p.cursor.consume_whitespace();
            if p.cursor.peek() != Some(':') {
                return Err(p.error("Expected `:` after object key"));
            }
            p.cursor.bump();
            p.cursor.consume_whitespace();
            entries.push((key, p.value()?));
            Ok(())
        })?;
        Ok(Value::Object(entries))
    }

    /// Comma-separated items up to `close`; a trailing comma is allowed.
    fn separated(
        &mut self,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<(), SyntaxError>,
    ) -> Result<(), SyntaxError> {
        loop {
            self.cursor.consume_whitespace();
            match self.cursor.peek() {
                Some(c) if c == close => {
                    self.cursor.bump();
                    return Ok(());
                }
                None => return Err(self.error(format!("Expected `{close}`"))),
                Some(_) => {}
            }
            item(self)?;
            self.cursor.consume_whitespace();
            match self.cursor.peek() {
                Some(',') => {
                    self.cursor.bump();
                }
                Some(c) if c == close => {}
                _ => return Err(self.error(format!("Expected `,` or `{close}`"))),
            }
        }
    }

    fn identifier(&mut self, message: &str) -> Result<(String, Span), SyntaxError> {
        let start = self.offset();
        let name = self
            .cursor
            .parse_token(&IDENTIFIER)
            .ok_or_else(|| self.error(message))?;
        Ok((name.to_string(), Span::new(start, self.offset())))
    }

    /// `name(` at the cursor.
    fn at_call(&self) -> bool {
        let mut lookahead = self.cursor.clone();
        lookahead.parse_token(&IDENTIFIER).is_some() && lookahead.peek() == Some('(')
    }

    /// `name=` at the cursor.
    fn at_pair(&self) -> bool {
        let mut lookahead = self.cursor.clone();
        lookahead.parse_token(&IDENTIFIER).is_some() && lookahead.peek() == Some('=')
    }

    /// A positional value that cannot be read as an attribute name.
    fn at_bare_value(&self) -> bool {
        match self.cursor.peek() {
            None => false,
            Some(c) if c.is_ascii_alphabetic() => {
                KEYWORDS.iter().any(|kw| self.cursor.clone().parse_keyword(kw).is_some()) || self.at_call()
            }
            Some(_) => true,
        }
    }

    fn offset(&self) -> usize {
        self.base + self.cursor.position()
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        let at = self.offset();
        SyntaxError::new(message, Span::new(at, at))
    }
}
