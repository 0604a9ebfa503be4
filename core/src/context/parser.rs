use super::cursor::{
    is_quote, is_sigil, Cursor, IDENTIFIER, NUMBER, SHORTHAND, TAG_OPEN, VARIABLE_HEAD,
};
use super::{CompletionContext, ContextKind, ParseOutcome, PRIMARY_ATTRIBUTE};

/// Deepest `[` nesting accepted inside a variable reference.
pub const MAX_NESTING: usize = 32;

const KEYWORDS: [&str; 3] = ["null", "true", "false"];

/// Single-pass classifier for the text between a tag-open marker and the cursor.
pub struct ContextParser<'a> {
    cursor: Cursor<'a>,
}

impl<'a> ContextParser<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            cursor: Cursor::new(text),
        }
    }

    pub fn cursor(&self) -> &Cursor<'a> {
        &self.cursor
    }

    pub fn parse_tag(&mut self) -> Option<CompletionContext> {
        self.cursor.parse_token(&TAG_OPEN)?;
        let Some(lead) = self.cursor.peek() else {
            return Some(CompletionContext::new(ContextKind::TagOrFunctionName));
        };

        if is_sigil(lead) {
            return self.parse_variable(0).into_context();
        }
        if lead == '.' || lead == '#' {
            return self.parse_annotations().into_context();
        }
        if !lead.is_ascii_alphabetic() {
            return None;
        }

        let start = self.cursor.position();
        let tag_name = self.cursor.parse_token(&IDENTIFIER)?;
        match self.cursor.peek() {
            None => Some(CompletionContext::new(ContextKind::TagOrFunctionName).with_tag(Some(tag_name))),
            Some(c) if c.is_whitespace() => self.parse_slots(tag_name).into_context(),
            Some('(') => {
                // `{% fn(...) %}` interpolates a function call
                self.cursor.reset(start);
                self.parse_value(None, None).into_context()
            }
            Some('=') => {
                // `{% key=value %}` is an annotation without a tag name
                self.cursor.reset(start);
                self.parse_annotations().into_context()
            }
            Some(_) => None,
        }
    }

    /// Whitespace-separated attribute slots following a tag name.
    pub fn parse_slots(&mut self, tag_name: &str) -> ParseOutcome {
        let tag = Some(tag_name);
        let mut first = true;
        while !self.cursor.eof() {
            self.cursor.consume_whitespace();
            if self.cursor.eof() {
                if first {
                    return ParseOutcome::completion(ContextKind::AttributeNameOrValue, tag, None);
                }
                break;
            }
            if self.cursor.ends_after(1) && self.cursor.expect(is_sigil) {
                let attribute = first.then_some(PRIMARY_ATTRIBUTE);
                return ParseOutcome::completion(ContextKind::Variable, tag, attribute);
            }

            let outcome = if self.cursor.expect(|c| c == '.' || c == '#') {
                self.parse_shorthand()
            } else if first && self.at_bare_value() {
                self.parse_value(tag, Some(PRIMARY_ATTRIBUTE))
            } else {
                self.parse_attribute_kv(tag)
            };
            first = false;

            match outcome {
                ParseOutcome::Skip if !self.at_slot_boundary() => return ParseOutcome::Error,
                ParseOutcome::Skip => continue,
                other => return other,
            }
        }
        ParseOutcome::Skip
    }

    /// A bare positional value is only recognised where it cannot be read as
    /// an attribute name: non-letter lead, a keyword literal, or `name(`.
    fn at_bare_value(&self) -> bool {
        match self.cursor.peek() {
            None => false,
            Some(c) if c.is_ascii_alphabetic() => {
                let mut lookahead = self.cursor.clone();
                if KEYWORDS.iter().any(|kw| lookahead.clone().parse_keyword(kw).is_some()) {
                    return true;
                }
                lookahead.parse_token(&IDENTIFIER).is_some() && lookahead.peek() == Some('(')
            }
            Some(_) => true,
        }
    }

    fn parse_shorthand(&mut self) -> ParseOutcome {
        match self.cursor.parse_token(&SHORTHAND) {
            Some(_) => ParseOutcome::Skip,
            None => ParseOutcome::Error,
        }
    }

    /// Class/id shorthand and `key=value` pairs of a tag with no name.
    pub fn parse_annotations(&mut self) -> ParseOutcome {
        loop {
            self.cursor.consume_whitespace();
            if self.cursor.eof() {
                return ParseOutcome::Skip;
            }
            let outcome = if self.cursor.expect(|c| c == '.' || c == '#') {
                self.parse_shorthand()
            } else if self.cursor.ends_after(1) && self.cursor.expect(is_sigil) {
                ParseOutcome::completion(ContextKind::Variable, None, None)
            } else {
                self.parse_attribute_kv(None)
            };
            if outcome != ParseOutcome::Skip {
                return outcome;
            }
            if !self.at_slot_boundary() {
                return ParseOutcome::Error;
            }
        }
    }

    /// Slots are separated by whitespace; a finished slot must be followed by
    /// whitespace or the end of input.
    fn at_slot_boundary(&self) -> bool {
        self.cursor.peek().is_none_or(char::is_whitespace)
    }

    pub fn parse_attribute_kv(&mut self, tag_name: Option<&str>) -> ParseOutcome {
        let Some(attribute_name) = self.cursor.parse_token(&IDENTIFIER) else {
            return ParseOutcome::Error;
        };
        if self.cursor.eof() {
            return ParseOutcome::completion(ContextKind::AttributeName, tag_name, Some(attribute_name));
        }
        if self.cursor.peek() == Some('=') {
            self.cursor.bump();
            return self.parse_value(tag_name, Some(attribute_name));
        }
        ParseOutcome::Error
    }

    pub fn parse_value(&mut self, tag_name: Option<&str>, attribute_name: Option<&str>) -> ParseOutcome {
        let Some(lead) = self.cursor.peek() else {
            return ParseOutcome::completion(ContextKind::AttributeValue, tag_name, attribute_name);
        };

        match lead {
            '{' | '[' => {
                let close = if lead == '{' { '}' } else { ']' };
                match self.cursor.parse_pair(lead, close) {
                    Some(_) => ParseOutcome::Skip,
                    None => ParseOutcome::Error,
                }
            }
            c if is_sigil(c) => {
                if self.cursor.ends_after(1) {
                    return ParseOutcome::completion(ContextKind::Variable, tag_name, attribute_name);
                }
                bind(self.parse_variable(0), tag_name, attribute_name)
            }
            c if c.is_ascii_alphabetic() => {
                if KEYWORDS.iter().any(|kw| self.cursor.parse_keyword(kw).is_some()) {
                    return ParseOutcome::Skip;
                }
                if self.cursor.ends_after(1) {
                    return ParseOutcome::completion(ContextKind::FunctionName, tag_name, attribute_name);
                }
                let start = self.cursor.position();
                if self.cursor.parse_token(&IDENTIFIER).is_none() || self.cursor.peek() != Some('(') {
                    self.cursor.reset(start);
                    return ParseOutcome::Error;
                }
                match self.cursor.parse_pair('(', ')') {
                    Some(_) => ParseOutcome::Skip,
                    None => {
                        self.cursor.reset(start);
                        ParseOutcome::Error
                    }
                }
            }
            c if c.is_ascii_digit() || c == '-' => {
                let start = self.cursor.position();
                if self.cursor.parse_token(&NUMBER).is_none() {
                    return ParseOutcome::Error;
                }
                if self.cursor.expect(|c| !c.is_whitespace()) {
                    self.cursor.reset(start);
                    return ParseOutcome::Error;
                }
                ParseOutcome::Skip
            }
            c if is_quote(c) => match self.cursor.parse_string() {
                Some(_) => ParseOutcome::Skip,
                None => ParseOutcome::Error,
            },
            _ => ParseOutcome::Error,
        }
    }

    /// `$name` followed by `.field` and `[index]` accessors.
    ///
    /// Running out of input inside the chain is a completion point; a chain
    /// that ends on a closed `]` or is followed by whitespace is skipped.
    pub fn parse_variable(&mut self, depth: usize) -> ParseOutcome {
        if depth > MAX_NESTING || !self.cursor.expect(is_sigil) {
            return ParseOutcome::Error;
        }
        if self.cursor.ends_after(1) {
            return ParseOutcome::completion(ContextKind::Variable, None, None);
        }
        if self.cursor.parse_token(&VARIABLE_HEAD).is_none() {
            return ParseOutcome::Error;
        }

        let mut closed = false;
        loop {
            let Some(c) = self.cursor.peek() else {
                if closed && depth == 0 {
                    return ParseOutcome::Skip;
                }
                return ParseOutcome::completion(ContextKind::Variable, None, None);
            };
            match c {
                '.' => {
                    self.cursor.bump();
                    if self.cursor.eof() || (self.cursor.ends_after(1) && self.cursor.expect(is_sigil)) {
                        return ParseOutcome::completion(ContextKind::Variable, None, None);
                    }
                    if self.cursor.parse_token(&IDENTIFIER).is_none() {
                        return ParseOutcome::Error;
                    }
                    closed = false;
                }
                '[' => {
                    self.cursor.bump();
                    let Some(next) = self.cursor.peek() else {
                        return ParseOutcome::completion(ContextKind::Variable, None, None);
                    };
                    if is_sigil(next) {
                        match self.parse_variable(depth + 1) {
                            ParseOutcome::Skip => {}
                            other => return other,
                        }
                    } else if next.is_ascii_digit() || next == '-' {
                        if self.cursor.parse_token(&NUMBER).is_none() {
                            return ParseOutcome::Error;
                        }
                    } else if is_quote(next) {
                        if self.cursor.parse_string().is_none() {
                            return ParseOutcome::Error;
                        }
                    } else {
                        return ParseOutcome::Error;
                    }
                    match self.cursor.peek() {
                        None => return ParseOutcome::completion(ContextKind::Variable, None, None),
                        Some(']') => {
                            self.cursor.bump();
                            closed = true;
                        }
                        Some(_) => return ParseOutcome::Error,
                    }
                }
                ']' if depth > 0 => return ParseOutcome::Skip,
                c if c.is_whitespace() && depth == 0 => return ParseOutcome::Skip,
                _ => return ParseOutcome::Error,
            }
        }
    }
}

/// Attach the enclosing tag/attribute to a completion found deeper down.
fn bind(outcome: ParseOutcome, tag_name: Option<&str>, attribute_name: Option<&str>) -> ParseOutcome {
    match outcome {
        ParseOutcome::Completion(mut ctx) => {
            if ctx.tag_name.is_none() {
                ctx.tag_name = tag_name.map(str::to_string);
            }
            if ctx.attribute_name.is_none() {
                ctx.attribute_name = attribute_name.map(str::to_string);
            }
            ParseOutcome::Completion(ctx)
        }
        other => other,
    }
}
