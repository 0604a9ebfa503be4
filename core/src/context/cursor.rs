use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) static TAG_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\{%\s*").unwrap());
pub(crate) static IDENTIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z][-\w]*").unwrap());
pub(crate) static VARIABLE_HEAD: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[$@][a-zA-Z][-\w]*").unwrap());
pub(crate) static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?").unwrap());
pub(crate) static SHORTHAND: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[.#][a-zA-Z][-\w]*").unwrap());

#[inline]
pub(crate) fn is_sigil(c: char) -> bool {
    c == '$' || c == '@'
}

#[inline]
pub(crate) fn is_quote(c: char) -> bool {
    c == '"' || c == '\''
}

#[inline]
pub(crate) fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

/// Forward-only scanner over a tag fragment.
///
/// Every multi-character `parse_*` helper either consumes a complete unit and
/// returns it, or leaves the position untouched and returns `None`.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// Rewind to a position previously returned by [`Cursor::position`].
    pub fn reset(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// True when exactly `n` characters remain.
    pub fn ends_after(&self, n: usize) -> bool {
        !self.eof() && self.rest().chars().count() == n
    }

    pub fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    pub fn expect(&self, pred: impl Fn(char) -> bool) -> bool {
        self.peek().is_some_and(pred)
    }

    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    pub fn consume_whitespace(&mut self) {
        while self.expect(char::is_whitespace) {
            self.bump();
        }
    }

    /// Consume an anchored regex match at the current position.
    pub fn parse_token(&mut self, re: &Regex) -> Option<&'a str> {
        let rest = self.rest();
        let m = re.find(rest)?;
        if m.start() != 0 || m.is_empty() {
            return None;
        }
        self.pos += m.end();
        Some(&rest[..m.end()])
    }

    /// Consume a literal keyword only when it is not the prefix of a longer word.
    pub fn parse_keyword(&mut self, word: &str) -> Option<&'a str> {
        let rest = self.rest();
        if !rest.starts_with(word) {
            return None;
        }
        if rest[word.len()..].chars().next().is_some_and(is_ident_continue) {
            return None;
        }
        self.pos += word.len();
        Some(&rest[..word.len()])
    }

    /// Consume a quoted string; a backslash escapes only the matching quote.
    /// Returns the string body without the surrounding quotes.
    pub fn parse_string(&mut self) -> Option<&'a str> {
        let quote = self.peek().filter(|c| is_quote(*c))?;
        let start = self.pos;
        self.bump();
        let body_start = self.pos;
        while let Some(c) = self.peek() {
            if c == '\\' && self.peek_nth(1) == Some(quote) {
                self.bump();
                self.bump();
                continue;
            }
            if c == quote {
                let body = &self.text[body_start..self.pos];
                self.bump();
                return Some(body);
            }
            self.bump();
        }
        self.pos = start;
        None
    }

    /// Consume a balanced `open`..`close` region, counting depth.
    /// Quoted strings inside the region are skipped as opaque units.
    pub fn parse_pair(&mut self, open: char, close: char) -> Option<&'a str> {
        if self.peek() != Some(open) {
            return None;
        }
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(c) = self.peek() {
            if is_quote(c) {
                if self.parse_string().is_none() {
                    break;
                }
                continue;
            }
            if c == open {
                depth += 1;
            } else if c == close {
                depth -= 1;
                if depth == 0 {
                    self.bump();
                    return Some(&self.text[start..self.pos]);
                }
            }
            self.bump();
        }
        self.pos = start;
        None
    }
}
