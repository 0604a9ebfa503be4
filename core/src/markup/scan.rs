use crate::context::{TAG_CLOSE, TAG_OPEN};

use super::{tag, Node, Span, SyntaxError};

/// Split `source` into text, tag and error nodes.
pub(super) fn scan(source: &str) -> Vec<Node> {
    let mut nodes = Vec::new();
    let mut pos = 0;

    while let Some(rel) = source[pos..].find(TAG_OPEN) {
        let start = pos + rel;
        if start > pos {
            nodes.push(Node::Text(Span::new(pos, start)));
        }

        match find_tag_end(source, start) {
            Some(end) => {
                let inner_start = start + TAG_OPEN.len();
                let inner_end = end - TAG_CLOSE.len();
                let span = Span::new(start, end);
                match tag::parse_tag(&source[inner_start..inner_end], inner_start, span) {
                    Ok(tag) => nodes.push(Node::Tag(tag)),
                    Err(mut err) => {
                        err.span = span;
                        nodes.push(Node::Error(err));
                    }
                }
                pos = end;
            }
            None => {
                let rest = &source[start + TAG_OPEN.len()..];
                let end = [rest.find('\n'), rest.find(TAG_OPEN)]
                    .into_iter()
                    .flatten()
                    .min()
                    .map_or(source.len(), |i| start + TAG_OPEN.len() + i);
                nodes.push(Node::Error(SyntaxError::new(
                    "Expected closing tag delimiter `%}`",
                    Span::new(start, end),
                )));
                pos = end;
            }
        }
    }

    if pos < source.len() {
        nodes.push(Node::Text(Span::new(pos, source.len())));
    }
    nodes
}

/// Byte offset just past the `%}` closing the tag opened at `start`.
/// Quoted strings are skipped; another `{%` first means the tag is unclosed.
fn find_tag_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut i = start + TAG_OPEN.len();
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == b'\\' && bytes.get(i + 1) == Some(&q) {
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match b {
            b'"' | b'\'' => quote = Some(b),
            b'%' if bytes.get(i + 1) == Some(&b'}') => return Some(i + 2),
            b'{' if bytes.get(i + 1) == Some(&b'%') => return None,
            _ => {}
        }
        i += 1;
    }
    None
}
