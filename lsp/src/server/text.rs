use std::hash::Hasher;

use ropey::Rope;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent};
use twox_hash::XxHash64;

/// Rope char index of an LSP position (UTF-16 column), clamped to the line.
pub(crate) fn position_to_char(text: &Rope, pos: Position) -> usize {
    let line = pos.line as usize;
    if line >= text.len_lines() {
        return text.len_chars();
    }
    let line_start = text.line_to_char(line);
    let mut remaining = pos.character as usize;
    let mut chars = 0usize;
    for ch in text.line(line).chars() {
        if ch == '\n' || ch == '\r' {
            break;
        }
        let width = ch.len_utf16();
        if width > remaining {
            break;
        }
        remaining -= width;
        chars += 1;
    }
    line_start + chars
}

/// Byte offset of an LSP position.
pub(crate) fn position_to_offset(text: &Rope, pos: Position) -> usize {
    text.char_to_byte(position_to_char(text, pos))
}

/// Position just before the line terminator of `line`.
pub(crate) fn line_end(text: &Rope, line: usize) -> Position {
    if line >= text.len_lines() {
        return line_end(text, text.len_lines().saturating_sub(1));
    }
    let width: usize = text
        .line(line)
        .chars()
        .take_while(|c| *c != '\n' && *c != '\r')
        .map(char::len_utf16)
        .sum();
    Position::new(line as u32, width as u32)
}

/// Apply one LSP content change, full or incremental.
pub(crate) fn apply_change(text: &mut Rope, change: &TextDocumentContentChangeEvent) {
    let Some(range) = &change.range else {
        *text = Rope::from_str(&change.text);
        return;
    };
    let a = position_to_char(text, range.start);
    let b = position_to_char(text, range.end);
    let (start, end) = (a.min(b), a.max(b));
    if start < end {
        text.remove(start..end);
    }
    if !change.text.is_empty() {
        text.insert(start, &change.text);
    }
}

pub(crate) fn content_hash(text: &Rope) -> u64 {
    let mut hasher = XxHash64::default();
    for chunk in text.chunks() {
        hasher.write(chunk.as_bytes());
    }
    hasher.finish()
}
