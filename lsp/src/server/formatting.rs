use markdoc_ls_core::markup::{self, FormatError};
use ropey::Rope;
use tower_lsp::lsp_types::{Position, Range, TextEdit};

use super::text::{line_end, position_to_char};

/// Edits that turn the whole document into its canonical form.
pub(crate) fn full_document_edits(text: &Rope) -> Result<Vec<TextEdit>, FormatError> {
    let source = text.to_string();
    let formatted = markup::format(&markup::Document::parse(&source))?;
    if formatted == source {
        return Ok(Vec::new());
    }
    let last_line = text.len_lines().saturating_sub(1);
    Ok(vec![TextEdit {
        range: Range::new(Position::new(0, 0), line_end(text, last_line)),
        new_text: formatted,
    }])
}

/// Edits for `range`, widened to whole lines. Text outside those lines is
/// never parsed, so a broken tag elsewhere does not block formatting.
pub(crate) fn range_edits(text: &Rope, range: Range) -> Result<Vec<TextEdit>, FormatError> {
    let (first, last) = if range.start.line <= range.end.line {
        (range.start.line, range.end.line)
    } else {
        (range.end.line, range.start.line)
    };
    let start = Position::new(first, 0);
    let end = line_end(text, last as usize);

    let slice = text.slice(position_to_char(text, start)..position_to_char(text, end)).to_string();
    let formatted = markup::format(&markup::Document::parse(&slice))?;
    if formatted == slice {
        return Ok(Vec::new());
    }
    Ok(vec![TextEdit {
        range: Range::new(start, end),
        new_text: formatted,
    }])
}
