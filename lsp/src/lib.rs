//! Markdoc language server: completion, hover, diagnostics and formatting
//! for `{% tag %}` documents.

pub mod analyzer;
pub mod server;
