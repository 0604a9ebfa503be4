use std::sync::Arc;

use markdoc_ls_core::context;
use markdoc_ls_core::markup::{self, Document};
use markdoc_ls_core::schema::SchemaSnapshot;
use tower_lsp::lsp_types::{CompletionItem, Diagnostic, Hover};

mod completions;
mod diagnostics;
mod documentation;
mod hover;
#[cfg(test)]
mod tests;

pub use completions::{complete, resolve, CompletionData, CompletionType};
pub use diagnostics::{severity, to_diagnostic, to_diagnostics, to_range, DIAGNOSTIC_SOURCE};
pub use documentation::{attribute_insert_text, disjunction, render_content};
pub use hover::hover;

// Keep the editor responsive on documents with many broken tags.
const MAX_DIAGNOSTICS: usize = 200;

/// Scanned document plus its diagnostics.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub document: Arc<Document>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Markdoc analyzer bound to one schema snapshot.
#[derive(Debug, Clone)]
pub struct MarkdocAnalyzer {
    schema: Arc<SchemaSnapshot>,
}

impl MarkdocAnalyzer {
    pub fn new(schema: Arc<SchemaSnapshot>) -> Self {
        Self { schema }
    }

    /// Analyzer over the built-in catalogue alone.
    pub fn builtin() -> Self {
        Self::new(Arc::new(SchemaSnapshot::builtin()))
    }

    pub fn schema(&self) -> &SchemaSnapshot {
        &self.schema
    }

    pub fn analyze(&self, content: &str) -> AnalysisResult {
        self.analyze_document(Arc::new(Document::parse(content)))
    }

    pub fn analyze_document(&self, document: Arc<Document>) -> AnalysisResult {
        let messages = markup::validate(&document, &self.schema);
        let mut diagnostics = to_diagnostics(&document, &messages);
        diagnostics.truncate(MAX_DIAGNOSTICS);
        AnalysisResult { document, diagnostics }
    }

    /// Candidates at byte `offset`; empty when the cursor is not inside a
    /// classifiable tag.
    pub fn completions(&self, content: &str, offset: usize) -> Vec<CompletionItem> {
        match context::classify(content, offset) {
            Some(ctx) => complete(&self.schema, &ctx),
            None => Vec::new(),
        }
    }

    pub fn resolve(&self, item: CompletionItem) -> CompletionItem {
        resolve(&self.schema, item)
    }

    pub fn hover(&self, document: &Document, offset: usize) -> Option<Hover> {
        hover(&self.schema, document, offset)
    }
}
