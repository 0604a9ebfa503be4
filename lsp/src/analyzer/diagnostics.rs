use markdoc_ls_core::markup::{Document, Level, Location, ValidationMessage};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

pub const DIAGNOSTIC_SOURCE: &str = "markdoc";

pub fn severity(level: Level) -> DiagnosticSeverity {
    match level {
        Level::Critical | Level::Error => DiagnosticSeverity::ERROR,
        Level::Warning => DiagnosticSeverity::WARNING,
        Level::Info | Level::Debug => DiagnosticSeverity::INFORMATION,
    }
}

pub fn to_range(location: Location) -> Range {
    Range::new(
        Position::new(location.start.line, location.start.character),
        Position::new(location.end.line, location.end.character),
    )
}

/// A byte range wins over a line location; a message with neither is dropped.
pub fn to_diagnostic(document: &Document, message: &ValidationMessage) -> Option<Diagnostic> {
    let location = match (message.range, message.location) {
        (Some(span), _) => document.location(span),
        (None, Some(location)) => location,
        (None, None) => return None,
    };
    Some(Diagnostic {
        range: to_range(location),
        severity: Some(severity(message.level)),
        code: Some(NumberOrString::String(message.id.clone())),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: message.message.clone(),
        ..Default::default()
    })
}

pub fn to_diagnostics(document: &Document, messages: &[ValidationMessage]) -> Vec<Diagnostic> {
    messages.iter().filter_map(|m| to_diagnostic(document, m)).collect()
}
