use anyhow::Context;
use std::path::{Component, Path};
use std::sync::Arc;

use markdoc_ls_core::schema::{CommandCompiler, SchemaRegistry, SchemaSnapshot};
use tower_lsp::lsp_types::DiagnosticSeverity;

use crate::analyzer::MarkdocAnalyzer;

const USAGE: &str = "Usage: markdoc-ls --analyze [--errors-only] <relative-file-path>\n       markdoc-ls --schema\n  --analyze <file>     : Validate a file against the schema of the current directory (JSON output)\n  --errors-only        : Show only errors in simple format\n  --schema             : Print the merged schema as JSON";

/// Handle one-shot command line modes. `Ok(None)` means run the server.
pub(crate) fn try_cli() -> anyhow::Result<Option<String>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() <= 1 {
        return Ok(None);
    }

    if args.iter().any(|a| a == "--schema") {
        let schema = load_schema()?;
        return Ok(Some(serde_json::to_string_pretty(schema.as_ref())?));
    }

    if let Some(i) = args.iter().position(|a| a == "--analyze") {
        let mut path_index = i + 1;
        while path_index < args.len() && args[path_index].starts_with("--") {
            path_index += 1;
        }
        let path = args.get(path_index).cloned().ok_or_else(|| anyhow::anyhow!(USAGE))?;
        let errors_only = args.iter().any(|a| a == "--errors-only");
        let content = read_file_content(&path)?;

        let analyzer = MarkdocAnalyzer::new(load_schema()?);
        return Ok(Some(render_analysis(&analyzer, &content, errors_only)?));
    }

    Ok(None)
}

fn load_schema() -> anyhow::Result<Arc<SchemaSnapshot>> {
    let root = std::env::current_dir().context("Failed to resolve current directory")?;
    let registry = SchemaRegistry::new(Some(root), Arc::new(CommandCompiler::default()));
    Ok(registry.load_blocking().unwrap_or_else(|| registry.snapshot()))
}

pub(crate) fn render_analysis(analyzer: &MarkdocAnalyzer, content: &str, errors_only: bool) -> anyhow::Result<String> {
    let analysis = analyzer.analyze(content);

    if !errors_only {
        let output = serde_json::json!({ "diagnostics": analysis.diagnostics });
        return Ok(serde_json::to_string_pretty(&output)?);
    }

    let errors: Vec<String> = analysis
        .diagnostics
        .iter()
        .filter(|d| d.severity == Some(DiagnosticSeverity::ERROR))
        .map(|d| {
            format!(
                "Line {}:{}: {}",
                d.range.start.line + 1,
                d.range.start.character + 1,
                d.message
            )
        })
        .collect();

    if errors.is_empty() {
        Ok("No errors found".to_string())
    } else {
        Ok(errors.join("\n"))
    }
}

pub(crate) fn is_safe_path(path: &str) -> bool {
    let path = Path::new(path);

    if path.as_os_str().is_empty() || path.is_absolute() {
        return false;
    }
    if path.components().any(|c| c == Component::ParentDir) {
        return false;
    }

    let s = path.to_string_lossy();
    if s.chars().any(|c| matches!(c, '\0' | '\n' | '\r' | '\t')) {
        return false;
    }
    // Windows drive prefixes such as `C:`.
    !(s.len() >= 2 && s.as_bytes()[1] == b':')
}

pub(crate) fn read_file_content(path: &str) -> anyhow::Result<String> {
    if !is_safe_path(path) {
        return Err(anyhow::anyhow!("Unsafe file path: {}", path));
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file '{}'", path))
}
