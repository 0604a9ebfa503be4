use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use markdoc_ls_core::markup;
use markdoc_ls_core::schema::{CommandCompiler, SchemaRegistry};
use ropey::Rope;
use tower_lsp::lsp_types::Url;
use tower_lsp::Client;
use tracing::warn;

use crate::analyzer::MarkdocAnalyzer;

use super::config::ServerConfig;

/// An open Markdoc document and its cached scan.
#[derive(Debug, Default)]
pub(crate) struct Document {
    pub(crate) content: Rope,
    pub(crate) version: i32,
    pub(crate) parsed: Option<Arc<markup::Document>>,
    pub(crate) content_hash: Option<u64>,
}

impl Document {
    pub(crate) fn new(text: &str, version: i32) -> Self {
        let content = Rope::from_str(text);
        Self {
            content_hash: Some(super::text::content_hash(&content)),
            content,
            version,
            parsed: None,
        }
    }

    /// Scanned form of the current content, computed once per edit.
    pub(crate) fn parsed(&mut self) -> Arc<markup::Document> {
        if let Some(parsed) = &self.parsed {
            return parsed.clone();
        }
        let parsed = Arc::new(markup::Document::parse(&self.content.to_string()));
        self.parsed = Some(parsed.clone());
        parsed
    }

    pub(crate) fn invalidate(&mut self) {
        self.parsed = None;
        self.content_hash = Some(super::text::content_hash(&self.content));
    }
}

/// Primary LSP server state shared across handlers.
pub(crate) struct MarkdocLanguageServer {
    pub(crate) client: Client,
    pub(crate) documents: Arc<DashMap<Url, Document>>,
    pub(crate) registry: Mutex<Arc<SchemaRegistry>>,
    pub(crate) workspace_root: Mutex<Option<PathBuf>>,
    pub(crate) ready: Arc<AtomicBool>,
    pub(crate) config: Mutex<ServerConfig>,
}

impl MarkdocLanguageServer {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(DashMap::new()),
            registry: Mutex::new(Arc::new(SchemaRegistry::new(None, Arc::new(CommandCompiler::default())))),
            workspace_root: Mutex::new(None),
            ready: Arc::new(AtomicBool::new(false)),
            config: Mutex::new(ServerConfig::default()),
        }
    }

    pub(crate) fn registry(&self) -> Arc<SchemaRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn config(&self) -> ServerConfig {
        self.config.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Analyzer over the last committed schema snapshot.
    pub(crate) fn analyzer(&self) -> MarkdocAnalyzer {
        MarkdocAnalyzer::new(self.registry().snapshot())
    }

    /// Fresh registry for the workspace root and the configured compiler.
    /// It serves the built-in catalogue until loaded.
    pub(crate) fn build_registry(&self) -> Arc<SchemaRegistry> {
        let root = self.workspace_root.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let compiler = match self.config().compiler {
            Some(argv) => CommandCompiler::new(argv).unwrap_or_else(|e| {
                warn!("invalid schema compiler ({}), falling back to node", e);
                CommandCompiler::default()
            }),
            None => CommandCompiler::default(),
        };
        Arc::new(SchemaRegistry::new(root, Arc::new(compiler)))
    }

    pub(crate) fn set_registry(&self, registry: Arc<SchemaRegistry>) {
        *self.registry.lock().unwrap_or_else(PoisonError::into_inner) = registry;
    }
}
