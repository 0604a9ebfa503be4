use std::path::PathBuf;
use std::sync::PoisonError;

use markdoc_ls_core::schema::SchemaRegistry;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::LanguageServer;
use tracing::{debug, info, warn};

use super::{
    formatting::{full_document_edits, range_edits},
    state::{Document, MarkdocLanguageServer},
    text::{apply_change, position_to_offset},
};

const OPEN_DELAY_MS: u64 = 150;
const CHANGE_DELAY_MS: u64 = 250;
const SCHEMA_WATCHERS: [&str; 2] = ["**/markdoc/**", "**/markdoc.config.*"];

fn empty_hover() -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: String::new(),
        }),
        range: None,
    }
}

/// First event that should rebuild the schema. Deletions only count for
/// files that fed the current snapshot.
fn changed_schema_path(registry: &SchemaRegistry, changes: &[FileEvent]) -> Option<PathBuf> {
    let snapshot = registry.snapshot();
    changes.iter().find_map(|event| {
        let path = event.uri.to_file_path().ok()?;
        let relevant = if event.typ == FileChangeType::DELETED {
            snapshot.sources.iter().any(|source| source == &path)
        } else if event.typ == FileChangeType::CHANGED || event.typ == FileChangeType::CREATED {
            registry.is_schema_path(&path)
        } else {
            false
        };
        relevant.then_some(path)
    })
}

#[allow(deprecated)]
fn workspace_root(params: &InitializeParams) -> Option<PathBuf> {
    let uri = params
        .workspace_folders
        .as_ref()
        .and_then(|folders| folders.first())
        .map(|folder| folder.uri.clone())
        .or_else(|| params.root_uri.clone())?;
    uri.to_file_path().ok()
}

#[tower_lsp::async_trait]
impl LanguageServer for MarkdocLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = workspace_root(&params);
        info!("Markdoc Language Server initializing for {:?}", root);
        *self.workspace_root.lock().unwrap_or_else(PoisonError::into_inner) = root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(TextDocumentSyncOptions {
                    open_close: Some(true),
                    change: Some(TextDocumentSyncKind::INCREMENTAL),
                    save: Some(TextDocumentSyncSaveOptions::SaveOptions(SaveOptions {
                        include_text: Some(true),
                    })),
                    ..Default::default()
                })),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(true),
                    trigger_characters: Some(
                        ["{", " ", "=", "$", "@", "("].iter().map(|c| c.to_string()).collect(),
                    ),
                    work_done_progress_options: Default::default(),
                    all_commit_characters: None,
                    completion_item: None,
                }),
                document_formatting_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "Markdoc Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        info!("Markdoc Language Server initialized");
        self.client
            .log_message(MessageType::INFO, "Markdoc Language Server started")
            .await;
        self.load_config().await;
        self.register_schema_watchers().await;

        self.set_registry(self.build_registry());
        self.spawn_initial_load();
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Markdoc Language Server shutting down");
        Ok(())
    }

    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        let compiler_changed = self.load_config().await;
        if !self.config().diagnostics_enabled {
            let open: Vec<Url> = self.documents.iter().map(|entry| entry.key().clone()).collect();
            for uri in open {
                self.clear_diagnostics(uri).await;
            }
            return;
        }
        if compiler_changed {
            info!("Schema compiler changed, rebuilding schema");
            let registry = self.build_registry();
            registry.load().await;
            self.set_registry(registry);
        }
        self.refresh_all_diagnostics().await;
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        self.documents
            .insert(uri.clone(), Document::new(&params.text_document.text, version));
        self.schedule_diagnostics(uri, version, OPEN_DELAY_MS).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        {
            let mut entry = self.documents.entry(uri.clone()).or_default();
            entry.version = version;
            for change in &params.content_changes {
                apply_change(&mut entry.content, change);
            }
            entry.invalidate();
        }
        self.schedule_diagnostics(uri, version, CHANGE_DELAY_MS).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let Some(text) = params.text else {
            return;
        };
        let version = {
            let Some(mut doc) = self.documents.get_mut(&uri) else {
                return;
            };
            let fresh = Document::new(&text, doc.version);
            if fresh.content_hash == doc.content_hash {
                debug!("{} saved without changes", uri);
                return;
            }
            *doc = fresh;
            doc.version
        };
        self.schedule_diagnostics(uri, version, 0).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        self.documents.remove(&uri);
        self.clear_diagnostics(uri).await;
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = &params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some((content, offset)) = self.documents.get(uri).map(|doc| {
            let offset = position_to_offset(&doc.content, position);
            (doc.content.to_string(), offset)
        }) else {
            return Ok(Some(CompletionResponse::Array(Vec::new())));
        };

        let items = self.ready_analyzer().await.completions(&content, offset);
        debug!("{} completion candidates at {:?}", items.len(), position);
        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        Ok(self.ready_analyzer().await.resolve(item))
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = &params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some((parsed, offset)) = self.documents.get_mut(uri).map(|mut doc| {
            let offset = position_to_offset(&doc.content, position);
            (doc.parsed(), offset)
        }) else {
            return Ok(Some(empty_hover()));
        };

        let hover = self.ready_analyzer().await.hover(&parsed, offset);
        Ok(Some(hover.unwrap_or_else(empty_hover)))
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let Some(text) = self.documents.get(&params.text_document.uri).map(|doc| doc.content.clone()) else {
            return Ok(None);
        };
        match full_document_edits(&text) {
            Ok(edits) => Ok(Some(edits)),
            Err(e) => {
                self.client.show_message(MessageType::ERROR, e.to_string()).await;
                Ok(None)
            }
        }
    }

    async fn range_formatting(&self, params: DocumentRangeFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let Some(text) = self.documents.get(&params.text_document.uri).map(|doc| doc.content.clone()) else {
            return Ok(None);
        };
        match range_edits(&text, params.range) {
            Ok(edits) => Ok(Some(edits)),
            Err(e) => {
                self.client.show_message(MessageType::ERROR, e.to_string()).await;
                Ok(None)
            }
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let registry = self.registry();
        let Some(path) = changed_schema_path(&registry, &params.changes) else {
            return;
        };

        if registry.reload(&path).await.is_some() {
            self.client
                .log_message(MessageType::INFO, format!("Reloaded Markdoc schema after {}", path.display()))
                .await;
            self.refresh_all_diagnostics().await;
        }
    }
}

impl MarkdocLanguageServer {
    async fn register_schema_watchers(&self) {
        let watchers = SCHEMA_WATCHERS
            .iter()
            .map(|pattern| FileSystemWatcher {
                glob_pattern: GlobPattern::String(pattern.to_string()),
                kind: None,
            })
            .collect();
        let options = match serde_json::to_value(DidChangeWatchedFilesRegistrationOptions { watchers }) {
            Ok(options) => options,
            Err(e) => {
                warn!("cannot encode file watcher options: {}", e);
                return;
            }
        };
        let registration = Registration {
            id: "markdoc-schema-watcher".to_string(),
            method: "workspace/didChangeWatchedFiles".to_string(),
            register_options: Some(options),
        };
        if let Err(e) = self.client.register_capability(vec![registration]).await {
            warn!("client refused schema file watchers: {}", e);
        }
    }
}
