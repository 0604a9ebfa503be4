use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde_json::{Map, Value};
use tracing::{debug, error, info, warn};

use super::compile::{json_kind, ModuleCompiler};
use super::layout::{self, ModuleKind};
use super::merge::{deep_merge, merge_config};
use super::{builtins, SchemaSnapshot};

/// Owns the current schema snapshot of one workspace root.
///
/// Readers take an `Arc` of the snapshot and never observe a partially
/// merged schema; reloads build a fresh snapshot and swap it in whole.
pub struct SchemaRegistry {
    root: Option<PathBuf>,
    compiler: Arc<dyn ModuleCompiler>,
    current: ArcSwap<SchemaSnapshot>,
    /// Ticket of the most recently requested build.
    requested: AtomicU64,
    commit: Mutex<()>,
}

impl SchemaRegistry {
    /// A registry serving the built-in catalogue until the first load.
    pub fn new(root: Option<PathBuf>, compiler: Arc<dyn ModuleCompiler>) -> Self {
        Self {
            root,
            compiler,
            current: ArcSwap::from_pointee(SchemaSnapshot::builtin()),
            requested: AtomicU64::new(0),
            commit: Mutex::new(()),
        }
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn snapshot(&self) -> Arc<SchemaSnapshot> {
        self.current.load_full()
    }

    pub fn generation(&self) -> u64 {
        self.current.load().generation
    }

    /// Build and commit a snapshot on the calling thread.
    ///
    /// Returns `None` when a later build was requested before this one finished.
    pub fn load_blocking(&self) -> Option<Arc<SchemaSnapshot>> {
        let ticket = self.next_ticket();
        let snapshot = build_snapshot(self.root.as_deref(), self.compiler.as_ref());
        self.commit(ticket, snapshot)
    }

    /// Build on the blocking pool and commit the result.
    pub async fn load(self: &Arc<Self>) -> Option<Arc<SchemaSnapshot>> {
        let ticket = self.next_ticket();
        let this = Arc::clone(self);
        let built =
            tokio::task::spawn_blocking(move || build_snapshot(this.root.as_deref(), this.compiler.as_ref())).await;
        match built {
            Ok(snapshot) => self.commit(ticket, snapshot),
            Err(e) => {
                error!("schema build task failed: {}", e);
                None
            }
        }
    }

    /// Whether a change to `path` should trigger a reload.
    pub fn is_schema_path(&self, path: &Path) -> bool {
        if self.current.load().sources.iter().any(|p| p == path) {
            return true;
        }
        self.root.as_deref().is_some_and(|root| layout::is_candidate(root, path))
    }

    /// Reload when `path` belongs to the schema; returns the committed snapshot.
    pub async fn reload(self: &Arc<Self>, path: &Path) -> Option<Arc<SchemaSnapshot>> {
        if !self.is_schema_path(path) {
            return None;
        }
        info!("Detected change in {}. Reloading config.", path.display());
        let snapshot = self.load().await;
        if let Some(s) = &snapshot {
            info!("Reloaded config (generation {})", s.generation);
        }
        snapshot
    }

    fn next_ticket(&self) -> u64 {
        self.requested.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn commit(&self, ticket: u64, mut snapshot: SchemaSnapshot) -> Option<Arc<SchemaSnapshot>> {
        let _guard = self.commit.lock().unwrap_or_else(PoisonError::into_inner);
        if self.requested.load(Ordering::SeqCst) != ticket {
            debug!("discarding superseded schema build #{}", ticket);
            return None;
        }
        snapshot.generation = self.current.load().generation + 1;
        let snapshot = Arc::new(snapshot);
        self.current.store(Arc::clone(&snapshot));
        Some(snapshot)
    }
}

/// Merge the built-in catalogue with every schema module found under `root`.
/// Returns the merged plain data and the files that contributed to it.
pub fn build_value(root: Option<&Path>, compiler: &dyn ModuleCompiler) -> (Value, Vec<PathBuf>) {
    let mut result = builtins::catalogue();
    let Some(root) = root else {
        return (result, Vec::new());
    };

    let layout = layout::detect(root);
    let mut sources = Vec::new();
    for module in layout.modules() {
        let compiled = match compiler.compile(&module.path, &module.parent) {
            Ok(Value::Object(map)) => Value::Object(map),
            Ok(other) => {
                warn!("{} exported {}, ignoring it", module.path.display(), json_kind(&other));
                Value::Object(Map::new())
            }
            Err(e) => {
                warn!("failed to load {}: {}", module.path.display(), e);
                Value::Object(Map::new())
            }
        };
        sources.push(module.path.clone());

        match module.kind {
            ModuleKind::Tags => merge_section(&mut result, "tags", compiled),
            ModuleKind::Nodes => merge_section(&mut result, "nodes", compiled),
            ModuleKind::Functions => merge_section(&mut result, "functions", compiled),
            ModuleKind::Variables => replace_section(&mut result, "variables", compiled),
            ModuleKind::Partials => replace_section(&mut result, "partials", compiled),
            ModuleKind::Config | ModuleKind::Root => merge_config(&mut result, compiled),
        }
    }
    (result, sources)
}

pub(crate) fn build_snapshot(root: Option<&Path>, compiler: &dyn ModuleCompiler) -> SchemaSnapshot {
    let (value, sources) = build_value(root, compiler);
    SchemaSnapshot::from_value(&value, sources)
}

fn merge_section(result: &mut Value, key: &str, overlay: Value) {
    if let Some(map) = result.as_object_mut() {
        let section = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
        deep_merge(section, overlay);
    }
}

fn replace_section(result: &mut Value, key: &str, value: Value) {
    if let Some(map) = result.as_object_mut() {
        map.insert(key.to_string(), value);
    }
}
