use std::path::{Path, PathBuf};

use tracing::info;

/// Directory holding one module per schema section.
pub const SCHEMA_DIR: &str = "markdoc";
/// Single-file schema at the project root.
pub const ROOT_MODULE: &str = "markdoc.config";
/// Module extensions in resolution priority order.
pub const EXTENSIONS: [&str; 6] = ["cjs", "cts", "js", "mjs", "ts", "mts"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    Tags,
    Nodes,
    Functions,
    Variables,
    Partials,
    Config,
    Root,
}

/// Directory modules in the order they are merged; `config` comes last.
pub const MODULE_ORDER: [ModuleKind; 6] = [
    ModuleKind::Tags,
    ModuleKind::Nodes,
    ModuleKind::Functions,
    ModuleKind::Variables,
    ModuleKind::Partials,
    ModuleKind::Config,
];

impl ModuleKind {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Tags => "tags",
            Self::Nodes => "nodes",
            Self::Functions => "functions",
            Self::Variables => "variables",
            Self::Partials => "partials",
            Self::Config => "config",
            Self::Root => ROOT_MODULE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaModule {
    pub kind: ModuleKind,
    pub path: PathBuf,
    /// Working directory handed to the compiler.
    pub parent: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    Directory(Vec<SchemaModule>),
    Root(SchemaModule),
    Builtin,
}

impl Layout {
    pub fn modules(&self) -> &[SchemaModule] {
        match self {
            Self::Directory(modules) => modules,
            Self::Root(module) => std::slice::from_ref(module),
            Self::Builtin => &[],
        }
    }
}

/// Decide where the schema of `root` lives. A `markdoc/` directory wins over
/// the root module even when it contains nothing recognisable.
pub fn detect(root: &Path) -> Layout {
    let dir = root.join(SCHEMA_DIR);
    if dir.is_dir() {
        let modules: Vec<SchemaModule> = MODULE_ORDER
            .iter()
            .filter_map(|kind| {
                resolve_module(&dir, kind.file_stem(), true).map(|path| SchemaModule {
                    kind: *kind,
                    path,
                    parent: dir.clone(),
                })
            })
            .collect();
        if modules.is_empty() {
            info!("failed to detect Markdoc config at {}", dir.display());
            return Layout::Builtin;
        }
        info!("Markdoc config (directory) detected at {}", dir.display());
        return Layout::Directory(modules);
    }

    match resolve_module(root, ROOT_MODULE, false) {
        Some(path) => {
            info!("Markdoc config (root module) detected at {}", root.display());
            Layout::Root(SchemaModule {
                kind: ModuleKind::Root,
                path,
                parent: root.to_path_buf(),
            })
        }
        None => {
            info!("failed to detect Markdoc config at {}", root.display());
            Layout::Builtin
        }
    }
}

/// First existing `<dir>/<stem>.<ext>` or, when allowed, `<dir>/<stem>/index.<ext>`.
fn resolve_module(dir: &Path, stem: &str, allow_index: bool) -> Option<PathBuf> {
    for ext in EXTENSIONS {
        let file = dir.join(format!("{stem}.{ext}"));
        if file.is_file() {
            return Some(file);
        }
        if allow_index {
            let index = dir.join(stem).join(format!("index.{ext}"));
            if index.is_file() {
                return Some(index);
            }
        }
    }
    None
}

/// Whether `path` is a location a schema module for `root` could live at,
/// whether or not it exists yet.
pub(crate) fn is_candidate(root: &Path, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !EXTENSIONS.contains(&ext) {
        return false;
    }
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return false;
    };
    let Some(parent) = path.parent() else {
        return false;
    };

    let dir = root.join(SCHEMA_DIR);
    let is_module_stem = |s: &str| MODULE_ORDER.iter().any(|k| k.file_stem() == s);
    if parent == dir && is_module_stem(stem) {
        return true;
    }
    if stem == "index" && parent.parent() == Some(dir.as_path()) {
        return parent
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(is_module_stem);
    }
    parent == root && stem == ROOT_MODULE
}
