use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde_json::Value;
use tracing::debug;

/// Turns a schema module on disk into plain data.
pub trait ModuleCompiler: Send + Sync {
    /// Compile the module at `path`, resolving its imports from `parent`.
    fn compile(&self, path: &Path, parent: &Path) -> Result<Value, CompileError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{program}` failed for {}: {stderr}", path.display())]
    Failed {
        program: String,
        path: PathBuf,
        stderr: String,
    },
    #[error("{} did not produce JSON: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{} exported {found}, expected an object", path.display())]
    NotAnObject { path: PathBuf, found: &'static str },
    #[error("empty compiler command")]
    EmptyCommand,
}

/// Imports the module given as the last argument and prints its default
/// export as JSON. Functions become their name and regexes their source.
pub const LOADER_SCRIPT: &str = r#"
const { pathToFileURL } = await import('node:url');
const target = process.argv[process.argv.length - 1];
const mod = await import(pathToFileURL(target).href);
const plain = (value, ancestors) => {
  if (typeof value === 'function') return value.name || null;
  if (value instanceof RegExp) return value.source;
  if (value === undefined) return null;
  if (value === null || typeof value !== 'object') return value;
  if (ancestors.includes(value)) return null;
  const next = [...ancestors, value];
  if (Array.isArray(value)) return value.map((v) => plain(v, next));
  const out = {};
  for (const [key, v] of Object.entries(value)) out[key] = plain(v, next);
  return out;
};
process.stdout.write(JSON.stringify(plain(mod.default ?? mod, []) ?? {}));
"#;

/// Runs an external command per module and parses its stdout as JSON.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    /// `argv` is the command prefix; the module path is appended as the last argument.
    pub fn new(argv: Vec<String>) -> Result<Self, CompileError> {
        let mut iter = argv.into_iter();
        let program = iter.next().ok_or(CompileError::EmptyCommand)?;
        Ok(Self {
            program,
            args: iter.collect(),
        })
    }

    pub fn node() -> Self {
        Self {
            program: "node".to_string(),
            args: vec!["--input-type=module".to_string(), "-e".to_string(), LOADER_SCRIPT.to_string()],
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl Default for CommandCompiler {
    fn default() -> Self {
        Self::node()
    }
}

impl ModuleCompiler for CommandCompiler {
    fn compile(&self, path: &Path, parent: &Path) -> Result<Value, CompileError> {
        debug!("compiling {} with {}", path.display(), self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(path)
            .current_dir(parent)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(CompileError::Failed {
                program: self.program.clone(),
                path: path.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let value: Value = serde_json::from_slice(&output.stdout).map_err(|source| CompileError::Output {
            path: path.to_path_buf(),
            source,
        })?;
        match value {
            Value::Object(_) => Ok(value),
            other => Err(CompileError::NotAnObject {
                path: path.to_path_buf(),
                found: json_kind(&other),
            }),
        }
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
