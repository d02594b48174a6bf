//! Loaded tool script and its symbol table

use std::fs;
use std::path::{Path, PathBuf};

use serde_yaml::{Mapping, Value};

use crate::error::BoxError;

/// Key whose mapping value names a file to inline, e.g. `prompt: { file: prompt.md }`
pub const INCLUDE_KEYS: &[&str] = &["prompt"];

/// A parsed tool script
#[derive(Debug, Clone)]
pub struct LoadedModule {
    path: PathBuf,
    symbols: Mapping,
}

impl LoadedModule {
    /// Read and parse a script, resolving file includes relative to its directory
    pub(crate) fn read(path: &Path) -> Result<Self, BoxError> {
        let content = fs::read_to_string(path)?;
        let mut document: Value = serde_yaml::from_str(&content)?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        resolve_includes(&mut document, base)?;

        let symbols = match document {
            // An empty document defines nothing
            Value::Null => Mapping::new(),
            Value::Mapping(symbols) => symbols,
            other => {
                return Err(format!(
                    "top level of a tool script must be a mapping, found {}",
                    kind_of(&other)
                )
                .into());
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            symbols,
        })
    }

    /// Absolute path the script was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up a top-level symbol
    pub fn get(&self, symbol: &str) -> Option<&Value> {
        self.symbols.get(symbol)
    }
}

/// Replace `{ file: path }` values under include keys with the file contents
fn resolve_includes(value: &mut Value, base: &Path) -> Result<(), BoxError> {
    match value {
        Value::Mapping(mapping) => {
            for (key, child) in mapping.iter_mut() {
                let is_include_key = key.as_str().is_some_and(|k| INCLUDE_KEYS.contains(&k));
                if is_include_key && let Some(file) = include_target(child) {
                    let path = base.join(file);
                    let content = fs::read_to_string(&path)
                        .map_err(|e| format!("failed to read included file {}: {}", path.display(), e))?;
                    *child = Value::String(content);
                } else {
                    resolve_includes(child, base)?;
                }
            }
        }
        Value::Sequence(items) => {
            for item in items {
                resolve_includes(item, base)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn include_target(value: &Value) -> Option<&str> {
    match value {
        Value::Mapping(mapping) if mapping.len() == 1 => mapping.get("file").and_then(Value::as_str),
        _ => None,
    }
}

/// Human name for a YAML value kind
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
