//! Tool Registry - discover tools in search directories
//!
//! Every `*.yml` / `*.yaml` file under a search directory is a candidate.
//! A candidate is registered only if it loads and its `tool` symbol is a
//! valid tool definition; anything else is skipped with a reason and a log
//! line. Enumeration loads scripts but never runs their steps.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::DirPrecedence;
use crate::loader::{LoadedModule, ModuleLoader, SCRIPT_EXTENSIONS};

use super::definition::{TOOL_SYMBOL, Tool, ToolLocation, ToolShapeError};

/// Why a candidate script was not registered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Reading or parsing the script failed
    LoadFailed,
    /// The script has no `tool` symbol
    MissingAttribute,
    /// `tool` is null
    Disabled,
    /// `tool` is not a valid tool definition
    WrongType,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            Self::LoadFailed => "load failed",
            Self::MissingAttribute => "missing attribute",
            Self::Disabled => "disabled",
            Self::WrongType => "wrong type",
        };
        write!(f, "{}", reason)
    }
}

/// A candidate left out of the registry
#[derive(Debug, Clone)]
pub struct Skipped {
    pub path: PathBuf,
    pub reason: SkipReason,
    pub detail: String,
}

impl Skipped {
    /// Diagnostic line, distinct per reason
    pub fn message(&self) -> String {
        let path = self.path.display();
        match self.reason {
            SkipReason::LoadFailed => format!("Failed to load tool script {}: {}", path, self.detail),
            SkipReason::MissingAttribute => {
                format!("Skipping {}: it does not define `{}`", path, TOOL_SYMBOL)
            }
            SkipReason::Disabled => format!("Skipping {}: `{}` is null, tool disabled", path, TOOL_SYMBOL),
            SkipReason::WrongType => format!(
                "Skipping {}: `{}` is not a valid tool definition: {}",
                path, TOOL_SYMBOL, self.detail
            ),
        }
    }

    fn log(&self) {
        match self.reason {
            SkipReason::Disabled => log::debug!("{}", self.message()),
            _ => log::warn!("{}", self.message()),
        }
    }
}

/// Sorted mapping of tool name to location
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolLocation>,
}

/// Result of scanning the search directories
#[derive(Debug, Clone, Default)]
pub struct Enumeration {
    pub registry: ToolRegistry,
    pub skipped: Vec<Skipped>,
}

impl ToolRegistry {
    /// Scan `dirs` in order, merging per `precedence`
    pub fn enumerate<P: AsRef<Path>>(dirs: &[P], precedence: DirPrecedence, loader: &ModuleLoader) -> Enumeration {
        let mut enumeration = Enumeration::default();

        for dir in dirs {
            let dir = dir.as_ref();
            let found = scan_dir(dir, loader, &mut enumeration.skipped);

            let tools = &mut enumeration.registry.tools;
            for (name, location) in found {
                if let Some(existing) = tools.get(&name) {
                    if precedence == DirPrecedence::FirstWins {
                        log::debug!("Tool `{}` from {} shadowed by {}", name, location, existing);
                        continue;
                    }
                    log::debug!("Tool `{}` from {} replaced by {}", name, existing, location);
                }
                tools.insert(name, location);
            }
        }

        log::info!(
            "Found {} tool(s), skipped {}",
            enumeration.registry.len(),
            enumeration.skipped.len()
        );
        enumeration
    }

    pub fn get(&self, name: &str) -> Option<&ToolLocation> {
        self.tools.get(name)
    }

    /// Tool names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ToolLocation)> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Tools accepted from one directory. Later paths overwrite earlier ones.
fn scan_dir(dir: &Path, loader: &ModuleLoader, skipped: &mut Vec<Skipped>) -> BTreeMap<String, ToolLocation> {
    let mut found = BTreeMap::new();

    if !dir.is_dir() {
        log::warn!("Tools directory {} does not exist, skipping", dir.display());
        return found;
    }
    log::debug!("Scanning {} for tools", dir.display());

    for path in candidates(dir) {
        let Ok(rel_path) = path.strip_prefix(dir).map(Path::to_path_buf) else {
            continue;
        };
        let Some(name) = rel_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        let verdict = loader
            .load(&rel_path, dir)
            .map_err(|e| (SkipReason::LoadFailed, e.to_string()))
            .and_then(|module| check(&module));

        match verdict {
            Ok(()) => {
                if let Some(previous) = found.get(&name) {
                    log::debug!("Tool `{}` at {} overwritten by {}", name, previous, path.display());
                }
                found.insert(name, ToolLocation::new(dir, rel_path));
            }
            Err((reason, detail)) => {
                let skip = Skipped { path, reason, detail };
                skip.log();
                skipped.push(skip);
            }
        }
    }

    found
}

/// Candidate scripts under `dir`, in path order
fn candidates(dir: &Path) -> Vec<PathBuf> {
    let root = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths: Vec<PathBuf> = SCRIPT_EXTENSIONS
        .iter()
        .filter_map(|ext| glob::glob(&format!("{}/**/*.{}", root, ext)).ok())
        .flat_map(|paths| paths.filter_map(|entry| entry.ok()))
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    paths
}

/// Accept a loaded script if its `tool` symbol is usable
fn check(module: &LoadedModule) -> Result<(), (SkipReason, String)> {
    let value = module
        .get(TOOL_SYMBOL)
        .ok_or((SkipReason::MissingAttribute, String::new()))?;

    match Tool::from_value(value) {
        Ok(_) => Ok(()),
        Err(ToolShapeError::Disabled) => Err((SkipReason::Disabled, String::new())),
        Err(e) => Err((SkipReason::WrongType, e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use tempfile::TempDir;

    const GOOD: &str = "tool:\n  prompt: 'Echo {{key1}}'\n  process: [stream, print_data]\n";

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn scenario_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.yml", GOOD);
        write(dir.path(), "bad_module.yml", "tool: [unclosed\n");
        write(dir.path(), "bad_type.yml", "tool: 1\n");
        write(dir.path(), "skip.yml", "tool: null\n");
        write(dir.path(), "no_attr.yml", "");
        dir
    }

    #[test]
    fn test_only_valid_tools_registered() {
        let dir = scenario_dir();
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(result.registry.names(), vec!["good"]);
        assert_eq!(result.skipped.len(), 4);
    }

    #[test]
    fn test_four_distinct_skip_reasons() {
        let dir = scenario_dir();
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        let reason_of = |stem: &str| {
            result
                .skipped
                .iter()
                .find(|s| s.path.file_stem().and_then(|n| n.to_str()) == Some(stem))
                .map(|s| s.reason)
        };
        assert_eq!(reason_of("bad_module"), Some(SkipReason::LoadFailed));
        assert_eq!(reason_of("bad_type"), Some(SkipReason::WrongType));
        assert_eq!(reason_of("skip"), Some(SkipReason::Disabled));
        assert_eq!(reason_of("no_attr"), Some(SkipReason::MissingAttribute));

        let messages: HashSet<String> = result
            .skipped
            .iter()
            .map(|s| s.message().replace(&s.path.display().to_string(), "<path>"))
            .collect();
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn test_names_sorted() {
        let dir = TempDir::new().unwrap();
        for name in ["zeta", "alpha", "mid"] {
            write(dir.path(), &format!("{}.yml", name), GOOD);
        }
        write(dir.path(), "nested/beta.yaml", GOOD);
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(result.registry.names(), vec!["alpha", "beta", "mid", "zeta"]);
        let beta = result.registry.get("beta").unwrap();
        assert_eq!(beta.rel_path, PathBuf::from("nested/beta.yaml"));
        assert_eq!(beta.symbol, TOOL_SYMBOL);
    }

    #[test]
    fn test_same_stem_last_path_wins() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a/dup.yml", GOOD);
        write(dir.path(), "b/dup.yml", GOOD);
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(result.registry.len(), 1);
        assert_eq!(result.registry.get("dup").unwrap().rel_path, PathBuf::from("b/dup.yml"));
    }

    #[test]
    fn test_dir_precedence() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        write(first.path(), "shared.yml", GOOD);
        write(second.path(), "shared.yml", GOOD);
        write(first.path(), "only_first.yml", GOOD);
        let dirs = [first.path(), second.path()];
        let loader = ModuleLoader::default();

        let last = ToolRegistry::enumerate(&dirs, DirPrecedence::LastWins, &loader);
        assert_eq!(last.registry.get("shared").unwrap().base_dir, second.path());

        let first_wins = ToolRegistry::enumerate(&dirs, DirPrecedence::FirstWins, &loader);
        assert_eq!(first_wins.registry.get("shared").unwrap().base_dir, first.path());
        assert_eq!(first_wins.registry.names(), vec!["only_first", "shared"]);
    }

    #[test]
    fn test_missing_dir_is_skipped() {
        let dir = scenario_dir();
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(
            &[Path::new("/nonexistent/clm/tools"), dir.path()],
            DirPrecedence::LastWins,
            &loader,
        );
        assert_eq!(result.registry.names(), vec!["good"]);
    }

    #[test]
    fn test_enumerating_twice_reuses_loads() {
        let dir = scenario_dir();
        let loader = ModuleLoader::default();

        ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);
        let loads = loader.load_count();
        ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(loader.load_count(), loads);
    }

    #[test]
    fn test_non_script_files_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "good.yml", GOOD);
        write(dir.path(), "README.md", "# tools");
        write(dir.path(), "good.py", "tool = 1");
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(result.registry.names(), vec!["good"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_args_clap_would_reject_are_wrong_type() {
        let dir = TempDir::new().unwrap();
        let arg_lists = [
            ("dup_long", "[{name: a, long: same}, {name: b, long: same}]"),
            ("dup_short", "[{name: a, short: s}, {name: b, short: s}]"),
            ("dashed_long", "[{name: a, long: '--a'}]"),
            ("required_after_optional", "[{name: a, default: x}, {name: b}]"),
            ("positional_flag", "[{name: a, flag: true}]"),
        ];
        for (stem, args) in arg_lists {
            let tool = format!("tool:\n  kind: command\n  prompt: x\n  args: {}\n", args);
            write(dir.path(), &format!("{}.yml", stem), &tool);
        }
        write(
            dir.path(),
            "nested_dup.yml",
            concat!(
                "tool:\n  kind: command\n  subcommands:\n    go:\n      prompt: x\n",
                "      args: [{name: a, long: same}, {name: b, long: same}]\n",
            ),
        );
        write(dir.path(), "good.yml", GOOD);
        let loader = ModuleLoader::default();

        let result = ToolRegistry::enumerate(&[dir.path()], DirPrecedence::LastWins, &loader);

        assert_eq!(result.registry.names(), vec!["good"]);
        assert_eq!(result.skipped.len(), 6);
        assert!(result.skipped.iter().all(|s| s.reason == SkipReason::WrongType));
    }
}
