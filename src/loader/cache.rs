//! Process-lifetime cache of loaded tool scripts

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use super::module::LoadedModule;

/// Request key: (search directory, identifier) as given by the caller
type RequestKey = (PathBuf, PathBuf);

/// Memoizes loaded scripts. No eviction: a script is read at most once per cache.
#[derive(Debug, Default)]
pub struct ModuleCache {
    /// Request → canonical script path
    resolved: RwLock<HashMap<RequestKey, PathBuf>>,
    /// Canonical script path → loaded module
    modules: RwLock<HashMap<PathBuf, Arc<LoadedModule>>>,
}

impl ModuleCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Module previously loaded for this exact request
    pub fn get_request(&self, dir: &Path, identifier: &Path) -> Option<Arc<LoadedModule>> {
        let key = (dir.to_path_buf(), identifier.to_path_buf());
        let path = self.resolved.read().ok()?.get(&key).cloned()?;
        self.get_path(&path)
    }

    /// Module previously loaded from this canonical path
    pub fn get_path(&self, path: &Path) -> Option<Arc<LoadedModule>> {
        self.modules.read().ok()?.get(path).cloned()
    }

    /// Record a request's resolution and the module, keeping any module
    /// already stored for the same path.
    pub fn insert(&self, dir: &Path, identifier: &Path, module: LoadedModule) -> Arc<LoadedModule> {
        let path = module.path().to_path_buf();
        let module = match self.modules.write() {
            Ok(mut modules) => modules.entry(path.clone()).or_insert_with(|| Arc::new(module)).clone(),
            Err(_) => Arc::new(module),
        };
        if let Ok(mut resolved) = self.resolved.write() {
            resolved.insert((dir.to_path_buf(), identifier.to_path_buf()), path);
        }
        module
    }

    /// Remember that a request resolves to a path whose module is already cached
    pub fn alias(&self, dir: &Path, identifier: &Path, path: &Path) {
        if let Ok(mut resolved) = self.resolved.write() {
            resolved.insert((dir.to_path_buf(), identifier.to_path_buf()), path.to_path_buf());
        }
    }

    /// Number of distinct scripts held
    pub fn len(&self) -> usize {
        self.modules.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
