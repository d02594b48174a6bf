//! Module Loader - load tool scripts from a search directory
//!
//! A tool script is a YAML document. Loading reads and parses it into a
//! symbol table and inlines `prompt: { file: … }` includes. Loads are
//! memoized in an injected `ModuleCache`, so listing tools and then running
//! one never reads the same script twice.

mod cache;
mod module;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

pub use cache::ModuleCache;
pub use module::LoadedModule;
pub(crate) use module::kind_of;

use crate::error::ModuleLoadError;

/// File extensions recognised as tool scripts
pub const SCRIPT_EXTENSIONS: &[&str] = &["yml", "yaml"];

/// Loads tool scripts, consulting the cache first
#[derive(Debug, Default)]
pub struct ModuleLoader {
    cache: ModuleCache,
    loads: AtomicUsize,
}

impl ModuleLoader {
    /// Create a loader around a cache
    pub fn new(cache: ModuleCache) -> Self {
        Self {
            cache,
            loads: AtomicUsize::new(0),
        }
    }

    /// Load `identifier` from `search_dir`.
    ///
    /// `identifier` is a path relative to the directory, with or without a
    /// script extension (`good`, `nested/good`, `good.yml`).
    pub fn load(
        &self,
        identifier: impl AsRef<Path>,
        search_dir: impl AsRef<Path>,
    ) -> Result<Arc<LoadedModule>, ModuleLoadError> {
        let identifier = identifier.as_ref();
        let search_dir = search_dir.as_ref();

        if let Some(module) = self.cache.get_request(search_dir, identifier) {
            log::trace!("Cache hit for {} in {}", identifier.display(), search_dir.display());
            return Ok(module);
        }

        let name = identifier.display().to_string();
        let path = resolve(identifier, search_dir).ok_or_else(|| ModuleLoadError::NotFound {
            name: name.clone(),
            dir: search_dir.to_path_buf(),
        })?;

        // Same file reached through a different identifier
        if let Some(module) = self.cache.get_path(&path) {
            self.cache.alias(search_dir, identifier, &path);
            return Ok(module);
        }

        log::info!("Loading tool from: {}", path.display());
        let module = LoadedModule::read(&path).map_err(|source| ModuleLoadError::Invalid {
            name,
            dir: search_dir.to_path_buf(),
            source,
        })?;
        self.loads.fetch_add(1, Ordering::SeqCst);

        Ok(self.cache.insert(search_dir, identifier, module))
    }

    /// Number of scripts actually read from disk
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn cache(&self) -> &ModuleCache {
        &self.cache
    }
}

/// True if the path carries a script extension
pub fn is_script(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SCRIPT_EXTENSIONS.contains(&e))
}

/// Find the script file for an identifier and canonicalize it
fn resolve(identifier: &Path, search_dir: &Path) -> Option<PathBuf> {
    let base = search_dir.join(identifier);
    let mut candidates = Vec::new();
    if is_script(&base) {
        candidates.push(base.clone());
    }
    for ext in SCRIPT_EXTENSIONS {
        let mut with_ext = base.clone().into_os_string();
        with_ext.push(".");
        with_ext.push(ext);
        candidates.push(PathBuf::from(with_ext));
    }
    candidates
        .into_iter()
        .find(|p| p.is_file())
        .and_then(|p| p.canonicalize().ok())
}
