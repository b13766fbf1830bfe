//! Dynamic loading of the native solver library
//!
//! Resolves a library name to a file using platform naming conventions,
//! loads it with `libloading`, and binds every symbol of the native surface
//! up front so a missing symbol is reported at load time rather than at the
//! first call.

use super::SymbolTable;
use libloading::Library;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Library loading errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("Library not found: {name} (searched {searched} paths)")]
    LibraryNotFound { name: String, searched: usize },

    #[error("Symbol '{symbol}' not found in library '{library}'")]
    SymbolNotFound { library: String, symbol: String },

    #[error("Failed to load library: {0}")]
    LoadFailed(String),
}

/// Platform-aware library path resolution
#[derive(Debug, Clone)]
pub struct LibraryLocator {
    search_paths: Vec<PathBuf>,
}

impl LibraryLocator {
    /// Locator over the platform default search paths
    pub fn new() -> Self {
        Self {
            search_paths: Self::default_search_paths(),
        }
    }

    /// Locator that tries `paths` (in order) before the platform defaults
    pub fn with_paths(paths: &[PathBuf]) -> Self {
        let mut locator = Self::new();
        for path in paths.iter().rev() {
            locator.add_search_path(path.clone());
        }
        locator
    }

    /// Working directory first, then the platform's system library dirs
    fn default_search_paths() -> Vec<PathBuf> {
        let system: &[&str] = if cfg!(target_os = "macos") {
            &["/usr/lib", "/usr/local/lib", "/opt/homebrew/lib"]
        } else if cfg!(all(target_os = "linux", target_pointer_width = "64")) {
            &["/usr/lib", "/usr/local/lib", "/lib", "/usr/lib64", "/lib64"]
        } else if cfg!(target_os = "linux") {
            &["/usr/lib", "/usr/local/lib", "/lib"]
        } else {
            &[]
        };

        let mut paths: Vec<PathBuf> = std::env::current_dir().into_iter().collect();
        paths.extend(system.iter().map(PathBuf::from));

        if cfg!(target_os = "windows") {
            if let Some(root) = std::env::var_os("SystemRoot") {
                paths.push(Path::new(&root).join("System32"));
            }
        }
        paths
    }

    /// Candidate file names for a short library name, in priority order
    pub fn file_names(name: &str) -> Vec<String> {
        let (prefixes, extensions): (&[&str], &[&str]) = if cfg!(target_os = "windows") {
            (&["", "lib"], &["dll"])
        } else if cfg!(target_os = "macos") {
            (&["lib", ""], &["dylib", "so"])
        } else {
            (&["lib", ""], &["so"])
        };

        let mut names = Vec::with_capacity(prefixes.len() * extensions.len());
        for prefix in prefixes {
            for ext in extensions {
                names.push(format!("{}{}.{}", prefix, name, ext));
            }
        }
        names
    }

    /// Resolve a library name (or absolute path) to an existing file
    pub fn resolve(&self, name: &str) -> Result<PathBuf, LoadError> {
        let path = Path::new(name);
        if path.is_absolute() {
            return if path.exists() {
                Ok(path.to_path_buf())
            } else {
                Err(LoadError::LibraryNotFound {
                    name: name.to_string(),
                    searched: 0,
                })
            };
        }

        let candidates = Self::file_names(name);
        for dir in &self.search_paths {
            for file in &candidates {
                let full = dir.join(file);
                if full.exists() {
                    return Ok(full);
                }
            }
        }

        Err(LoadError::LibraryNotFound {
            name: name.to_string(),
            searched: self.search_paths.len(),
        })
    }

    /// Add a search path with highest priority
    pub fn add_search_path(&mut self, path: PathBuf) {
        self.search_paths.insert(0, path);
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }
}

impl Default for LibraryLocator {
    fn default() -> Self {
        Self::new()
    }
}

/// A solver library loaded from disk with all symbols bound
pub struct LoadedSolver {
    pub(super) table: SymbolTable,
    path: PathBuf,
    // Dropped last: the symbol table points into it
    _library: Library,
}

impl LoadedSolver {
    /// Load and bind the library at `path`
    ///
    /// # Safety
    ///
    /// Loading runs the library's initialisers, and every bound symbol is
    /// trusted to have the signature declared by the native surface.
    pub unsafe fn load(path: &Path) -> Result<Self, LoadError> {
        let library = Library::new(path).map_err(|e| LoadError::LoadFailed(e.to_string()))?;
        let table = SymbolTable::resolve(&library, &path.display().to_string())?;

        tracing::info!(path = %path.display(), "loaded solver library");

        Ok(Self {
            table,
            path: path.to_path_buf(),
            _library: library,
        })
    }

    /// Resolve `name` with `locator`, then load it
    ///
    /// # Safety
    ///
    /// See [`LoadedSolver::load`].
    pub unsafe fn locate(locator: &LibraryLocator, name: &str) -> Result<Self, LoadError> {
        let path = locator.resolve(name)?;
        Self::load(&path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
