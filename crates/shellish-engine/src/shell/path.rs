//! Search-path resolution
//!
//! Maps a bare executable name to a runnable path by probing an ordered
//! list of directories. The first `dir/name` that exists and is executable
//! wins, even when later directories also contain the name. Names that
//! contain a path separator skip the search and resolve against the
//! shell's working directory, which need not be the host process's.

use std::env;
use std::path::{Path, PathBuf};

use super::types::resolve_relative;

/// Immutable snapshot of an ordered executable search path.
///
/// Taken once per resolution attempt; mutations to the environment after
/// the snapshot do not affect an in-flight resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPath {
    dirs: Vec<PathBuf>,
}

impl SearchPath {
    /// Parse a colon-separated search-path value.
    pub fn from_value(value: &str) -> Self {
        Self {
            dirs: env::split_paths(value).collect(),
        }
    }

    /// Snapshot the process's own `PATH`.
    pub fn from_env() -> Self {
        Self::from_value(&env::var("PATH").unwrap_or_default())
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Resolve a name to a runnable path.
    ///
    /// Names containing a path separator bypass the search and are checked
    /// against `cwd` (the shell state's working directory, so `./tool`
    /// follows `cd`). Returns `None` when nothing yields an executable.
    pub fn resolve(&self, name: &str, cwd: &Path) -> Option<PathBuf> {
        if name.contains(std::path::MAIN_SEPARATOR) {
            let path = resolve_relative(Path::new(name), cwd);
            if is_executable(&path) {
                return Some(path);
            }
            return None;
        }

        for dir in &self.dirs {
            let candidate = dir.join(name);
            if is_executable(&candidate) {
                return Some(candidate);
            }
        }

        None
    }
}

/// Check if a path is an executable regular file.
fn is_executable(path: &Path) -> bool {
    if !path.is_file() {
        return false;
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = path.metadata() {
            let mode = metadata.permissions().mode();
            // Any execute bit counts
            return mode & 0o111 != 0;
        }
        false
    }

    #[cfg(not(unix))]
    {
        true
    }
}
