//! Platform-specific directory defaults
//!
//! Follows the XDG Base Directory Specification on Linux and the standard
//! locations on macOS. Environment variables override the defaults:
//! - `UNIBUILD_CACHE_DIR` - Override the cache directory
//! - `UNIBUILD_ARCHIVES_DIR` - Override the archive directory

use std::env;
use std::path::PathBuf;

/// Environment variable names for directory overrides
pub const ENV_CACHE_DIR: &str = "UNIBUILD_CACHE_DIR";
pub const ENV_ARCHIVES_DIR: &str = "UNIBUILD_ARCHIVES_DIR";

/// Application name used in directory paths
const APP_NAME: &str = "unibuild";

const ARCHIVES_SUBDIR: &str = "archives";

/// Default locations used when the build configuration leaves them out
#[derive(Debug, Clone)]
pub struct UnibuildDirs {
    cache_dir: PathBuf,
    archives_dir: Option<PathBuf>,
}

impl UnibuildDirs {
    /// Resolve directories from the environment and platform defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache_dir: Self::resolve_cache_dir(),
            archives_dir: env::var(ENV_ARCHIVES_DIR).ok().map(PathBuf::from),
        }
    }

    /// Cache directory
    ///
    /// - Linux: `$XDG_CACHE_HOME/unibuild` or `~/.cache/unibuild`
    /// - macOS: `~/Library/Caches/unibuild`
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone()
    }

    /// Shared source archive directory, under the cache directory unless overridden
    #[must_use]
    pub fn archives_dir(&self) -> PathBuf {
        self.archives_dir
            .clone()
            .unwrap_or_else(|| self.cache_dir.join(ARCHIVES_SUBDIR))
    }

    fn resolve_cache_dir() -> PathBuf {
        if let Ok(path) = env::var(ENV_CACHE_DIR) {
            return PathBuf::from(path);
        }

        dirs::cache_dir()
            .map(|p| p.join(APP_NAME))
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".cache").join(APP_NAME))
                    .unwrap_or_else(|| PathBuf::from(".").join(".cache").join(APP_NAME))
            })
    }
}

impl Default for UnibuildDirs {
    fn default() -> Self {
        Self::new()
    }
}
