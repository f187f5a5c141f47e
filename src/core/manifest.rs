//! Build configuration (unibuild.toml) parsing
//!
//! The build configuration names the target architectures, the platform and
//! the directories the orchestrator works in. It supports `${VAR}`
//! environment substitution and `extends = "<base>"` inheritance.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::config::defaults;
use crate::error::ConfigError;
use crate::infra::dirs::UnibuildDirs;

/// The build configuration file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    /// Build section
    pub build: BuildSection,
}

/// `[build]` section as written on disk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BuildSection {
    /// Ordered target architectures
    #[serde(default)]
    pub architectures: Vec<String>,

    /// Platform identifier (macos, linux, ...)
    #[serde(default)]
    pub platform: Option<String>,

    /// Where source archives are stored
    #[serde(default)]
    pub archives_dir: Option<PathBuf>,

    /// Root of the component scratch directories
    #[serde(default)]
    pub work_dir: Option<PathBuf>,

    /// Root of the component output trees
    #[serde(default)]
    pub build_root: Option<PathBuf>,

    /// Directory patches are resolved against
    #[serde(default)]
    pub patches_dir: Option<PathBuf>,

    /// Directory holding component descriptors
    #[serde(default)]
    pub components_dir: Option<PathBuf>,

    /// Build the architectures of one component concurrently
    #[serde(default)]
    pub parallel_architectures: Option<bool>,

    /// Maximum number of concurrent architecture builds
    #[serde(default)]
    pub jobs: Option<usize>,
}

/// Target platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    /// macOS: compilers accept `-arch <name>`
    MacOs,
    /// Any other platform, by identifier
    Other(String),
}

impl Platform {
    /// Parse a platform identifier
    pub fn from_identifier(identifier: &str) -> Self {
        match identifier.trim().to_lowercase().as_str() {
            "macos" | "darwin" | "mac os x" | "osx" => Self::MacOs,
            other => Self::Other(other.to_string()),
        }
    }

    /// Platform of the running host
    pub fn host() -> Self {
        Self::from_identifier(std::env::consts::OS)
    }

    /// Whether compilers take per-architecture designator flags
    pub fn supports_arch_flags(&self) -> bool {
        matches!(self, Self::MacOs)
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MacOs => write!(f, "macos"),
            Self::Other(name) => write!(f, "{name}"),
        }
    }
}

/// Resolved build configuration with absolute paths and defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    /// Ordered, non-empty architecture list
    pub architectures: Vec<String>,
    /// Target platform
    pub platform: Platform,
    /// Archive storage directory
    pub archives_dir: PathBuf,
    /// Root of component working directories
    pub work_dir: PathBuf,
    /// Root of component build paths
    pub build_root: PathBuf,
    /// Patches directory
    pub patches_dir: PathBuf,
    /// Component descriptor directory
    pub components_dir: PathBuf,
    /// Build architectures concurrently
    pub parallel_architectures: bool,
    /// Concurrency limit for architecture builds
    pub jobs: usize,
}

impl BuildConfig {
    /// Configuration rooted at `root` using default directory names
    pub fn new(architectures: Vec<String>, root: &Path) -> Result<Self, ConfigError> {
        BuildSection {
            architectures,
            archives_dir: Some(PathBuf::from("archives")),
            ..BuildSection::default()
        }
        .resolve(root)
    }

    /// Set the platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Whether more than one architecture is configured
    pub fn is_universal(&self) -> bool {
        self.architectures.len() > 1
    }
}

impl BuildSection {
    /// Apply defaults and make relative paths absolute against `base_dir`
    pub fn resolve(&self, base_dir: &Path) -> Result<BuildConfig, ConfigError> {
        if self.architectures.is_empty() {
            return Err(ConfigError::NoArchitectures);
        }

        let rooted = |value: &Option<PathBuf>, default: &str| {
            let path = value.clone().unwrap_or_else(|| PathBuf::from(default));
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let archives_dir = match &self.archives_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base_dir.join(dir),
            None => UnibuildDirs::new().archives_dir(),
        };

        Ok(BuildConfig {
            architectures: self.architectures.clone(),
            platform: self
                .platform
                .as_deref()
                .map_or_else(Platform::host, Platform::from_identifier),
            archives_dir,
            work_dir: rooted(&self.work_dir, defaults::DEFAULT_WORK_DIR),
            build_root: rooted(&self.build_root, defaults::DEFAULT_BUILD_ROOT),
            patches_dir: rooted(&self.patches_dir, defaults::DEFAULT_PATCHES_DIR),
            components_dir: rooted(&self.components_dir, defaults::DEFAULT_COMPONENTS_DIR),
            parallel_architectures: self.parallel_architectures.unwrap_or(true),
            jobs: self.jobs.filter(|&j| j > 0).unwrap_or_else(num_cpus::get),
        })
    }
}

fn env_var_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("Invalid env regex"))
}

/// Substitute `${VAR}` patterns with environment variable values.
///
/// Unset variables become empty strings.
///
/// # Examples
/// ```
/// use unibuild::core::manifest::substitute_env_vars;
///
/// std::env::set_var("UNIBUILD_DOC_VAR", "hello");
/// assert_eq!(substitute_env_vars("a_${UNIBUILD_DOC_VAR}_b"), "a_hello_b");
/// std::env::remove_var("UNIBUILD_DOC_VAR");
/// ```
pub fn substitute_env_vars(input: &str) -> String {
    env_var_regex()
        .replace_all(input, |caps: &regex::Captures<'_>| {
            std::env::var(&caps[1]).unwrap_or_default()
        })
        .into_owned()
}

/// Recursively substitute environment variables in a TOML value
fn substitute_in_value(value: &mut toml::Value) {
    match value {
        toml::Value::String(s) => {
            *s = substitute_env_vars(s);
        }
        toml::Value::Array(arr) => {
            for item in arr.iter_mut() {
                substitute_in_value(item);
            }
        }
        toml::Value::Table(table) => {
            for (_, v) in table.iter_mut() {
                substitute_in_value(v);
            }
        }
        _ => {}
    }
}

/// Merge two TOML tables, with `override_table` values taking precedence.
fn merge_toml_tables(base: &mut toml::value::Table, override_table: &toml::value::Table) {
    for (key, override_value) in override_table {
        match (base.get_mut(key), override_value) {
            (Some(toml::Value::Table(base_table)), toml::Value::Table(override_table)) => {
                merge_toml_tables(base_table, override_table);
            }
            _ => {
                base.insert(key.clone(), override_value.clone());
            }
        }
    }
}

/// Load a TOML file and resolve its `extends` directive recursively.
fn load_toml_with_inheritance(path: &Path) -> Result<toml::Value, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut value: toml::Value = toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        error: e.to_string(),
    })?;

    if let Some(extends) = value.get("extends").and_then(|v| v.as_str()) {
        let base_dir = path.parent().unwrap_or(Path::new("."));
        let base_value = load_toml_with_inheritance(&base_dir.join(extends))?;

        if let (toml::Value::Table(mut merged), toml::Value::Table(current)) =
            (base_value, &value)
        {
            merge_toml_tables(&mut merged, current);
            value = toml::Value::Table(merged);
        }
    }

    if let toml::Value::Table(table) = &mut value {
        table.remove("extends");
    }

    Ok(value)
}

impl Manifest {
    /// Load from a file, resolving `extends` and `${VAR}` substitutions
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut value = load_toml_with_inheritance(path)?;
        substitute_in_value(&mut value);

        value.try_into().map_err(|e: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Load and resolve into a [`BuildConfig`] relative to the file's directory
    pub fn load_config(path: &Path) -> Result<BuildConfig, ConfigError> {
        let manifest = Self::load(path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let base_dir = std::path::absolute(base_dir).unwrap_or_else(|_| base_dir.to_path_buf());
        manifest.build.resolve(&base_dir)
    }

    /// Parse from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}
