//! Error types for unibuild
//!
//! Domain-specific error types using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Component registration errors
#[derive(Error, Debug)]
pub enum SetupError {
    /// Two descriptors share a (case-insensitive) name
    #[error("Component '{name}' is registered twice")]
    DuplicateComponent { name: String },

    /// Descriptor could not be read
    #[error("Failed to read component descriptor '{path}': {error}")]
    ReadDescriptor { path: PathBuf, error: String },

    /// Descriptor is not valid TOML or misses required fields
    #[error("Invalid component descriptor '{path}': {error}")]
    InvalidDescriptor { path: PathBuf, error: String },
}

/// Dependency resolution errors
#[derive(Error, Debug)]
pub enum ResolverError {
    /// Repeated scan made no progress
    #[error("Circular or unsatisfiable dependencies between: {}", remaining.join(", "))]
    CircularDependency { remaining: Vec<String> },

    /// Dependency names a component that is not registered
    #[error("Missing dependency: '{dependency}' required by '{component}'")]
    MissingDependency {
        component: String,
        dependency: String,
    },
}

/// Pipeline stage errors
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Archive extension does not select an extraction mode
    #[error("Unknown archive format for '{path}'")]
    UnknownArchiveFormat { path: PathBuf },

    /// Required external tool is not installed
    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    /// Tool could not be started
    #[error("Failed to run '{command}' for {component} ({stage}): {error}")]
    SpawnFailed {
        component: String,
        stage: String,
        command: String,
        error: String,
    },

    /// Tool exited unsuccessfully
    #[error("{stage} of {component} failed: '{command}' exited with {status}")]
    ToolFailed {
        component: String,
        stage: String,
        command: String,
        status: String,
    },
}

/// Universal merge errors
#[derive(Error, Debug)]
pub enum UniversalizeError {
    /// No registered universalizer produced the path
    #[error("Could not universalize '{}' ({})", path.display(), format_arch_dirs(arch_dirs))]
    UniversalizationFailed {
        path: PathBuf,
        arch_dirs: Vec<(String, PathBuf)>,
    },

    /// A universalizer accepted the path but its merge failed
    #[error("{universalizer} failed to merge '{}': {error}", path.display())]
    MergeFailed {
        universalizer: String,
        path: PathBuf,
        error: String,
    },

    /// The merge task stopped before finishing
    #[error("Merge into '{}' did not complete: {error}", path.display())]
    MergeAborted { path: PathBuf, error: String },
}

fn format_arch_dirs(arch_dirs: &[(String, PathBuf)]) -> String {
    arch_dirs
        .iter()
        .map(|(arch, dir)| format!("{arch}: {}", dir.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Download errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// Network error
    #[error("Network error downloading '{url}': {error}")]
    NetworkError { url: String, error: String },

    /// IO error
    #[error("IO error for '{path}': {error}")]
    IoError { path: PathBuf, error: String },
}

/// Filesystem errors
#[derive(Error, Debug)]
pub enum FilesystemError {
    /// Failed to create directory
    #[error("Failed to create directory '{path}': {error}")]
    CreateDir { path: PathBuf, error: String },

    /// Failed to remove directory
    #[error("Failed to remove directory '{path}': {error}")]
    RemoveDir { path: PathBuf, error: String },

    /// Failed to write file
    #[error("Failed to write file '{path}': {error}")]
    WriteFile { path: PathBuf, error: String },

    /// Failed to read file
    #[error("Failed to read file '{path}': {error}")]
    ReadFile { path: PathBuf, error: String },

    /// Failed to copy a file or symlink
    #[error("Failed to copy '{from}' to '{to}': {error}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        error: String,
    },

    /// Failed to walk a directory tree
    #[error("Failed to walk '{path}': {error}")]
    Walk { path: PathBuf, error: String },
}

/// Build configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file missing
    #[error("Configuration not found at '{path}'")]
    NotFound { path: PathBuf },

    /// Configuration file unreadable
    #[error("Failed to read configuration '{path}': {error}")]
    Read { path: PathBuf, error: String },

    /// Configuration file is not valid TOML for the schema
    #[error("Failed to parse configuration '{path}': {error}")]
    Parse { path: PathBuf, error: String },

    /// Architecture list is empty
    #[error("At least one architecture must be configured")]
    NoArchitectures,
}

/// Top-level unibuild error type
#[derive(Error, Debug)]
pub enum UnibuildError {
    /// Setup error
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Resolver error
    #[error("Resolver error: {0}")]
    Resolver(#[from] ResolverError),

    /// Pipeline error
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Universalize error
    #[error("Universalize error: {0}")]
    Universalize(#[from] UniversalizeError),

    /// Download error
    #[error("Download error: {0}")]
    Download(#[from] DownloadError),

    /// Filesystem error
    #[error("Filesystem error: {0}")]
    Filesystem(#[from] FilesystemError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}
