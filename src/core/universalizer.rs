//! File universalizers
//!
//! A universalizer merges the per-architecture copies of one output file into
//! a single file valid for every architecture. The merge engine asks each
//! registered universalizer in order and the first applicable one wins.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use crate::error::UniversalizeError;
use crate::infra::{filesystem, process};

/// Ordered mapping of architecture to its output tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchDirs {
    dirs: Vec<(String, PathBuf)>,
}

impl ArchDirs {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an architecture's output tree
    pub fn push(&mut self, arch: impl Into<String>, dir: impl Into<PathBuf>) {
        self.dirs.push((arch.into(), dir.into()));
    }

    /// Architectures and their trees, in configuration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.dirs.iter().map(|(a, d)| (a.as_str(), d.as_path()))
    }

    /// Per-architecture location of a tree-relative path
    pub fn paths_of<'a>(&'a self, relative: &'a Path) -> impl Iterator<Item = (&'a str, PathBuf)> + 'a {
        self.iter().map(move |(arch, dir)| (arch, dir.join(relative)))
    }

    /// Tree of the first architecture
    pub fn first(&self) -> Option<&Path> {
        self.dirs.first().map(|(_, d)| d.as_path())
    }

    /// Number of architectures
    pub fn len(&self) -> usize {
        self.dirs.len()
    }

    /// Whether no architecture is present
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty()
    }

    /// Owned copy for error reporting
    pub fn to_vec(&self) -> Vec<(String, PathBuf)> {
        self.dirs.clone()
    }
}

impl<A: Into<String>, D: Into<PathBuf>> FromIterator<(A, D)> for ArchDirs {
    fn from_iter<I: IntoIterator<Item = (A, D)>>(iter: I) -> Self {
        Self {
            dirs: iter.into_iter().map(|(a, d)| (a.into(), d.into())).collect(),
        }
    }
}

/// Merges per-architecture copies of a file
pub trait Universalizer: fmt::Debug + Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &str;

    /// Whether this universalizer can merge `relative` across `arch_dirs`
    fn applicable_to(&self, relative: &Path, arch_dirs: &ArchDirs) -> bool;

    /// Write the merged file for `relative` to `dest`
    fn merge(&self, relative: &Path, dest: &Path, arch_dirs: &ArchDirs)
        -> Result<(), UniversalizeError>;
}

/// Built-in universalizers in lookup order
pub fn default_universalizers() -> Vec<Arc<dyn Universalizer>> {
    vec![
        Arc::new(MachOUniversalizer::new()),
        Arc::new(HeaderUniversalizer),
    ]
}

const MACHO_MAGICS: [[u8; 4]; 5] = [
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

/// Whether a file starts with a Mach-O (thin or fat) magic
pub fn is_macho(path: &Path) -> bool {
    use std::io::Read;

    let Ok(mut file) = std::fs::File::open(path) else {
        return false;
    };
    let mut magic = [0u8; 4];
    file.read_exact(&mut magic).is_ok() && MACHO_MAGICS.contains(&magic)
}

/// Combines Mach-O objects, libraries and executables with `lipo`
#[derive(Debug, Clone)]
pub struct MachOUniversalizer {
    lipo: String,
}

impl MachOUniversalizer {
    /// Use `lipo` from `PATH`
    pub fn new() -> Self {
        Self {
            lipo: "lipo".to_string(),
        }
    }

    /// Use a specific `lipo` binary
    pub fn with_lipo(lipo: impl Into<String>) -> Self {
        Self { lipo: lipo.into() }
    }
}

impl Default for MachOUniversalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Universalizer for MachOUniversalizer {
    fn name(&self) -> &str {
        "macho"
    }

    fn applicable_to(&self, relative: &Path, arch_dirs: &ArchDirs) -> bool {
        !arch_dirs.is_empty()
            && arch_dirs.paths_of(relative).all(|(_, p)| is_macho(&p))
            && process::is_tool_available(&self.lipo)
    }

    fn merge(
        &self,
        relative: &Path,
        dest: &Path,
        arch_dirs: &ArchDirs,
    ) -> Result<(), UniversalizeError> {
        let failed = |error: String| UniversalizeError::MergeFailed {
            universalizer: self.name().to_string(),
            path: relative.to_path_buf(),
            error,
        };

        let output = Command::new(&self.lipo)
            .arg("-create")
            .args(arch_dirs.paths_of(relative).map(|(_, p)| p))
            .arg("-output")
            .arg(dest)
            .output()
            .map_err(|e| failed(e.to_string()))?;

        if !output.status.success() {
            return Err(failed(String::from_utf8_lossy(&output.stderr).trim().to_string()));
        }
        Ok(())
    }
}

/// Splits differing C headers into per-architecture copies behind a
/// dispatching header
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderUniversalizer;

impl HeaderUniversalizer {
    fn arch_header_name(relative: &Path, arch: &str) -> Option<String> {
        let stem = relative.file_stem()?.to_str()?;
        Some(format!("{stem}-{arch}.h"))
    }

    /// Preprocessor condition selecting `arch`
    pub fn arch_condition(arch: &str) -> String {
        match arch {
            "i386" => "defined(__i386__)".to_string(),
            "x86_64" => "defined(__x86_64__)".to_string(),
            "ppc" => "defined(__ppc__)".to_string(),
            "ppc64" => "defined(__ppc64__)".to_string(),
            "arm64" => "defined(__arm64__) || defined(__aarch64__)".to_string(),
            other => format!("defined(__{other}__)"),
        }
    }

    /// Content of the dispatching header
    pub fn dispatch_header(relative: &Path, arch_dirs: &ArchDirs) -> Option<String> {
        let mut out = String::from("/* Generated by unibuild */\n");
        for (i, (arch, _)) in arch_dirs.iter().enumerate() {
            let directive = if i == 0 { "#if" } else { "#elif" };
            let header = Self::arch_header_name(relative, arch)?;
            out.push_str(&format!(
                "{directive} {}\n#include \"{header}\"\n",
                Self::arch_condition(arch)
            ));
        }
        out.push_str("#else\n#error \"Unsupported architecture\"\n#endif\n");
        Some(out)
    }
}

impl Universalizer for HeaderUniversalizer {
    fn name(&self) -> &str {
        "header"
    }

    fn applicable_to(&self, relative: &Path, arch_dirs: &ArchDirs) -> bool {
        relative.extension().is_some_and(|e| e == "h")
            && !arch_dirs.is_empty()
            && arch_dirs.paths_of(relative).all(|(_, p)| p.is_file())
    }

    fn merge(
        &self,
        relative: &Path,
        dest: &Path,
        arch_dirs: &ArchDirs,
    ) -> Result<(), UniversalizeError> {
        let failed = |error: String| UniversalizeError::MergeFailed {
            universalizer: self.name().to_string(),
            path: relative.to_path_buf(),
            error,
        };
        let dest_dir = dest
            .parent()
            .ok_or_else(|| failed("destination has no parent directory".to_string()))?;

        let mut copies = Vec::new();
        for (arch, source) in arch_dirs.paths_of(relative) {
            let name = Self::arch_header_name(relative, arch)
                .ok_or_else(|| failed("header name is not valid UTF-8".to_string()))?;
            copies.push((source, dest_dir.join(name)));
        }

        // Never replace a file that is already part of the merged tree
        let occupied = std::iter::once(dest)
            .chain(copies.iter().map(|(_, target)| target.as_path()))
            .find(|path| path.symlink_metadata().is_ok());
        if let Some(path) = occupied {
            return Err(failed(format!("'{}' already exists", path.display())));
        }

        for (source, target) in &copies {
            filesystem::copy_file(source, target).map_err(|e| failed(e.to_string()))?;
        }

        let content = Self::dispatch_header(relative, arch_dirs)
            .ok_or_else(|| failed("header name is not valid UTF-8".to_string()))?;
        filesystem::write_file(dest, &content).map_err(|e| failed(e.to_string()))
    }
}
