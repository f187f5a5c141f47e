//! Source archive extraction
//!
//! The archive's extension selects the tar mode. Permissions are always
//! preserved.

use std::path::Path;

use crate::config::defaults;
use crate::error::PipelineError;
use crate::infra::process::Invocation;

/// Supported archive compressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// `.gz`, `.tgz` and `.Z`
    Gzip,
    /// `.bz2`
    Bzip2,
    /// `.tar`
    Tar,
}

impl ArchiveFormat {
    /// Detect the format from the file extension
    pub fn detect(path: &Path) -> Result<Self, PipelineError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz" | "tgz" | "Z") => Ok(Self::Gzip),
            Some("bz2") => Ok(Self::Bzip2),
            Some("tar") => Ok(Self::Tar),
            _ => Err(PipelineError::UnknownArchiveFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Tar mode flags for extraction
    pub fn tar_flags(self) -> &'static str {
        match self {
            Self::Gzip => "xpzf",
            Self::Bzip2 => "xpjf",
            Self::Tar => "xpf",
        }
    }
}

/// Invocation extracting `archive` into `dest` with extra tar flags appended
pub fn unpack_invocation(
    archive: &Path,
    dest: &Path,
    extra_flags: &[String],
) -> Result<Invocation, PipelineError> {
    let format = ArchiveFormat::detect(archive)?;
    Ok(Invocation::new(defaults::TAR_TOOL, dest)
        .arg(format.tar_flags())
        .arg(archive.display().to_string())
        .args(extra_flags.iter().cloned()))
}
