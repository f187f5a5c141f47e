//! Source archive fetching
//!
//! Downloads the archives of selected components into the archive directory.
//! Archives already on disk are never fetched again, and the first failed
//! download aborts the action.

use std::path::PathBuf;

use crate::core::component::Component;
use crate::error::UnibuildError;
use crate::infra::download::{DownloadManager, ProgressCallback};
use crate::infra::filesystem;

/// An archive fetched by this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArchive {
    /// Component name
    pub name: String,
    /// Archive path
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA-256 of the content, hex encoded
    pub sha256: String,
}

/// Result of fetching archives
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Archives downloaded by this run
    pub downloaded: Vec<FetchedArchive>,
    /// Components whose archive was already present
    pub skipped: Vec<String>,
}

/// Options for fetching archives
pub struct FetchOptions<'p> {
    /// Suppress console progress lines
    pub quiet: bool,
    /// Builds a progress callback for a component's download
    pub progress: Option<&'p (dyn Fn(&Component) -> ProgressCallback + Sync)>,
}

impl Default for FetchOptions<'_> {
    fn default() -> Self {
        Self {
            quiet: true,
            progress: None,
        }
    }
}

/// Fetch the archives of `components` in order
pub async fn fetch_archives(
    components: &[&Component],
    manager: &DownloadManager,
    options: &FetchOptions<'_>,
) -> Result<FetchResult, UnibuildError> {
    let mut result = FetchResult::default();

    for component in components {
        let archive = component.source_archive_file();
        if archive.exists() {
            tracing::info!("{}: archive already downloaded", component.name());
            if !options.quiet {
                println!("{}: Download already downloaded.", component.name());
            }
            result.skipped.push(component.name().to_string());
            continue;
        }

        if let Some(dir) = archive.parent() {
            filesystem::create_dir_all(dir)?;
        }

        tracing::info!("{}: downloading {}", component.name(), component.download_url());
        if !options.quiet {
            println!("{}: Download '{}'...", component.name(), component.download_url());
        }

        let progress = options.progress.map(|make| make(component));
        let downloaded = manager
            .download(component.download_url(), archive, progress)
            .await;

        match downloaded {
            Ok(download) => {
                tracing::debug!("{}: sha256 {}", component.name(), download.checksum);
                if !options.quiet {
                    println!("{}: done.", component.name());
                }
                result.downloaded.push(FetchedArchive {
                    name: component.name().to_string(),
                    path: download.path,
                    size: download.size,
                    sha256: download.checksum,
                });
            }
            Err(e) => {
                if !options.quiet {
                    println!("{}: failed!", component.name());
                }
                return Err(e.into());
            }
        }
    }

    Ok(result)
}
