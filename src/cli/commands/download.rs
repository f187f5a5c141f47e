//! `download` command: fetch source archives

use anyhow::{Context, Result};
use serde_json::json;

use super::GlobalOptions;
use crate::cli::output::{download_progress, status};
use crate::core::component::Component;
use crate::core::fetch::{fetch_archives, FetchOptions};
use crate::core::resolver::Resolver;
use crate::infra::download::{DownloadManager, ProgressCallback};

/// Download the archives of the selected components
pub async fn execute(options: &GlobalOptions, components: &[String]) -> Result<()> {
    let (_config, registry) = options.load()?;
    let selected = Resolver::new(&registry).select_components(components);
    let show_progress = options.output.shows_progress();
    if selected.is_empty() && show_progress {
        eprintln!("{} No components selected", status::WARNING);
    }

    let progress: &(dyn Fn(&Component) -> ProgressCallback + Sync) = &download_progress;
    let fetch_options = FetchOptions {
        quiet: !show_progress,
        progress: show_progress.then_some(progress),
    };
    let result = fetch_archives(&selected, &DownloadManager::new(), &fetch_options)
        .await
        .context("Download failed")?;

    if options.output.json {
        let summary = json!({
            "downloaded": result.downloaded.iter().map(|d| json!({
                "name": d.name,
                "path": d.path,
                "size": d.size,
                "sha256": d.sha256,
            })).collect::<Vec<_>>(),
            "skipped": result.skipped,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if show_progress {
        println!(
            "{} {} downloaded, {} already present",
            status::SUCCESS,
            result.downloaded.len(),
            result.skipped.len()
        );
    }
    Ok(())
}
