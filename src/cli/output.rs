//! Output formatting and progress indicators
//!
//! Console verbosity, tracing setup, download progress bars and error
//! display.

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use crate::core::component::Component;
use crate::infra::download::ProgressCallback;

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";
}

/// Global output settings from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputConfig {
    /// Suppress progress output
    pub quiet: bool,
    /// Machine-readable output
    pub json: bool,
    /// `-v` count
    pub verbose: u8,
}

impl OutputConfig {
    /// Settings from the global flags
    pub fn new(quiet: bool, json: bool, verbose: u8) -> Self {
        Self {
            quiet,
            json,
            verbose,
        }
    }

    /// Whether human progress lines are printed
    pub fn shows_progress(&self) -> bool {
        !self.quiet && !self.json
    }

    /// Default log filter for the verbosity; `RUST_LOG` overrides it
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => "warn",
            (false, 1) => "info",
            (false, _) => "debug",
        }
    }

    /// Install the tracing subscriber, logging to stderr
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.log_filter()));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}

/// Create a progress bar for downloads
pub fn create_download_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
            .expect("Invalid progress bar template")
            .progress_chars("█▓▒░"),
    );
    pb
}

/// Progress callback driving a download bar for one component
pub fn download_progress(_component: &Component) -> ProgressCallback {
    let pb = create_download_bar(0);
    Box::new(move |downloaded, total| {
        if total > 0 && pb.length() != Some(total) {
            pb.set_length(total);
        }
        pb.set_position(downloaded);
        if total > 0 && downloaded >= total {
            pb.finish_and_clear();
        }
    })
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    eprintln!("{} Error: {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        eprintln!("  Caused by: {cause}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_filter_follows_verbosity() {
        assert_eq!(OutputConfig::new(false, false, 0).log_filter(), "warn");
        assert_eq!(OutputConfig::new(false, false, 1).log_filter(), "info");
        assert_eq!(OutputConfig::new(false, false, 3).log_filter(), "debug");
        assert_eq!(OutputConfig::new(true, false, 2).log_filter(), "error");
    }

    #[test]
    fn test_json_hides_progress() {
        assert!(OutputConfig::new(false, false, 0).shows_progress());
        assert!(!OutputConfig::new(false, true, 0).shows_progress());
        assert!(!OutputConfig::new(true, false, 0).shows_progress());
    }

    #[test]
    fn test_download_bar_length() {
        let pb = create_download_bar(1024);
        assert_eq!(pb.length(), Some(1024));
    }
}
