//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::LazyLock;

use crate::config::defaults;
use commands::{Commands, GlobalOptions};
use output::OutputConfig;

static LONG_VERSION: LazyLock<String> = LazyLock::new(|| {
    let sha = option_env!("VERGEN_GIT_SHA").unwrap_or("unknown");
    let date = option_env!("VERGEN_BUILD_DATE").unwrap_or("unknown");
    format!("{} (git {sha}, built {date})", env!("CARGO_PKG_VERSION"))
});

/// Unibuild - universal source-build orchestrator
///
/// Downloads component sources, builds them in dependency order and merges
/// per-architecture builds into universal output trees.
#[derive(Parser, Debug)]
#[command(name = "unibuild")]
#[command(author, version, about, long_about = None)]
#[command(long_version = LONG_VERSION.as_str())]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Build configuration file (default: ./unibuild.toml)
    #[arg(short, long, global = true, env = defaults::ENV_CONFIG, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Output settings from the global flags
    pub fn output_config(&self) -> OutputConfig {
        OutputConfig::new(self.quiet, self.json, self.verbose)
    }

    /// Execute the CLI command
    pub async fn run(self) -> Result<()> {
        let options = GlobalOptions {
            config: self.config.clone(),
            output: self.output_config(),
        };
        if let Some(cmd) = self.command {
            cmd.run(&options).await
        } else {
            // No subcommand provided, show help
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_dep_flags_parse() {
        let cli = Cli::try_parse_from(["unibuild", "--json", "dep", "--missing", "zlib", "png"])
            .unwrap();
        assert!(cli.json);
        match cli.command {
            Some(Commands::Dep {
                components,
                missing,
            }) => {
                assert!(missing);
                assert_eq!(components, vec!["zlib", "png"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["unibuild", "build", "all", "-q", "-c", "/x/unibuild.toml"])
            .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.config, Some(PathBuf::from("/x/unibuild.toml")));
    }
}
