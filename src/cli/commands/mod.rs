//! CLI command implementations
//!
//! Each command is implemented in its own submodule.

pub mod build;
pub mod dep;
pub mod download;

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::PathBuf;

use crate::cli::output::OutputConfig;
use crate::config::defaults;
use crate::core::manifest::{BuildConfig, Manifest};
use crate::core::registry::ComponentRegistry;

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download component source archives
    Download {
        /// Components to download (default: all)
        components: Vec<String>,
    },

    /// Build components in dependency order
    Build {
        /// Components to build (default: all)
        components: Vec<String>,

        /// Also build unbuilt components depending on the selection
        #[arg(short, long)]
        missing: bool,
    },

    /// Print the resolved build order
    Dep {
        /// Components to resolve (default: all)
        components: Vec<String>,

        /// Include unbuilt components depending on the selection
        #[arg(short, long)]
        missing: bool,
    },
}

/// Options shared by every command
#[derive(Debug, Clone)]
pub struct GlobalOptions {
    /// Explicit configuration path
    pub config: Option<PathBuf>,
    /// Output settings
    pub output: OutputConfig,
}

impl GlobalOptions {
    /// Configuration file to load
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Ok(std::env::current_dir()?.join(defaults::CONFIG_FILE)),
        }
    }

    /// Load the build configuration and component registry
    pub fn load(&self) -> Result<(BuildConfig, ComponentRegistry)> {
        let path = self.config_path()?;
        let config = Manifest::load_config(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?;
        let registry = ComponentRegistry::load(&config).with_context(|| {
            format!(
                "Failed to load components from {}",
                config.components_dir.display()
            )
        })?;
        tracing::debug!(
            "Loaded {} components for {}",
            registry.len(),
            config.architectures.join(", ")
        );
        Ok((config, registry))
    }
}

impl Commands {
    /// Execute the command
    pub async fn run(self, options: &GlobalOptions) -> Result<()> {
        match self {
            Self::Download { components } => download::execute(options, &components).await,
            Self::Build {
                components,
                missing,
            } => build::execute(options, &components, missing).await,
            Self::Dep {
                components,
                missing,
            } => dep::execute(options, &components, missing),
        }
    }
}
