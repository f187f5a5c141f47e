//! Component build pipeline
//!
//! Drives one build attempt of a component through
//! Unpack → Patch → Configure → Build → Install. Stages run strictly in
//! sequence, each in an explicit working directory, and the first failing
//! tool aborts the attempt.

use std::path::Path;

use crate::config::defaults;
use crate::core::build_env::Composer;
use crate::core::component::{Component, Stage};
use crate::error::UnibuildError;
use crate::infra::archive;
use crate::infra::process::{self, Invocation};

/// Runs pipeline stages for components
#[derive(Debug, Clone)]
pub struct Pipeline<'a> {
    composer: &'a Composer<'a>,
    quiet: bool,
}

impl<'a> Pipeline<'a> {
    /// Pipeline composing stage invocations with `composer`
    pub fn new(composer: &'a Composer<'a>) -> Self {
        Self {
            composer,
            quiet: false,
        }
    }

    /// Suppress console progress lines
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Check that the tools the fixed stages need are installed
    pub fn preflight(&self, component: &Component) -> Result<(), UnibuildError> {
        process::require_tool(defaults::TAR_TOOL)?;
        if !component.patches().is_empty() {
            process::require_tool(defaults::PATCH_TOOL)?;
        }
        Ok(())
    }

    /// Run every stage in `working_dir`, installing into `dest_dir`
    pub async fn run(
        &self,
        component: &Component,
        working_dir: &Path,
        architectures: &[String],
        dest_dir: &Path,
    ) -> Result<(), UnibuildError> {
        self.unpack(component, working_dir).await?;
        self.patch(component, working_dir).await?;
        self.stage(component, Stage::Configure, working_dir, architectures, dest_dir)
            .await?;
        self.stage(component, Stage::Build, working_dir, architectures, dest_dir)
            .await?;
        self.stage(component, Stage::Install, working_dir, architectures, dest_dir)
            .await
    }

    /// Extract the source archive into `working_dir`
    pub async fn unpack(&self, component: &Component, working_dir: &Path) -> Result<(), UnibuildError> {
        let invocation = archive::unpack_invocation(
            component.source_archive_file(),
            working_dir,
            component.tar_flags(),
        )?;
        self.announce("Unpack", component, &format!("(work dir {})", working_dir.display()));
        invocation.run(component.name(), "Unpack").await?;
        Ok(())
    }

    /// Apply declared patches in order; nothing to do without patches
    pub async fn patch(&self, component: &Component, working_dir: &Path) -> Result<(), UnibuildError> {
        if component.patches().is_empty() {
            tracing::debug!("No patches for {}", component.name());
            return Ok(());
        }

        self.announce("Patch", component, "");
        for patch in component.patches() {
            let patch_file = component.patches_dir().join(patch);
            Invocation::new(defaults::PATCH_TOOL, working_dir)
                .args(["-p0", "-i"])
                .arg(patch_file.display().to_string())
                .run(component.name(), "Patch")
                .await?;
        }
        Ok(())
    }

    /// Run a declared stage with the composed arguments and environment.
    ///
    /// The build stage goes through the shell.
    pub async fn stage(
        &self,
        component: &Component,
        stage: Stage,
        working_dir: &Path,
        architectures: &[String],
        dest_dir: &Path,
    ) -> Result<(), UnibuildError> {
        let composed = self
            .composer
            .compose(component, stage, architectures, dest_dir)?;

        let detail = match stage {
            Stage::Install => format!("(into {})", dest_dir.display()),
            _ => format!("({})", architectures.join(", ")),
        };
        self.announce(&stage.to_string(), component, &detail);

        Invocation::new(composed.command, working_dir)
            .args(composed.args)
            .env(composed.env)
            .through_shell(stage == Stage::Build)
            .run(component.name(), &stage.to_string())
            .await?;
        Ok(())
    }

    fn announce(&self, stage: &str, component: &Component, detail: &str) {
        tracing::info!("{stage} {} {detail}", component.name());
        if !self.quiet {
            if detail.is_empty() {
                println!("==> {stage} {} ...", component.name());
            } else {
                println!("==> {stage} {} {detail} ...", component.name());
            }
        }
    }
}
