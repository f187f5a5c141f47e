//! Universal-build engine
//!
//! Builds components in resolver order. A component is built in a single pass
//! when it can target every architecture at once or only one architecture is
//! configured. Otherwise each architecture is built in its own working
//! directory into its own temporary tree, and the trees are merged into the
//! component's build path.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::defaults;
use crate::core::build_env::Composer;
use crate::core::component::Component;
use crate::core::manifest::BuildConfig;
use crate::core::merge::{MergeReport, Merger};
use crate::core::pipeline::Pipeline;
use crate::core::registry::ComponentRegistry;
use crate::core::resolver::Resolver;
use crate::core::universalizer::{default_universalizers, ArchDirs, Universalizer};
use crate::error::{FilesystemError, ResolverError, UnibuildError, UniversalizeError};
use crate::infra::filesystem;

/// How a component is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// One pipeline run for all architectures
    SinglePass,
    /// One pipeline run per architecture followed by a merge
    PerArchitecture,
}

impl BuildMode {
    /// Mode for `component` under `config`
    pub fn for_component(component: &Component, config: &BuildConfig) -> Self {
        if component.supports_single_pass_universal() || !config.is_universal() {
            Self::SinglePass
        } else {
            Self::PerArchitecture
        }
    }
}

/// Result of building one component
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutcome {
    /// Component name
    pub component: String,
    /// Mode used
    pub mode: BuildMode,
    /// Merge summary for per-architecture builds
    pub merge: Option<MergeReport>,
}

/// Drives builds of a registry under one configuration
#[derive(Debug)]
pub struct Builder {
    config: BuildConfig,
    registry: ComponentRegistry,
    universalizers: Arc<[Arc<dyn Universalizer>]>,
    base_env: Option<HashMap<String, String>>,
    quiet: bool,
}

impl Builder {
    /// Builder with the built-in universalizers
    pub fn new(config: BuildConfig, registry: ComponentRegistry) -> Self {
        Self {
            config,
            registry,
            universalizers: default_universalizers().into(),
            base_env: None,
            quiet: false,
        }
    }

    /// Replace the universalizer list; lookup follows list order
    #[must_use]
    pub fn with_universalizers(mut self, universalizers: Vec<Arc<dyn Universalizer>>) -> Self {
        self.universalizers = universalizers.into();
        self
    }

    /// Environment inherited by tools instead of the process environment
    #[must_use]
    pub fn with_base_env(mut self, env: HashMap<String, String>) -> Self {
        self.base_env = Some(env);
        self
    }

    /// Suppress console progress lines
    #[must_use]
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Ordered build plan for a request
    pub fn plan<S: AsRef<str>>(
        &self,
        requested: &[S],
        include_missing_dependents: bool,
    ) -> Result<Vec<&Component>, ResolverError> {
        Resolver::new(&self.registry).resolve(requested, include_missing_dependents)
    }

    /// Resolve and build a request; stops at the first failing component
    pub async fn build<S: AsRef<str>>(
        &self,
        requested: &[S],
        include_missing_dependents: bool,
    ) -> Result<Vec<BuildOutcome>, UnibuildError> {
        let plan = self.plan(requested, include_missing_dependents)?;
        tracing::info!(
            "Build plan: {}",
            plan.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );

        let mut outcomes = Vec::with_capacity(plan.len());
        for component in plan {
            outcomes.push(self.build_component(component).await?);
        }
        Ok(outcomes)
    }

    /// Build one component into its build path
    pub async fn build_component(&self, component: &Component) -> Result<BuildOutcome, UnibuildError> {
        let composer = self.composer();
        let pipeline = Pipeline::new(&composer).quiet(self.quiet);
        pipeline.preflight(component)?;

        let mode = BuildMode::for_component(component, &self.config);
        tracing::info!("Building {} ({mode:?})", component.name());

        let merge = match mode {
            BuildMode::SinglePass => {
                filesystem::create_dir_all(component.working_dir())?;
                pipeline
                    .run(
                        component,
                        component.working_dir(),
                        &self.config.architectures,
                        component.build_path(),
                    )
                    .await?;
                None
            }
            BuildMode::PerArchitecture => Some(self.build_per_architecture(&pipeline, component).await?),
        };

        Ok(BuildOutcome {
            component: component.name().to_string(),
            mode,
            merge,
        })
    }

    async fn build_per_architecture(
        &self,
        pipeline: &Pipeline<'_>,
        component: &Component,
    ) -> Result<MergeReport, UnibuildError> {
        // Dropping the TempDirs removes the trees on every exit path
        let mut temps = Vec::with_capacity(self.config.architectures.len());
        for arch in &self.config.architectures {
            let prefix = format!("{}-{}-{arch}-", defaults::ARCH_TEMP_PREFIX, component.name());
            let temp = tempfile::Builder::new()
                .prefix(&prefix)
                .tempdir()
                .map_err(|e| FilesystemError::CreateDir {
                    path: std::env::temp_dir().join(&prefix),
                    error: e.to_string(),
                })?;
            temps.push(temp);
        }

        let arch_dirs: ArchDirs = self
            .config
            .architectures
            .iter()
            .zip(&temps)
            .map(|(arch, temp)| (arch.clone(), temp.path().to_path_buf()))
            .collect();

        let limit = Semaphore::new(self.config.jobs.max(1));
        let builds = self
            .config
            .architectures
            .iter()
            .zip(&temps)
            .map(|(arch, temp)| Self::build_architecture(pipeline, component, arch, temp.path(), &limit));

        if self.config.parallel_architectures {
            futures::future::try_join_all(builds).await?;
        } else {
            for build in builds {
                build.await?;
            }
        }

        // Hashing, copying and lipo are blocking
        let merger = Merger::new(self.universalizers.clone());
        let build_path = component.build_path().to_path_buf();
        let report = tokio::task::spawn_blocking(move || merger.merge(&arch_dirs, &build_path))
            .await
            .map_err(|e| UniversalizeError::MergeAborted {
                path: component.build_path().to_path_buf(),
                error: e.to_string(),
            })??;
        tracing::info!(
            "Merged {}: {} copied, {} universalized",
            component.name(),
            report.copied,
            report.universalized.len()
        );
        Ok(report)
    }

    async fn build_architecture(
        pipeline: &Pipeline<'_>,
        component: &Component,
        arch: &str,
        dest: &Path,
        limit: &Semaphore,
    ) -> Result<(), UnibuildError> {
        // The semaphore is never closed
        let _permit = limit.acquire().await.ok();

        let working_dir = component.arch_working_dir(arch);
        filesystem::reset_dir(&working_dir)?;
        pipeline
            .run(component, &working_dir, &[arch.to_string()], dest)
            .await
    }

    fn composer(&self) -> Composer<'_> {
        let composer = Composer::new(&self.registry, self.config.platform.clone());
        match &self.base_env {
            Some(env) => composer.with_base_env(env.clone()),
            None => composer,
        }
    }
}
