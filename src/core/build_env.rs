//! Build environment composition
//!
//! Turns a component's declared stage command into the concrete argument
//! vector and environment of one invocation. Configure and build stages pick
//! up the flags contributed by direct dependencies and have `ARCH`/`ARCH_FLAGS`
//! substituted; the install stage only knows `DEST_DIR`.

use std::collections::HashMap;
use std::path::Path;

use crate::config::defaults;
use crate::core::component::{Component, Stage};
use crate::core::manifest::Platform;
use crate::core::registry::ComponentRegistry;
use crate::core::template::Vars;
use crate::error::ResolverError;

/// Compiler flags variable
pub const CFLAGS: &str = "CFLAGS";

/// Linker flags variable
pub const LDFLAGS: &str = "LDFLAGS";

/// Fully composed invocation of one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedStage {
    /// Command to run
    pub command: String,
    /// Substituted arguments
    pub args: Vec<String>,
    /// Complete environment: inherited variables overlaid with composed ones
    pub env: HashMap<String, String>,
}

impl ComposedStage {
    /// Command and arguments joined by spaces
    pub fn command_line(&self) -> String {
        std::iter::once(self.command.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Composes stage invocations for components of one registry
#[derive(Debug, Clone)]
pub struct Composer<'a> {
    registry: &'a ComponentRegistry,
    platform: Platform,
    base_env: HashMap<String, String>,
}

impl<'a> Composer<'a> {
    /// Composer inheriting the current process environment
    pub fn new(registry: &'a ComponentRegistry, platform: Platform) -> Self {
        Self {
            registry,
            platform,
            base_env: std::env::vars().collect(),
        }
    }

    /// Replace the inherited environment
    #[must_use]
    pub fn with_base_env(mut self, env: HashMap<String, String>) -> Self {
        self.base_env = env;
        self
    }

    /// Compose `stage` of `component`.
    ///
    /// `architectures` drives `ARCH`/`ARCH_FLAGS` for configure and build;
    /// `dest_dir` is bound to `DEST_DIR` for install and ignored otherwise.
    pub fn compose(
        &self,
        component: &Component,
        stage: Stage,
        architectures: &[String],
        dest_dir: &Path,
    ) -> Result<ComposedStage, ResolverError> {
        let composed = match stage {
            Stage::Configure | Stage::Build => {
                self.compose_with_dependencies(component, stage, architectures)?
            }
            Stage::Install => self.compose_install(component, dest_dir),
        };

        tracing::debug!(
            "{stage} {}: {}",
            component.name(),
            composed.command_line()
        );
        Ok(composed)
    }

    /// Variables available to configure and build arguments
    pub fn arch_vars(&self, architectures: &[String]) -> Vars {
        let arch = match architectures {
            [single] => single.clone(),
            _ => defaults::UNIVERSAL_ARCH.to_string(),
        };
        let arch_flags = if self.platform.supports_arch_flags() {
            architectures
                .iter()
                .map(|a| format!("-arch {a}"))
                .collect::<Vec<_>>()
                .join(" ")
        } else {
            String::new()
        };

        Vars::new().with("ARCH", arch).with("ARCH_FLAGS", arch_flags)
    }

    fn compose_with_dependencies(
        &self,
        component: &Component,
        stage: Stage,
        architectures: &[String],
    ) -> Result<ComposedStage, ResolverError> {
        let declared = component.stage(stage);
        let mut args = declared.flags.clone();
        let mut overrides: HashMap<String, String> = declared
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        for dependency in component.dependencies() {
            if stage == Stage::Configure {
                args.extend(dependency.computed_configure_flags(self.registry, component)?);
            }
            let cflags = dependency.computed_cflags(self.registry, component)?;
            let ldflags = dependency.computed_ldflags(self.registry, component)?;
            self.append_flags(&mut overrides, CFLAGS, &cflags);
            self.append_flags(&mut overrides, LDFLAGS, &ldflags);
        }

        let vars = self.arch_vars(architectures);
        Ok(self.finish(declared.command.clone(), &args, overrides, &vars))
    }

    fn compose_install(&self, component: &Component, dest_dir: &Path) -> ComposedStage {
        let declared = component.stage(Stage::Install);
        let overrides = declared
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let vars = Vars::new().with("DEST_DIR", dest_dir.display().to_string());
        self.finish(declared.command.clone(), &declared.flags, overrides, &vars)
    }

    /// Existing value (override, else inherited) followed by `flags`
    fn append_flags(&self, overrides: &mut HashMap<String, String>, key: &str, flags: &[String]) {
        if flags.is_empty() {
            return;
        }
        let existing = overrides
            .get(key)
            .or_else(|| self.base_env.get(key))
            .cloned()
            .unwrap_or_default();

        let mut parts = Vec::with_capacity(flags.len() + 1);
        if !existing.is_empty() {
            parts.push(existing);
        }
        parts.extend(flags.iter().cloned());
        overrides.insert(key.to_string(), parts.join(" "));
    }

    fn finish(
        &self,
        command: String,
        args: &[String],
        overrides: HashMap<String, String>,
        vars: &Vars,
    ) -> ComposedStage {
        let mut env = self.base_env.clone();
        for (key, value) in overrides {
            env.insert(key, vars.substitute(&value));
        }

        ComposedStage {
            command,
            args: vars.substitute_all(args),
            env,
        }
    }
}
