//! Component descriptors
//!
//! A component is one buildable unit of the distribution. It is described
//! declaratively in `components/<name>.toml` and becomes immutable once it is
//! registered.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::defaults;
use crate::core::manifest::BuildConfig;
use crate::core::registry::ComponentRegistry;
use crate::core::template::Vars;
use crate::error::{ResolverError, SetupError};

/// Pipeline stages driven by a declared command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Configure stage
    Configure,
    /// Build stage
    Build,
    /// Install stage
    Install,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure => write!(f, "Configure"),
            Self::Build => write!(f, "Build"),
            Self::Install => write!(f, "Install"),
        }
    }
}

/// Command, flags and environment overrides of one stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageCommand {
    /// Command to run
    pub command: String,

    /// Command arguments
    #[serde(default)]
    pub flags: Vec<String>,

    /// Environment variable overrides
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

impl StageCommand {
    /// Create a stage command without flags or environment
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            flags: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    /// Append an argument
    #[must_use]
    pub fn arg(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Set an environment override
    #[must_use]
    pub fn env(mut self, key: &str, value: impl Into<String>) -> Self {
        self.env.insert(key.to_string(), value.into());
        self
    }

    fn default_for(stage: Stage) -> Self {
        match stage {
            Stage::Configure => Self::new(defaults::DEFAULT_CONFIGURE_COMMAND),
            Stage::Build => Self::new(defaults::DEFAULT_MAKE_COMMAND),
            Stage::Install => Self::new(defaults::DEFAULT_MAKE_COMMAND)
                .arg("install")
                .arg("DESTDIR=${DEST_DIR}"),
        }
    }
}

/// A build dependency on another component, held by name.
///
/// The referenced component is looked up in the registry whenever the
/// dependency's contributions are requested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dependency {
    /// Name of the component depended on
    #[serde(rename = "name")]
    pub component_name: String,

    /// Compiler flags; `-I${DEP_PREFIX}/include` when absent
    #[serde(default)]
    pub cflags: Option<Vec<String>>,

    /// Linker flags; `-L${DEP_PREFIX}/lib` when absent
    #[serde(default)]
    pub ldflags: Option<Vec<String>>,

    /// Extra configure flags for the dependent
    #[serde(default)]
    pub configure_flags: Vec<String>,
}

impl Dependency {
    /// Depend on `component_name` with default flag contributions
    pub fn new(component_name: impl Into<String>) -> Self {
        Self {
            component_name: component_name.into(),
            cflags: None,
            ldflags: None,
            configure_flags: Vec::new(),
        }
    }

    /// Override the compiler flag contribution
    #[must_use]
    pub fn with_cflags<I: IntoIterator<Item = S>, S: Into<String>>(mut self, flags: I) -> Self {
        self.cflags = Some(flags.into_iter().map(Into::into).collect());
        self
    }

    /// Override the linker flag contribution
    #[must_use]
    pub fn with_ldflags<I: IntoIterator<Item = S>, S: Into<String>>(mut self, flags: I) -> Self {
        self.ldflags = Some(flags.into_iter().map(Into::into).collect());
        self
    }

    /// Add configure flags contributed to the dependent
    #[must_use]
    pub fn with_configure_flags<I: IntoIterator<Item = S>, S: Into<String>>(
        mut self,
        flags: I,
    ) -> Self {
        self.configure_flags
            .extend(flags.into_iter().map(Into::into));
        self
    }

    /// Whether this dependency refers to `name` (case-insensitive)
    pub fn refers_to(&self, name: &str) -> bool {
        self.component_name.eq_ignore_ascii_case(name)
    }

    /// Compiler flags contributed to `dependent`
    pub fn computed_cflags(
        &self,
        registry: &ComponentRegistry,
        dependent: &Component,
    ) -> Result<Vec<String>, ResolverError> {
        let default = ["-I${DEP_PREFIX}/include".to_string()];
        let flags = self.cflags.as_deref().unwrap_or(&default);
        self.expand(flags, registry, dependent)
    }

    /// Linker flags contributed to `dependent`
    pub fn computed_ldflags(
        &self,
        registry: &ComponentRegistry,
        dependent: &Component,
    ) -> Result<Vec<String>, ResolverError> {
        let default = ["-L${DEP_PREFIX}/lib".to_string()];
        let flags = self.ldflags.as_deref().unwrap_or(&default);
        self.expand(flags, registry, dependent)
    }

    /// Configure flags contributed to `dependent`
    pub fn computed_configure_flags(
        &self,
        registry: &ComponentRegistry,
        dependent: &Component,
    ) -> Result<Vec<String>, ResolverError> {
        self.expand(&self.configure_flags, registry, dependent)
    }

    fn expand(
        &self,
        flags: &[String],
        registry: &ComponentRegistry,
        dependent: &Component,
    ) -> Result<Vec<String>, ResolverError> {
        let target = registry.resolve_dependency(self, dependent)?;
        let vars = Vars::new()
            .with("DEP_NAME", target.name())
            .with("DEP_PREFIX", target.build_path().display().to_string())
            .with("DEPENDENT", dependent.name())
            .with(
                "DEPENDENT_PREFIX",
                dependent.build_path().display().to_string(),
            );
        Ok(vars.substitute_all(flags))
    }
}

/// A registered build target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    name: String,
    download_url: String,
    source_archive_file: PathBuf,
    working_dir: PathBuf,
    build_path: PathBuf,
    patches: Vec<String>,
    patches_dir: PathBuf,
    dependencies: Vec<Dependency>,
    single_pass_universal: bool,
    tar_flags: Vec<String>,
    configure: StageCommand,
    build: StageCommand,
    install: StageCommand,
}

impl Component {
    /// Create a component with default paths and stage commands
    pub fn new(name: impl Into<String>, config: &BuildConfig) -> Self {
        let name = name.into();
        Self {
            download_url: String::new(),
            source_archive_file: config.archives_dir.join(format!("{name}.tar.gz")),
            working_dir: config.work_dir.join(&name),
            build_path: config.build_root.join(&name),
            patches: Vec::new(),
            patches_dir: config.patches_dir.clone(),
            dependencies: Vec::new(),
            single_pass_universal: false,
            tar_flags: Vec::new(),
            configure: StageCommand::default_for(Stage::Configure),
            build: StageCommand::default_for(Stage::Build),
            install: StageCommand::default_for(Stage::Install),
            name,
        }
    }

    /// Parse a TOML descriptor
    pub fn from_toml(content: &str, path: &Path, config: &BuildConfig) -> Result<Self, SetupError> {
        let descriptor: ComponentDescriptor =
            toml::from_str(content).map_err(|e| SetupError::InvalidDescriptor {
                path: path.to_path_buf(),
                error: e.to_string(),
            })?;
        Ok(descriptor.into_component(config))
    }

    /// Read and parse a descriptor file
    pub fn load(path: &Path, config: &BuildConfig) -> Result<Self, SetupError> {
        let content = std::fs::read_to_string(path).map_err(|e| SetupError::ReadDescriptor {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::from_toml(&content, path, config)
    }

    /// Set the download URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.download_url = url.into();
        self
    }

    /// Set the source archive path
    #[must_use]
    pub fn with_archive(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_archive_file = path.into();
        self
    }

    /// Set the working directory
    #[must_use]
    pub fn with_working_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.working_dir = path.into();
        self
    }

    /// Set the build path
    #[must_use]
    pub fn with_build_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.build_path = path.into();
        self
    }

    /// Add a dependency
    #[must_use]
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a patch file
    #[must_use]
    pub fn with_patch(mut self, patch: impl Into<String>) -> Self {
        self.patches.push(patch.into());
        self
    }

    /// Set the patches directory
    #[must_use]
    pub fn with_patches_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.patches_dir = path.into();
        self
    }

    /// Add extra tar flags
    #[must_use]
    pub fn with_tar_flags<I: IntoIterator<Item = S>, S: Into<String>>(mut self, flags: I) -> Self {
        self.tar_flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Declare single-pass universal build support
    #[must_use]
    pub fn with_single_pass_universal(mut self, supported: bool) -> Self {
        self.single_pass_universal = supported;
        self
    }

    /// Replace a stage command
    #[must_use]
    pub fn with_stage(mut self, stage: Stage, command: StageCommand) -> Self {
        match stage {
            Stage::Configure => self.configure = command,
            Stage::Build => self.build = command,
            Stage::Install => self.install = command,
        }
        self
    }

    /// Component name as declared
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Download URL
    pub fn download_url(&self) -> &str {
        &self.download_url
    }

    /// Archive location on disk
    pub fn source_archive_file(&self) -> &Path {
        &self.source_archive_file
    }

    /// Scratch directory for single-pass builds
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Scratch directory of one architecture, a sibling of [`Self::working_dir`]
    pub fn arch_working_dir(&self, arch: &str) -> PathBuf {
        let mut name = self
            .working_dir
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from(&self.name));
        name.push(format!("-{arch}"));
        self.working_dir.with_file_name(name)
    }

    /// Final output tree; its existence means "already built"
    pub fn build_path(&self) -> &Path {
        &self.build_path
    }

    /// Whether the final output tree exists
    pub fn is_built(&self) -> bool {
        self.build_path.is_dir()
    }

    /// Ordered patch file names
    pub fn patches(&self) -> &[String] {
        &self.patches
    }

    /// Directory patches are relative to
    pub fn patches_dir(&self) -> &Path {
        &self.patches_dir
    }

    /// Ordered dependencies
    pub fn dependencies(&self) -> &[Dependency] {
        &self.dependencies
    }

    /// Whether one configure/build/install pass can target every architecture
    pub fn supports_single_pass_universal(&self) -> bool {
        self.single_pass_universal
    }

    /// Extra flags appended to the tar invocation
    pub fn tar_flags(&self) -> &[String] {
        &self.tar_flags
    }

    /// Declared command of a stage
    pub fn stage(&self, stage: Stage) -> &StageCommand {
        match stage {
            Stage::Configure => &self.configure,
            Stage::Build => &self.build,
            Stage::Install => &self.install,
        }
    }

    /// Whether this component lists `name` as a dependency
    pub fn depends_on(&self, name: &str) -> bool {
        self.dependencies.iter().any(|d| d.refers_to(name))
    }
}

/// On-disk descriptor format
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ComponentDescriptor {
    component: ComponentSection,

    #[serde(default)]
    dependencies: Vec<Dependency>,

    #[serde(default)]
    configure: Option<StageCommand>,

    #[serde(default)]
    build: Option<StageCommand>,

    #[serde(default)]
    install: Option<StageCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct ComponentSection {
    name: String,

    url: String,

    #[serde(default)]
    archive: Option<String>,

    #[serde(default)]
    single_pass_universal: bool,

    #[serde(default)]
    tar_flags: Vec<String>,

    #[serde(default)]
    patches: Vec<String>,

    #[serde(default)]
    patches_dir: Option<PathBuf>,

    #[serde(default)]
    working_dir: Option<PathBuf>,

    #[serde(default)]
    build_path: Option<PathBuf>,
}

impl ComponentDescriptor {
    fn into_component(self, config: &BuildConfig) -> Component {
        let section = self.component;
        let archive = section
            .archive
            .unwrap_or_else(|| archive_name_from_url(&section.url, &section.name));

        let mut component = Component::new(section.name, config)
            .with_archive(config.archives_dir.join(archive))
            .with_url(section.url)
            .with_single_pass_universal(section.single_pass_universal)
            .with_tar_flags(section.tar_flags);

        if let Some(dir) = section.patches_dir {
            component = component.with_patches_dir(config.patches_dir.join(dir));
        }
        if let Some(dir) = section.working_dir {
            component = component.with_working_dir(config.work_dir.join(dir));
        }
        if let Some(dir) = section.build_path {
            component = component.with_build_path(config.build_root.join(dir));
        }
        for patch in section.patches {
            component = component.with_patch(patch);
        }
        for dependency in self.dependencies {
            component = component.with_dependency(dependency);
        }

        let stages = [
            (Stage::Configure, self.configure),
            (Stage::Build, self.build),
            (Stage::Install, self.install),
        ];
        for (stage, command) in stages {
            if let Some(command) = command {
                component = component.with_stage(stage, command);
            }
        }

        component
    }
}

/// Last path segment of a URL, ignoring query and fragment
fn archive_name_from_url(url: &str, fallback: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);
    without_query
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && !s.contains(':'))
        .map_or_else(|| format!("{fallback}.tar.gz"), ToString::to_string)
}
