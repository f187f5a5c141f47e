//! Component registry
//!
//! Holds every known component in registration order and indexes them by
//! lower-cased name. The registry is read-only once setup finishes.

use std::collections::HashMap;
use std::path::Path;

use crate::core::component::{Component, Dependency};
use crate::core::manifest::BuildConfig;
use crate::error::{ResolverError, SetupError};

/// Registered components
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: Vec<Component>,
    index: HashMap<String, usize>,
}

impl ComponentRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component; names are unique case-insensitively
    pub fn register(&mut self, component: Component) -> Result<(), SetupError> {
        let key = component.name().to_lowercase();
        if self.index.contains_key(&key) {
            return Err(SetupError::DuplicateComponent {
                name: component.name().to_string(),
            });
        }
        self.index.insert(key, self.components.len());
        self.components.push(component);
        Ok(())
    }

    /// Build a registry from components, failing on the first duplicate
    pub fn from_components<I>(components: I) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = Component>,
    {
        let mut registry = Self::new();
        for component in components {
            registry.register(component)?;
        }
        Ok(registry)
    }

    /// Load every `*.toml` descriptor of `config.components_dir`, in file-name order
    pub fn load(config: &BuildConfig) -> Result<Self, SetupError> {
        Self::load_dir(&config.components_dir, config)
    }

    /// Load every `*.toml` descriptor of `dir`, in file-name order
    pub fn load_dir(dir: &Path, config: &BuildConfig) -> Result<Self, SetupError> {
        let entries = std::fs::read_dir(dir).map_err(|e| SetupError::ReadDescriptor {
            path: dir.to_path_buf(),
            error: e.to_string(),
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        let mut registry = Self::new();
        for path in paths {
            let component = Component::load(&path, config)?;
            tracing::debug!("Registered {} from {}", component.name(), path.display());
            registry.register(component)?;
        }
        Ok(registry)
    }

    /// Look up a component by case-insensitive name
    pub fn find(&self, name: &str) -> Option<&Component> {
        self.index
            .get(&name.to_lowercase())
            .map(|&i| &self.components[i])
    }

    /// Position of a component in registration order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(&name.to_lowercase()).copied()
    }

    /// Resolve a dependency of `dependent` to its registered component
    pub fn resolve_dependency(
        &self,
        dependency: &Dependency,
        dependent: &Component,
    ) -> Result<&Component, ResolverError> {
        self.find(&dependency.component_name)
            .ok_or_else(|| ResolverError::MissingDependency {
                component: dependent.name().to_string(),
                dependency: dependency.component_name.clone(),
            })
    }

    /// Components that list `name` as a direct dependency
    pub fn dependents_of<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Component> + 'a {
        self.components.iter().filter(move |c| c.depends_on(name))
    }

    /// All components in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Component> {
        self.components.iter()
    }

    /// Number of registered components
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether no component is registered
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::generators::component_name;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn config(root: &Path) -> BuildConfig {
        BuildConfig::new(vec!["x86_64".to_string()], root).unwrap()
    }

    #[test]
    fn test_duplicate_registration_is_setup_error() {
        let cfg = config(Path::new("/r"));
        let mut registry = ComponentRegistry::new();
        registry.register(Component::new("zlib", &cfg)).unwrap();

        let err = registry.register(Component::new("ZLib", &cfg)).unwrap_err();
        assert!(matches!(err, SetupError::DuplicateComponent { name } if name == "ZLib"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_find_is_case_insensitive() {
        let cfg = config(Path::new("/r"));
        let registry =
            ComponentRegistry::from_components([Component::new("OpenSSL", &cfg)]).unwrap();

        assert_eq!(registry.find("openssl").map(Component::name), Some("OpenSSL"));
        assert_eq!(registry.find("OPENSSL").map(Component::name), Some("OpenSSL"));
        assert!(registry.find("libressl").is_none());
    }

    #[test]
    fn test_missing_dependency_is_reported_lazily() {
        let cfg = config(Path::new("/r"));
        let curl = Component::new("curl", &cfg).with_dependency(Dependency::new("nghttp2"));
        // Registration succeeds even though nghttp2 is unknown
        let registry = ComponentRegistry::from_components([curl.clone()]).unwrap();

        let err = registry
            .resolve_dependency(&curl.dependencies()[0], &curl)
            .unwrap_err();
        assert!(matches!(
            err,
            ResolverError::MissingDependency { component, dependency }
                if component == "curl" && dependency == "nghttp2"
        ));
    }

    #[test]
    fn test_dependents_of() {
        let cfg = config(Path::new("/r"));
        let registry = ComponentRegistry::from_components([
            Component::new("zlib", &cfg),
            Component::new("png", &cfg).with_dependency(Dependency::new("zlib")),
            Component::new("gd", &cfg).with_dependency(Dependency::new("png")),
        ])
        .unwrap();

        let names: Vec<_> = registry.dependents_of("ZLIB").map(Component::name).collect();
        assert_eq!(names, vec!["png"]);
    }

    #[test]
    fn test_load_dir_orders_by_file_name() {
        let temp = TempDir::new().unwrap();
        let cfg = config(temp.path());
        std::fs::create_dir_all(&cfg.components_dir).unwrap();
        for (file, name) in [("20-png.toml", "png"), ("10-zlib.toml", "zlib")] {
            std::fs::write(
                cfg.components_dir.join(file),
                format!("[component]\nname = \"{name}\"\nurl = \"http://x/{name}.tar.gz\"\n"),
            )
            .unwrap();
        }
        std::fs::write(cfg.components_dir.join("README"), "not a descriptor").unwrap();

        let registry = ComponentRegistry::load(&cfg).unwrap();
        let names: Vec<_> = registry.iter().map(Component::name).collect();
        assert_eq!(names, vec!["zlib", "png"]);
    }

    #[test]
    fn test_load_dir_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        let cfg = config(temp.path());
        std::fs::create_dir_all(&cfg.components_dir).unwrap();
        for file in ["a.toml", "b.toml"] {
            std::fs::write(
                cfg.components_dir.join(file),
                "[component]\nname = \"zlib\"\nurl = \"http://x/zlib.tar.gz\"\n",
            )
            .unwrap();
        }

        assert!(matches!(
            ComponentRegistry::load(&cfg),
            Err(SetupError::DuplicateComponent { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Any casing of a registered name finds the component and cannot
        /// register a second one
        #[test]
        fn prop_names_are_case_insensitive(name in component_name()) {
            let cfg = config(Path::new("/r"));
            let mut registry = ComponentRegistry::new();
            registry.register(Component::new(name.clone(), &cfg)).unwrap();

            for variant in [name.to_lowercase(), name.to_uppercase()] {
                prop_assert_eq!(registry.find(&variant).map(Component::name), Some(name.as_str()));
                let duplicate = registry.register(Component::new(variant, &cfg));
                prop_assert!(
                    matches!(duplicate, Err(SetupError::DuplicateComponent { .. })),
                    "duplicate accepted"
                );
            }
            prop_assert_eq!(registry.len(), 1);
        }
    }
}
