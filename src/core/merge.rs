//! Universal merge
//!
//! Reassembles one build tree from per-architecture install trees. Paths whose
//! content is identical for every architecture are copied from the first
//! tree; every other path goes through the first applicable universalizer.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::universalizer::{ArchDirs, Universalizer};
use crate::error::{UnibuildError, UniversalizeError};
use crate::infra::filesystem::{self, FingerprintMap};

/// Split of every path seen in any architecture tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Present everywhere with identical fingerprints
    pub common: BTreeSet<PathBuf>,
    /// Missing somewhere or differing between architectures
    pub arch_dependent: BTreeSet<PathBuf>,
}

/// Classify paths of per-architecture fingerprint maps
pub fn classify(maps: &[FingerprintMap]) -> Classification {
    let mut fingerprints: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
    for map in maps {
        for (path, fingerprint) in map {
            fingerprints
                .entry(path.as_path())
                .or_default()
                .push(fingerprint.as_str());
        }
    }

    let mut classification = Classification::default();
    for (path, seen) in fingerprints {
        let common = seen.len() == maps.len() && seen.windows(2).all(|w| w[0] == w[1]);
        if common {
            classification.common.insert(path.to_path_buf());
        } else {
            classification.arch_dependent.insert(path.to_path_buf());
        }
    }
    classification
}

/// What a merge did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Files and links copied from the first architecture
    pub copied: usize,
    /// Architecture-dependent paths and the universalizer that merged each
    pub universalized: Vec<(PathBuf, String)>,
}

/// Merges architecture trees using an ordered universalizer list
#[derive(Debug, Clone)]
pub struct Merger {
    universalizers: Arc<[Arc<dyn Universalizer>]>,
}

impl Merger {
    /// Merger consulting `universalizers` in order
    pub fn new(universalizers: impl Into<Arc<[Arc<dyn Universalizer>]>>) -> Self {
        Self {
            universalizers: universalizers.into(),
        }
    }

    /// Rebuild `build_path` from the trees in `arch_dirs`.
    ///
    /// The build path is removed first. An architecture-dependent path no
    /// universalizer accepts aborts the merge before that path is written.
    pub fn merge(
        &self,
        arch_dirs: &ArchDirs,
        build_path: &Path,
    ) -> Result<MergeReport, UnibuildError> {
        let Some(first) = arch_dirs.first() else {
            return Ok(MergeReport::default());
        };

        let maps = arch_dirs
            .iter()
            .map(|(_, dir)| filesystem::fingerprint_tree(dir))
            .collect::<Result<Vec<_>, _>>()?;
        let classification = classify(&maps);
        tracing::info!(
            "Merging {}: {} common, {} architecture-dependent paths",
            build_path.display(),
            classification.common.len(),
            classification.arch_dependent.len()
        );

        filesystem::reset_dir(build_path)?;
        let copied = filesystem::copy_tree(first, build_path, &classification.arch_dependent)?;

        let mut universalized = Vec::with_capacity(classification.arch_dependent.len());
        for relative in &classification.arch_dependent {
            let universalizer = self
                .universalizers
                .iter()
                .find(|u| u.applicable_to(relative, arch_dirs))
                .ok_or_else(|| UniversalizeError::UniversalizationFailed {
                    path: relative.clone(),
                    arch_dirs: arch_dirs.to_vec(),
                })?;

            let dest = build_path.join(relative);
            if let Some(parent) = dest.parent() {
                filesystem::create_dir_all(parent)?;
            }
            tracing::debug!("{} merges {}", universalizer.name(), relative.display());
            universalizer.merge(relative, &dest, arch_dirs)?;
            universalized.push((relative.clone(), universalizer.name().to_string()));
        }

        Ok(MergeReport {
            copied,
            universalized,
        })
    }
}
