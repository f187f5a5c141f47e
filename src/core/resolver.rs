//! Dependency resolution
//!
//! Selects the components a request touches and computes a build order in
//! which every component comes after its in-plan dependencies.

use std::collections::HashSet;

use crate::config::defaults;
use crate::core::component::Component;
use crate::core::registry::ComponentRegistry;
use crate::error::ResolverError;

/// Resolves build requests against a registry
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    registry: &'a ComponentRegistry,
}

impl<'a> Resolver<'a> {
    /// Create a resolver over a registry
    pub fn new(registry: &'a ComponentRegistry) -> Self {
        Self { registry }
    }

    /// Compute the ordered build plan for a request.
    ///
    /// An empty request or one containing `all` selects every component.
    /// With `include_missing_dependents`, components depending (directly or
    /// transitively) on the selection whose build path does not exist yet are
    /// added as well.
    pub fn resolve<S: AsRef<str>>(
        &self,
        requested: &[S],
        include_missing_dependents: bool,
    ) -> Result<Vec<&'a Component>, ResolverError> {
        let mut candidates = self.select(requested);
        if include_missing_dependents {
            self.add_missing_dependents(&mut candidates);
        }
        candidates.sort_unstable();
        self.order(&candidates)
    }

    /// Components named by a request, in registry order, without any
    /// dependency handling
    pub fn select_components<S: AsRef<str>>(&self, requested: &[S]) -> Vec<&'a Component> {
        let components: Vec<&'a Component> = self.registry.iter().collect();
        let mut positions = self.select(requested);
        positions.sort_unstable();
        positions.into_iter().map(|pos| components[pos]).collect()
    }

    /// Registry positions matching the request
    fn select<S: AsRef<str>>(&self, requested: &[S]) -> Vec<usize> {
        let all = requested.is_empty()
            || requested
                .iter()
                .any(|r| r.as_ref().eq_ignore_ascii_case(defaults::ALL_COMPONENTS));
        if all {
            return (0..self.registry.len()).collect();
        }

        let mut selected = Vec::new();
        for name in requested {
            match self.registry.position(name.as_ref()) {
                Some(pos) if !selected.contains(&pos) => selected.push(pos),
                Some(_) => {}
                None => tracing::warn!("Unknown component '{}' ignored", name.as_ref()),
            }
        }
        selected
    }

    /// Close `candidates` under "unbuilt component depending on a candidate"
    fn add_missing_dependents(&self, candidates: &mut Vec<usize>) {
        let components: Vec<&Component> = self.registry.iter().collect();
        let mut found_new = true;

        while found_new {
            found_new = false;
            let mut i = 0;
            while i < candidates.len() {
                let name = components[candidates[i]].name();
                for dependent in self.registry.dependents_of(name) {
                    let Some(pos) = self.registry.position(dependent.name()) else {
                        continue;
                    };
                    if !candidates.contains(&pos) && !dependent.is_built() {
                        tracing::debug!(
                            "Adding {} (depends on {name}, not built yet)",
                            dependent.name()
                        );
                        candidates.push(pos);
                        found_new = true;
                    }
                }
                i += 1;
            }
        }
    }

    /// Stable repeated-scan topological order of `candidates`
    fn order(&self, candidates: &[usize]) -> Result<Vec<&'a Component>, ResolverError> {
        let components: Vec<&'a Component> = self.registry.iter().collect();

        // Dependency positions per candidate; unknown names fail here
        let mut deps: Vec<(usize, Vec<usize>)> = Vec::with_capacity(candidates.len());
        for &pos in candidates {
            let component = components[pos];
            let mut positions = Vec::with_capacity(component.dependencies().len());
            for dependency in component.dependencies() {
                let target = self.registry.resolve_dependency(dependency, component)?;
                if let Some(p) = self.registry.position(target.name()) {
                    positions.push(p);
                }
            }
            deps.push((pos, positions));
        }

        let in_plan: HashSet<usize> = candidates.iter().copied().collect();
        let mut emitted: HashSet<usize> = HashSet::with_capacity(candidates.len());
        let mut plan = Vec::with_capacity(candidates.len());

        while !deps.is_empty() {
            let before = deps.len();
            deps.retain(|(pos, positions)| {
                let ready = positions
                    .iter()
                    .all(|p| !in_plan.contains(p) || emitted.contains(p));
                if ready {
                    emitted.insert(*pos);
                    plan.push(components[*pos]);
                }
                !ready
            });

            if deps.len() == before {
                return Err(ResolverError::CircularDependency {
                    remaining: deps
                        .iter()
                        .map(|(pos, _)| components[*pos].name().to_string())
                        .collect(),
                });
            }
        }

        Ok(plan)
    }
}
