//! Declarative resource manifests.
//!
//! A manifest lists the tools, toolkits, knowledge bases and agents of one
//! deployment together with the dependencies between them. Loading a manifest
//! always validates it; a `Manifest` value is therefore known to have unique,
//! non-empty names, resolvable dependencies and no cycles.

pub mod definition;
mod loader;

pub use definition::{ResourceDescriptor, ResourceKind};
pub use loader::ManifestFormat;

use crate::error::{ManifestError, Result};
use crate::orderer::DependencyOrderer;
use crate::plan::Action;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Manifest {
    name: Option<String>,
    resources: Vec<ResourceDescriptor>,
    base_dir: PathBuf,
}

impl Manifest {
    /// Read, parse and validate a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let raw = loader::read(path)?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let manifest = Self::from_resources(raw.resources, base_dir)?.with_name(raw.name);
        tracing::debug!(
            path = %path.display(),
            resources = manifest.resources.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Parse manifest text without touching the filesystem
    pub fn parse(contents: &str, format: ManifestFormat, base_dir: &Path) -> Result<Self> {
        let raw = loader::parse(contents, format).map_err(|reason| {
            crate::error::LifecycleError::ManifestParse {
                path: base_dir.to_path_buf(),
                reason,
            }
        })?;
        Ok(Self::from_resources(raw.resources, base_dir.to_path_buf())?.with_name(raw.name))
    }

    /// Build a manifest from in-memory descriptors, validating them
    pub fn from_resources(
        resources: Vec<ResourceDescriptor>,
        base_dir: PathBuf,
    ) -> std::result::Result<Self, ManifestError> {
        validate(&resources)?;
        Ok(Self {
            name: None,
            resources,
            base_dir,
        })
    }

    fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Resources in declaration order
    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Directory the manifest was loaded from; commands run here
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Narrow the manifest to `names` and everything an action on them needs.
    ///
    /// For import that is the selected resources plus their transitive
    /// dependencies; for remove it is the selected resources plus everything
    /// that transitively depends on them. Declaration order is preserved and
    /// dependencies on resources outside the selection are dropped.
    pub fn select(
        &self,
        names: &[String],
        action: Action,
    ) -> std::result::Result<Self, ManifestError> {
        if names.is_empty() {
            return Ok(self.clone());
        }

        let mut edges: HashMap<&str, Vec<&str>> = HashMap::new();
        for resource in &self.resources {
            for dep in &resource.depends_on {
                let (from, to) = match action {
                    Action::Import => (resource.name.as_str(), dep.as_str()),
                    Action::Remove => (dep.as_str(), resource.name.as_str()),
                };
                edges.entry(from).or_default().push(to);
            }
        }

        let mut keep: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = Vec::new();
        for name in names {
            let resource = self
                .get(name)
                .ok_or_else(|| ManifestError::UnknownResource(name.clone()))?;
            stack.push(resource.name.as_str());
        }

        while let Some(current) = stack.pop() {
            if !keep.insert(current) {
                continue;
            }
            if let Some(next) = edges.get(current) {
                stack.extend(next.iter().copied());
            }
        }

        let resources = self
            .resources
            .iter()
            .filter(|r| keep.contains(r.name.as_str()))
            .map(|r| {
                let mut r = r.clone();
                r.depends_on.retain(|dep| keep.contains(dep.as_str()));
                r
            })
            .collect();

        Ok(Self {
            name: self.name.clone(),
            resources,
            base_dir: self.base_dir.clone(),
        })
    }
}

/// Names must be non-empty and unique, dependencies must resolve, and the
/// dependency graph must be acyclic
fn validate(resources: &[ResourceDescriptor]) -> std::result::Result<(), ManifestError> {
    let mut seen = HashSet::with_capacity(resources.len());
    for (i, resource) in resources.iter().enumerate() {
        if resource.name.trim().is_empty() {
            return Err(ManifestError::EmptyName(i + 1));
        }
        if !seen.insert(resource.name.as_str()) {
            return Err(ManifestError::DuplicateName(resource.name.clone()));
        }
    }

    for resource in resources {
        if let Some(missing) = resource
            .depends_on
            .iter()
            .find(|dep| !seen.contains(dep.as_str()))
        {
            return Err(ManifestError::UnknownDependency {
                resource: resource.name.clone(),
                dependency: missing.clone(),
            });
        }
    }

    DependencyOrderer::new(resources).creation_order()?;
    Ok(())
}
