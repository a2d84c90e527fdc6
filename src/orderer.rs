//! Dependency ordering for manifest resources.
//!
//! Creation order is a depth-first topological sort in which roots are
//! visited in declaration order and dependencies in the order they are listed,
//! so independent resources keep their manifest order. Deletion order is the
//! exact reverse of creation order.

use crate::error::ManifestError;
use crate::manifest::ResourceDescriptor;
use crate::plan::Action;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    Visiting,
    Done,
}

pub struct DependencyOrderer<'a> {
    resources: &'a [ResourceDescriptor],
    index: HashMap<&'a str, usize>,
}

impl<'a> DependencyOrderer<'a> {
    pub fn new(resources: &'a [ResourceDescriptor]) -> Self {
        let mut index = HashMap::with_capacity(resources.len());
        for (i, resource) in resources.iter().enumerate() {
            // First declaration wins; duplicates are rejected by manifest validation
            index.entry(resource.name.as_str()).or_insert(i);
        }
        Self { resources, index }
    }

    /// Dependencies strictly before their dependents
    pub fn creation_order(&self) -> Result<Vec<&'a ResourceDescriptor>, ManifestError> {
        let mut marks = vec![Mark::Unvisited; self.resources.len()];
        let mut path = Vec::new();
        let mut sorted = Vec::with_capacity(self.resources.len());

        for i in 0..self.resources.len() {
            self.visit(i, &mut marks, &mut path, &mut sorted)?;
        }

        Ok(sorted.into_iter().map(|i| &self.resources[i]).collect())
    }

    /// Dependents strictly before their dependencies
    pub fn deletion_order(&self) -> Result<Vec<&'a ResourceDescriptor>, ManifestError> {
        let mut order = self.creation_order()?;
        order.reverse();
        Ok(order)
    }

    pub fn order_for(&self, action: Action) -> Result<Vec<&'a ResourceDescriptor>, ManifestError> {
        match action {
            Action::Import => self.creation_order(),
            Action::Remove => self.deletion_order(),
        }
    }

    fn visit(
        &self,
        i: usize,
        marks: &mut [Mark],
        path: &mut Vec<usize>,
        sorted: &mut Vec<usize>,
    ) -> Result<(), ManifestError> {
        match marks[i] {
            Mark::Done => return Ok(()),
            Mark::Visiting => return Err(self.cycle_error(path, i)),
            Mark::Unvisited => {}
        }

        marks[i] = Mark::Visiting;
        path.push(i);

        let resource = &self.resources[i];
        for dep in &resource.depends_on {
            let dep_index = self.index.get(dep.as_str()).copied().ok_or_else(|| {
                ManifestError::UnknownDependency {
                    resource: resource.name.clone(),
                    dependency: dep.clone(),
                }
            })?;
            self.visit(dep_index, marks, path, sorted)?;
        }

        path.pop();
        marks[i] = Mark::Done;
        sorted.push(i);

        Ok(())
    }

    /// Build the cycle from the point where `reentered` first appears on the path
    fn cycle_error(&self, path: &[usize], reentered: usize) -> ManifestError {
        let start = path.iter().position(|&p| p == reentered).unwrap_or(0);
        let mut cycle: Vec<String> = path[start..]
            .iter()
            .map(|&p| self.resources[p].name.clone())
            .collect();
        cycle.push(self.resources[reentered].name.clone());
        ManifestError::CyclicDependency { cycle }
    }
}
