//! Dependency graph between entity mappings
//!
//! An edge `a -> b` means mapping `a` references the entity produced by `b`
//! (via an `entity:` property), so `b` must be mapped first.
//!
//! Ordering uses Kahn's algorithm with a stable tie-break: among mappings
//! with no unmet dependencies, the one declared first goes first. Without
//! any references the order is simply the declaration order.

use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use crate::error::MappingError;

#[derive(Debug, Clone, Default)]
pub struct MappingGraph {
    /// Mapping names in declaration order
    names: Vec<String>,
    /// For each node, the indices of the nodes it depends on
    dependencies: Vec<BTreeSet<usize>>,
}

impl MappingGraph {
    /// Build the graph from `(name, dependencies)` pairs in declaration order.
    ///
    /// Dependencies on names that are not nodes are dropped; binding reports
    /// those.
    pub fn new<'a, I, D>(nodes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, D)>,
        D: IntoIterator<Item = &'a String>,
    {
        let nodes: Vec<(&str, Vec<&String>)> = nodes
            .into_iter()
            .map(|(name, deps)| (name, deps.into_iter().collect()))
            .collect();
        let index: HashMap<&str, usize> = nodes
            .iter()
            .enumerate()
            .map(|(idx, (name, _))| (*name, idx))
            .collect();

        let names = nodes.iter().map(|(name, _)| name.to_string()).collect();
        let dependencies = nodes
            .iter()
            .map(|(_, deps)| {
                deps.iter()
                    .filter_map(|dep| index.get(dep.as_str()).copied())
                    .collect()
            })
            .collect();

        Self {
            names,
            dependencies,
        }
    }

    /// Mappings that `name` depends on
    pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
        self.position(name)
            .map(|idx| {
                self.dependencies[idx]
                    .iter()
                    .map(|&dep| self.names[dep].as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Mappings that depend on `name`
    pub fn dependents_of(&self, name: &str) -> Vec<&str> {
        let Some(target) = self.position(name) else {
            return Vec::new();
        };
        self.dependencies
            .iter()
            .enumerate()
            .filter(|(_, deps)| deps.contains(&target))
            .map(|(idx, _)| self.names[idx].as_str())
            .collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Mapping names with every dependency before its dependents
    pub fn topological_order(&self) -> Result<Vec<String>, MappingError> {
        let n = self.names.len();

        // dependents[i] = nodes that must wait for i
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut in_degree: Vec<usize> = vec![0; n];
        for (idx, deps) in self.dependencies.iter().enumerate() {
            for &dep in deps {
                dependents[dep].push(idx);
                in_degree[idx] += 1;
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = in_degree
            .iter()
            .enumerate()
            .filter(|(_, &degree)| degree == 0)
            .map(|(idx, _)| Reverse(idx))
            .collect();

        let mut sorted: Vec<usize> = Vec::with_capacity(n);
        while let Some(Reverse(idx)) = ready.pop() {
            sorted.push(idx);
            for &next in &dependents[idx] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if sorted.len() != n {
            let mappings = (0..n)
                .filter(|idx| in_degree[*idx] > 0)
                .map(|idx| self.names[idx].clone())
                .collect();
            return Err(MappingError::DependencyCycle { mappings });
        }

        Ok(sorted.into_iter().map(|idx| self.names[idx].clone()).collect())
    }
}
