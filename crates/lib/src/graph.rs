//! Dependency resolution against a [`PackageIndex`].
//!
//! Requirements are walked breadth-first in declaration order. Each package
//! is selected once, at the highest version satisfying the first constraint
//! that reaches it; later constraints are checked against that selection and
//! reported as conflicts, never re-solved.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ConfigError;
use crate::index::{PackageIndex, PackageRecord};
use crate::recipe::{Requirement, Version};

#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("package '{package}' required by '{requested_by}' is not in the index")]
  NotFound { package: String, requested_by: String },

  #[error("no version of '{package}' satisfies '{constraint}' required by '{requested_by}' (available: {available})")]
  NoMatchingVersion {
    package: String,
    constraint: String,
    requested_by: String,
    available: String,
  },

  #[error("version conflict on '{package}': {selected} was selected but '{requested_by}' requires '{constraint}'")]
  Conflict {
    package: String,
    selected: String,
    constraint: String,
    requested_by: String,
  },

  #[error("dependency cycle through '{package}'")]
  Cycle { package: String },

  #[error("index entry '{package}' has an invalid requirement: {source}")]
  InvalidRecord {
    package: String,
    #[source]
    source: ConfigError,
  },
}

/// Resolved packages with edges from each dependency to its dependents.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
  graph: DiGraph<PackageRecord, ()>,
  nodes: BTreeMap<String, NodeIndex>,
  direct: BTreeSet<String>,
  order: Vec<NodeIndex>,
}

impl DependencyGraph {
  pub fn empty() -> Self {
    Self::default()
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  pub fn get(&self, name: &str) -> Option<&PackageRecord> {
    self.nodes.get(name).map(|idx| &self.graph[*idx])
  }

  /// Packages with dependencies before dependents, ties broken by name.
  pub fn packages(&self) -> impl Iterator<Item = &PackageRecord> {
    self.order.iter().map(|idx| &self.graph[*idx])
  }

  /// Whether `name` was required by the recipe itself.
  pub fn is_direct(&self, name: &str) -> bool {
    self.direct.contains(name)
  }

  /// Immediate dependencies of `name`, sorted.
  pub fn dependencies_of(&self, name: &str) -> Vec<&str> {
    let Some(idx) = self.nodes.get(name) else {
      return Vec::new();
    };
    let mut deps: Vec<&str> = self
      .graph
      .neighbors_directed(*idx, Direction::Incoming)
      .map(|dep| self.graph[dep].name.as_str())
      .collect();
    deps.sort_unstable();
    deps.dedup();
    deps
  }

  /// Kahn's algorithm over a name-ordered ready set.
  fn compute_order(&mut self) -> Result<(), ResolveError> {
    // Cycle detection (self loops included) before ordering.
    toposort(&self.graph, None).map_err(|cycle| ResolveError::Cycle {
      package: self.graph[cycle.node_id()].name.clone(),
    })?;

    let mut remaining: BTreeMap<NodeIndex, usize> = self
      .graph
      .node_indices()
      .map(|idx| (idx, self.graph.neighbors_directed(idx, Direction::Incoming).count()))
      .collect();
    let mut ready: BTreeSet<(String, NodeIndex)> = remaining
      .iter()
      .filter(|(_, count)| **count == 0)
      .map(|(idx, _)| (self.graph[*idx].name.clone(), *idx))
      .collect();

    let mut order = Vec::with_capacity(self.graph.node_count());
    while let Some((_, idx)) = ready.pop_first() {
      order.push(idx);
      for dependent in self.graph.neighbors_directed(idx, Direction::Outgoing) {
        if let Some(count) = remaining.get_mut(&dependent) {
          *count -= 1;
          if *count == 0 {
            ready.insert((self.graph[dependent].name.clone(), dependent));
          }
        }
      }
    }
    self.order = order;
    Ok(())
  }
}

/// Resolve `requirements` declared by `root` against `index`.
pub fn resolve(root: &str, requirements: &[Requirement], index: &dyn PackageIndex) -> Result<DependencyGraph, ResolveError> {
  let mut graph = DependencyGraph::empty();
  let mut queue: VecDeque<(Option<String>, Requirement)> =
    requirements.iter().cloned().map(|req| (None, req)).collect();
  graph.direct = requirements.iter().map(|r| r.name.clone()).collect();

  while let Some((requester, requirement)) = queue.pop_front() {
    let requested_by = requester.clone().unwrap_or_else(|| root.to_string());

    let idx = match graph.nodes.get(&requirement.name) {
      Some(idx) => {
        let selected = &graph.graph[*idx];
        if !requirement.constraint.matches(&selected.parsed_version()) {
          return Err(ResolveError::Conflict {
            package: requirement.name.clone(),
            selected: selected.version.clone(),
            constraint: requirement.constraint.to_string(),
            requested_by,
          });
        }
        *idx
      }
      None => {
        let record = select(&requirement, &requested_by, index)?;
        debug!(package = %record.name, version = %record.version, requested_by = %requested_by, "selected package");
        for reference in &record.requires {
          let transitive = Requirement::parse(reference).map_err(|source| ResolveError::InvalidRecord {
            package: record.reference(),
            source,
          })?;
          queue.push_back((Some(record.name.clone()), transitive));
        }
        let idx = graph.graph.add_node(record);
        graph.nodes.insert(requirement.name.clone(), idx);
        idx
      }
    };

    if let Some(requester) = requester
      && let Some(dependent) = graph.nodes.get(&requester)
    {
      graph.graph.update_edge(idx, *dependent, ());
    }
  }

  graph.compute_order()?;
  info!(root = %root, packages = graph.len(), "dependency graph resolved");
  Ok(graph)
}

fn select(requirement: &Requirement, requested_by: &str, index: &dyn PackageIndex) -> Result<PackageRecord, ResolveError> {
  let candidates = index.candidates(&requirement.name);
  if candidates.is_empty() {
    return Err(ResolveError::NotFound {
      package: requirement.name.clone(),
      requested_by: requested_by.to_string(),
    });
  }

  let best = candidates
    .iter()
    .map(|record| (record.parsed_version(), *record))
    .filter(|(version, _)| requirement.constraint.matches(version))
    .max_by(|a, b| a.0.cmp(&b.0))
    .map(|(_, record)| record.clone());

  best.ok_or_else(|| {
    let mut available: Vec<Version> = candidates.iter().map(|r| r.parsed_version()).collect();
    available.sort();
    ResolveError::NoMatchingVersion {
      package: requirement.name.clone(),
      constraint: requirement.constraint.to_string(),
      requested_by: requested_by.to_string(),
      available: available.iter().map(Version::as_str).collect::<Vec<_>>().join(", "),
    }
  })
}
