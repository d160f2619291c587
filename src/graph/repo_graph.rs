//! Repository dependency graph built from scanned manifests + petgraph
//!
//! ## Graph Structure
//!
//! - **Directed Graph**: `A → B` means "A depends on B"
//! - **Nodes**: managed repositories, plus unmanaged leaves for external
//!   requirements when requested
//! - **Edges**: manifest requirements resolved against managed module paths
//! - **Index**: name and module-path lookups via integer node indices
//!
//! Release ordering is *layered*, not a single linear order: level `i` holds
//! every repository whose managed dependencies all live in levels `< i`, so a
//! whole level can be released concurrently.

use crate::core::error::{ConfigError, ConvoyError, ConvoyResult, PlanError};
use crate::manifest::RepoInfo;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// A repository node in the dependency graph
#[derive(Debug, Clone)]
pub struct RepoNode {
  pub name: String,
  pub module_path: String,
  /// False for external requirements surfaced by `include_external`
  pub is_managed: bool,
}

/// Repository dependency graph
#[derive(Debug)]
pub struct RepoGraph {
  graph: DiGraph<RepoNode, ()>,
  name_to_node: HashMap<String, NodeIndex>,
}

impl RepoGraph {
  /// Build the graph from scanned repositories
  ///
  /// Requirements that match no managed module path are external; they are
  /// ignored unless `include_external` is set, in which case they appear as
  /// unmanaged leaf nodes (inspection only). Duplicate module paths and
  /// dependency cycles are construction errors.
  pub fn build(repos: &[RepoInfo], include_external: bool) -> ConvoyResult<Self> {
    let mut graph: DiGraph<RepoNode, ()> = DiGraph::new();
    let mut name_to_node = HashMap::new();
    let mut module_to_node: HashMap<String, NodeIndex> = HashMap::new();

    for repo in repos {
      if let Some(&existing) = module_to_node.get(&repo.module_path) {
        return Err(ConvoyError::Config(ConfigError::DuplicateModulePath {
          module_path: repo.module_path.clone(),
          repos: vec![graph[existing].name.clone(), repo.name.clone()],
        }));
      }
      let idx = graph.add_node(RepoNode {
        name: repo.name.clone(),
        module_path: repo.module_path.clone(),
        is_managed: true,
      });
      name_to_node.insert(repo.name.clone(), idx);
      module_to_node.insert(repo.module_path.clone(), idx);
    }

    for repo in repos {
      let from = name_to_node[&repo.name];
      for requirement in &repo.requirements {
        match module_to_node.get(requirement) {
          Some(&to) if to != from => {
            graph.add_edge(from, to, ());
          }
          Some(_) => {} // self edges excluded at scan time; belt here
          None if include_external => {
            let idx = *module_to_node.entry(requirement.clone()).or_insert_with(|| {
              graph.add_node(RepoNode {
                name: requirement.clone(),
                module_path: requirement.clone(),
                is_managed: false,
              })
            });
            graph.add_edge(from, idx, ());
          }
          None => {}
        }
      }
    }

    let built = Self { graph, name_to_node };

    // Cycles are fatal at construction, before any planning happens
    built.release_levels()?;

    Ok(built)
  }

  /// All managed repository names, sorted
  pub fn managed_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self
      .graph
      .node_indices()
      .filter(|&ix| self.graph[ix].is_managed)
      .map(|ix| self.graph[ix].name.clone())
      .collect();
    names.sort();
    names
  }

  pub fn contains(&self, name: &str) -> bool {
    self.name_to_node.contains_key(name)
  }

  /// Layered topological sort over every managed repository
  pub fn release_levels(&self) -> ConvoyResult<Vec<Vec<String>>> {
    let candidates: HashSet<NodeIndex> = self
      .graph
      .node_indices()
      .filter(|&ix| self.graph[ix].is_managed)
      .collect();
    self.levels_of(&candidates)
  }

  /// Layered topological sort restricted to `subset`
  ///
  /// Level assignment only counts dependencies *inside* the subset: a
  /// dependency that is not being released is already satisfied and cannot
  /// gate ordering.
  pub fn release_levels_for(&self, subset: &HashSet<String>) -> ConvoyResult<Vec<Vec<String>>> {
    let mut candidates = HashSet::new();
    for name in subset {
      let idx = self.find(name)?;
      candidates.insert(idx);
    }
    self.levels_of(&candidates)
  }

  /// Module paths this repository requires (managed and, when the graph was
  /// built with `include_external`, external)
  pub fn dependencies_of(&self, name: &str) -> ConvoyResult<Vec<String>> {
    let idx = self.find(name)?;
    let mut deps: Vec<String> = self
      .graph
      .neighbors_directed(idx, Direction::Outgoing)
      .map(|d| self.graph[d].module_path.clone())
      .collect();
    deps.sort();
    deps.dedup();
    Ok(deps)
  }

  /// Managed repositories transitively required by `names`, including the
  /// starting set itself
  pub fn dependency_closure(&self, names: &[String]) -> ConvoyResult<HashSet<String>> {
    let mut closure = HashSet::new();
    let mut stack = Vec::new();

    for name in names {
      stack.push(self.find(name)?);
    }

    while let Some(idx) = stack.pop() {
      if !self.graph[idx].is_managed || !closure.insert(self.graph[idx].name.clone()) {
        continue;
      }
      for dep in self.graph.neighbors_directed(idx, Direction::Outgoing) {
        stack.push(dep);
      }
    }

    Ok(closure)
  }

  fn find(&self, name: &str) -> ConvoyResult<NodeIndex> {
    self
      .name_to_node
      .get(name)
      .copied()
      .ok_or_else(|| ConvoyError::Plan(PlanError::UnknownRepo { name: name.to_string() }))
  }

  /// Kahn layering over `candidates`; edges to nodes outside the candidate
  /// set are treated as already satisfied
  fn levels_of(&self, candidates: &HashSet<NodeIndex>) -> ConvoyResult<Vec<Vec<String>>> {
    let mut remaining: HashSet<NodeIndex> = candidates.clone();
    let mut dep_count: HashMap<NodeIndex, usize> = remaining
      .iter()
      .map(|&ix| {
        let count = self
          .graph
          .neighbors_directed(ix, Direction::Outgoing)
          .filter(|dep| remaining.contains(dep))
          .count();
        (ix, count)
      })
      .collect();

    let mut levels = Vec::new();
    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().copied().filter(|ix| dep_count[ix] == 0).collect();

      if ready.is_empty() {
        let mut stuck: Vec<String> = remaining.iter().map(|&ix| self.graph[ix].name.clone()).collect();
        stuck.sort();
        return Err(ConvoyError::Plan(PlanError::CycleDetected { repos: stuck }));
      }

      ready.sort_by(|a, b| self.graph[*a].name.cmp(&self.graph[*b].name));

      for &idx in &ready {
        remaining.remove(&idx);
        for dependent in self.graph.neighbors_directed(idx, Direction::Incoming) {
          if remaining.contains(&dependent)
            && let Some(count) = dep_count.get_mut(&dependent)
          {
            *count -= 1;
          }
        }
      }

      levels.push(ready.iter().map(|&ix| self.graph[ix].name.clone()).collect());
    }

    Ok(levels)
  }
}
