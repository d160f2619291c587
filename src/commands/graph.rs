//! Graph command: release levels and dependency edges

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use crate::graph::RepoGraph;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Serialize)]
struct GraphReport {
  levels: Vec<Vec<String>>,
  dependencies: BTreeMap<String, Vec<String>>,
}

/// Print the release-level layering and each repository's dependencies
///
/// With `--include-external`, requirements outside the product show up as
/// unmanaged leaves in the dependency lists.
pub fn run_graph(ctx: &ReleaseContext, include_external: bool, json: bool) -> ConvoyResult<()> {
  // The context graph excludes externals; rebuild when they were requested
  let rebuilt;
  let graph: &RepoGraph = if include_external {
    rebuilt = RepoGraph::build(&ctx.repos, true)?;
    &rebuilt
  } else {
    ctx.graph.as_ref()
  };

  let levels = graph.release_levels()?;
  let mut dependencies = BTreeMap::new();
  for name in graph.managed_names() {
    dependencies.insert(name.clone(), graph.dependencies_of(&name)?);
  }

  if json {
    let report = GraphReport { levels, dependencies };
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("🗺  Release order ({} level{})", levels.len(), if levels.len() == 1 { "" } else { "s" });
  for (i, level) in levels.iter().enumerate() {
    println!("   {}: {}", i, level.join(", "));
  }

  println!();
  for (name, deps) in &dependencies {
    if deps.is_empty() {
      println!("   {} (no dependencies)", name);
    } else {
      println!("   {} → {}", name, deps.join(", "));
    }
  }

  Ok(())
}
