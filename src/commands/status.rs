//! Status command: one row per managed repository

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct StatusRow {
  name: String,
  module_path: String,
  branch: String,
  dirty: bool,
  latest_tag: Option<String>,
  pending_commits: usize,
}

/// Show branch, cleanliness, latest tag, and pending commit count for every
/// managed repository
pub fn run_status(ctx: &ReleaseContext, json: bool) -> ConvoyResult<()> {
  let mut rows = Vec::new();

  for repo in &ctx.repos {
    let git = ctx.git_for(repo, false)?;
    let status = git.status()?;
    let latest_tag = git.latest_tag()?;
    let pending_commits = match &latest_tag {
      Some(tag) => git.commits_since(tag)?,
      None => git.log_since(None)?.len(),
    };

    rows.push(StatusRow {
      name: repo.name.clone(),
      module_path: repo.module_path.clone(),
      branch: status.branch,
      dirty: status.is_dirty,
      latest_tag,
      pending_commits,
    });
  }

  if json {
    println!("{}", serde_json::to_string_pretty(&rows)?);
    return Ok(());
  }

  if rows.is_empty() {
    println!("⚠️  No managed repositories found (no submodules with a Cargo.toml)");
    return Ok(());
  }

  let name_width = rows.iter().map(|r| r.name.len()).max().unwrap_or(4).max(4);
  println!("📦 {} managed repositor{}", rows.len(), if rows.len() == 1 { "y" } else { "ies" });
  println!();
  println!("   {:<name_width$}  {:<10}  {:<6}  {:<10}  PENDING", "REPO", "BRANCH", "STATE", "TAG");
  for row in &rows {
    println!(
      "   {:<name_width$}  {:<10}  {:<6}  {:<10}  {}",
      row.name,
      row.branch,
      if row.dirty { "dirty" } else { "clean" },
      row.latest_tag.as_deref().unwrap_or("-"),
      row.pending_commits
    );
  }

  Ok(())
}
