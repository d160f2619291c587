//! Release execution: consume a persisted plan and perform the tagging,
//! pushing, and parent finalize sequence in dependency order
//!
//! State machine per run:
//!
//! ```text
//! Loaded → PreflightChecked → {per level: Tagged → Pushed} → ParentFinalized → Cleared
//! ```
//!
//! A single repository failure is recorded and the run continues; the apply
//! as a whole fails at the end if anything failed, and the plan file stays on
//! disk so a corrected re-run resumes where this one stopped. No repository
//! in level k is touched before every repository in levels < k has completed
//! (success or recorded failure).

use crate::core::context::ReleaseContext;
use crate::core::error::{ConvoyError, ConvoyResult, PlanError, PreflightIssue};
use crate::core::vcs::SystemGit;
use crate::release::plan::{ExecState, ReleasePlan};
use crate::ui::progress::LevelProgress;
use rayon::prelude::*;
use std::path::Path;

/// Flags controlling one apply run
#[derive(Debug, Clone, Copy, Default)]
pub struct ApplyOptions {
  /// Push tags (and the finalized parent) to origin
  pub push: bool,
  /// Log every mutating git call instead of executing it
  pub dry_run: bool,
  /// Proceed despite preflight violations
  pub force: bool,
  /// Skip the parent finalize step
  pub skip_parent: bool,
}

/// Apply a persisted plan
pub fn apply(ctx: &ReleaseContext, plan: &mut ReleasePlan, opts: &ApplyOptions) -> ConvoyResult<()> {
  // The context rebuilt the graph from the *current* repository set; a
  // planned repository that vanished means structural drift since planning
  for name in plan.selected_names() {
    if ctx.repo(&name).is_none() {
      return Err(ConvoyError::Plan(PlanError::RepoVanished { name }));
    }
  }

  // Honor human edits to selected_bump: next versions derive from the plan
  // file's bump, not from whatever was printed at plan time
  for row in plan.repos.values_mut() {
    if row.selected {
      row.next_version = row.selected_bump.apply(&row.current_version);
    }
  }

  preflight(ctx, plan, opts)?;

  if opts.dry_run {
    println!("🔍 Dry-run: mutating git calls are logged, not executed");
  }

  let mut failed: Vec<String> = Vec::new();
  let progress = LevelProgress::new();
  let levels = plan.release_levels.clone();

  for (level_idx, level) in levels.iter().enumerate() {
    let mut targets: Vec<(String, std::path::PathBuf, String)> = Vec::new();
    for name in level {
      let Some(row) = plan.repos.get(name) else { continue };
      if !row.selected {
        continue;
      }
      if already_done(row.exec, opts.push) {
        println!("   ⏭  {}: already completed, skipping", name);
        continue;
      }
      let Some(repo) = ctx.repo(name) else { continue };
      let tag_name = format!("{}{}", ctx.config.release.tag_prefix, row.next_version);
      targets.push((name.clone(), repo.directory.clone(), tag_name));
    }

    if targets.is_empty() {
      continue;
    }

    let names: Vec<&str> = targets.iter().map(|(n, _, _)| n.as_str()).collect();
    println!("🚀 Level {}: {}", level_idx, names.join(", "));
    let bar = progress.start_level(level_idx, targets.len());

    // No intra-level dependency exists, so repositories fan out; levels
    // themselves stay strictly ordered
    let results: Vec<(String, String, ConvoyResult<()>)> = targets
      .par_iter()
      .map(|(name, dir, tag_name)| {
        let result = release_repo(ctx, name, dir, tag_name, opts);
        progress.inc(&bar);
        (name.clone(), tag_name.clone(), result)
      })
      .collect();

    for (name, tag_name, result) in results {
      let Some(row) = plan.repos.get_mut(&name) else { continue };
      match result {
        Ok(()) => {
          row.exec = if opts.push { ExecState::Pushed } else { ExecState::Tagged };
          println!("   ✅ {}: {}", name, tag_name);
        }
        Err(e) => {
          row.exec = ExecState::Failed;
          eprintln!("   ❌ {}: {}", name, e);
          failed.push(name);
        }
      }
    }

    // Persist progress after every level so a corrected re-run resumes
    if !opts.dry_run {
      plan.save(&ctx.plan_path())?;
    }
  }

  // Parent finalize waits for a fully successful run: tagging the root
  // against a partial release would record an incomplete version set. A
  // resumed apply finalizes once every repository is through.
  if failed.is_empty() {
    if !(opts.skip_parent || plan.skip_parent) {
      finalize_parent(ctx, plan, opts).map_err(|e| ConvoyError::ParentFinalizeFailed { reason: Box::new(e) })?;
    }
  } else if !(opts.skip_parent || plan.skip_parent) {
    println!("   ⏸  Parent finalize deferred until every repository succeeds");
  }

  if failed.is_empty() {
    if !opts.dry_run {
      ReleasePlan::clear(&ctx.plan_path())?;
    }
    println!("\n✅ Release applied{}", if opts.dry_run { " (dry-run)" } else { "" });
    Ok(())
  } else {
    failed.sort();
    Err(ConvoyError::ApplyFailed { failed })
  }
}

/// A repository already satisfied by a previous run needs no work
fn already_done(exec: ExecState, push: bool) -> bool {
  match exec {
    ExecState::Pushed => true,
    ExecState::Tagged => !push,
    ExecState::Pending | ExecState::Failed => false,
  }
}

/// Check branch and cleanliness across every selected repository, reporting
/// all violations at once before aborting
fn preflight(ctx: &ReleaseContext, plan: &ReleasePlan, opts: &ApplyOptions) -> ConvoyResult<()> {
  let expected = &ctx.config.release.branch;
  let selected = plan.selected_names();
  let mut issues = Vec::new();

  println!("🔎 Preflight ({} repositories)", selected.len());
  for name in &selected {
    let Some(repo) = ctx.repo(name) else { continue };
    let git = ctx.git_for(repo, false)?;
    let status = git.status()?;

    if status.branch == *expected && !status.is_dirty {
      println!("   ✓ {} ({})", name, status.branch);
    } else {
      let issue = PreflightIssue {
        repo: name.clone(),
        branch: status.branch,
        expected_branch: expected.clone(),
        dirty: status.is_dirty,
      };
      println!("   ✗ {} {}", name, issue.describe());
      issues.push(issue);
    }
  }

  if !issues.is_empty() {
    if opts.force {
      println!("   ⚠️  Proceeding despite preflight issues (--force)");
    } else {
      // All-or-nothing: releasing part of an inconsistent product would
      // leave the dependency graph's version references incoherent
      return Err(ConvoyError::ReleaseBlocked { issues });
    }
  }

  Ok(())
}

/// Tag and push a single repository
fn release_repo(ctx: &ReleaseContext, name: &str, dir: &Path, tag_name: &str, opts: &ApplyOptions) -> ConvoyResult<()> {
  let git = SystemGit::open(dir, ctx.timeout(), opts.dry_run)?;

  if !opts.force {
    let status = git.status()?;
    if status.branch != ctx.config.release.branch || status.is_dirty {
      return Err(ConvoyError::message(format!(
        "'{}' changed state since preflight: on '{}'{}",
        name,
        status.branch,
        if status.is_dirty { ", dirty" } else { "" }
      )));
    }
  }

  if git.has_tag(tag_name)? {
    // The target tag already exists; the plan is satisfied for this repo
    println!("   ℹ️  {}: tag {} already exists", name, tag_name);
  } else {
    git.tag(tag_name, &format!("Release {} {}", name, tag_name))?;
  }

  if opts.push {
    push_with_retry(&git, tag_name)?;
  }

  Ok(())
}

/// Push a ref, retrying once when the failure was a timeout (transient)
fn push_with_retry(git: &SystemGit, refname: &str) -> ConvoyResult<()> {
  match git.push_tag(refname) {
    Err(ConvoyError::Git(e)) if e.is_retryable() => git.push_tag(refname),
    other => other,
  }
}

/// Record the released child versions in the aggregating root: stage only
/// the submodule pointers, commit, tag with the greatest released version,
/// push
fn finalize_parent(ctx: &ReleaseContext, plan: &ReleasePlan, opts: &ApplyOptions) -> ConvoyResult<()> {
  let prefix = &ctx.config.release.tag_prefix;

  let released: Vec<(String, semver::Version)> = plan
    .repos
    .iter()
    .filter(|(_, row)| row.selected && matches!(row.exec, ExecState::Tagged | ExecState::Pushed))
    .map(|(name, row)| (name.clone(), row.next_version.clone()))
    .collect();

  let Some(parent_version) = released.iter().map(|(_, v)| v.clone()).max() else {
    return Ok(()); // nothing was released, nothing to record
  };

  let git = ctx.git_for_root(opts.dry_run)?;

  let paths: Vec<String> = released.iter().map(|(name, _)| name.clone()).collect();
  git.stage(&paths)?;

  let message = parent_commit_message(&released, prefix);
  if opts.dry_run {
    git.commit(&message)?; // logs only
  } else if git.has_staged_changes()? {
    git.commit(&message)?;
    println!("📦 Parent commit: {}", message);
  }

  let tag_name = format!("{}{}", prefix, parent_version);
  if opts.dry_run || !git.has_tag(&tag_name)? {
    git.tag(&tag_name, &format!("Release {}", tag_name))?;
  }

  if opts.push {
    git.push_branch(&ctx.config.release.branch)?;
    push_with_retry(&git, &tag_name)?;
  }

  println!("📦 Parent finalized at {}", tag_name);
  Ok(())
}

/// `release: a@v1.2.3, b@v0.4.0` - pairs sorted by repository name
fn parent_commit_message(released: &[(String, semver::Version)], prefix: &str) -> String {
  let mut pairs: Vec<String> = released
    .iter()
    .map(|(name, version)| format!("{}@{}{}", name, prefix, version))
    .collect();
  pairs.sort();
  format!("release: {}", pairs.join(", "))
}
