//! Release planning: combine the graph, resolved versions, and operator
//! selections into a persisted, reviewable plan

use crate::core::context::ReleaseContext;
use crate::core::error::{ConvoyError, ConvoyResult, PlanError, ResultExt};
use crate::release::changelog::Changelog;
use crate::release::plan::{ExecState, ReleasePlan, RepoReleasePlan, RowStatus};
use crate::release::resolver::{self, VersionState};
use crate::release::version::VersionBump;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::PathBuf;

/// Operator selections for one planning run
///
/// Immutable and passed by reference - overrides never live in globals.
#[derive(Debug, Clone, Default)]
pub struct ReleaseSelectionCriteria {
  /// Repositories forced to a major bump
  pub major: Vec<String>,
  /// Repositories forced to a minor bump
  pub minor: Vec<String>,
  /// Repositories forced to a patch bump
  pub patch: Vec<String>,
  /// Restrict the release to these repositories (empty = everything)
  pub only: Vec<String>,
  /// Expand `only` with its transitive dependencies
  pub with_deps: bool,
  /// Skip the parent finalize step at apply time
  pub skip_parent: bool,
  /// Stage changelog drafts
  pub changelog: bool,
}

impl ReleaseSelectionCriteria {
  /// Per-repository bump override; a repository named in more than one list
  /// is a user error
  pub fn override_for(&self, name: &str) -> ConvoyResult<Option<VersionBump>> {
    let mut hit = None;
    for (list, bump) in [
      (&self.major, VersionBump::Major),
      (&self.minor, VersionBump::Minor),
      (&self.patch, VersionBump::Patch),
    ] {
      if list.iter().any(|n| n == name) {
        if hit.is_some() {
          return Err(ConvoyError::message(format!(
            "Repository '{}' appears in more than one bump list",
            name
          )));
        }
        hit = Some(bump);
      }
    }
    Ok(hit)
  }

  fn named_repos(&self) -> impl Iterator<Item = &String> {
    self
      .major
      .iter()
      .chain(self.minor.iter())
      .chain(self.patch.iter())
      .chain(self.only.iter())
  }
}

/// Generate and persist a release plan
pub fn generate_plan(ctx: &ReleaseContext, criteria: &ReleaseSelectionCriteria) -> ConvoyResult<ReleasePlan> {
  // Every name the operator typed must be a managed repository
  for name in criteria.named_repos() {
    if !ctx.graph.contains(name) {
      return Err(ConvoyError::Plan(PlanError::UnknownRepo { name: name.clone() }));
    }
  }

  // Scope selection, optionally expanded over dependency edges
  let mut scope: Vec<String> = if criteria.only.is_empty() {
    ctx.repos.iter().map(|r| r.name.clone()).collect()
  } else {
    criteria.only.clone()
  };

  let mut auto_added: HashSet<String> = HashSet::new();
  if criteria.with_deps && !criteria.only.is_empty() {
    let explicit: HashSet<String> = scope.iter().cloned().collect();
    let closure = ctx.graph.dependency_closure(&scope)?;
    auto_added = closure.difference(&explicit).cloned().collect();
    scope = ctx
      .repos
      .iter()
      .map(|r| r.name.clone())
      .filter(|name| closure.contains(name))
      .collect();
  }

  // Resolve every repository in scope
  let mut states: HashMap<String, VersionState> = HashMap::new();
  for name in &scope {
    let repo = ctx
      .repo(name)
      .ok_or_else(|| ConvoyError::Plan(PlanError::UnknownRepo { name: name.clone() }))?;
    let git = ctx.git_for(repo, false)?;
    let state = resolver::resolve(&git, name, &ctx.config.release.tag_prefix, criteria.override_for(name)?)?;
    states.insert(name.clone(), state);
  }

  // A repository joins the release when it has changes, or when it was pulled
  // in as a dependency and policy says unchanged dependencies get a fresh tag
  let tag_unchanged = ctx.config.release.tag_unchanged_dependencies;
  let mut selected: HashSet<String> = HashSet::new();
  for name in &scope {
    let state = &states[name];
    if state.has_changes || (auto_added.contains(name) && tag_unchanged) {
      selected.insert(name.clone());
    }
  }

  if selected.is_empty() {
    return Err(ConvoyError::Plan(PlanError::NothingToRelease));
  }

  let release_levels = ctx.graph.release_levels_for(&selected)?;

  // Populate one row per repository in scope
  let mut repos = BTreeMap::new();
  for name in &scope {
    let state = &states[name];
    let is_selected = selected.contains(name);
    let forced = is_selected && !state.has_changes;

    let (selected_bump, next_version, status, reasoning) = if forced {
      // No content changes, but a dependent is being released against it
      (
        VersionBump::Patch,
        VersionBump::Patch.apply(&state.current_version),
        RowStatus::PendingReview,
        "required by a dependent release; no content changes".to_string(),
      )
    } else if is_selected {
      let bump = state.suggested_bump;
      (bump, state.next_version(bump), RowStatus::PendingReview, state.reasoning.clone())
    } else {
      (
        VersionBump::None,
        state.current_version.clone(),
        RowStatus::NoOp,
        state.reasoning.clone(),
      )
    };

    repos.insert(
      name.clone(),
      RepoReleasePlan {
        current_version: state.current_version.clone(),
        current_tag: state.current_tag.clone(),
        suggested_bump: state.suggested_bump,
        reasoning,
        selected_bump,
        next_version,
        changelog_path: None,
        status,
        selected: is_selected,
        forced,
        exec: ExecState::Pending,
      },
    );
  }

  // Changelog drafts are best-effort: a failure keeps the commit-scan
  // suggestion and never aborts planning
  if criteria.changelog && ctx.config.release.changelog {
    let date = Utc::now().format("%Y-%m-%d").to_string();
    for name in &selected {
      let state = &states[name];
      if state.commits.is_empty() {
        continue;
      }
      let Some(row) = repos.get_mut(name) else {
        continue;
      };
      match stage_changelog(ctx, name, &row.next_version, &date, state) {
        Ok((path, summary)) => {
          row.changelog_path = Some(path);
          row.reasoning = summary;
        }
        Err(e) => {
          eprintln!("⚠️  Changelog draft for '{}' failed ({}); keeping commit-scan suggestion", name, e);
        }
      }
    }
  }

  let root_git = ctx.git_for_root(false)?;
  let parent_current_version = match root_git.latest_tag()? {
    Some(tag) => Some(crate::release::version::parse_tag("(root)", &tag, &ctx.config.release.tag_prefix)?),
    None => None,
  };

  let mut plan = ReleasePlan {
    id: String::new(),
    created_at: Utc::now(),
    root_directory: ctx.root.clone(),
    release_levels,
    parent_current_version,
    parent_version: semver::Version::new(0, 0, 0),
    repos,
    skip_parent: criteria.skip_parent,
  };
  plan.parent_version = plan
    .max_selected_next()
    .unwrap_or_else(|| semver::Version::new(0, 0, 0));
  plan.refresh_id()?;

  plan.save(&ctx.plan_path())?;
  Ok(plan)
}

fn stage_changelog(
  ctx: &ReleaseContext,
  name: &str,
  next_version: &semver::Version,
  date: &str,
  state: &VersionState,
) -> ConvoyResult<(PathBuf, String)> {
  let draft = Changelog::from_commits(next_version.to_string(), date.to_string(), &state.commits);
  let summary = draft.summary();

  let dir = ctx.changelog_dir();
  fs::create_dir_all(&dir).context("Failed to create changelog directory")?;
  // Nested submodule paths become flat file names
  let path = dir.join(format!("{}.md", name.replace('/', "-")));
  fs::write(&path, draft.to_markdown())?;

  Ok((path, summary))
}
