//! Per-repository version resolution
//!
//! Three steps against the repository's history: find the current released
//! version (latest reachable tag), detect whether anything changed since it,
//! and suggest a bump class for the next release.

use crate::core::error::ConvoyResult;
use crate::core::vcs::{CommitInfo, SystemGit};
use crate::release::version::{self, VersionBump};

/// Resolved release state for one repository
#[derive(Debug, Clone)]
pub struct VersionState {
  /// Latest released version; 0.0.0 when the repository has never been tagged
  pub current_version: semver::Version,
  /// The tag that version came from, None for unreleased repositories
  pub current_tag: Option<String>,
  /// Commits exist between the current tag and the branch tip
  pub has_changes: bool,
  /// The commits driving this release, newest first (empty when unchanged)
  pub commits: Vec<CommitInfo>,
  /// Suggested bump class
  pub suggested_bump: VersionBump,
  /// Why the suggestion was made
  pub reasoning: String,
}

impl VersionState {
  /// Next version under a selected bump: strictly greater than current when
  /// changes exist, exactly current otherwise
  pub fn next_version(&self, selected: VersionBump) -> semver::Version {
    if self.has_changes {
      selected.apply(&self.current_version)
    } else {
      self.current_version.clone()
    }
  }
}

/// Resolve a repository's version state
///
/// `override_bump` is the operator's per-repository selection; it takes
/// precedence over the commit-scan suggestion.
pub fn resolve(
  git: &SystemGit,
  repo_name: &str,
  tag_prefix: &str,
  override_bump: Option<VersionBump>,
) -> ConvoyResult<VersionState> {
  let current_tag = git.latest_tag()?;

  let Some(tag) = current_tag else {
    // Never released: everything in history counts as pending changes
    let commits = git.log_since(None)?;
    let (suggested, reasoning) = suggested_with_override(&commits, override_bump);
    return Ok(VersionState {
      current_version: semver::Version::new(0, 0, 0),
      current_tag: None,
      has_changes: true,
      commits,
      suggested_bump: suggested,
      reasoning,
    });
  };

  let current_version = version::parse_tag(repo_name, &tag, tag_prefix)?;

  if git.commits_since(&tag)? == 0 {
    return Ok(VersionState {
      current_version,
      current_tag: Some(tag.clone()),
      has_changes: false,
      commits: Vec::new(),
      suggested_bump: VersionBump::None,
      reasoning: format!("no commits since {}", tag),
    });
  }

  let commits = git.log_since(Some(&tag))?;
  let (suggested, reasoning) = suggested_with_override(&commits, override_bump);

  Ok(VersionState {
    current_version,
    current_tag: Some(tag),
    has_changes: true,
    commits,
    suggested_bump: suggested,
    reasoning,
  })
}

fn suggested_with_override(commits: &[CommitInfo], override_bump: Option<VersionBump>) -> (VersionBump, String) {
  match override_bump {
    Some(bump) => (bump, "selected on the command line".to_string()),
    None => version::suggest_bump(commits),
  }
}
