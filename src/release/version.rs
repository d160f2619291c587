//! Version bumps and bump suggestion from commit history

use crate::core::error::{ConvoyError, ConvoyResult, PlanError};
use crate::core::vcs::CommitInfo;
use crate::release::changelog::ConventionalCommit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Version bump class based on conventional commits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VersionBump {
  /// Major version bump (breaking changes)
  Major,
  /// Minor version bump (new features)
  Minor,
  /// Patch version bump (everything else)
  Patch,
  /// No bump (repository unchanged)
  None,
}

impl VersionBump {
  /// Apply bump to a semver version, resetting lower components
  pub fn apply(&self, version: &semver::Version) -> semver::Version {
    match self {
      VersionBump::Major => semver::Version::new(version.major + 1, 0, 0),
      VersionBump::Minor => semver::Version::new(version.major, version.minor + 1, 0),
      VersionBump::Patch => semver::Version::new(version.major, version.minor, version.patch + 1),
      VersionBump::None => version.clone(),
    }
  }
}

impl fmt::Display for VersionBump {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      VersionBump::Major => "major",
      VersionBump::Minor => "minor",
      VersionBump::Patch => "patch",
      VersionBump::None => "none",
    };
    write!(f, "{}", s)
  }
}

/// Parse an existing release tag into a version
///
/// A tag that does not match `<prefix><semver>` is a hard error: a next
/// version cannot safely be computed from it, and a malformed tag usually
/// means shared state went bad.
pub fn parse_tag(repo: &str, tag: &str, prefix: &str) -> ConvoyResult<semver::Version> {
  let bare = tag.strip_prefix(prefix).unwrap_or(tag);
  semver::Version::parse(bare).map_err(|_| {
    ConvoyError::Plan(PlanError::InvalidTag {
      repo: repo.to_string(),
      tag: tag.to_string(),
    })
  })
}

/// Whether a commit announces a breaking change
fn is_breaking(commit: &CommitInfo) -> bool {
  if let Some(parsed) = ConventionalCommit::parse(&commit.message)
    && parsed.is_breaking()
  {
    return true;
  }
  commit.message.contains("BREAKING CHANGE") || commit.message.contains("BREAKING-CHANGE")
}

fn is_feature(commit: &CommitInfo) -> bool {
  ConventionalCommit::parse(&commit.message)
    .map(|c| c.commit_type == crate::release::changelog::CommitType::Feat)
    .unwrap_or(false)
}

/// Suggest a bump from the commits since the last release
///
/// Any breaking commit forces major; any feature forces minor; everything
/// else - fixes, chores, non-conventional messages - is a patch. Returns the
/// suggestion together with its reasoning text.
pub fn suggest_bump(commits: &[CommitInfo]) -> (VersionBump, String) {
  let breaking = commits.iter().filter(|c| is_breaking(c)).count();
  let features = commits.iter().filter(|c| is_feature(c)).count();

  if let Some(first) = commits.iter().find(|c| is_breaking(c)) {
    return (
      VersionBump::Major,
      format!(
        "{} breaking change(s) in {} commit(s), e.g. \"{}\"",
        breaking,
        commits.len(),
        first.subject()
      ),
    );
  }
  if features > 0 {
    return (
      VersionBump::Minor,
      format!("{} feature(s) in {} commit(s)", features, commits.len()),
    );
  }
  (
    VersionBump::Patch,
    format!("{} commit(s), no features or breaking changes", commits.len()),
  )
}
