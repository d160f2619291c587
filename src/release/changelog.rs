//! Changelog drafts from conventional commits
//!
//! A deterministic, zero-panic renderer standing in for an external
//! text-generation service. Uses winnow for parsing (not regex). Draft
//! generation is best-effort at plan time: a failure here falls back to the
//! commit-scan bump suggestion and never aborts planning.

use crate::core::vcs::CommitInfo;
use std::collections::BTreeMap;
use std::fmt;

/// A parsed conventional commit
///
/// Format: `<type>(<scope>): <description>`
///
/// Example: `feat(auth): add OAuth2 support`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConventionalCommit {
  /// Commit type (feat, fix, chore, docs, etc.)
  pub commit_type: CommitType,
  /// Optional scope (e.g., "auth", "api", "core")
  pub scope: Option<String>,
  /// Short description
  pub description: String,
  /// Breaking change footer, empty string for a bare `!` marker
  pub breaking_change: Option<String>,
}

/// Conventional commit types
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommitType {
  Feat,
  Fix,
  Docs,
  Style,
  Refactor,
  Perf,
  Test,
  Build,
  Ci,
  Chore,
  Revert,
  Other,
}

impl CommitType {
  /// Parse commit type from string
  pub fn from_str(s: &str) -> Self {
    match s.to_lowercase().as_str() {
      "feat" | "feature" => Self::Feat,
      "fix" => Self::Fix,
      "docs" | "doc" => Self::Docs,
      "style" => Self::Style,
      "refactor" => Self::Refactor,
      "perf" | "performance" => Self::Perf,
      "test" | "tests" => Self::Test,
      "build" => Self::Build,
      "ci" => Self::Ci,
      "chore" => Self::Chore,
      "revert" => Self::Revert,
      _ => Self::Other,
    }
  }

  /// Get the display name for this commit type
  pub fn display_name(&self) -> &'static str {
    match self {
      Self::Feat => "Features",
      Self::Fix => "Bug Fixes",
      Self::Docs => "Documentation",
      Self::Style => "Style",
      Self::Refactor => "Refactoring",
      Self::Perf => "Performance",
      Self::Test => "Tests",
      Self::Build => "Build",
      Self::Ci => "CI",
      Self::Chore => "Chores",
      Self::Revert => "Reverts",
      Self::Other => "Other",
    }
  }
}

impl fmt::Display for CommitType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.display_name())
  }
}

impl ConventionalCommit {
  /// Check if this commit is a breaking change
  pub fn is_breaking(&self) -> bool {
    self.breaking_change.is_some()
  }

  /// Parse a conventional commit from a git commit message
  ///
  /// Returns None if the message doesn't follow conventional commit format.
  /// This is intentional - not all commits need to be conventional.
  pub fn parse(message: &str) -> Option<Self> {
    use winnow::ascii::{alphanumeric1, space0};
    use winnow::combinator::{opt, preceded, terminated};
    use winnow::prelude::*;
    use winnow::token::take_till;

    let (first_line, rest) = message.split_once('\n').unwrap_or((message, ""));

    // Parse type(scope)!: description
    let mut parser = (
      alphanumeric1::<_, ()>.map(CommitType::from_str),
      opt(preceded('(', terminated(take_till(1.., ')'), ')'))),
      opt('!'),
      ':',
      space0,
      take_till(0.., ['\n', '\r']),
    );

    let Ok((commit_type, scope, breaking_indicator, _, _, description)) = parser.parse(first_line) else {
      return None;
    };

    // Look for a BREAKING CHANGE footer in the body
    let mut breaking_change = None;
    for line in rest.lines() {
      if let Some((key, value)) = line.trim().split_once(':') {
        let key = key.trim();
        if key.eq_ignore_ascii_case("BREAKING CHANGE") || key.eq_ignore_ascii_case("BREAKING-CHANGE") {
          breaking_change = Some(value.trim().to_string());
        }
      }
    }

    if breaking_change.is_none() && breaking_indicator.is_some() {
      breaking_change = Some(String::new());
    }

    Some(Self {
      commit_type,
      scope: scope.map(|s: &str| s.to_string()),
      description: description.trim().to_string(),
      breaking_change,
    })
  }
}

/// A changelog draft for one repository release
#[derive(Debug, Clone)]
pub struct Changelog {
  pub version: String,
  /// Date of the release (ISO 8601)
  pub date: String,
  /// Grouped commits by type
  commits_by_type: BTreeMap<CommitType, Vec<ConventionalCommit>>,
  /// Every commit in the range, conventional or not
  all_commit_shas: Vec<String>,
}

impl Changelog {
  /// Build a draft from the commits since the last release
  pub fn from_commits(version: String, date: String, commits: &[CommitInfo]) -> Self {
    let mut draft = Self {
      version,
      date,
      commits_by_type: BTreeMap::new(),
      all_commit_shas: Vec::new(),
    };

    for commit in commits {
      draft.all_commit_shas.push(commit.sha.clone());
      if let Some(parsed) = ConventionalCommit::parse(&commit.message) {
        draft.commits_by_type.entry(parsed.commit_type).or_default().push(parsed);
      }
    }

    draft
  }

  /// One-line summary used as bump reasoning when the draft succeeds
  pub fn summary(&self) -> String {
    let count = |t: CommitType| self.commits_by_type.get(&t).map(Vec::len).unwrap_or(0);
    let breaking: usize = self
      .commits_by_type
      .values()
      .flatten()
      .filter(|c| c.is_breaking())
      .count();

    let mut parts = Vec::new();
    if breaking > 0 {
      parts.push(format!("{} breaking", breaking));
    }
    if count(CommitType::Feat) > 0 {
      parts.push(format!("{} feature(s)", count(CommitType::Feat)));
    }
    if count(CommitType::Fix) > 0 {
      parts.push(format!("{} fix(es)", count(CommitType::Fix)));
    }
    if parts.is_empty() {
      parts.push("maintenance only".to_string());
    }

    format!(
      "changelog: {} across {} commit(s)",
      parts.join(", "),
      self.all_commit_shas.len()
    )
  }

  /// Render as markdown
  pub fn to_markdown(&self) -> String {
    let mut output = String::new();

    output.push_str(&format!("## [{}] - {}\n\n", self.version, self.date));

    let ordered_types = [
      CommitType::Feat,
      CommitType::Fix,
      CommitType::Perf,
      CommitType::Docs,
      CommitType::Refactor,
      CommitType::Test,
      CommitType::Build,
      CommitType::Ci,
      CommitType::Chore,
      CommitType::Style,
      CommitType::Revert,
      CommitType::Other,
    ];

    for commit_type in &ordered_types {
      let Some(commits) = self.commits_by_type.get(commit_type) else {
        continue;
      };
      if commits.is_empty() {
        continue;
      }

      output.push_str(&format!("### {}\n\n", commit_type.display_name()));

      for commit in commits {
        let scope_str = commit
          .scope
          .as_ref()
          .map(|s| format!("**{}**: ", s))
          .unwrap_or_default();

        output.push_str(&format!("- {}{}\n", scope_str, commit.description));

        if let Some(ref breaking) = commit.breaking_change {
          if breaking.is_empty() {
            output.push_str("  - **BREAKING CHANGE**\n");
          } else {
            output.push_str(&format!("  - **BREAKING**: {}\n", breaking));
          }
        }
      }

      output.push('\n');
    }

    output
  }
}
