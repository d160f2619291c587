//! The persisted release plan - the unit of hand-off between planning and
//! execution
//!
//! A plan is written by `convoy plan`, optionally edited by a human
//! (`selected`, `status`, `selected_bump`), consumed by `convoy apply`, and
//! cleared only after a fully successful apply. Per-repository execution
//! state is persisted incrementally during apply so a corrected re-run can
//! resume instead of re-deriving progress from tag presence alone.

use crate::core::error::{ConvoyError, ConvoyResult, PlanError, ResultExt};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Review state of one plan row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowStatus {
  #[serde(rename = "pending-review")]
  PendingReview,
  #[serde(rename = "approved")]
  Approved,
  /// Not part of the release (no changes)
  #[serde(rename = "-")]
  NoOp,
}

impl fmt::Display for RowStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      RowStatus::PendingReview => "pending-review",
      RowStatus::Approved => "approved",
      RowStatus::NoOp => "-",
    };
    write!(f, "{}", s)
  }
}

/// Execution progress of one repository, persisted during apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecState {
  #[default]
  Pending,
  Tagged,
  Pushed,
  Failed,
}

/// One repository's row in the plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoReleasePlan {
  pub current_version: semver::Version,
  pub current_tag: Option<String>,
  pub suggested_bump: crate::release::VersionBump,
  pub reasoning: String,
  pub selected_bump: crate::release::VersionBump,
  pub next_version: semver::Version,
  pub changelog_path: Option<PathBuf>,
  pub status: RowStatus,
  pub selected: bool,
  /// Auto-included as a dependency of an explicitly requested repository
  #[serde(default)]
  pub forced: bool,
  #[serde(default)]
  pub exec: ExecState,
}

/// The persisted release plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasePlan {
  /// Content hash over levels and rows
  pub id: String,
  pub created_at: DateTime<Utc>,
  pub root_directory: PathBuf,
  /// Frozen at plan time; apply orders execution by these, not a recompute
  pub release_levels: Vec<Vec<String>>,
  pub repos: BTreeMap<String, RepoReleasePlan>,
  /// Root repository's version before this release
  pub parent_current_version: Option<semver::Version>,
  /// Root repository's version after this release (max selected next)
  pub parent_version: semver::Version,
  #[serde(default)]
  pub skip_parent: bool,
}

impl ReleasePlan {
  /// Content hash of the plan's decision-relevant parts
  pub fn compute_id(&self) -> ConvoyResult<String> {
    let payload = serde_json::to_vec(&(&self.release_levels, &self.repos))?;
    let mut hasher = Sha256::new();
    hasher.update(&payload);
    Ok(format!("{:x}", hasher.finalize()))
  }

  /// Recompute the id after rows changed
  pub fn refresh_id(&mut self) -> ConvoyResult<()> {
    self.id = self.compute_id()?;
    Ok(())
  }

  /// Short form of the id for display
  pub fn short_id(&self) -> &str {
    &self.id[..12.min(self.id.len())]
  }

  /// Names of repositories that are part of the release, sorted
  pub fn selected_names(&self) -> Vec<String> {
    self
      .repos
      .iter()
      .filter(|(_, row)| row.selected)
      .map(|(name, _)| name.clone())
      .collect()
  }

  /// Greatest next version among selected repositories
  pub fn max_selected_next(&self) -> Option<semver::Version> {
    self
      .repos
      .values()
      .filter(|row| row.selected)
      .map(|row| row.next_version.clone())
      .max()
  }

  /// Persist to the well-known location, overwriting any prior plan
  pub fn save(&self, path: &Path) -> ConvoyResult<()> {
    if let Some(dir) = path.parent() {
      fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let json = serde_json::to_string_pretty(self)?;
    fs::write(path, json).with_context(|| format!("Failed to write plan to {}", path.display()))?;
    Ok(())
  }

  /// Load the persisted plan
  pub fn load(path: &Path) -> ConvoyResult<Self> {
    if !path.exists() {
      return Err(ConvoyError::Plan(PlanError::NoPlan {
        path: path.to_path_buf(),
      }));
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read plan from {}", path.display()))?;
    let plan: ReleasePlan = serde_json::from_str(&content)
      .with_context(|| format!("Malformed plan file at {}; re-run `convoy plan`", path.display()))?;
    Ok(plan)
  }

  /// Remove the persisted plan after a fully successful apply
  pub fn clear(path: &Path) -> ConvoyResult<()> {
    if path.exists() {
      fs::remove_file(path).with_context(|| format!("Failed to remove plan at {}", path.display()))?;
    }
    Ok(())
  }

  /// Human-readable rendering for `plan` and `show`
  pub fn render(&self) -> String {
    let mut out = String::new();

    out.push_str(&format!(
      "📋 Release plan {} (created {})\n",
      self.short_id(),
      self.created_at.format("%Y-%m-%d %H:%M UTC")
    ));
    out.push_str(&format!("   Root: {}\n", self.root_directory.display()));

    let order: Vec<String> = self
      .release_levels
      .iter()
      .map(|level| format!("[{}]", level.join(", ")))
      .collect();
    out.push_str(&format!("   Order: {}\n\n", order.join(" → ")));

    let name_width = self.repos.keys().map(String::len).max().unwrap_or(4).max(4);
    out.push_str(&format!(
      "   {:<name_width$}  {:<9}  {:<6}  {:<9}  {:<15}  {}\n",
      "REPO", "CURRENT", "BUMP", "NEXT", "STATUS", "SELECTED"
    ));
    for (name, row) in &self.repos {
      out.push_str(&format!(
        "   {:<name_width$}  {:<9}  {:<6}  {:<9}  {:<15}  {}\n",
        name,
        row.current_version.to_string(),
        row.selected_bump.to_string(),
        row.next_version.to_string(),
        row.status.to_string(),
        if row.selected { "yes" } else { "no" }
      ));
    }

    let parent_current = self
      .parent_current_version
      .as_ref()
      .map(|v| v.to_string())
      .unwrap_or_else(|| "-".to_string());
    if self.skip_parent {
      out.push_str("\n   Parent: skipped\n");
    } else {
      out.push_str(&format!("\n   Parent: {} → {}\n", parent_current, self.parent_version));
    }

    out
  }
}
