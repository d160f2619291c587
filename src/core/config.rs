//! Product configuration loaded from convoy.toml at the root repository
//!
//! Every field has a default; a missing file means "all defaults" so a fresh
//! product works without any setup.

use crate::core::error::{ConfigError, ConvoyError, ConvoyResult, ResultExt};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Configuration for convoy, `[release]` table of convoy.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConvoyConfig {
  #[serde(default)]
  pub release: ReleaseSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseSettings {
  /// Branch every repository must be on for preflight to pass
  #[serde(default = "default_branch")]
  pub branch: String,

  /// Release tags are `<prefix><semver>`, e.g. "v1.2.3"
  #[serde(default = "default_tag_prefix")]
  pub tag_prefix: String,

  /// When a dependency is auto-included by `--with-deps` but has no changes,
  /// still give it a patch release so dependents reference a fresh tag.
  /// Explicit policy choice; see DESIGN.md.
  #[serde(default = "default_true")]
  pub tag_unchanged_dependencies: bool,

  /// Stage changelog drafts under .convoy/changelogs/ at plan time
  #[serde(default = "default_true")]
  pub changelog: bool,

  /// Time budget for every git subprocess, in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
}

fn default_branch() -> String {
  "main".to_string()
}

fn default_tag_prefix() -> String {
  "v".to_string()
}

fn default_true() -> bool {
  true
}

fn default_timeout_secs() -> u64 {
  30
}

impl Default for ReleaseSettings {
  fn default() -> Self {
    Self {
      branch: default_branch(),
      tag_prefix: default_tag_prefix(),
      tag_unchanged_dependencies: true,
      changelog: true,
      timeout_secs: default_timeout_secs(),
    }
  }
}

impl ConvoyConfig {
  /// Load convoy.toml from the product root, falling back to defaults when
  /// the file does not exist
  pub fn load(root: &Path) -> ConvoyResult<Self> {
    let path = root.join("convoy.toml");
    if !path.exists() {
      return Ok(Self::default());
    }

    let content =
      fs::read_to_string(&path).with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: ConvoyConfig = toml_edit::de::from_str(&content).map_err(|e| {
      ConvoyError::Config(ConfigError::Invalid {
        path: path.clone(),
        reason: e.to_string(),
      })
    })?;

    config.validate(&path)?;
    Ok(config)
  }

  fn validate(&self, path: &Path) -> ConvoyResult<()> {
    if self.release.branch.is_empty() {
      return Err(ConvoyError::Config(ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: "release.branch must not be empty".to_string(),
      }));
    }
    if self.release.timeout_secs == 0 {
      return Err(ConvoyError::Config(ConfigError::Invalid {
        path: path.to_path_buf(),
        reason: "release.timeout_secs must be at least 1".to_string(),
      }));
    }
    Ok(())
  }
}
