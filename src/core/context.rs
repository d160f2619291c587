//! Unified product context - build once, pass everywhere
//!
//! Discovers the product root from the current working directory, loads
//! convoy.toml, scans every submodule manifest, and builds the dependency
//! graph. Commands receive `&ReleaseContext` instead of re-deriving any of
//! this themselves.

use crate::core::config::ConvoyConfig;
use crate::core::error::{ConfigError, ConvoyError, ConvoyResult};
use crate::core::vcs::SystemGit;
use crate::graph::RepoGraph;
use crate::manifest::{self, RepoInfo};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Everything commands need about the product: root, config, repositories,
/// and the dependency graph
pub struct ReleaseContext {
  /// Product root (the aggregating repository's working tree)
  pub root: PathBuf,

  /// convoy.toml settings (defaults when the file is absent)
  pub config: ConvoyConfig,

  /// Managed repositories in .gitmodules order
  pub repos: Vec<RepoInfo>,

  /// Dependency graph over the managed repositories
  /// Wrapped in Arc for sharing into per-level worker closures
  pub graph: Arc<RepoGraph>,
}

impl ReleaseContext {
  /// Build the context from any directory inside the product repository
  pub fn build(cwd: &Path) -> ConvoyResult<Self> {
    let root = SystemGit::toplevel(cwd)
      .map_err(|_| ConvoyError::Config(ConfigError::RootNotFound { cwd: cwd.to_path_buf() }))?;
    let config = ConvoyConfig::load(&root)?;

    let root_git = SystemGit::open(&root, Duration::from_secs(config.release.timeout_secs), false)?;
    let mut repos = Vec::new();
    for submodule in root_git.submodule_paths()? {
      match manifest::read_repo(&root, &submodule)? {
        Some(repo) => repos.push(repo),
        None => {
          eprintln!("⚠️  Skipping '{}': no releasable manifest found", submodule);
        }
      }
    }

    let graph = Arc::new(RepoGraph::build(&repos, false)?);

    Ok(Self {
      root,
      config,
      repos,
      graph,
    })
  }

  /// Git runner for one managed repository
  pub fn git_for(&self, repo: &RepoInfo, dry_run: bool) -> ConvoyResult<SystemGit> {
    SystemGit::open(&repo.directory, self.timeout(), dry_run)
  }

  /// Git runner for the aggregating root repository
  pub fn git_for_root(&self, dry_run: bool) -> ConvoyResult<SystemGit> {
    SystemGit::open(&self.root, self.timeout(), dry_run)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_secs(self.config.release.timeout_secs)
  }

  /// Look up a managed repository by name
  pub fn repo(&self, name: &str) -> Option<&RepoInfo> {
    self.repos.iter().find(|r| r.name == name)
  }

  /// Where the persisted release plan lives
  pub fn plan_path(&self) -> PathBuf {
    self.root.join(".convoy").join("release-plan.json")
  }

  /// Where changelog drafts are staged at plan time
  pub fn changelog_dir(&self) -> PathBuf {
    self.root.join(".convoy").join("changelogs")
  }
}
