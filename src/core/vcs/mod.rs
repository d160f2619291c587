pub mod system_git;

pub use system_git::SystemGit;

/// Working-tree state of a repository
#[derive(Debug, Clone)]
pub struct GitStatus {
  pub branch: String,
  pub is_dirty: bool,
}

/// A commit relevant to release planning
#[derive(Debug, Clone)]
pub struct CommitInfo {
  pub sha: String,
  pub message: String,
}

impl CommitInfo {
  /// First line of the commit message
  pub fn subject(&self) -> &str {
    self.message.lines().next().unwrap_or("")
  }
}
