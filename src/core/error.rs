//! Error types for convoy with contextual messages and exit codes
//!
//! One unified error type, categorized so the binary can map failures to
//! distinct exit codes: structural/user problems, git/system problems, and
//! release-gate (preflight/apply) problems.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for convoy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, invalid args, malformed plan)
  User = 1,
  /// System error (git, network, I/O)
  System = 2,
  /// Release gate failure (preflight blocked, repos failed during apply)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for convoy
#[derive(Debug)]
pub enum ConvoyError {
  /// Configuration errors
  Config(ConfigError),

  /// Git operation errors
  Git(GitError),

  /// Planning errors (graph structure, version tags, empty scope)
  Plan(PlanError),

  /// Release preflight blocked the run
  ReleaseBlocked { issues: Vec<PreflightIssue> },

  /// One or more repositories failed during apply
  ApplyFailed { failed: Vec<String> },

  /// The aggregating root repository could not be finalized
  ParentFinalizeFailed { reason: Box<ConvoyError> },

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl ConvoyError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    ConvoyError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      ConvoyError::Message { message, context, help } => ConvoyError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      ConvoyError::Config(_) => ExitCode::User,
      ConvoyError::Git(_) => ExitCode::System,
      ConvoyError::Plan(_) => ExitCode::User,
      ConvoyError::ReleaseBlocked { .. } => ExitCode::Validation,
      ConvoyError::ApplyFailed { .. } => ExitCode::Validation,
      ConvoyError::ParentFinalizeFailed { .. } => ExitCode::System,
      ConvoyError::Io(_) => ExitCode::System,
      ConvoyError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      ConvoyError::Config(e) => e.help_message(),
      ConvoyError::Git(e) => e.help_message(),
      ConvoyError::Plan(e) => e.help_message(),
      ConvoyError::ReleaseBlocked { .. } => {
        Some("Commit or stash local changes (or check out the release branch), then re-run. Use --force to override.".to_string())
      }
      ConvoyError::ApplyFailed { .. } => {
        Some("The plan file was kept. Fix the listed repositories and re-run `convoy apply`; completed repositories are skipped.".to_string())
      }
      ConvoyError::Message { help, .. } => help.clone(),
      _ => None,
    }
  }
}

impl fmt::Display for ConvoyError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConvoyError::Config(e) => write!(f, "{}", e),
      ConvoyError::Git(e) => write!(f, "{}", e),
      ConvoyError::Plan(e) => write!(f, "{}", e),
      ConvoyError::ReleaseBlocked { issues } => {
        write!(f, "Release blocked by preflight: {} repositor{} not ready", issues.len(), if issues.len() == 1 { "y is" } else { "ies are" })
      }
      ConvoyError::ApplyFailed { failed } => {
        write!(f, "Release apply failed for: {}", failed.join(", "))
      }
      ConvoyError::ParentFinalizeFailed { reason } => {
        write!(f, "Failed to finalize the root repository: {}", reason)
      }
      ConvoyError::Io(e) => write!(f, "I/O error: {}", e),
      ConvoyError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for ConvoyError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConvoyError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for ConvoyError {
  fn from(err: io::Error) -> Self {
    ConvoyError::Io(err)
  }
}

impl From<String> for ConvoyError {
  fn from(msg: String) -> Self {
    ConvoyError::message(msg)
  }
}

impl From<&str> for ConvoyError {
  fn from(msg: &str) -> Self {
    ConvoyError::message(msg)
  }
}

impl From<toml_edit::TomlError> for ConvoyError {
  fn from(err: toml_edit::TomlError) -> Self {
    ConvoyError::message(format!("TOML parse error: {}", err))
  }
}

impl From<toml_edit::de::Error> for ConvoyError {
  fn from(err: toml_edit::de::Error) -> Self {
    ConvoyError::message(format!("TOML deserialization error: {}", err))
  }
}

impl From<serde_json::Error> for ConvoyError {
  fn from(err: serde_json::Error) -> Self {
    ConvoyError::message(format!("JSON error: {}", err))
  }
}

impl From<semver::Error> for ConvoyError {
  fn from(err: semver::Error) -> Self {
    ConvoyError::message(format!("Version parse error: {}", err))
  }
}

impl From<std::string::FromUtf8Error> for ConvoyError {
  fn from(err: std::string::FromUtf8Error) -> Self {
    ConvoyError::message(format!("UTF-8 conversion error: {}", err))
  }
}

/// Convert anyhow::Error to ConvoyError (test helpers and interop)
impl From<anyhow::Error> for ConvoyError {
  fn from(err: anyhow::Error) -> Self {
    ConvoyError::message(err.to_string())
  }
}

/// Configuration-related errors
#[derive(Debug)]
pub enum ConfigError {
  /// Not inside a product repository (no git toplevel found)
  RootNotFound { cwd: PathBuf },

  /// convoy.toml exists but is invalid
  Invalid { path: PathBuf, reason: String },

  /// Two managed repositories claim the same module path
  DuplicateModulePath { module_path: String, repos: Vec<String> },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::RootNotFound { .. } => {
        Some("Run convoy from inside the product repository (the root that holds the submodules).".to_string())
      }
      ConfigError::DuplicateModulePath { .. } => {
        Some("Each managed repository must have a unique [package] name in its Cargo.toml.".to_string())
      }
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::RootNotFound { cwd } => {
        write!(f, "No product repository found from: {}", cwd.display())
      }
      ConfigError::Invalid { path, reason } => {
        write!(f, "Invalid configuration in {}: {}", path.display(), reason)
      }
      ConfigError::DuplicateModulePath { module_path, repos } => {
        write!(
          f,
          "Module path '{}' is claimed by more than one repository: {}",
          module_path,
          repos.join(", ")
        )
      }
    }
  }
}

/// Git operation errors
#[derive(Debug)]
pub enum GitError {
  /// Git command failed with a nonzero exit
  CommandFailed { command: String, stderr: String },

  /// Git command exceeded its time budget (retryable, distinct from a
  /// definitive nonzero exit)
  Timeout { command: String, seconds: u64 },

  /// Repository not found
  RepoNotFound { path: PathBuf },

  /// Push failed
  PushFailed { repo: String, refname: String, reason: String },
}

impl GitError {
  /// Timeouts are transient; a retry may succeed
  pub fn is_retryable(&self) -> bool {
    matches!(self, GitError::Timeout { .. })
  }

  fn help_message(&self) -> Option<String> {
    match self {
      GitError::PushFailed { reason, .. } => {
        if reason.contains("non-fast-forward") {
          Some("The remote has commits you don't have. Pull first in that repository.".to_string())
        } else if reason.contains("permission denied") || reason.contains("403") {
          Some("Check your SSH key permissions and remote access.".to_string())
        } else {
          None
        }
      }
      GitError::Timeout { .. } => Some("The operation timed out. Check network connectivity and retry; raise timeout_secs in convoy.toml if the remote is slow.".to_string()),
      GitError::RepoNotFound { path } => Some(format!(
        "Initialize the submodule first or check the path: {}",
        path.display()
      )),
      _ => None,
    }
  }
}

impl fmt::Display for GitError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      GitError::CommandFailed { command, stderr } => {
        write!(f, "Git command failed: {}\n{}", command, stderr)
      }
      GitError::Timeout { command, seconds } => {
        write!(f, "Git command timed out after {}s: {}", seconds, command)
      }
      GitError::RepoNotFound { path } => {
        write!(f, "Git repository not found at: {}", path.display())
      }
      GitError::PushFailed { repo, refname, reason } => {
        write!(f, "Push of {} from {} failed: {}", refname, repo, reason)
      }
    }
  }
}

/// Planning errors: structural problems detected before any mutation
#[derive(Debug)]
pub enum PlanError {
  /// The dependency graph contains a cycle
  CycleDetected { repos: Vec<String> },

  /// An existing release tag could not be parsed as a version
  InvalidTag { repo: String, tag: String },

  /// No repository in scope has changes to release
  NothingToRelease,

  /// A repository named on the command line is not managed
  UnknownRepo { name: String },

  /// No persisted plan to apply or show
  NoPlan { path: PathBuf },

  /// A planned repository no longer exists in the product
  RepoVanished { name: String },
}

impl PlanError {
  fn help_message(&self) -> Option<String> {
    match self {
      PlanError::CycleDetected { .. } => {
        Some("Break the dependency cycle between the listed repositories; releases require a DAG.".to_string())
      }
      PlanError::InvalidTag { .. } => {
        Some("Fix or delete the malformed tag; convoy cannot compute a next version from it.".to_string())
      }
      PlanError::NoPlan { .. } => Some("Run `convoy plan` first.".to_string()),
      PlanError::RepoVanished { .. } => {
        Some("The repository set changed since planning. Re-run `convoy plan`.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for PlanError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlanError::CycleDetected { repos } => {
        write!(f, "Dependency cycle detected among: {}", repos.join(", "))
      }
      PlanError::InvalidTag { repo, tag } => {
        write!(f, "Repository '{}' has an unparsable release tag: '{}'", repo, tag)
      }
      PlanError::NothingToRelease => {
        write!(f, "No repository in scope has changes since its last release")
      }
      PlanError::UnknownRepo { name } => {
        write!(f, "Repository '{}' is not managed by this product", name)
      }
      PlanError::NoPlan { path } => {
        write!(f, "No release plan found at {}", path.display())
      }
      PlanError::RepoVanished { name } => {
        write!(f, "Planned repository '{}' no longer exists in the product", name)
      }
    }
  }
}

/// A single preflight violation, collected across all repositories so the
/// operator sees every problem at once
#[derive(Debug, Clone)]
pub struct PreflightIssue {
  pub repo: String,
  pub branch: String,
  pub expected_branch: String,
  pub dirty: bool,
}

impl PreflightIssue {
  pub fn describe(&self) -> String {
    let mut problems = Vec::new();
    if self.branch != self.expected_branch {
      problems.push(format!("on '{}' (expected '{}')", self.branch, self.expected_branch));
    }
    if self.dirty {
      problems.push("working tree dirty".to_string());
    }
    problems.join(", ")
  }
}

/// Result type alias for convoy
pub type ConvoyResult<T> = Result<T, ConvoyError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> ConvoyResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> ConvoyResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<ConvoyError>,
{
  fn context(self, ctx: impl Into<String>) -> ConvoyResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> ConvoyResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &ConvoyError) {
  eprintln!("\n❌ {}\n", error);

  match error {
    ConvoyError::ApplyFailed { failed } => {
      for repo in failed {
        eprintln!("   failed: {}", repo);
      }
      eprintln!();
    }
    ConvoyError::ReleaseBlocked { issues } => {
      for issue in issues {
        eprintln!("   {}: {}", issue.repo, issue.describe());
      }
      eprintln!();
    }
    _ => {}
  }

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
