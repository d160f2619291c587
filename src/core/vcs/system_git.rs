//! System git backend - zero dependencies, maximum control
//!
//! Executes git as a subprocess with an isolated environment. Every call runs
//! under a bounded timeout; expiry kills the child and surfaces as
//! `GitError::Timeout`, which callers may treat as transient and retry. In
//! dry-run mode every mutating command is printed instead of executed.

use crate::core::error::{ConvoyError, ConvoyResult, GitError};
use crate::core::vcs::{CommitInfo, GitStatus};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Git runner bound to one repository working directory
pub struct SystemGit {
  repo_path: PathBuf,
  timeout: Duration,
  dry_run: bool,
}

impl SystemGit {
  /// Open a git repository, verifying it exists with one subprocess call
  pub fn open(path: &Path, timeout: Duration, dry_run: bool) -> ConvoyResult<Self> {
    let git = Self {
      repo_path: path.to_path_buf(),
      timeout,
      dry_run,
    };

    let output = git.run(&["rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("not a git repository") {
        return Err(ConvoyError::Git(GitError::RepoNotFound {
          path: path.to_path_buf(),
        }));
      }
      return Err(ConvoyError::message(format!("Failed to open git repository: {}", stderr)));
    }

    Ok(git)
  }

  /// Resolve the toplevel working-tree directory for `path`
  pub fn toplevel(path: &Path) -> ConvoyResult<PathBuf> {
    let git = Self {
      repo_path: path.to_path_buf(),
      timeout: Duration::from_secs(10),
      dry_run: false,
    };
    let output = git.run(&["rev-parse", "--show-toplevel"])?;
    if !output.status.success() {
      return Err(ConvoyError::Git(GitError::RepoNotFound {
        path: path.to_path_buf(),
      }));
    }
    Ok(PathBuf::from(String::from_utf8_lossy(&output.stdout).trim()))
  }

  /// Get branch and dirty state
  pub fn status(&self) -> ConvoyResult<GitStatus> {
    let branch_out = self.run(&["rev-parse", "--abbrev-ref", "HEAD"])?;
    let branch = if branch_out.status.success() {
      String::from_utf8_lossy(&branch_out.stdout).trim().to_string()
    } else {
      "HEAD".to_string() // Detached HEAD
    };

    let porcelain = self.run_checked(&["status", "--porcelain"], "git status")?;
    let is_dirty = !String::from_utf8_lossy(&porcelain.stdout).trim().is_empty();

    Ok(GitStatus { branch, is_dirty })
  }

  /// Most recent tag reachable from HEAD, or None for an unreleased repo
  pub fn latest_tag(&self) -> ConvoyResult<Option<String>> {
    let output = self.run(&["describe", "--tags", "--abbrev=0"])?;
    if !output.status.success() {
      // "No names found" / "No tags can describe" both mean unreleased
      return Ok(None);
    }
    let tag = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Ok(if tag.is_empty() { None } else { Some(tag) })
  }

  /// Number of commits between `tag` and HEAD
  pub fn commits_since(&self, tag: &str) -> ConvoyResult<usize> {
    let range = format!("{}..HEAD", tag);
    let output = self.run_checked(&["rev-list", "--count", &range], "git rev-list --count")?;
    let count = String::from_utf8_lossy(&output.stdout)
      .trim()
      .parse::<usize>()
      .map_err(|e| ConvoyError::message(format!("Unparsable commit count: {}", e)))?;
    Ok(count)
  }

  /// Commits between `since` (exclusive) and HEAD, newest first. With no
  /// anchor, the repository's full history.
  pub fn log_since(&self, since: Option<&str>) -> ConvoyResult<Vec<CommitInfo>> {
    // %x1f separates sha from message, %x1e terminates the record, so
    // multi-line bodies survive parsing
    let range;
    let mut args = vec!["log", "--no-merges", "--pretty=format:%H%x1f%B%x1e"];
    if let Some(anchor) = since {
      range = format!("{}..HEAD", anchor);
      args.push(&range);
    }

    let output = self.run_checked(&args, "git log")?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut commits = Vec::new();
    for record in stdout.split('\u{1e}') {
      let record = record.trim_start_matches(['\n', '\r']);
      if record.trim().is_empty() {
        continue;
      }
      if let Some((sha, message)) = record.split_once('\u{1f}') {
        commits.push(CommitInfo {
          sha: sha.trim().to_string(),
          message: message.trim().to_string(),
        });
      }
    }

    Ok(commits)
  }

  /// Check whether a tag exists locally
  pub fn has_tag(&self, name: &str) -> ConvoyResult<bool> {
    let output = self.run_checked(&["tag", "-l", name], "git tag -l")?;
    Ok(!String::from_utf8_lossy(&output.stdout).trim().is_empty())
  }

  /// Create an annotated tag. An already-existing tag with the same name is
  /// treated as satisfied (idempotent re-apply).
  pub fn tag(&self, name: &str, message: &str) -> ConvoyResult<()> {
    if self.dry_run {
      self.log_dry_run(&["tag", "-a", name, "-m", message]);
      return Ok(());
    }

    let output = self.run(&["tag", "-a", name, "-m", message])?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      if stderr.contains("already exists") {
        return Ok(());
      }
      return Err(ConvoyError::Git(GitError::CommandFailed {
        command: format!("git tag -a {}", name),
        stderr: stderr.to_string(),
      }));
    }
    Ok(())
  }

  /// Push a tag to origin
  pub fn push_tag(&self, name: &str) -> ConvoyResult<()> {
    self.push_ref(name)
  }

  /// Push a branch to origin
  pub fn push_branch(&self, branch: &str) -> ConvoyResult<()> {
    self.push_ref(branch)
  }

  fn push_ref(&self, refname: &str) -> ConvoyResult<()> {
    if self.dry_run {
      self.log_dry_run(&["push", "origin", refname]);
      return Ok(());
    }

    let output = self.run(&["push", "origin", refname])?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ConvoyError::Git(GitError::PushFailed {
        repo: self.repo_path.display().to_string(),
        refname: refname.to_string(),
        reason: stderr.trim().to_string(),
      }));
    }
    Ok(())
  }

  /// Stage specific paths (used for submodule pointer updates in the root)
  pub fn stage(&self, paths: &[String]) -> ConvoyResult<()> {
    if paths.is_empty() {
      return Ok(());
    }

    let mut args = vec!["add", "--"];
    args.extend(paths.iter().map(String::as_str));

    if self.dry_run {
      self.log_dry_run(&args);
      return Ok(());
    }

    self.run_checked(&args, "git add").map(|_| ())
  }

  /// Whether anything is staged for commit
  pub fn has_staged_changes(&self) -> ConvoyResult<bool> {
    // diff --cached --quiet exits 1 when the index differs from HEAD
    let output = self.run(&["diff", "--cached", "--quiet"])?;
    Ok(!output.status.success())
  }

  /// Commit the index
  pub fn commit(&self, message: &str) -> ConvoyResult<()> {
    if self.dry_run {
      self.log_dry_run(&["commit", "-m", message]);
      return Ok(());
    }

    self.run_checked(&["commit", "-m", message], "git commit").map(|_| ())
  }

  /// Submodule paths declared in .gitmodules, in file order
  pub fn submodule_paths(&self) -> ConvoyResult<Vec<String>> {
    if !self.repo_path.join(".gitmodules").exists() {
      return Ok(Vec::new());
    }

    let output = self.run_checked(
      &["config", "-f", ".gitmodules", "--get-regexp", r"^submodule\..*\.path$"],
      "git config -f .gitmodules",
    )?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut paths = Vec::new();
    for line in stdout.lines() {
      // Format: "submodule.<name>.path <path>"
      if let Some((_, path)) = line.split_once(' ') {
        paths.push(path.trim().to_string());
      }
    }
    Ok(paths)
  }

  /// Run a git command, mapping a nonzero exit to a command failure
  fn run_checked(&self, args: &[&str], what: &str) -> ConvoyResult<Output> {
    let output = self.run(args)?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      return Err(ConvoyError::Git(GitError::CommandFailed {
        command: what.to_string(),
        stderr: stderr.trim().to_string(),
      }));
    }
    Ok(output)
  }

  /// Run a git command with the isolated environment and time budget
  fn run(&self, args: &[&str]) -> ConvoyResult<Output> {
    let mut cmd = self.git_cmd();
    cmd.args(args);
    run_with_timeout(cmd, self.timeout).map_err(|e| match e {
      RunError::Timeout => ConvoyError::Git(GitError::Timeout {
        command: format!("git {}", args.join(" ")),
        seconds: self.timeout.as_secs(),
      }),
      RunError::Io(err) => ConvoyError::Io(err).context(format!("Failed to execute git {}", args.join(" "))),
    })
  }

  /// Create a safe git command with isolated environment
  ///
  /// - Sets working directory to repo path
  /// - Clears environment variables, whitelists only PATH and HOME
  /// - Adds safe configuration overrides
  fn git_cmd(&self) -> Command {
    let mut cmd = Command::new("git");

    cmd.arg("-C").arg(&self.repo_path);

    // Isolated environment (don't trust global config)
    cmd.env_clear();
    if let Ok(path) = std::env::var("PATH") {
      cmd.env("PATH", path);
    }
    if let Ok(home) = std::env::var("HOME") {
      cmd.env("HOME", home);
    }

    // Force safe behavior (override user config)
    cmd.arg("-c").arg("protocol.version=2");
    cmd.arg("-c").arg("advice.detachedHead=false");
    cmd.arg("-c").arg("core.quotePath=false");

    cmd
  }

  fn log_dry_run(&self, args: &[&str]) {
    println!("   [dry-run] git -C {} {}", self.repo_path.display(), args.join(" "));
  }
}

enum RunError {
  Timeout,
  Io(std::io::Error),
}

/// Spawn the command and wait for it, killing the child when the budget
/// expires. Stdout/stderr are drained on dedicated threads so a chatty child
/// cannot deadlock on a full pipe.
fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<Output, RunError> {
  cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

  let mut child = cmd.spawn().map_err(RunError::Io)?;

  let mut stdout_pipe = child.stdout.take();
  let mut stderr_pipe = child.stderr.take();

  let stdout_handle = std::thread::spawn(move || {
    let mut buf = Vec::new();
    if let Some(pipe) = stdout_pipe.as_mut() {
      let _ = pipe.read_to_end(&mut buf);
    }
    buf
  });
  let stderr_handle = std::thread::spawn(move || {
    let mut buf = Vec::new();
    if let Some(pipe) = stderr_pipe.as_mut() {
      let _ = pipe.read_to_end(&mut buf);
    }
    buf
  });

  let deadline = Instant::now() + timeout;
  let status = loop {
    match child.try_wait().map_err(RunError::Io)? {
      Some(status) => break status,
      None => {
        if Instant::now() >= deadline {
          let _ = child.kill();
          let _ = child.wait();
          return Err(RunError::Timeout);
        }
        std::thread::sleep(Duration::from_millis(20));
      }
    }
  };

  let stdout = stdout_handle.join().unwrap_or_default();
  let stderr = stderr_handle.join().unwrap_or_default();

  Ok(Output { status, stdout, stderr })
}
