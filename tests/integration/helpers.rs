//! Test helpers for integration tests

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// A test product: a root repository with child repositories as submodules,
/// each with its own bare upstream so pushes have somewhere to land
pub struct TestProduct {
  _tmp: TempDir,
  /// Working clone of the product root
  pub root: PathBuf,
  /// Directory holding the bare upstreams
  pub origins: PathBuf,
}

impl TestProduct {
  /// Create the product root with its bare upstream
  pub fn new() -> Result<Self> {
    let tmp = TempDir::new()?;
    let origins = tmp.path().join("origins");
    std::fs::create_dir_all(&origins)?;

    let root_origin = origins.join("product.git");
    git(&origins, &["init", "--bare", "--initial-branch=main", "product.git"])?;

    let root = tmp.path().join("product");
    std::fs::create_dir_all(&root)?;
    git(&root, &["init", "--initial-branch=main"])?;
    git(&root, &["config", "user.name", "Test User"])?;
    git(&root, &["config", "user.email", "test@example.com"])?;
    git(&root, &["remote", "add", "origin", path_str(&root_origin)])?;

    std::fs::write(root.join("convoy.toml"), "[release]\nbranch = \"main\"\n")?;
    std::fs::write(root.join(".gitignore"), ".convoy/\n")?;
    git(&root, &["add", "."])?;
    git(&root, &["commit", "-m", "chore: product scaffolding"])?;
    git(&root, &["push", "-u", "origin", "main"])?;

    Ok(Self {
      _tmp: tmp,
      root,
      origins,
    })
  }

  /// Create a child repository with its bare upstream and add it to the
  /// product as a submodule. `deps` are sibling package names to declare in
  /// the child's manifest.
  pub fn add_repo(&self, name: &str, deps: &[&str]) -> Result<()> {
    let bare = self.origins.join(format!("{}.git", name));
    git(
      &self.origins,
      &["init", "--bare", "--initial-branch=main", &format!("{}.git", name)],
    )?;

    // Seed the upstream through a scratch working copy
    let seed = self.origins.join(format!("{}-seed", name));
    std::fs::create_dir_all(&seed)?;
    git(&seed, &["init", "--initial-branch=main"])?;
    git(&seed, &["config", "user.name", "Test User"])?;
    git(&seed, &["config", "user.email", "test@example.com"])?;
    git(&seed, &["remote", "add", "origin", path_str(&bare)])?;

    let mut manifest = format!(
      "[package]\nname = \"{}\"\nversion = \"0.1.0\"\nedition = \"2021\"\n\n[dependencies]\n",
      name
    );
    for dep in deps {
      manifest.push_str(&format!("{} = {{ git = \"https://example.invalid/{}\" }}\n", dep, dep));
    }
    std::fs::write(seed.join("Cargo.toml"), manifest)?;
    std::fs::create_dir_all(seed.join("src"))?;
    std::fs::write(seed.join("src/lib.rs"), format!("//! {} crate\n", name))?;
    git(&seed, &["add", "."])?;
    git(&seed, &["commit", "-m", &format!("chore: scaffold {}", name)])?;
    git(&seed, &["push", "-u", "origin", "main"])?;

    // Link into the product; local submodule URLs need the file protocol
    git(
      &self.root,
      &[
        "-c",
        "protocol.file.allow=always",
        "submodule",
        "add",
        path_str(&bare),
        name,
      ],
    )?;
    let child = self.child(name);
    git(&child, &["config", "user.name", "Test User"])?;
    git(&child, &["config", "user.email", "test@example.com"])?;
    git(&self.root, &["commit", "-m", &format!("chore: add {} submodule", name)])?;
    git(&self.root, &["push", "origin", "main"])?;

    Ok(())
  }

  /// Working tree of a child repository
  pub fn child(&self, name: &str) -> PathBuf {
    self.root.join(name)
  }

  /// Commit a content change inside a child repository
  pub fn commit_in(&self, name: &str, message: &str) -> Result<()> {
    let dir = self.child(name);
    let log = dir.join("CHANGES.txt");
    let mut content = std::fs::read_to_string(&log).unwrap_or_default();
    content.push_str(message);
    content.push('\n');
    std::fs::write(&log, content)?;

    git(&dir, &["add", "."])?;
    git(&dir, &["commit", "-m", message])?;
    Ok(())
  }

  /// Create an annotated tag in a child repository
  pub fn tag_in(&self, name: &str, tag: &str) -> Result<()> {
    git(&self.child(name), &["tag", "-a", tag, "-m", tag])?;
    Ok(())
  }

  /// Tags present in a repository's bare upstream
  pub fn tags_in_origin(&self, name: &str) -> Result<Vec<String>> {
    let bare = if name == "product" {
      self.origins.join("product.git")
    } else {
      self.origins.join(format!("{}.git", name))
    };
    let output = git(&self.origins, &["ls-remote", "--tags", path_str(&bare)])?;
    let stdout = String::from_utf8_lossy(&output.stdout);

    let mut tags: Vec<String> = stdout
      .lines()
      .filter_map(|line| line.split("refs/tags/").nth(1))
      .map(|t| t.trim_end_matches("^{}").to_string())
      .collect();
    tags.sort();
    tags.dedup();
    Ok(tags)
  }

  /// Tags present locally in a child repository
  pub fn local_tags(&self, name: &str) -> Result<Vec<String>> {
    let output = git(&self.child(name), &["tag", "-l"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect(),
    )
  }

  /// Subjects of the most recent commits in the product root
  pub fn root_log(&self, n: usize) -> Result<Vec<String>> {
    let output = git(&self.root, &["log", &format!("-{}", n), "--pretty=format:%s"])?;
    Ok(
      String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect(),
    )
  }

  /// Point a child repository's origin somewhere that cannot accept pushes
  pub fn break_origin(&self, name: &str) -> Result<()> {
    git(
      &self.child(name),
      &["remote", "set-url", "origin", "/nonexistent/convoy-test.git"],
    )?;
    Ok(())
  }

  /// Restore a child repository's origin to its bare upstream
  pub fn fix_origin(&self, name: &str) -> Result<()> {
    let bare = self.origins.join(format!("{}.git", name));
    git(&self.child(name), &["remote", "set-url", "origin", path_str(&bare)])?;
    Ok(())
  }

  /// The persisted plan location
  pub fn plan_path(&self) -> PathBuf {
    self.root.join(".convoy").join("release-plan.json")
  }

  /// Parse the persisted plan as JSON
  pub fn plan_json(&self) -> Result<serde_json::Value> {
    let content = std::fs::read_to_string(self.plan_path())?;
    Ok(serde_json::from_str(&content)?)
  }

  /// Run convoy in the product root, failing the test on a nonzero exit
  pub fn run(&self, args: &[&str]) -> Result<Output> {
    let output = self.run_raw(args)?;
    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr);
      let stdout = String::from_utf8_lossy(&output.stdout);
      anyhow::bail!(
        "convoy {} failed\nstdout: {}\nstderr: {}",
        args.join(" "),
        stdout,
        stderr
      );
    }
    Ok(output)
  }

  /// Run convoy without asserting on the exit status
  pub fn run_raw(&self, args: &[&str]) -> Result<Output> {
    let bin = env!("CARGO_BIN_EXE_convoy");
    Command::new(bin)
      .current_dir(&self.root)
      .args(args)
      .output()
      .context("Failed to run convoy")
  }
}

fn path_str(path: &Path) -> &str {
  path.to_str().expect("test paths are valid UTF-8")
}

/// Run git command in a directory
pub fn git(cwd: &Path, args: &[&str]) -> Result<Output> {
  let output = Command::new("git")
    .current_dir(cwd)
    .args(args)
    .output()
    .context("Failed to run git command")?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    anyhow::bail!("Git command failed: git {}\n{}", args.join(" "), stderr);
  }

  Ok(output)
}

/// Combined stdout + stderr as a string
pub fn combined_output(output: &Output) -> String {
  format!(
    "{}{}",
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  )
}
