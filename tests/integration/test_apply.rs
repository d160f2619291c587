//! Integration tests for `convoy apply`

use crate::helpers::{TestProduct, combined_output};
use anyhow::Result;

fn two_repo_product() -> Result<TestProduct> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;
  product.tag_in("core", "v0.1.0")?;
  product.tag_in("flow", "v0.1.0")?;
  product.commit_in("core", "fix: flush on close")?;
  product.commit_in("flow", "fix: propagate errors")?;
  Ok(product)
}

#[test]
fn test_apply_tags_pushes_and_finalizes_parent() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["plan"])?;
  product.run(&["apply", "--push"])?;

  // Child tags reached their upstreams
  assert_eq!(product.tags_in_origin("core")?, vec!["v0.1.1"]);
  assert_eq!(product.tags_in_origin("flow")?, vec!["v0.1.1"]);

  // Parent recorded the release: pointer commit, tag, push
  let log = product.root_log(1)?;
  assert_eq!(log[0], "release: core@v0.1.1, flow@v0.1.1");
  assert_eq!(product.tags_in_origin("product")?, vec!["v0.1.1"]);

  // A fully successful apply clears the plan
  assert!(!product.plan_path().exists());
  Ok(())
}

#[test]
fn test_apply_without_push_stays_local() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["plan"])?;
  product.run(&["apply"])?;

  assert!(product.local_tags("core")?.contains(&"v0.1.1".to_string()));
  // Nothing pushed to the upstreams
  assert!(product.tags_in_origin("core")?.is_empty());
  Ok(())
}

#[test]
fn test_dry_run_mutates_nothing_and_keeps_plan() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["plan"])?;
  let output = product.run(&["apply", "--push", "--dry-run"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("[dry-run]"), "should log intended git calls: {}", stdout);
  assert!(!product.local_tags("core")?.contains(&"v0.1.1".to_string()));
  assert!(product.tags_in_origin("core")?.is_empty());
  assert!(product.plan_path().exists(), "dry-run must keep the plan");
  Ok(())
}

#[test]
fn test_preflight_blocks_dirty_repo() -> Result<()> {
  let product = two_repo_product()?;
  product.run(&["plan"])?;

  std::fs::write(product.child("flow").join("scratch.txt"), "uncommitted")?;

  let output = product.run_raw(&["apply"])?;
  assert_eq!(output.status.code(), Some(3), "preflight failures exit 3");
  let text = combined_output(&output);
  assert!(text.contains("flow"), "should name the dirty repo: {}", text);

  // All-or-nothing: the clean repo was not tagged either
  assert!(!product.local_tags("core")?.contains(&"v0.1.1".to_string()));
  assert!(product.plan_path().exists());
  Ok(())
}

#[test]
fn test_partial_failure_reports_and_resumes() -> Result<()> {
  let product = two_repo_product()?;
  product.run(&["plan"])?;

  // flow's upstream cannot accept pushes; core's can
  product.break_origin("flow")?;

  let output = product.run_raw(&["apply", "--push"])?;
  assert_eq!(output.status.code(), Some(3));
  let text = combined_output(&output);
  assert!(text.contains("flow"), "failure must name flow: {}", text);

  // core went through and is not rolled back
  assert_eq!(product.tags_in_origin("core")?, vec!["v0.1.1"]);

  // Plan survives with per-repo execution state for resuming
  let plan = product.plan_json()?;
  assert_eq!(plan["repos"]["core"]["exec"], "pushed");
  assert_eq!(plan["repos"]["flow"]["exec"], "failed");

  // Parent finalize waits for the full release
  assert_ne!(product.root_log(1)?[0], "release: core@v0.1.1, flow@v0.1.1");

  // Fix the remote and re-run: core is skipped, flow retried
  product.fix_origin("flow")?;
  let output = product.run(&["apply", "--push"])?;
  let text = combined_output(&output);
  assert!(text.contains("skipping"), "core should be skipped on resume: {}", text);

  assert_eq!(product.tags_in_origin("flow")?, vec!["v0.1.1"]);
  assert_eq!(product.root_log(1)?[0], "release: core@v0.1.1, flow@v0.1.1");
  assert!(!product.plan_path().exists());
  Ok(())
}

#[test]
fn test_reapplying_a_completed_plan_is_a_noop() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["plan"])?;
  let plan_bytes = std::fs::read(product.plan_path())?;
  product.run(&["apply", "--push"])?;

  // Restore the cleared plan and re-apply: existing tags satisfy it
  std::fs::write(product.plan_path(), &plan_bytes)?;
  product.run(&["apply", "--push"])?;

  assert_eq!(product.tags_in_origin("core")?, vec!["v0.1.1"]);
  let release_commits = product
    .root_log(10)?
    .into_iter()
    .filter(|s| s.starts_with("release:"))
    .count();
  assert_eq!(release_commits, 1, "no duplicate parent commit on re-apply");
  Ok(())
}

#[test]
fn test_skip_parent_leaves_root_untouched() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["plan", "--skip-parent"])?;
  product.run(&["apply", "--push"])?;

  assert_eq!(product.tags_in_origin("core")?, vec!["v0.1.1"]);
  assert!(product.tags_in_origin("product")?.is_empty());
  assert!(!product.root_log(1)?[0].starts_with("release:"));
  Ok(())
}

#[test]
fn test_one_shot_release_command() -> Result<()> {
  let product = two_repo_product()?;

  product.run(&["release", "--push"])?;

  assert_eq!(product.tags_in_origin("core")?, vec!["v0.1.1"]);
  assert_eq!(product.tags_in_origin("flow")?, vec!["v0.1.1"]);
  assert!(!product.plan_path().exists());
  Ok(())
}

#[test]
fn test_apply_without_plan_fails() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;

  let output = product.run_raw(&["apply"])?;
  assert!(!output.status.success());
  assert!(combined_output(&output).contains("No release plan"));
  Ok(())
}
