//! Integration tests for `convoy status`

use crate::helpers::TestProduct;
use anyhow::Result;

#[test]
fn test_status_lists_every_managed_repo() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;

  let output = product.run(&["status"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("core"), "missing core in: {}", stdout);
  assert!(stdout.contains("flow"), "missing flow in: {}", stdout);
  assert!(stdout.contains("clean"), "fresh repos should be clean: {}", stdout);
  Ok(())
}

#[test]
fn test_status_json_is_valid() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;

  let output = product.run(&["status", "--json"])?;
  let rows: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  let rows = rows.as_array().expect("status --json is an array");
  assert_eq!(rows.len(), 2);
  for row in rows {
    assert_eq!(row["branch"], "main");
    assert_eq!(row["dirty"], false);
    // Unreleased repos report their whole history as pending
    assert!(row["pending_commits"].as_u64().unwrap() >= 1);
    assert!(row["latest_tag"].is_null());
  }
  Ok(())
}

#[test]
fn test_status_shows_tag_and_pending_count() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.tag_in("core", "v0.1.0")?;
  product.commit_in("core", "docs: explain the thing")?;

  let output = product.run(&["status", "--json"])?;
  let rows: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  let core = &rows.as_array().unwrap()[0];
  assert_eq!(core["name"], "core");
  assert_eq!(core["latest_tag"], "v0.1.0");
  assert_eq!(core["pending_commits"], 1);
  Ok(())
}

#[test]
fn test_status_marks_dirty_worktree() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  std::fs::write(product.child("core").join("scratch.txt"), "uncommitted")?;

  let output = product.run(&["status", "--json"])?;
  let rows: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(rows.as_array().unwrap()[0]["dirty"], true);
  Ok(())
}
