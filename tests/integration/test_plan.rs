//! Integration tests for `convoy plan`

use crate::helpers::{TestProduct, combined_output};
use anyhow::Result;

#[test]
fn test_plan_orders_changed_repos_and_suggests_patch() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;
  product.tag_in("core", "v0.1.0")?;
  product.tag_in("flow", "v0.1.0")?;
  product.commit_in("core", "docs: clarify usage")?;
  product.commit_in("flow", "chore: tidy build")?;

  product.run(&["plan"])?;
  let plan = product.plan_json()?;

  assert_eq!(plan["release_levels"], serde_json::json!([["core"], ["flow"]]));
  for name in ["core", "flow"] {
    let row = &plan["repos"][name];
    assert_eq!(row["selected_bump"], "patch", "{} should be a patch", name);
    assert_eq!(row["next_version"], "0.1.1");
    assert_eq!(row["status"], "pending-review");
    assert_eq!(row["selected"], true);
    assert_eq!(row["exec"], "pending");
  }
  assert_eq!(plan["parent_version"], "0.1.1");
  Ok(())
}

#[test]
fn test_unchanged_repo_is_excluded_with_same_version() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;
  product.tag_in("core", "v1.2.0")?;
  product.tag_in("flow", "v0.1.0")?;
  product.commit_in("flow", "fix: handle empty input")?;

  product.run(&["plan"])?;
  let plan = product.plan_json()?;

  let core = &plan["repos"]["core"];
  assert_eq!(core["selected"], false);
  assert_eq!(core["status"], "-");
  assert_eq!(core["next_version"], "1.2.0");

  // Unselected dependencies never gate level assignment
  assert_eq!(plan["release_levels"], serde_json::json!([["flow"]]));
  Ok(())
}

#[test]
fn test_major_override() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.tag_in("core", "v1.2.3")?;
  product.commit_in("core", "chore: small tweak")?;

  product.run(&["plan", "--major", "core"])?;
  let plan = product.plan_json()?;

  let core = &plan["repos"]["core"];
  assert_eq!(core["selected_bump"], "major");
  assert_eq!(core["next_version"], "2.0.0");
  Ok(())
}

#[test]
fn test_feature_commit_suggests_minor() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.tag_in("core", "v0.1.0")?;
  product.commit_in("core", "feat: add streaming mode")?;

  product.run(&["plan"])?;
  let plan = product.plan_json()?;

  assert_eq!(plan["repos"]["core"]["suggested_bump"], "minor");
  assert_eq!(plan["repos"]["core"]["next_version"], "0.2.0");
  Ok(())
}

#[test]
fn test_unreleased_repo_starts_from_zero() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;

  product.run(&["plan"])?;
  let plan = product.plan_json()?;

  let core = &plan["repos"]["core"];
  assert_eq!(core["current_version"], "0.0.0");
  assert!(core["current_tag"].is_null());
  assert_eq!(core["selected"], true);
  Ok(())
}

#[test]
fn test_nothing_to_release_is_an_error() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.tag_in("core", "v0.1.0")?;

  let output = product.run_raw(&["plan"])?;
  assert!(!output.status.success());
  assert!(combined_output(&output).contains("No repository"));
  assert!(!product.plan_path().exists());
  Ok(())
}

#[test]
fn test_changelog_draft_is_staged() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("flow", &[])?;
  product.tag_in("flow", "v0.1.0")?;
  product.commit_in("flow", "feat(parser): accept trailing commas")?;

  product.run(&["plan"])?;

  let draft = product.root.join(".convoy").join("changelogs").join("flow.md");
  assert!(draft.exists(), "changelog draft should be staged");
  let content = std::fs::read_to_string(&draft)?;
  assert!(content.contains("### Features"));
  assert!(content.contains("accept trailing commas"));

  let plan = product.plan_json()?;
  assert!(plan["repos"]["flow"]["changelog_path"].as_str().unwrap().ends_with("flow.md"));
  Ok(())
}

#[test]
fn test_with_deps_force_includes_unchanged_dependency() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;
  product.tag_in("core", "v1.0.0")?;
  product.tag_in("flow", "v0.1.0")?;
  product.commit_in("flow", "feat: new pipeline stage")?;

  product.run(&["plan", "--only", "flow", "--with-deps"])?;
  let plan = product.plan_json()?;

  let core = &plan["repos"]["core"];
  assert_eq!(core["selected"], true);
  assert_eq!(core["forced"], true);
  assert_eq!(core["selected_bump"], "patch");
  assert_eq!(core["next_version"], "1.0.1");

  // The forced dependency still releases before its dependent
  assert_eq!(plan["release_levels"], serde_json::json!([["core"], ["flow"]]));
  Ok(())
}

#[test]
fn test_unknown_repo_is_rejected() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.commit_in("core", "fix: something")?;

  let output = product.run_raw(&["plan", "--only", "ghost"])?;
  assert!(!output.status.success());
  assert!(combined_output(&output).contains("not managed"));
  Ok(())
}

#[test]
fn test_show_prints_persisted_plan() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.commit_in("core", "fix: off by one")?;

  product.run(&["plan"])?;
  let output = product.run(&["show"])?;
  let stdout = String::from_utf8_lossy(&output.stdout);

  assert!(stdout.contains("Release plan"));
  assert!(stdout.contains("core"));
  Ok(())
}
