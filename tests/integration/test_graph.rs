//! Integration tests for `convoy graph`

use crate::helpers::{TestProduct, combined_output};
use anyhow::Result;

#[test]
fn test_graph_levels_follow_dependencies() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core"])?;
  product.add_repo("web", &["core", "flow"])?;

  let output = product.run(&["graph", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(report["levels"], serde_json::json!([["core"], ["flow"], ["web"]]));
  assert_eq!(report["dependencies"]["web"], serde_json::json!(["core", "flow"]));
  Ok(())
}

#[test]
fn test_independent_repos_share_a_level() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("util", &[])?;
  product.add_repo("web", &["core", "util"])?;

  let output = product.run(&["graph", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;

  assert_eq!(report["levels"], serde_json::json!([["core", "util"], ["web"]]));
  Ok(())
}

#[test]
fn test_external_requirements_hidden_by_default() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("core", &[])?;
  product.add_repo("flow", &["core", "serde"])?;

  let output = product.run(&["graph", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(report["dependencies"]["flow"], serde_json::json!(["core"]));

  let output = product.run(&["graph", "--include-external", "--json"])?;
  let report: serde_json::Value = serde_json::from_slice(&output.stdout)?;
  assert_eq!(report["dependencies"]["flow"], serde_json::json!(["core", "serde"]));
  // External leaves never join the release order
  assert_eq!(report["levels"], serde_json::json!([["core"], ["flow"]]));
  Ok(())
}

#[test]
fn test_dependency_cycle_is_fatal() -> Result<()> {
  let product = TestProduct::new()?;
  product.add_repo("alpha", &["beta"])?;
  product.add_repo("beta", &["alpha"])?;

  let output = product.run_raw(&["status"])?;
  assert!(!output.status.success(), "cycle must abort every command");
  let text = combined_output(&output);
  assert!(text.contains("cycle"), "should name the cycle: {}", text);
  assert!(text.contains("alpha") && text.contains("beta"));
  Ok(())
}
