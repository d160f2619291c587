//! Plan command: analyze the product and persist a reviewable release plan

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use crate::release::planner::{self, ReleaseSelectionCriteria};

/// Generate and persist a release plan, then print it for review
#[allow(clippy::too_many_arguments)] // flags map one-to-one onto CLI options
pub fn run_plan(
  ctx: &ReleaseContext,
  major: Vec<String>,
  minor: Vec<String>,
  patch: Vec<String>,
  only: Vec<String>,
  with_deps: bool,
  skip_parent: bool,
  no_changelog: bool,
  json: bool,
) -> ConvoyResult<()> {
  let criteria = ReleaseSelectionCriteria {
    major,
    minor,
    patch,
    only,
    with_deps,
    skip_parent,
    changelog: !no_changelog,
  };

  let plan = planner::generate_plan(ctx, &criteria)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
    return Ok(());
  }

  println!("{}", plan.render());
  println!("Plan written to {}", ctx.plan_path().display());
  println!();
  println!("Next steps:");
  println!("  review/edit the plan file (selected, selected_bump), then");
  println!("  convoy apply --push");

  Ok(())
}
