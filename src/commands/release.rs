//! Release command: legacy one-shot plan + apply
//!
//! Kept for operators who do not want the review pause. The plan is still
//! persisted first, so a failed apply leaves the same resumable state as the
//! two-step flow.

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use crate::release::executor::{self, ApplyOptions};
use crate::release::planner::{self, ReleaseSelectionCriteria};

#[allow(clippy::too_many_arguments)] // flags map one-to-one onto CLI options
pub fn run_release(
  ctx: &ReleaseContext,
  major: Vec<String>,
  minor: Vec<String>,
  patch: Vec<String>,
  only: Vec<String>,
  with_deps: bool,
  skip_parent: bool,
  push: bool,
  dry_run: bool,
  force: bool,
) -> ConvoyResult<()> {
  let criteria = ReleaseSelectionCriteria {
    major,
    minor,
    patch,
    only,
    with_deps,
    skip_parent,
    changelog: true,
  };

  let mut plan = planner::generate_plan(ctx, &criteria)?;
  println!("{}", plan.render());

  let opts = ApplyOptions {
    push,
    dry_run,
    force,
    skip_parent,
  };
  executor::apply(ctx, &mut plan, &opts)
}
