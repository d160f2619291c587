//! Apply command: execute the persisted release plan

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use crate::release::ReleasePlan;
use crate::release::executor::{self, ApplyOptions};

pub fn run_apply(ctx: &ReleaseContext, push: bool, dry_run: bool, force: bool, skip_parent: bool) -> ConvoyResult<()> {
  let mut plan = ReleasePlan::load(&ctx.plan_path())?;

  println!("{}", plan.render());

  let opts = ApplyOptions {
    push,
    dry_run,
    force,
    skip_parent,
  };
  executor::apply(ctx, &mut plan, &opts)
}
