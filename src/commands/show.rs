//! Show command: print the persisted release plan read-only

use crate::core::context::ReleaseContext;
use crate::core::error::ConvoyResult;
use crate::release::ReleasePlan;

pub fn run_show(ctx: &ReleaseContext, json: bool) -> ConvoyResult<()> {
  let plan = ReleasePlan::load(&ctx.plan_path())?;

  if json {
    println!("{}", serde_json::to_string_pretty(&plan)?);
  } else {
    println!("{}", plan.render());
  }

  Ok(())
}
