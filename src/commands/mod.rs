//! CLI commands for convoy
//!
//! ## Inspection
//! - **status**: per-repository branch, cleanliness, latest tag, pending commits
//! - **graph**: release levels and dependency edges
//! - **show**: print the persisted release plan read-only
//!
//! ## Release
//! - **plan**: analyze the product and persist a reviewable release plan
//! - **apply**: execute the persisted plan (tag, push, parent finalize)
//! - **release**: legacy one-shot plan + apply without the review pause
//!
//! All commands accept `&ReleaseContext` to avoid redundant discovery work.

pub mod apply;
pub mod graph;
pub mod plan;
pub mod release;
pub mod show;
pub mod status;

pub use apply::run_apply;
pub use graph::run_graph;
pub use plan::run_plan;
pub use release::run_release;
pub use show::run_show;
pub use status::run_status;
