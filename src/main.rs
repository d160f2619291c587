mod commands;
mod core;
mod graph;
mod manifest;
mod release;
mod ui;

use crate::core::context::ReleaseContext;
use crate::core::error::{ConvoyError, print_error};
use clap::{Parser, Subcommand};

/// Coordinate dependency-ordered releases across submodule-linked repositories
#[derive(Parser)]
#[command(name = "convoy")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct ConvoyCli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  // ============================================================================
  // Inspection
  // ============================================================================
  /// Show status of all managed repositories
  Status {
    /// Output status in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Show release levels and dependency edges
  Graph {
    /// Also show requirements outside the product as leaf nodes
    #[arg(long)]
    include_external: bool,
    /// Output the graph in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Print the persisted release plan without applying it
  Show {
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  // ============================================================================
  // Release
  // ============================================================================
  /// Plan a release (analyze changes, suggest version bumps, persist for review)
  Plan {
    /// Force a major bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    major: Vec<String>,
    /// Force a minor bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    minor: Vec<String>,
    /// Force a patch bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    patch: Vec<String>,
    /// Restrict the release to these repositories (repeatable)
    #[arg(long, value_name = "REPO")]
    only: Vec<String>,
    /// Expand --only with its transitive dependencies
    #[arg(long)]
    with_deps: bool,
    /// Skip the parent finalize step at apply time
    #[arg(long)]
    skip_parent: bool,
    /// Do not stage changelog drafts
    #[arg(long)]
    no_changelog: bool,
    /// Output the plan in JSON format
    #[arg(long)]
    json: bool,
  },

  /// Apply the persisted release plan (tag, push, finalize parent)
  Apply {
    /// Push created tags and the finalized parent to origin
    #[arg(long)]
    push: bool,
    /// Log every mutating git call instead of executing it
    #[arg(long)]
    dry_run: bool,
    /// Proceed despite preflight violations
    #[arg(long)]
    force: bool,
    /// Skip the parent finalize step
    #[arg(long)]
    skip_parent: bool,
  },

  /// Plan and apply in one step (no review pause)
  Release {
    /// Force a major bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    major: Vec<String>,
    /// Force a minor bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    minor: Vec<String>,
    /// Force a patch bump for a repository (repeatable)
    #[arg(long, value_name = "REPO")]
    patch: Vec<String>,
    /// Restrict the release to these repositories (repeatable)
    #[arg(long, value_name = "REPO")]
    only: Vec<String>,
    /// Expand --only with its transitive dependencies
    #[arg(long)]
    with_deps: bool,
    /// Skip the parent finalize step
    #[arg(long)]
    skip_parent: bool,
    /// Push created tags and the finalized parent to origin
    #[arg(long)]
    push: bool,
    /// Log every mutating git call instead of executing it
    #[arg(long)]
    dry_run: bool,
    /// Proceed despite preflight violations
    #[arg(long)]
    force: bool,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .valid(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

fn main() {
  let cli = ConvoyCli::parse();

  // Build the product context once (root discovery, config, manifests, graph)
  let cwd = match std::env::current_dir() {
    Ok(dir) => dir,
    Err(e) => {
      eprintln!("Error: Failed to get current directory: {}", e);
      std::process::exit(1);
    }
  };

  let ctx = match ReleaseContext::build(&cwd) {
    Ok(ctx) => ctx,
    Err(e) => handle_error(e),
  };

  let result = match cli.command {
    Commands::Status { json } => commands::run_status(&ctx, json),
    Commands::Graph { include_external, json } => commands::run_graph(&ctx, include_external, json),
    Commands::Show { json } => commands::run_show(&ctx, json),

    Commands::Plan {
      major,
      minor,
      patch,
      only,
      with_deps,
      skip_parent,
      no_changelog,
      json,
    } => commands::run_plan(
      &ctx,
      major,
      minor,
      patch,
      only,
      with_deps,
      skip_parent,
      no_changelog,
      json,
    ),

    Commands::Apply {
      push,
      dry_run,
      force,
      skip_parent,
    } => commands::run_apply(&ctx, push, dry_run, force, skip_parent),

    Commands::Release {
      major,
      minor,
      patch,
      only,
      with_deps,
      skip_parent,
      push,
      dry_run,
      force,
    } => commands::run_release(
      &ctx, major, minor, patch, only, with_deps, skip_parent, push, dry_run, force,
    ),
  };

  if let Err(err) = result {
    handle_error(err);
  }
}

fn handle_error(err: ConvoyError) -> ! {
  print_error(&err);
  std::process::exit(err.exit_code().as_i32());
}
