//! `trackploy diff` -- sync the local clone and show the staged changes.

use anyhow::Result;
use trackploy_ui::styles::render_change_summary;

use crate::cli::DiffArgs;
use crate::commands::deploy::build_deployer;
use crate::context::RuntimeContext;
use crate::output::{output_json, print_change_set};

/// Execute the `trackploy diff` command.
pub fn run(ctx: &RuntimeContext, args: &DiffArgs) -> Result<()> {
    let settings = ctx.settings(&args.target)?;
    let mut deployer = build_deployer(ctx, &settings)?;
    deployer.sync()?;
    let changes = deployer.preview()?;

    if ctx.json {
        output_json(&changes);
    } else if args.stat {
        println!("{}", render_change_summary(&changes));
    } else {
        print_change_set(&changes);
    }
    Ok(())
}
