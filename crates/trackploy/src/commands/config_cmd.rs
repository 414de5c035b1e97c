//! `trackploy config` -- show the effective configuration or write a new
//! `trackploy.yaml`.

use anyhow::{Context, Result, bail};
use trackploy_config::DeployConfig;
use trackploy_config::config::save_config;
use trackploy_config::config_file::CONFIG_FILE_NAME;

use crate::cli::{ConfigArgs, ConfigCommands, ConfigInitArgs, TargetArgs};
use crate::context::{RuntimeContext, apply_overrides};
use crate::output::output_json;

/// Execute the `trackploy config` command.
pub fn run(ctx: &RuntimeContext, args: &ConfigArgs) -> Result<()> {
    match &args.command {
        ConfigCommands::Show(target) => show(ctx, target),
        ConfigCommands::Init(init_args) => init(ctx, init_args),
    }
}

fn show(ctx: &RuntimeContext, args: &TargetArgs) -> Result<()> {
    let config = ctx.load_config(args)?;
    if ctx.json {
        output_json(&config);
    } else {
        let yaml = serde_yaml::to_string(&config).context("failed to render configuration")?;
        print!("{yaml}");
    }
    Ok(())
}

fn init(ctx: &RuntimeContext, args: &ConfigInitArgs) -> Result<()> {
    let path = std::env::current_dir()
        .context("cannot determine the current directory")?
        .join(CONFIG_FILE_NAME);
    if path.exists() && !args.force {
        bail!(
            "{} already exists\nHint: pass --force to overwrite it",
            path.display()
        );
    }

    let mut config = DeployConfig::default();
    apply_overrides(&mut config, &args.target);
    save_config(&path, &config)?;

    if ctx.json {
        output_json(&serde_json::json!({ "path": path }));
    } else if !ctx.quiet {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
