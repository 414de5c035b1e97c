//! `trackploy` -- deploy a staged tree to git-backed targets.
//!
//! This is the entry point. It parses CLI arguments with clap, resolves the
//! runtime context, and dispatches to command handlers.

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;

use cli::{Cli, Commands};
use context::RuntimeContext;

fn main() {
    // A deployment interrupted with Ctrl+C stops where it is; nothing is
    // rolled back and the next run's sync check sees the state it left.
    let _ = ctrlc::set_handler(|| {
        eprintln!("Interrupted");
        std::process::exit(130);
    });

    let cli = Cli::parse();
    let ctx = RuntimeContext::from_global_args(&cli.global);

    if ctx.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trackploy=debug")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Some(Commands::Deploy(args)) => commands::deploy::run(&ctx, &args),
        Some(Commands::Diff(args)) => commands::diff_cmd::run(&ctx, &args),
        Some(Commands::Status(args)) => commands::status_cmd::run(&ctx, &args),
        Some(Commands::Check(args)) => commands::check::run(&ctx, &args),
        Some(Commands::Config(args)) => commands::config_cmd::run(&ctx, &args),
        Some(Commands::Version) => commands::version::run(&ctx),
        Some(Commands::Completion(args)) => commands::completion::run(&args),
        None => {
            // No subcommand -- print help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            Ok(())
        }
    };

    if let Err(e) = result {
        if cli.global.json {
            let err_json = serde_json::json!({
                "error": format!("{:#}", e),
            });
            if let Ok(s) = serde_json::to_string_pretty(&err_json) {
                eprintln!("{}", s);
            }
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}
