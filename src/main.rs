mod catalog;
mod cli;
mod commands;
mod config;
mod host;
mod paths;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub why_run: bool,
    pub strict: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        // Recipe `log` resources always reach the terminal.
        .filter_module("recipe", log_level.max(log::LevelFilter::Info))
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        why_run: cli.why_run,
        strict: cli.strict,
    };

    match cli.command {
        Command::Resolve(args) => commands::resolve::run(&ctx, args),
        Command::Apply(args) => commands::apply::run(&ctx, args),
        Command::List { providers } => commands::list::run(&ctx, providers),
        Command::Node(args) => commands::node::run(&ctx, args),
        Command::Config => commands::config::run(&ctx),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "sous", &mut io::stdout());
            Ok(())
        }
    }
}
