mod cli;
mod commands;
mod config;
mod loader;
mod report;
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
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    if let Command::Completions { shell } = cli.command {
        generate(shell, &mut Cli::command(), "intune-import", &mut io::stdout());
        return Ok(());
    }

    let config = config::AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Import(args) => commands::import::run(&ctx, &config, args),
        Command::Classify { path } => commands::classify::run(&ctx, &path),
        Command::Inventory { kind } => commands::inventory::run(&ctx, &config, kind),
        Command::Kinds => commands::kinds::run(&ctx),
        Command::Config(cmd) => commands::config::run(&ctx, cli.config.as_deref(), &config, cmd),
        Command::Completions { .. } => Ok(()),
    }
}
