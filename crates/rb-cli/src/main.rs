use std::io;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use rb_cli::commands::{booking, issue, log, schedule, timeline};
use rb_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let today = Local::now().date_naive();
    let mut out = io::stdout().lock();
    match command {
        Commands::Book(args) => booking::book(&mut out, args, &config, today)?,
        Commands::Shift(args) => booking::shift(&mut out, args, &config, today)?,
        Commands::Split(args) => booking::split(&mut out, args, &config, today)?,
        Commands::Delete(args) => booking::delete(&mut out, args, &config)?,
        Commands::Log(args) => log::run(&mut out, args, &config, today)?,
        Commands::Issue(args) => issue::issue(&mut out, args, &config)?,
        Commands::Milestone(args) => issue::milestone(&mut out, args, &config)?,
        Commands::Schedule(args) => schedule::run(&mut out, args, &config, today)?,
        Commands::Timeline(args) => timeline::run(&mut out, args, &config, today)?,
    }

    Ok(())
}
