use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ts_cli::commands::{backfill, balance, clock, edit, holidays, mark, show};
use ts_cli::{Cli, Commands, Config, TerminalPrompt};
use ts_core::DayKind;
use ts_db::Database;

/// Open the database, ensuring the parent directory exists.
fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path).with_context(|| {
        format!(
            "failed to open database at {}",
            config.database_path.display()
        )
    })
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::load_from(cli.config.as_deref());

    // Verbose flag or `debug = true` in the config turn on debug logging
    let filter = if cli.verbose || config.as_ref().is_ok_and(|c| c.debug) {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    match run(&cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, config: Result<Config, figment::Error>) -> Result<()> {
    let config = config.context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let now = Local::now().naive_local();
    let today = now.date();
    let mut db = open_database(&config)?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Clock(args) => clock::run(&mut stdout, args, &mut db, &config, now)?,
        Commands::Edit(args) => edit::run(&mut stdout, args, &mut db, today)?,
        Commands::Flex(args) => mark::run(&mut stdout, args, DayKind::Flex, &mut db, today)?,
        Commands::Pto(args) => mark::run(&mut stdout, args, DayKind::Pto, &mut db, today)?,
        Commands::Show(args) => show::run(&mut stdout, args, &db, &config, today)?,
        Commands::Backfill(args) => {
            let mut prompt = TerminalPrompt::stdio();
            backfill::run(&mut stdout, args, &mut db, &config, today, &mut prompt)?;
        }
        Commands::Balance(args) => balance::run(&mut stdout, args, &mut db, &config, today)?,
        Commands::Holidays(args) => holidays::run(&mut stdout, args, &mut db)?,
    }

    stdout.flush()?;
    Ok(())
}
