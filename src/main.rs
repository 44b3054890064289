//! Binary entry point: resolve configuration, start logging, open the store,
//! then hand off to the TUI or a one-shot command.
use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use school_manager::cli::{self, Cli, Command};
use school_manager::config::Config;
use school_manager::{logging, run_app, App, SqliteStore};

fn main() -> Result<()> {
    let args = Cli::parse();

    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = args.db {
        config.db_path = db;
    }
    logging::init(&config.log_path, &config.log_level)?;

    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    info!(db = %config.db_path.display(), "school manager started");

    match args.command.unwrap_or(Command::Tui) {
        Command::Tui => {
            let mut app = App::new(Box::new(store), config)?;
            run_app(&mut app)
        }
        command => {
            let stdout = io::stdout();
            cli::execute(command, &store, &config, &mut stdout.lock())
        }
    }
}
