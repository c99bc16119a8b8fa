mod analytics;
mod chat;
mod commands;
mod error;
mod format;
mod host;
mod lifecycle;
mod providers;
mod storage;
mod types;
mod util;

#[cfg(test)]
mod testing;

use clap::Parser;
use commands::{Cli, Commands};
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "AI_JOURNAL_LOG";

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();
    let store = cli.settings_store();

    let result = match cli.command {
        Commands::Models(args) => commands::chat::run(args, &store),
        Commands::Entries(args) => commands::journal::entries(args),
        Commands::Status(args) => commands::journal::status(args),
        Commands::Add(args) => commands::journal::add(args, &store),
        Commands::EndWeek(args) => commands::journal::end_week_command(args, &store),
        Commands::Settings(cmd) => commands::settings::run(cmd, &store),
        Commands::Keys(cmd) => commands::keychain::run(cmd),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
