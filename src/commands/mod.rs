pub mod chat;
pub mod journal;
pub mod keychain;
pub mod settings;

use crate::host::SettingsService;
use crate::storage::keychain::with_keychain_fallback;
use crate::storage::settings_io::FileSettingsStore;
use crate::types::JournalSettings;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "ai_journal",
    author,
    version,
    about = "AI-assisted learning journal for markdown notes",
    long_about = "Append prompt/response exchanges from OpenAI, Gemini, OpenAI-compatible or \
                  local models to a markdown note,\nreplay earlier exchanges as context, and close \
                  the week with learning analytics."
)]
pub struct Cli {
    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true, env = "AI_JOURNAL_SETTINGS")]
    pub settings_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "List the models available with the current settings")]
    Models(chat::ModelsArgs),

    #[command(about = "List the journal entries of a note")]
    Entries(journal::EntriesArgs),

    #[command(about = "Show whether a note is uninitialized, active or locked")]
    Status(journal::StatusArgs),

    #[command(about = "Ask a model and append the exchange to a note")]
    Add(journal::AddArgs),

    #[command(about = "Write the weekly reflection and analytics, then lock the note")]
    EndWeek(journal::EndWeekArgs),

    #[command(subcommand, about = "Show or change settings")]
    Settings(settings::SettingsCommand),

    #[command(subcommand, about = "Manage API keys stored in the OS keychain")]
    Keys(keychain::KeysCommand),
}

impl Cli {
    pub fn settings_store(&self) -> FileSettingsStore {
        match &self.settings_file {
            Some(path) => FileSettingsStore::new(path.clone()),
            None => FileSettingsStore::at_default_location(),
        }
    }
}

/// Settings for one action: the file values with keychain keys filling gaps.
pub(crate) fn settings_snapshot(store: &FileSettingsStore) -> JournalSettings {
    with_keychain_fallback(store.load())
}
