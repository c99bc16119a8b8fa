use crate::error::{JournalError, JournalResult};
use crate::storage::keychain::{clear_api_key, has_api_key, set_api_key, KeyProvider};
use clap::{Args, Subcommand};
use std::io::BufRead;

#[derive(Subcommand)]
pub enum KeysCommand {
    #[command(about = "Store an API key (reads stdin when no key is given)")]
    Set(SetKeyArgs),

    #[command(about = "Remove a stored API key")]
    Clear(ProviderArgs),

    #[command(about = "Show whether a key is stored")]
    Status(ProviderArgs),
}

#[derive(Args)]
pub struct ProviderArgs {
    #[arg(help = "openai, gemini or compatible")]
    pub provider: String,
}

#[derive(Args)]
pub struct SetKeyArgs {
    #[arg(help = "openai, gemini or compatible")]
    pub provider: String,

    pub key: Option<String>,
}

fn provider(value: &str) -> JournalResult<KeyProvider> {
    KeyProvider::parse(value).ok_or_else(|| {
        JournalError::Validation(format!(
            "Unknown provider '{value}'. Use openai, gemini or compatible."
        ))
    })
}

pub fn run(cmd: KeysCommand) -> JournalResult<()> {
    match cmd {
        KeysCommand::Set(args) => {
            let provider = provider(&args.provider)?;
            let key = match args.key {
                Some(key) => key,
                None => {
                    let mut line = String::new();
                    std::io::stdin().lock().read_line(&mut line)?;
                    line
                }
            };
            set_api_key(provider, &key)?;
            println!("Stored {} key in the keychain.", args.provider);
        }
        KeysCommand::Clear(args) => {
            clear_api_key(provider(&args.provider)?)?;
            println!("Removed {} key from the keychain.", args.provider);
        }
        KeysCommand::Status(args) => {
            let stored = has_api_key(provider(&args.provider)?)?;
            println!("{}: {}", args.provider, if stored { "stored" } else { "not set" });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_rejected() {
        assert!(matches!(provider("claude"), Err(JournalError::Validation(_))));
        assert_eq!(provider("Gemini").expect("provider"), KeyProvider::Gemini);
    }
}
