use crate::error::{JournalError, JournalResult};
use crate::host::SettingsService;
use crate::storage::settings_io::FileSettingsStore;
use crate::types::{normalize_settings, JournalSettings, LocalApiFormat};
use clap::{Args, Subcommand};

#[derive(Subcommand)]
pub enum SettingsCommand {
    #[command(about = "Print the stored settings (keys masked)")]
    Show,

    #[command(about = "Change one setting")]
    Set(SetArgs),

    #[command(about = "Print the settings file location")]
    Path,
}

#[derive(Args)]
pub struct SetArgs {
    /// Field name, e.g. geminiApiKey, useLocalLlm, localLlmApiFormat
    pub field: String,

    /// New value (empty string clears text fields)
    pub value: String,
}

pub fn run(cmd: SettingsCommand, store: &FileSettingsStore) -> JournalResult<()> {
    match cmd {
        SettingsCommand::Show => {
            let masked = masked(store.load());
            println!("{}", serde_json::to_string_pretty(&masked)?);
        }
        SettingsCommand::Set(args) => {
            let updated = apply_setting(store.load(), &args.field, &args.value)?;
            store.save(&updated)?;
            println!("Saved {} to {}", args.field, store.path().display());
        }
        SettingsCommand::Path => println!("{}", store.path().display()),
    }
    Ok(())
}

fn masked(mut settings: JournalSettings) -> JournalSettings {
    for key in [
        &mut settings.openai_api_key,
        &mut settings.gemini_api_key,
        &mut settings.compatible_api_key,
    ] {
        *key = mask_key(key.as_str());
    }
    settings
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    match chars.len() {
        0 => String::new(),
        1..=8 => "*".repeat(chars.len()),
        len => {
            let tail: String = chars[len - 4..].iter().collect();
            format!("****{tail}")
        }
    }
}

fn parse_bool(value: &str) -> JournalResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        other => Err(JournalError::Validation(format!("Expected true or false, got '{other}'"))),
    }
}

/// Apply one `field value` pair. Field names are the settings file's keys.
pub(crate) fn apply_setting(
    mut settings: JournalSettings,
    field: &str,
    value: &str,
) -> JournalResult<JournalSettings> {
    let text = value.trim().to_string();
    match field {
        "openaiApiKey" => settings.openai_api_key = text,
        "geminiApiKey" => settings.gemini_api_key = text,
        "compatibleApiKey" => settings.compatible_api_key = text,
        "compatibleBaseUrl" => settings.compatible_base_url = text,
        "openaiBaseUrl" => settings.openai_base_url = text,
        "geminiBaseUrl" => settings.gemini_base_url = text,
        "useLocalLlm" => settings.use_local_llm = parse_bool(value)?,
        "localLlmBaseUrl" => settings.local_llm_base_url = text,
        "localLlmModelName" => settings.local_llm_model_name = text,
        "localLlmApiFormat" => {
            settings.local_llm_api_format = LocalApiFormat::parse(value).ok_or_else(|| {
                JournalError::Validation(format!(
                    "Unknown local API format '{value}'. Use {} or {}.",
                    LocalApiFormat::OpenAiCompatible.as_str(),
                    LocalApiFormat::Native.as_str()
                ))
            })?;
        }
        "requestTimeoutSecs" => {
            settings.request_timeout_secs = if text.is_empty() {
                None
            } else {
                Some(text.parse().map_err(|_| {
                    JournalError::Validation(format!("Expected a number of seconds, got '{text}'"))
                })?)
            };
        }
        other => {
            return Err(JournalError::Validation(format!("Unknown setting '{other}'")));
        }
    }
    Ok(normalize_settings(settings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DEFAULT_COMPATIBLE_BASE_URL;

    #[test]
    fn apply_setting_updates_and_normalizes() {
        let settings = apply_setting(JournalSettings::default(), "compatibleBaseUrl", "https://x.test/v1/").expect("set");
        assert_eq!(settings.compatible_base_url, "https://x.test/v1");

        let settings = apply_setting(settings, "compatibleBaseUrl", "").expect("clear");
        assert_eq!(settings.compatible_base_url, DEFAULT_COMPATIBLE_BASE_URL);

        let settings = apply_setting(settings, "useLocalLlm", "yes").expect("bool");
        assert!(settings.use_local_llm);

        let settings = apply_setting(settings, "localLlmApiFormat", "native").expect("format");
        assert_eq!(settings.local_llm_api_format, LocalApiFormat::Native);

        let settings = apply_setting(settings, "requestTimeoutSecs", "0").expect("timeout");
        assert_eq!(settings.request_timeout_secs, None);
    }

    #[test]
    fn apply_setting_rejects_bad_input() {
        for (field, value) in [
            ("claudeApiKey", "x"),
            ("useLocalLlm", "maybe"),
            ("localLlmApiFormat", "grpc"),
            ("requestTimeoutSecs", "soon"),
        ] {
            assert!(
                matches!(
                    apply_setting(JournalSettings::default(), field, value),
                    Err(JournalError::Validation(_))
                ),
                "{field}={value} should be rejected"
            );
        }
    }

    #[test]
    fn keys_are_masked_for_display() {
        assert_eq!(mask_key(""), "");
        assert_eq!(mask_key("abc"), "***");
        assert_eq!(mask_key("sk-proj-123456789"), "****6789");

        let shown = masked(JournalSettings {
            gemini_api_key: "AIzaSyExample1234".to_string(),
            ..JournalSettings::default()
        });
        assert_eq!(shown.gemini_api_key, "****1234");
        assert_eq!(shown.openai_api_key, "");
    }

    #[test]
    fn set_persists_through_the_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = FileSettingsStore::new(dir.path().join("settings.json"));
        run(
            SettingsCommand::Set(SetArgs {
                field: "localLlmModelName".to_string(),
                value: " llama3:latest ".to_string(),
            }),
            &store,
        )
        .expect("set");
        assert_eq!(store.load().local_llm_model_name, "llama3:latest");
    }
}
