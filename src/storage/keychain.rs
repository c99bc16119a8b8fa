use crate::error::{JournalError, JournalResult};
use crate::types::{
    JournalSettings, COMPATIBLE_USERNAME, GEMINI_USERNAME, KEYCHAIN_SERVICE, OPENAI_USERNAME,
};
use keyring::{Entry, Error as KeyringError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyProvider {
    OpenAi,
    Gemini,
    Compatible,
}

impl KeyProvider {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai" => Some(Self::OpenAi),
            "gemini" => Some(Self::Gemini),
            "compatible" | "openrouter" => Some(Self::Compatible),
            _ => None,
        }
    }

    fn username(&self) -> &'static str {
        match self {
            Self::OpenAi => OPENAI_USERNAME,
            Self::Gemini => GEMINI_USERNAME,
            Self::Compatible => COMPATIBLE_USERNAME,
        }
    }
}

fn keyring_entry(provider: KeyProvider) -> JournalResult<Entry> {
    Ok(Entry::new(KEYCHAIN_SERVICE, provider.username())?)
}

pub(crate) fn set_api_key(provider: KeyProvider, api_key: &str) -> JournalResult<bool> {
    if api_key.trim().is_empty() {
        return Err(JournalError::Validation("API key cannot be empty".to_string()));
    }
    keyring_entry(provider)?.set_password(api_key.trim())?;
    Ok(true)
}

pub(crate) fn has_api_key(provider: KeyProvider) -> JournalResult<bool> {
    Ok(read_api_key(provider)?.is_some())
}

pub(crate) fn clear_api_key(provider: KeyProvider) -> JournalResult<bool> {
    match keyring_entry(provider)?.delete_password() {
        Ok(_) | Err(KeyringError::NoEntry) => Ok(true),
        Err(error) => Err(error.into()),
    }
}

fn read_api_key(provider: KeyProvider) -> JournalResult<Option<String>> {
    match keyring_entry(provider)?.get_password() {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value.trim().to_string())),
        Ok(_) | Err(KeyringError::NoEntry) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

/// Fill API keys missing from the settings file with keychain values.
/// Keychain failures leave the key empty.
pub(crate) fn with_keychain_fallback(mut settings: JournalSettings) -> JournalSettings {
    let slots = [
        (KeyProvider::OpenAi, &mut settings.openai_api_key),
        (KeyProvider::Gemini, &mut settings.gemini_api_key),
        (KeyProvider::Compatible, &mut settings.compatible_api_key),
    ];
    for (provider, slot) in slots {
        if !slot.trim().is_empty() {
            continue;
        }
        match read_api_key(provider) {
            Ok(Some(value)) => *slot = value,
            Ok(None) => {}
            Err(error) => debug!(?provider, %error, "keychain lookup failed"),
        }
    }
    settings
}
