use crate::error::JournalResult;
use crate::host::SettingsService;
use crate::types::{normalize_settings, JournalSettings, SETTINGS_DIR_NAME, SETTINGS_FILE_NAME};
use crate::util::write_atomic;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

pub(crate) fn app_settings_path() -> PathBuf {
    let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join(SETTINGS_DIR_NAME).join(SETTINGS_FILE_NAME)
}

/// JSON settings file. Unreadable or missing files load as defaults.
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn at_default_location() -> Self {
        Self::new(app_settings_path())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl SettingsService for FileSettingsStore {
    fn load(&self) -> JournalSettings {
        if !self.path.exists() {
            return JournalSettings::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<JournalSettings>(&content) {
                Ok(settings) => normalize_settings(settings),
                Err(error) => {
                    warn!(path = %self.path.display(), %error, "settings file is invalid, using defaults");
                    JournalSettings::default()
                }
            },
            Err(_) => JournalSettings::default(),
        }
    }

    fn save(&self, settings: &JournalSettings) -> JournalResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(&normalize_settings(settings.clone()))?;
        write_atomic(&self.path, &bytes)?;
        Ok(())
    }
}
