use crate::error::JournalResult;
use crate::types::{JournalSettings, TIMESTAMP_FORMAT};
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde_yaml::Mapping;

/// Text buffer of the note being edited.
pub trait DocumentService {
    fn text(&self) -> JournalResult<String>;
    fn set_text(&mut self, text: &str) -> JournalResult<()>;
    fn replace_selection(&mut self, text: &str) -> JournalResult<()>;
    fn created_at(&self) -> JournalResult<DateTime<Local>>;
}

/// Structured header of the note.
pub trait MetadataService {
    fn frontmatter(&self) -> JournalResult<Mapping>;

    /// Apply `apply` to the frontmatter and append `tail` to the body as one write.
    fn mutate_and_append<F>(&mut self, apply: F, tail: &str) -> JournalResult<()>
    where
        F: FnOnce(&mut Mapping);
}

pub trait SettingsService {
    fn load(&self) -> JournalSettings;
    fn save(&self, settings: &JournalSettings) -> JournalResult<()>;
}

pub(crate) fn frontmatter_str<'a>(frontmatter: &'a Mapping, key: &str) -> Option<&'a str> {
    frontmatter
        .get(key)
        .and_then(serde_yaml::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

pub(crate) fn frontmatter_time(frontmatter: &Mapping, key: &str) -> Option<DateTime<Local>> {
    let text = frontmatter_str(frontmatter, key)?;
    let naive = NaiveDateTime::parse_from_str(text, TIMESTAMP_FORMAT).ok()?;
    Local.from_local_datetime(&naive).earliest()
}
