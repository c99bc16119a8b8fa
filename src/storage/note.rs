use crate::error::{JournalError, JournalResult};
use crate::host::{frontmatter_time, DocumentService, MetadataService};
use crate::types::FM_CREATED;
use crate::util::write_atomic;
use chrono::{DateTime, Local};
use serde_yaml::Mapping;
use std::fs;
use std::path::{Path, PathBuf};

/// Markdown note on disk. The leading `---` block is its frontmatter.
///
/// Writes replace the file, so its filesystem creation time only holds until
/// the first write. The `created` frontmatter key takes precedence once set.
pub struct NoteFile {
    path: PathBuf,
}

impl NoteFile {
    pub fn open(path: &Path) -> JournalResult<Self> {
        if !path.exists() {
            return Err(JournalError::Validation(format!(
                "Note not found: {}",
                path.display()
            )));
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    /// Open the note, creating an empty file when it does not exist yet.
    pub fn open_or_create(path: &Path) -> JournalResult<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, b"")?;
        }
        Self::open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentService for NoteFile {
    fn text(&self) -> JournalResult<String> {
        Ok(fs::read_to_string(&self.path)?)
    }

    fn set_text(&mut self, text: &str) -> JournalResult<()> {
        write_atomic(&self.path, text.as_bytes())?;
        Ok(())
    }

    fn replace_selection(&mut self, text: &str) -> JournalResult<()> {
        let mut content = self.text()?;
        content.push_str(text);
        self.set_text(&content)
    }

    fn created_at(&self) -> JournalResult<DateTime<Local>> {
        let stamped = self
            .frontmatter()
            .ok()
            .and_then(|frontmatter| frontmatter_time(&frontmatter, FM_CREATED));
        if let Some(created) = stamped {
            return Ok(created);
        }
        let metadata = fs::metadata(&self.path)?;
        let time = metadata.created().or_else(|_| metadata.modified())?;
        Ok(DateTime::<Local>::from(time))
    }
}

impl MetadataService for NoteFile {
    fn frontmatter(&self) -> JournalResult<Mapping> {
        let content = self.text()?;
        let (yaml, _) = split_frontmatter(&content);
        parse_frontmatter(yaml)
    }

    fn mutate_and_append<F>(&mut self, apply: F, tail: &str) -> JournalResult<()>
    where
        F: FnOnce(&mut Mapping),
    {
        let content = self.text()?;
        let rendered = rewrite(&content, apply, tail)?;
        self.set_text(&rendered)
    }
}

/// Split note text into its frontmatter YAML (if any) and the remaining body.
pub(crate) fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let Some(rest) = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    else {
        return (None, content);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, content)
}

pub(crate) fn parse_frontmatter(yaml: Option<&str>) -> JournalResult<Mapping> {
    match yaml {
        Some(text) if !text.trim().is_empty() => Ok(serde_yaml::from_str::<Mapping>(text)?),
        _ => Ok(Mapping::new()),
    }
}

pub(crate) fn render_with_frontmatter(mapping: &Mapping, body: &str) -> JournalResult<String> {
    if mapping.is_empty() {
        return Ok(body.to_string());
    }
    let yaml = serde_yaml::to_string(mapping)?;
    Ok(format!("---\n{yaml}---\n{body}"))
}

/// Note text with `apply` run on its frontmatter and `tail` appended to the body.
pub(crate) fn rewrite<F>(content: &str, apply: F, tail: &str) -> JournalResult<String>
where
    F: FnOnce(&mut Mapping),
{
    let (yaml, body) = split_frontmatter(content);
    let mut mapping = parse_frontmatter(yaml)?;
    apply(&mut mapping);
    render_with_frontmatter(&mapping, &format!("{body}{tail}"))
}
