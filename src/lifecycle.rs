//! Note lifecycle: `Uninitialized` (no course metadata) → `Active` → `Locked`.
//!
//! The state is derived once per action from the frontmatter snapshot. A locked
//! note is terminal and every action against it fails without writing.

use crate::analytics::analyze;
use crate::chat::{list_available_models, resolve_model, submit};
use crate::error::{JournalError, JournalResult};
use crate::format::{self, EntryMetadata};
use crate::host::{frontmatter_str, DocumentService, MetadataService};
use crate::providers::Transport;
use crate::types::{
    course_title_for, AddedEntry, CourseInfo, JournalSettings, LearningAnalytics, WeekSummary,
    FM_COURSE_ID, FM_COURSE_TITLE, FM_END_TIME, FM_ID_MODEL, FM_JOURNAL_STATUS,
    FM_LEARNING_THEORY, FM_MAIN_TOPICS, FM_MODELS_USED, FM_PROMPT_COUNT, FM_SEMESTER,
    FM_CREATED, FM_START_TIME, FM_STUDENT_ID, FM_STUDENT_NAME, FM_TIME_TO_COMPLETE,
    FM_TOTAL_TOKENS, STATUS_LOCKED, TIMESTAMP_FORMAT,
};
use chrono::{DateTime, Duration, Local};
use serde::Serialize;
use serde_yaml::{Mapping, Number, Value};
use tracing::{info, warn};

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JournalState {
    Uninitialized,
    Active,
    Locked,
}

impl JournalState {
    pub fn from_frontmatter(frontmatter: &Mapping) -> Self {
        if frontmatter_str(frontmatter, FM_JOURNAL_STATUS) == Some(STATUS_LOCKED) {
            Self::Locked
        } else if frontmatter_str(frontmatter, FM_COURSE_ID).is_some() {
            Self::Active
        } else {
            Self::Uninitialized
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Active => "active",
            Self::Locked => "locked",
        }
    }
}

pub fn journal_state<N: MetadataService>(note: &N) -> JournalResult<JournalState> {
    Ok(JournalState::from_frontmatter(&note.frontmatter()?))
}

/// Student name and course id are required. A missing title is looked up in
/// the course catalog.
pub fn validate_course(mut course: CourseInfo) -> JournalResult<CourseInfo> {
    course.course_id = course.course_id.trim().to_string();
    course.student_name = course.student_name.trim().to_string();
    course.student_id = course.student_id.trim().to_string();
    course.semester = course.semester.trim().to_string();
    course.course_title = course.course_title.trim().to_string();

    if course.student_name.is_empty() || course.course_id.is_empty() {
        return Err(JournalError::Validation(
            "Student Name and Course are required.".to_string(),
        ));
    }
    if course.course_title.is_empty() {
        let title = course_title_for(&course.course_id).ok_or_else(|| {
            JournalError::Validation(format!(
                "Unknown course '{}'. Provide a course title.",
                course.course_id
            ))
        })?;
        course.course_title = title.to_string();
    }
    Ok(course)
}

fn write_course(frontmatter: &mut Mapping, course: &CourseInfo) {
    let fields = [
        (FM_COURSE_ID, &course.course_id),
        (FM_COURSE_TITLE, &course.course_title),
        (FM_STUDENT_NAME, &course.student_name),
        (FM_STUDENT_ID, &course.student_id),
        (FM_SEMESTER, &course.semester),
    ];
    for (key, value) in fields {
        frontmatter.insert(Value::from(key), Value::String(value.clone()));
    }
}

/// What the user asked for in the composer.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeRequest<'a> {
    pub prompt: &'a str,
    pub model_id: Option<&'a str>,
    pub context_ids: &'a [u32],
}

/// Add one exchange to the note.
///
/// An uninitialized note needs `course`. Course metadata, the `created` stamp
/// and the new block are written together in one write, and only after the
/// provider call succeeds.
pub fn add_exchange<N>(
    note: &mut N,
    course: Option<CourseInfo>,
    request: &ExchangeRequest<'_>,
    settings: &JournalSettings,
    transport: &dyn Transport,
) -> JournalResult<AddedEntry>
where
    N: DocumentService + MetadataService,
{
    let frontmatter = note.frontmatter()?;
    let pending_course = match JournalState::from_frontmatter(&frontmatter) {
        JournalState::Locked => return Err(JournalError::Locked),
        JournalState::Active => None,
        JournalState::Uninitialized => {
            let course = course.ok_or_else(|| {
                JournalError::Validation(
                    "This journal is not initialized yet. Provide the course information.".to_string(),
                )
            })?;
            Some(validate_course(course)?)
        }
    };

    let created = if frontmatter.contains_key(FM_CREATED) {
        None
    } else {
        Some(note.created_at()?.format(TIMESTAMP_FORMAT).to_string())
    };

    let text = note.text()?;
    let prior = format::parse(&text);
    let models = list_available_models(settings);
    let model = resolve_model(&models, request.model_id)?;

    let outcome = submit(
        request.prompt,
        request.context_ids,
        &model,
        &prior,
        settings,
        transport,
    )?;

    let initialized = pending_course.is_some();
    let index = format::next_prompt_index(&text);
    let block = format::serialize(
        index,
        request.prompt,
        &outcome.response,
        &EntryMetadata {
            model: outcome.model_label.clone(),
            total_tokens: outcome.tokens_total,
            context_tokens: outcome.tokens_context,
        },
    );
    if pending_course.is_some() || created.is_some() {
        note.mutate_and_append(
            |frontmatter| {
                if let Some(course) = &pending_course {
                    write_course(frontmatter, course);
                }
                if let Some(created) = created {
                    frontmatter.insert(Value::from(FM_CREATED), Value::String(created));
                }
            },
            &block,
        )?;
    } else {
        note.replace_selection(&block)?;
    }
    info!(index, model = %outcome.model_label, tokens = outcome.tokens_total, "journal entry added");

    Ok(AddedEntry {
        index,
        block,
        outcome,
        initialized,
    })
}

/// `HH:MM:SS`; hours keep counting past a day.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

fn reflection_section(reflection: &str, end_time: &str) -> String {
    format!(
        "\n---\n## Weekly Reflection\n\n{reflection}\n\n---\n*This journal entry was locked on {end_time}.*\n"
    )
}

/// Close the week: summarize every entry, run analytics, append the
/// reflection and lock the note.
///
/// A failed analytics call is reported in the summary and replaced by `N/A`
/// fields; the note is locked regardless. The summary fields, the lock and
/// the reflection land in a single write.
pub fn end_week<N>(
    note: &mut N,
    reflection: &str,
    settings: &JournalSettings,
    transport: &dyn Transport,
    now: DateTime<Local>,
) -> JournalResult<WeekSummary>
where
    N: DocumentService + MetadataService,
{
    match journal_state(note)? {
        JournalState::Locked => return Err(JournalError::Locked),
        JournalState::Uninitialized => return Err(JournalError::NotInitialized),
        JournalState::Active => {}
    }
    let reflection = reflection.trim();
    if reflection.is_empty() {
        return Err(JournalError::Validation(
            "Reflection cannot be empty.".to_string(),
        ));
    }

    let text = note.text()?;
    let entries = format::parse(&text);

    let mut models_used: Vec<String> = Vec::new();
    let mut total_tokens = 0;
    for usage in entries.iter().map(|entry| entry.usage()) {
        if let Some(model) = usage.model {
            if !models_used.contains(&model) {
                models_used.push(model);
            }
        }
        total_tokens += usage.total_tokens.unwrap_or(0);
    }

    let started = note.created_at()?;
    let start_time = started.format(TIMESTAMP_FORMAT).to_string();
    let end_time = now.format(TIMESTAMP_FORMAT).to_string();
    let time_to_complete = format_elapsed(now.signed_duration_since(started));

    let prompts: Vec<String> = entries.iter().map(|entry| entry.prompt.clone()).collect();
    let (analytics, analytics_error) = match analyze(&prompts, settings, transport) {
        Ok(analytics) => (analytics, None),
        Err(error) => {
            warn!(%error, "learning analytics unavailable; locking with N/A");
            (LearningAnalytics::unavailable(), Some(error.to_string()))
        }
    };

    let section = reflection_section(reflection, &end_time);
    let summary = WeekSummary {
        start_time,
        end_time,
        time_to_complete,
        prompt_count: entries.len(),
        total_tokens,
        models_used,
        analytics,
        analytics_error,
    };
    note.mutate_and_append(|frontmatter| write_week_summary(frontmatter, &summary), &section)?;
    info!(
        prompts = summary.prompt_count,
        tokens = summary.total_tokens,
        "journal week ended and locked"
    );
    Ok(summary)
}

fn write_week_summary(frontmatter: &mut Mapping, summary: &WeekSummary) {
    let text = |value: &str| Value::String(value.to_string());
    let models = summary
        .models_used
        .iter()
        .map(|model| Value::String(model.clone()))
        .collect();

    let fields = [
        (FM_START_TIME, text(&summary.start_time)),
        (FM_END_TIME, text(&summary.end_time)),
        (FM_TIME_TO_COMPLETE, text(&summary.time_to_complete)),
        (FM_PROMPT_COUNT, Value::Number(Number::from(summary.prompt_count as u64))),
        (FM_TOTAL_TOKENS, Value::Number(Number::from(summary.total_tokens))),
        (FM_MODELS_USED, Value::Sequence(models)),
        (FM_MAIN_TOPICS, text(&summary.analytics.main_topics)),
        (FM_LEARNING_THEORY, text(&summary.analytics.learning_theory)),
        (FM_ID_MODEL, text(&summary.analytics.id_model)),
        (FM_JOURNAL_STATUS, text(STATUS_LOCKED)),
    ];
    for (key, value) in fields {
        frontmatter.insert(Value::from(key), value);
    }
}
