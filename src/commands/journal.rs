use crate::chat::preview_tokens;
use crate::error::JournalResult;
use crate::format::{self, ParseReport};
use crate::host::DocumentService;
use crate::lifecycle::{add_exchange, end_week, journal_state, ExchangeRequest, JournalState};
use crate::providers::ReqwestTransport;
use crate::storage::note::NoteFile;
use crate::storage::settings_io::FileSettingsStore;
use crate::types::{CourseInfo, JournalEntry};
use chrono::{Datelike, Local};
use clap::Args;
use serde_json::json;
use std::path::PathBuf;

#[derive(Args)]
pub struct EntriesArgs {
    #[arg(help = "Markdown note")]
    pub note: PathBuf,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

#[derive(Args)]
pub struct StatusArgs {
    #[arg(help = "Markdown note")]
    pub note: PathBuf,
}

#[derive(Args)]
pub struct AddArgs {
    #[arg(help = "Markdown note (created when missing)")]
    pub note: PathBuf,

    /// Prompt text
    #[arg(short, long)]
    pub prompt: String,

    /// Model id from `models` (defaults to the first available model)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Earlier prompt numbers to replay as context, e.g. 1,3
    #[arg(short, long, value_delimiter = ',')]
    pub context: Vec<u32>,

    /// Only print the token estimate; nothing is sent
    #[arg(long)]
    pub preview: bool,

    #[command(flatten)]
    pub course: CourseArgs,
}

/// Required only the first time a note is used.
#[derive(Args, Default)]
pub struct CourseArgs {
    #[arg(long)]
    pub student_name: Option<String>,

    #[arg(long)]
    pub student_id: Option<String>,

    /// Course id such as "OLID 505"
    #[arg(long)]
    pub course_id: Option<String>,

    /// Looked up from the course catalog when omitted
    #[arg(long)]
    pub course_title: Option<String>,

    /// "<Term> <Year>", e.g. "Spring 2027" (default: Fall of the current year)
    #[arg(long)]
    pub semester: Option<String>,
}

impl CourseArgs {
    fn into_course_info(self) -> Option<CourseInfo> {
        if self.student_name.is_none() && self.course_id.is_none() {
            return None;
        }
        let semester = self
            .semester
            .unwrap_or_else(|| format!("Fall {}", Local::now().year()));
        Some(CourseInfo {
            course_id: self.course_id.unwrap_or_default(),
            course_title: self.course_title.unwrap_or_default(),
            student_name: self.student_name.unwrap_or_default(),
            student_id: self.student_id.unwrap_or_default(),
            semester,
        })
    }
}

#[derive(Args)]
pub struct EndWeekArgs {
    #[arg(help = "Markdown note")]
    pub note: PathBuf,

    /// Weekly reflection text
    #[arg(short, long)]
    pub reflection: String,

    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn entries(args: EntriesArgs) -> JournalResult<()> {
    let note = NoteFile::open(&args.note)?;
    let report = format::parse_with_report(&note.text()?);

    if args.json {
        let entries: Vec<_> = report.entries.iter().map(entry_json).collect();
        let output = json!({ "entries": entries, "warnings": report.warnings });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    for line in entry_lines(&report) {
        println!("{line}");
    }
    Ok(())
}

fn entry_json(entry: &JournalEntry) -> serde_json::Value {
    let usage = entry.usage();
    json!({
        "id": entry.id,
        "prompt": entry.prompt,
        "response": entry.response,
        "model": usage.model,
        "totalTokens": usage.total_tokens,
        "contextTokens": usage.context_tokens,
    })
}

fn entry_lines(report: &ParseReport) -> Vec<String> {
    let mut lines = Vec::new();
    if report.entries.is_empty() {
        lines.push("No journal entries yet.".to_string());
    }
    for entry in &report.entries {
        let usage = entry.usage();
        let first_line = entry.prompt.lines().next().unwrap_or_default();
        lines.push(format!(
            "Prompt {}: {} [{}, {} tokens]",
            entry.id,
            truncate(first_line, 60),
            usage.model.as_deref().unwrap_or("unknown model"),
            usage.total_tokens.unwrap_or(0)
        ));
    }
    for warning in &report.warnings {
        lines.push(format!("warning: {warning}"));
    }
    lines
}

fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let cut: String = text.chars().take(limit).collect();
    format!("{cut}...")
}

pub fn status(args: StatusArgs) -> JournalResult<()> {
    let note = NoteFile::open(&args.note)?;
    let state = journal_state(&note)?;
    let detail = match state {
        JournalState::Uninitialized => "no course information yet; the first `add` needs course flags",
        JournalState::Active => "accepting new entries",
        JournalState::Locked => "read-only",
    };
    println!("{} ({detail})", state.as_str());
    Ok(())
}

pub fn add(args: AddArgs, store: &FileSettingsStore) -> JournalResult<()> {
    let settings = super::settings_snapshot(store);
    let mut note = NoteFile::open_or_create(&args.note)?;

    if args.preview {
        let prior = format::parse(&note.text()?);
        println!("{}", preview_tokens(&prior, &args.context, &args.prompt));
        return Ok(());
    }

    let transport = ReqwestTransport::new(settings.request_timeout_secs)?;
    let request = ExchangeRequest {
        prompt: &args.prompt,
        model_id: args.model.as_deref(),
        context_ids: &args.context,
    };
    let added = add_exchange(
        &mut note,
        args.course.into_course_info(),
        &request,
        &settings,
        &transport,
    )?;

    if added.initialized {
        println!("Journal initialized.");
    }
    println!("{}", added.block.trim_start());
    println!(
        "AI chat entry added to {} as Prompt {} ({} tokens, context {}).",
        note.path().display(),
        added.index,
        added.outcome.tokens_total,
        added.outcome.tokens_context
    );
    Ok(())
}

pub fn end_week_command(args: EndWeekArgs, store: &FileSettingsStore) -> JournalResult<()> {
    let settings = super::settings_snapshot(store);
    let mut note = NoteFile::open(&args.note)?;
    let transport = ReqwestTransport::new(settings.request_timeout_secs)?;

    let summary = end_week(&mut note, &args.reflection, &settings, &transport, Local::now())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    if let Some(error) = &summary.analytics_error {
        eprintln!("warning: Could not get AI analytics: {error}");
    }
    println!("Week ended and all analytics saved!");
    println!("  prompts:          {}", summary.prompt_count);
    println!("  total tokens:     {}", summary.total_tokens);
    println!("  models used:      {}", summary.models_used.join(", "));
    println!("  time to complete: {}", summary.time_to_complete);
    println!("  main topics:      {}", summary.analytics.main_topics);
    println!("  learning theory:  {}", summary.analytics.learning_theory);
    println!("  ID model:         {}", summary.analytics.id_model);
    Ok(())
}
