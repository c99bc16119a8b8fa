use serde::{Deserialize, Serialize};

pub(crate) const KEYCHAIN_SERVICE: &str = "com.keeponfirst.ai-journal";
pub(crate) const OPENAI_USERNAME: &str = "openai_api_key";
pub(crate) const GEMINI_USERNAME: &str = "gemini_api_key";
pub(crate) const COMPATIBLE_USERNAME: &str = "compatible_api_key";
pub(crate) const SETTINGS_DIR_NAME: &str = "ai-journal";
pub(crate) const SETTINGS_FILE_NAME: &str = "settings.json";

pub(crate) const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1/models";
pub(crate) const DEFAULT_COMPATIBLE_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub(crate) const DEFAULT_LOCAL_LLM_BASE_URL: &str = "http://localhost:11434";

pub(crate) const ANALYTICS_OPENAI_MODEL: &str = "gpt-4o";
pub(crate) const ANALYTICS_COMPATIBLE_MODEL: &str = "openai/gpt-4o";
pub(crate) const SEPARATOR_LABEL: &str = "——————————";

// Frontmatter keys.
pub(crate) const FM_COURSE_ID: &str = "course-id";
pub(crate) const FM_COURSE_TITLE: &str = "course-title";
pub(crate) const FM_STUDENT_NAME: &str = "student-name";
pub(crate) const FM_STUDENT_ID: &str = "student-id";
pub(crate) const FM_SEMESTER: &str = "semester";
pub(crate) const FM_JOURNAL_STATUS: &str = "journal-status";
pub(crate) const FM_START_TIME: &str = "start-time";
pub(crate) const FM_END_TIME: &str = "end-time";
pub(crate) const FM_TIME_TO_COMPLETE: &str = "time-to-complete";
pub(crate) const FM_PROMPT_COUNT: &str = "prompt-count";
pub(crate) const FM_TOTAL_TOKENS: &str = "total-tokens-used";
pub(crate) const FM_MODELS_USED: &str = "models-used";
pub(crate) const FM_MAIN_TOPICS: &str = "main-topics";
pub(crate) const FM_LEARNING_THEORY: &str = "inferred-learning-theory";
pub(crate) const FM_ID_MODEL: &str = "inferred-id-model";
pub(crate) const STATUS_LOCKED: &str = "locked";
pub(crate) const FM_CREATED: &str = "created";

/// Local timestamps written into the frontmatter and the lock line.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) const COURSE_CATALOG: [(&str, &str); 13] = [
    ("OLID 500", "Foundations: Instructional Design, Training and Performance"),
    ("OLID 501", "Design and Delivery of Online Learning"),
    ("OLID 502", "Interactive Media for Learning"),
    ("OLID 503", "Universal Design & Accessibility"),
    ("OLID 504", "App Design & Task Analysis"),
    ("OLID 505", "Usability & Problem Solving with AI"),
    ("OLID 506", "Learning Performance & Project Management"),
    ("OLID 507", "Online Content Management"),
    ("OLID 508", "Design Studio with AI"),
    ("OLID 509", "Emerging Technologies Research Studio"),
    ("OLID 510", "Emerging Technologies and the Workplace"),
    ("OLID 511", "Story-based Learning & Gamification"),
    ("OLID 512", "Instructional Design Methods"),
];

pub(crate) fn course_title_for(course_id: &str) -> Option<&'static str> {
    COURSE_CATALOG
        .iter()
        .find(|(id, _)| id.eq_ignore_ascii_case(course_id.trim()))
        .map(|(_, title)| *title)
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocalApiFormat {
    #[default]
    #[serde(rename = "openai-compatible")]
    OpenAiCompatible,
    #[serde(rename = "ollama-native")]
    Native,
}

impl LocalApiFormat {
    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai-compatible",
            Self::Native => "ollama-native",
        }
    }

    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "openai-compatible" | "compatible" | "openai" => Some(Self::OpenAiCompatible),
            "ollama-native" | "native" | "ollama" => Some(Self::Native),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JournalSettings {
    #[serde(default)]
    pub(crate) openai_api_key: String,
    #[serde(default)]
    pub(crate) gemini_api_key: String,
    #[serde(default)]
    pub(crate) compatible_api_key: String,
    #[serde(default = "default_compatible_base_url")]
    pub(crate) compatible_base_url: String,
    #[serde(default)]
    pub(crate) use_local_llm: bool,
    #[serde(default = "default_local_llm_base_url")]
    pub(crate) local_llm_base_url: String,
    #[serde(default)]
    pub(crate) local_llm_model_name: String,
    #[serde(default)]
    pub(crate) local_llm_api_format: LocalApiFormat,
    #[serde(default = "default_openai_base_url")]
    pub(crate) openai_base_url: String,
    #[serde(default = "default_gemini_base_url")]
    pub(crate) gemini_base_url: String,
    #[serde(default)]
    pub(crate) request_timeout_secs: Option<u64>,
}

impl Default for JournalSettings {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            compatible_api_key: String::new(),
            compatible_base_url: default_compatible_base_url(),
            use_local_llm: false,
            local_llm_base_url: default_local_llm_base_url(),
            local_llm_model_name: String::new(),
            local_llm_api_format: LocalApiFormat::default(),
            openai_base_url: default_openai_base_url(),
            gemini_base_url: default_gemini_base_url(),
            request_timeout_secs: None,
        }
    }
}

fn default_compatible_base_url() -> String {
    DEFAULT_COMPATIBLE_BASE_URL.to_string()
}

fn default_local_llm_base_url() -> String {
    DEFAULT_LOCAL_LLM_BASE_URL.to_string()
}

fn default_openai_base_url() -> String {
    DEFAULT_OPENAI_BASE_URL.to_string()
}

fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

impl JournalSettings {
    pub(crate) fn has_openai_key(&self) -> bool {
        !self.openai_api_key.trim().is_empty()
    }

    pub(crate) fn has_gemini_key(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }

    pub(crate) fn has_compatible_key(&self) -> bool {
        !self.compatible_api_key.trim().is_empty()
    }
}

pub(crate) fn normalize_settings(mut settings: JournalSettings) -> JournalSettings {
    settings.openai_api_key = settings.openai_api_key.trim().to_string();
    settings.gemini_api_key = settings.gemini_api_key.trim().to_string();
    settings.compatible_api_key = settings.compatible_api_key.trim().to_string();
    settings.local_llm_model_name = settings.local_llm_model_name.trim().to_string();

    settings.compatible_base_url =
        normalize_base_url(&settings.compatible_base_url, DEFAULT_COMPATIBLE_BASE_URL);
    settings.local_llm_base_url =
        normalize_base_url(&settings.local_llm_base_url, DEFAULT_LOCAL_LLM_BASE_URL);
    settings.openai_base_url = normalize_base_url(&settings.openai_base_url, DEFAULT_OPENAI_BASE_URL);
    settings.gemini_base_url = normalize_base_url(&settings.gemini_base_url, DEFAULT_GEMINI_BASE_URL);

    if settings.request_timeout_secs == Some(0) {
        settings.request_timeout_secs = None;
    }
    settings
}

fn normalize_base_url(value: &str, fallback: &str) -> String {
    let trimmed = crate::util::trim_trailing_slashes(value.trim());
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ModelFamily {
    OpenAi,
    Gemini,
    Compatible,
    Local,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    Model,
    Separator,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ModelDefinition {
    pub(crate) id: String,
    pub(crate) api_id: String,
    pub(crate) display_name: String,
    pub(crate) family: ModelFamily,
    pub(crate) kind: ModelKind,
}

impl ModelDefinition {
    pub(crate) fn model(id: &str, api_id: &str, display_name: &str, family: ModelFamily) -> Self {
        Self {
            id: id.to_string(),
            api_id: api_id.to_string(),
            display_name: display_name.to_string(),
            family,
            kind: ModelKind::Model,
        }
    }

    pub(crate) fn separator(id: &str, family: ModelFamily) -> Self {
        Self {
            id: id.to_string(),
            api_id: String::new(),
            display_name: SEPARATOR_LABEL.to_string(),
            family,
            kind: ModelKind::Separator,
        }
    }

    pub(crate) fn is_selectable(&self) -> bool {
        self.kind == ModelKind::Model
    }
}

/// One prompt/response exchange recovered from the note text.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub(crate) id: u32,
    pub(crate) prompt: String,
    pub(crate) response: String,
    pub(crate) metadata_text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Stored history calls the reply turn `model`; providers map it to their own name.
    #[serde(rename = "model")]
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Turn {
    pub(crate) role: Role,
    pub(crate) content: String,
}

impl Turn {
    pub(crate) fn user(content: &str) -> Self {
        Self {
            role: Role::User,
            content: content.to_string(),
        }
    }

    pub(crate) fn assistant(content: &str) -> Self {
        Self {
            role: Role::Assistant,
            content: content.to_string(),
        }
    }
}

/// Ordered turns sent to a provider. The last turn is always the new user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub(crate) fn new(history: Vec<Turn>, prompt: &str) -> Self {
        let mut turns = history;
        turns.push(Turn::user(prompt));
        Self { turns }
    }

    pub(crate) fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub(crate) fn history(&self) -> &[Turn] {
        &self.turns[..self.turns.len() - 1]
    }

    pub(crate) fn latest(&self) -> &Turn {
        &self.turns[self.turns.len() - 1]
    }
}

/// Text and token count produced by one provider round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub(crate) text: String,
    pub(crate) token_count: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatOutcome {
    pub(crate) model_label: String,
    pub(crate) response: String,
    pub(crate) tokens_total: u64,
    pub(crate) tokens_context: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CourseInfo {
    pub(crate) course_id: String,
    pub(crate) course_title: String,
    pub(crate) student_name: String,
    pub(crate) student_id: String,
    pub(crate) semester: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LearningAnalytics {
    pub(crate) main_topics: String,
    pub(crate) learning_theory: String,
    pub(crate) id_model: String,
}

impl LearningAnalytics {
    pub(crate) fn unavailable() -> Self {
        Self {
            main_topics: "N/A".to_string(),
            learning_theory: "N/A".to_string(),
            id_model: "N/A".to_string(),
        }
    }

    pub(crate) fn no_data() -> Self {
        Self {
            main_topics: "No prompts to analyze".to_string(),
            learning_theory: "N/A".to_string(),
            id_model: "N/A".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AddedEntry {
    pub(crate) index: usize,
    pub(crate) block: String,
    pub(crate) outcome: ChatOutcome,
    pub(crate) initialized: bool,
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekSummary {
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) time_to_complete: String,
    pub(crate) prompt_count: usize,
    pub(crate) total_tokens: u64,
    pub(crate) models_used: Vec<String>,
    pub(crate) analytics: LearningAnalytics,
    pub(crate) analytics_error: Option<String>,
}
