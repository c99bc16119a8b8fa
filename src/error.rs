use thiserror::Error;

#[derive(Debug, Error)]
pub enum JournalError {
    /// No usable credentials or endpoint for the requested action.
    #[error("{0}")]
    Configuration(String),

    #[error("{}", transport_message(.provider, .status, .status_text, .body, .message))]
    Transport {
        provider: String,
        status: u16,
        status_text: String,
        body: String,
        message: Option<String>,
    },

    #[error("{provider} request failed: {detail}")]
    Network { provider: String, detail: String },

    /// 2xx response whose body does not match the provider schema.
    #[error("{provider} returned an unexpected response: {detail}")]
    Protocol { provider: String, detail: String },

    #[error("Gemini API Error: No response candidate returned.{}", block_reason_suffix(.block_reason))]
    NoCandidates { block_reason: Option<String> },

    #[error("Analytics API returned an invalid response. Check API key and Base URL. ({0})")]
    InvalidAnalytics(String),

    #[error("{0}")]
    Validation(String),

    #[error("This journal is locked and cannot be modified.")]
    Locked,

    #[error("Please add a chat entry first to initialize the note.")]
    NotInitialized,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frontmatter error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Keychain error: {0}")]
    Keychain(#[from] keyring::Error),
}

pub type JournalResult<T> = Result<T, JournalError>;

fn transport_message(
    provider: &str,
    status: &u16,
    status_text: &str,
    body: &str,
    message: &Option<String>,
) -> String {
    match message {
        Some(message) => format!("{provider} API Error: {status} {status_text} - {message}"),
        None => format!("{provider} API Error: {status} {status_text} - {body}"),
    }
}

fn block_reason_suffix(block_reason: &Option<String>) -> String {
    block_reason
        .as_deref()
        .map(|reason| format!(" Reason: {reason}."))
        .unwrap_or_default()
}
