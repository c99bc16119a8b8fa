use super::{chat_messages, ensure_success, parse_json_body, read_chat_completion, token_count_or_estimate};
use super::{ChatProvider, HttpRequest, Transport};
use crate::error::{JournalError, JournalResult};
use crate::types::{Completion, Conversation, JournalSettings, LocalApiFormat, ModelDefinition};
use crate::util::trim_trailing_slashes;
use serde_json::{json, Value};

const PROVIDER: &str = "Local LLM";

/// Local server (Ollama or any OpenAI-compatible runtime). No authentication.
pub struct LocalProvider<'a> {
    base_url: String,
    format: LocalApiFormat,
    transport: &'a dyn Transport,
}

impl<'a> LocalProvider<'a> {
    pub(crate) fn new(settings: &JournalSettings, transport: &'a dyn Transport) -> JournalResult<Self> {
        if !settings.use_local_llm {
            return Err(JournalError::Configuration(
                "Local LLM mode is turned off in Settings.".to_string(),
            ));
        }
        Ok(Self {
            base_url: settings.local_llm_base_url.clone(),
            format: settings.local_llm_api_format,
            transport,
        })
    }

    fn endpoint(&self) -> String {
        let base = trim_trailing_slashes(&self.base_url);
        match self.format {
            LocalApiFormat::Native => format!("{base}/api/chat"),
            LocalApiFormat::OpenAiCompatible => format!("{base}/v1/chat/completions"),
        }
    }
}

impl ChatProvider for LocalProvider<'_> {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn complete(&self, conversation: &Conversation, model_api_id: &str) -> JournalResult<Completion> {
        let messages = chat_messages(conversation);
        let payload = json!({
            "model": model_api_id,
            "messages": messages,
            "stream": false,
        });
        let request = HttpRequest::post(PROVIDER, self.endpoint(), payload);

        let response = ensure_success(PROVIDER, self.transport.send(&request)?)?;
        let value = parse_json_body(PROVIDER, &response.body)?;

        match self.format {
            LocalApiFormat::OpenAiCompatible => read_chat_completion(PROVIDER, &value, &messages),
            LocalApiFormat::Native => {
                let text = value
                    .get("message")
                    .and_then(|message| message.get("content"))
                    .and_then(Value::as_str)
                    .ok_or_else(|| JournalError::Protocol {
                        provider: PROVIDER.to_string(),
                        detail: "missing message.content".to_string(),
                    })?;
                let prompt_count = value.get("prompt_eval_count").and_then(Value::as_u64);
                let eval_count = value.get("eval_count").and_then(Value::as_u64);
                let reported = prompt_count.zip(eval_count).map(|(prompt, eval)| prompt + eval);
                Ok(Completion {
                    text: text.to_string(),
                    token_count: token_count_or_estimate(reported, &messages, text),
                })
            }
        }
    }

    fn metadata_label(&self, model: &ModelDefinition) -> String {
        let suffix = match self.format {
            LocalApiFormat::Native => "Native",
            LocalApiFormat::OpenAiCompatible => "Compatible",
        };
        format!("{} ({suffix})", model.display_name)
    }
}
