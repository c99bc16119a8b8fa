use super::{ensure_success, parse_json_body, token_count_or_estimate, ChatProvider};
use super::{HttpRequest, Transport};
use crate::error::{JournalError, JournalResult};
use crate::types::{Completion, Conversation, JournalSettings, Role, Turn};
use crate::util::trim_trailing_slashes;
use serde_json::{json, Value};

const PROVIDER: &str = "Gemini";

/// Native `generateContent` API. The key travels as a query parameter.
pub struct GeminiProvider<'a> {
    base_url: String,
    api_key: String,
    transport: &'a dyn Transport,
}

impl<'a> GeminiProvider<'a> {
    pub(crate) fn new(settings: &JournalSettings, transport: &'a dyn Transport) -> JournalResult<Self> {
        if !settings.has_gemini_key() {
            return Err(JournalError::Configuration(
                "Missing Gemini API key. Set it in Settings first.".to_string(),
            ));
        }
        Ok(Self {
            base_url: settings.gemini_base_url.clone(),
            api_key: settings.gemini_api_key.trim().to_string(),
            transport,
        })
    }
}

fn content_entry(turn: &Turn) -> Value {
    let role = match turn.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    json!({ "role": role, "parts": [{ "text": turn.content }] })
}

impl ChatProvider for GeminiProvider<'_> {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn complete(&self, conversation: &Conversation, model_api_id: &str) -> JournalResult<Completion> {
        let mut contents: Vec<Value> = conversation.history().iter().map(content_entry).collect();
        contents.push(content_entry(conversation.latest()));

        let url = format!(
            "{}/{model_api_id}:generateContent?key={}",
            trim_trailing_slashes(&self.base_url),
            self.api_key
        );
        let request = HttpRequest::post(PROVIDER, url, json!({ "contents": contents }));

        let response = ensure_success(PROVIDER, self.transport.send(&request)?)?;
        let value = parse_json_body(PROVIDER, &response.body)?;

        let candidates = value
            .get("candidates")
            .and_then(Value::as_array)
            .filter(|items| !items.is_empty());
        let Some(candidates) = candidates else {
            let block_reason = value
                .get("promptFeedback")
                .and_then(|feedback| feedback.get("blockReason"))
                .and_then(Value::as_str)
                .map(str::to_string);
            return Err(JournalError::NoCandidates { block_reason });
        };

        let text = candidates[0]
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
            .and_then(|parts| parts.first())
            .and_then(|part| part.get("text"))
            .and_then(Value::as_str)
            .ok_or_else(|| JournalError::Protocol {
                provider: PROVIDER.to_string(),
                detail: "missing candidates[0].content.parts[0].text".to_string(),
            })?;

        let reported = value
            .get("usageMetadata")
            .and_then(|usage| usage.get("totalTokenCount"))
            .and_then(Value::as_u64);
        Ok(Completion {
            text: text.to_string(),
            token_count: token_count_or_estimate(reported, &contents, text),
        })
    }
}
