pub mod gemini;
pub mod http;
pub mod local;
pub mod openai;

use crate::error::{JournalError, JournalResult};
use crate::types::{Completion, Conversation, JournalSettings, ModelDefinition, ModelFamily, Role};
use crate::util::estimate_tokens;
use serde_json::{json, Value};

pub use http::{HttpRequest, HttpResponse, ReqwestTransport, Transport};

/// One provider family's wire protocol.
pub trait ChatProvider {
    fn name(&self) -> &'static str;

    fn complete(&self, conversation: &Conversation, model_api_id: &str) -> JournalResult<Completion>;

    /// Model name written into the entry's metadata annotation.
    fn metadata_label(&self, model: &ModelDefinition) -> String {
        model.display_name.clone()
    }
}

/// Build the adapter for a model family from the current settings snapshot.
pub fn provider_for<'a>(
    family: ModelFamily,
    settings: &JournalSettings,
    transport: &'a dyn Transport,
) -> JournalResult<Box<dyn ChatProvider + 'a>> {
    let provider: Box<dyn ChatProvider + 'a> = match family {
        ModelFamily::OpenAi => Box::new(openai::OpenAiCompatibleProvider::official(settings, transport)?),
        ModelFamily::Compatible => {
            Box::new(openai::OpenAiCompatibleProvider::compatible(settings, transport)?)
        }
        ModelFamily::Gemini => Box::new(gemini::GeminiProvider::new(settings, transport)?),
        ModelFamily::Local => Box::new(local::LocalProvider::new(settings, transport)?),
    };
    Ok(provider)
}

/// `{role, content}` messages with assistant turns under the `assistant` wire role.
pub(crate) fn chat_messages(conversation: &Conversation) -> Vec<Value> {
    conversation
        .turns()
        .iter()
        .map(|turn| {
            let role = match turn.role {
                Role::User => "user",
                Role::Assistant => "assistant",
            };
            json!({ "role": role, "content": turn.content })
        })
        .collect()
}

/// Turn a non-2xx response into a transport error, lifting `error.message`
/// out of JSON bodies.
pub(crate) fn ensure_success(provider: &str, response: HttpResponse) -> JournalResult<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        });
    Err(JournalError::Transport {
        provider: provider.to_string(),
        status: response.status,
        status_text: response.status_text,
        body: response.body,
        message,
    })
}

pub(crate) fn parse_json_body(provider: &str, body: &str) -> JournalResult<Value> {
    serde_json::from_str(body).map_err(|error| JournalError::Protocol {
        provider: provider.to_string(),
        detail: format!("body is not JSON ({error})"),
    })
}

/// Read `choices[0].message.content` and `usage.total_tokens` from an
/// OpenAI-style chat completion.
pub(crate) fn read_chat_completion(
    provider: &str,
    value: &Value,
    request_messages: &[Value],
) -> JournalResult<Completion> {
    let text = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .ok_or_else(|| JournalError::Protocol {
            provider: provider.to_string(),
            detail: "missing choices[0].message.content".to_string(),
        })?;

    let reported = value
        .get("usage")
        .and_then(|usage| usage.get("total_tokens"))
        .and_then(Value::as_u64);
    Ok(Completion {
        text: text.to_string(),
        token_count: token_count_or_estimate(reported, request_messages, text),
    })
}

/// Provider-reported usage when present and non-zero, otherwise an estimate
/// over the serialized request plus the response text.
pub(crate) fn token_count_or_estimate(reported: Option<u64>, request: &[Value], response: &str) -> u64 {
    match reported {
        Some(count) if count > 0 => count,
        _ => {
            let serialized = serde_json::to_string(request).unwrap_or_default();
            estimate_tokens(&format!("{serialized}{response}"))
        }
    }
}
