use super::{chat_messages, ensure_success, parse_json_body, read_chat_completion, ChatProvider};
use super::{HttpRequest, Transport};
use crate::error::{JournalError, JournalResult};
use crate::types::{Completion, Conversation, JournalSettings};
use crate::util::trim_trailing_slashes;
use serde_json::json;

/// Chat completions over the OpenAI wire shape, for the official API and for
/// third-party compatible services.
pub struct OpenAiCompatibleProvider<'a> {
    label: &'static str,
    base_url: String,
    api_key: String,
    transport: &'a dyn Transport,
}

impl<'a> OpenAiCompatibleProvider<'a> {
    pub(crate) fn official(settings: &JournalSettings, transport: &'a dyn Transport) -> JournalResult<Self> {
        if !settings.has_openai_key() {
            return Err(JournalError::Configuration(
                "Missing OpenAI API key. Set it in Settings first.".to_string(),
            ));
        }
        Ok(Self {
            label: "OpenAI",
            base_url: settings.openai_base_url.clone(),
            api_key: settings.openai_api_key.trim().to_string(),
            transport,
        })
    }

    pub(crate) fn compatible(settings: &JournalSettings, transport: &'a dyn Transport) -> JournalResult<Self> {
        if !settings.has_compatible_key() {
            return Err(JournalError::Configuration(
                "Missing OpenAI-compatible API key. Set it in Settings first.".to_string(),
            ));
        }
        Ok(Self {
            label: "OpenAI-Compatible",
            base_url: settings.compatible_base_url.clone(),
            api_key: settings.compatible_api_key.trim().to_string(),
            transport,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", trim_trailing_slashes(&self.base_url))
    }
}

impl ChatProvider for OpenAiCompatibleProvider<'_> {
    fn name(&self) -> &'static str {
        self.label
    }

    fn complete(&self, conversation: &Conversation, model_api_id: &str) -> JournalResult<Completion> {
        let messages = chat_messages(conversation);
        let payload = json!({
            "model": model_api_id,
            "messages": messages,
        });
        let request = HttpRequest::post(self.label, self.endpoint(), payload).bearer(&self.api_key);

        let response = ensure_success(self.label, self.transport.send(&request)?)?;
        let value = parse_json_body(self.label, &response.body)?;
        read_chat_completion(self.label, &value, &messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::types::Turn;
    use crate::util::estimate_tokens;
    use serde_json::Value;

    fn settings() -> JournalSettings {
        JournalSettings {
            openai_api_key: "sk-official".to_string(),
            compatible_api_key: "sk-or".to_string(),
            compatible_base_url: "https://openrouter.test/api/v1/".to_string(),
            ..JournalSettings::default()
        }
    }

    #[test]
    fn official_request_shape_and_usage() {
        let transport = ScriptedTransport::new().reply(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"Example: ..."}}],"usage":{"total_tokens":210}}"#,
        );
        let provider = OpenAiCompatibleProvider::official(&settings(), &transport).expect("provider");
        let conversation = Conversation::new(
            vec![Turn::user("What is ADDIE?"), Turn::assistant("It is a model...")],
            "Give an example",
        );

        let completion = provider.complete(&conversation, "gpt-4o").expect("completion");
        assert_eq!(completion.text, "Example: ...");
        assert_eq!(completion.token_count, 210);

        let sent = transport.single_request();
        assert_eq!(sent.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(sent.header("Authorization"), Some("Bearer sk-official"));
        assert_eq!(sent.body["model"], "gpt-4o");
        let roles: Vec<&str> = sent.body["messages"]
            .as_array()
            .expect("messages")
            .iter()
            .filter_map(|message| message["role"].as_str())
            .collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
    }

    #[test]
    fn compatible_uses_trimmed_base_url_and_its_own_key() {
        let transport = ScriptedTransport::new()
            .reply(200, r#"{"choices":[{"message":{"content":"hi"}}],"usage":{"total_tokens":9}}"#);
        let provider = OpenAiCompatibleProvider::compatible(&settings(), &transport).expect("provider");
        provider
            .complete(&Conversation::new(Vec::new(), "hello"), "openai/gpt-4o")
            .expect("completion");

        let sent = transport.single_request();
        assert_eq!(sent.url, "https://openrouter.test/api/v1/chat/completions");
        assert_eq!(sent.header("Authorization"), Some("Bearer sk-or"));
    }

    #[test]
    fn missing_usage_is_estimated_from_request_and_response() {
        let transport = ScriptedTransport::new().reply(200, r#"{"choices":[{"message":{"content":"short answer"}}]}"#);
        let provider = OpenAiCompatibleProvider::official(&settings(), &transport).expect("provider");
        let completion = provider
            .complete(&Conversation::new(Vec::new(), "question"), "gpt-4o")
            .expect("completion");

        let messages: Value = transport.single_request().body["messages"].clone();
        let serialized = serde_json::to_string(&messages).expect("json");
        assert_eq!(
            completion.token_count,
            estimate_tokens(&format!("{serialized}short answer"))
        );
    }

    #[test]
    fn missing_choices_is_a_protocol_error() {
        let transport = ScriptedTransport::new().reply(200, r#"{"object":"chat.completion"}"#);
        let provider = OpenAiCompatibleProvider::official(&settings(), &transport).expect("provider");
        let result = provider.complete(&Conversation::new(Vec::new(), "q"), "gpt-4o");
        assert!(matches!(result, Err(JournalError::Protocol { .. })));
    }

    #[test]
    fn http_failure_carries_status_and_provider_message() {
        let transport = ScriptedTransport::new().reply(401, r#"{"error":{"message":"Incorrect API key provided"}}"#);
        let provider = OpenAiCompatibleProvider::official(&settings(), &transport).expect("provider");
        let error = provider
            .complete(&Conversation::new(Vec::new(), "q"), "gpt-4o")
            .expect_err("401 must fail");
        assert!(error.to_string().contains("401"));
        assert!(error.to_string().contains("Incorrect API key provided"));
    }

    #[test]
    fn missing_key_fails_without_network() {
        let transport = ScriptedTransport::new();
        let result = OpenAiCompatibleProvider::official(&JournalSettings::default(), &transport);
        assert!(matches!(result, Err(JournalError::Configuration(_))));
        assert_eq!(transport.request_count(), 0);
    }
}
