use crate::error::{JournalError, JournalResult};
use crate::providers::{ensure_success, HttpRequest, Transport};
use crate::types::{
    JournalSettings, LearningAnalytics, ANALYTICS_COMPATIBLE_MODEL, ANALYTICS_OPENAI_MODEL,
};
use crate::util::trim_trailing_slashes;
use serde_json::{json, Value};
use tracing::debug;

const ANALYSIS_FAILED: &str = "Analysis failed";

const SYSTEM_PROMPT: &str = r#"You are an expert in instructional design and learning sciences. Analyze the following list of user prompts from a student's journal.
Based ONLY on the user's prompts, provide a brief analysis. Do NOT analyze the AI's hypothetical responses.
Focus on the student's line of inquiry. Respond ONLY with a valid JSON object with three keys: "mainTopics", "learningTheory", "idModel".
- "mainTopics": A string of 3-5 comma-separated keywords summarizing the user's topics.
- "learningTheory": A string identifying the most relevant learning theory (e.g., "Constructivism", "Cognitivism", "Behaviorism"). If none apply, state "N/A".
- "idModel": A string identifying the most relevant instructional design model (e.g., "ADDIE", "Gagne's Nine Events", "Bloom's Taxonomy"), including a model for ADDIE(M), which is ADDIE plus Management. If none apply, state "N/A"."#;

/// Endpoint, key and model used for the analytics call.
struct AnalyticsTarget {
    provider: &'static str,
    url: String,
    api_key: String,
    model: &'static str,
}

/// The official key wins when both are configured.
fn analytics_target(settings: &JournalSettings) -> JournalResult<AnalyticsTarget> {
    if settings.has_openai_key() {
        return Ok(AnalyticsTarget {
            provider: "OpenAI",
            url: format!("{}/chat/completions", trim_trailing_slashes(&settings.openai_base_url)),
            api_key: settings.openai_api_key.trim().to_string(),
            model: ANALYTICS_OPENAI_MODEL,
        });
    }
    if settings.has_compatible_key() {
        return Ok(AnalyticsTarget {
            provider: "OpenAI-Compatible",
            url: format!(
                "{}/chat/completions",
                trim_trailing_slashes(&settings.compatible_base_url)
            ),
            api_key: settings.compatible_api_key.trim().to_string(),
            model: ANALYTICS_COMPATIBLE_MODEL,
        });
    }
    Err(JournalError::Configuration(
        "Analytics requires an Official OpenAI or OpenAI-Compatible API key.".to_string(),
    ))
}

fn numbered_prompts(prompts: &[String]) -> String {
    let lines: Vec<String> = prompts
        .iter()
        .enumerate()
        .map(|(index, prompt)| format!("{}. {prompt}", index + 1))
        .collect();
    format!("User Prompts:\n{}", lines.join("\n"))
}

/// Summarize the student's prompts with one structured-JSON chat completion.
pub fn analyze(
    prompts: &[String],
    settings: &JournalSettings,
    transport: &dyn Transport,
) -> JournalResult<LearningAnalytics> {
    let target = analytics_target(settings)?;
    if prompts.is_empty() {
        return Ok(LearningAnalytics::no_data());
    }

    let payload = json!({
        "model": target.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            { "role": "user", "content": numbered_prompts(prompts) },
        ],
        "response_format": { "type": "json_object" },
    });
    let request = HttpRequest::post(target.provider, target.url, payload).bearer(&target.api_key);

    debug!(provider = target.provider, prompts = prompts.len(), "requesting learning analytics");
    let response = ensure_success(target.provider, transport.send(&request)?)?;
    parse_analytics(&response.body)
}

fn parse_analytics(body: &str) -> JournalResult<LearningAnalytics> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| JournalError::InvalidAnalytics(format!("body is not JSON: {error}")))?;
    let content = value
        .get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(Value::as_str)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| {
            JournalError::InvalidAnalytics("missing choices[0].message.content".to_string())
        })?;
    let result: Value = serde_json::from_str(content)
        .map_err(|error| JournalError::InvalidAnalytics(format!("content is not JSON: {error}")))?;

    Ok(LearningAnalytics {
        main_topics: field_or_failed(&result, "mainTopics"),
        learning_theory: field_or_failed(&result, "learningTheory"),
        id_model: field_or_failed(&result, "idModel"),
    })
}

fn field_or_failed(result: &Value, key: &str) -> String {
    let text = match result.get(key) {
        Some(Value::String(text)) => text.trim().to_string(),
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(", "),
        _ => String::new(),
    };
    if text.is_empty() {
        ANALYSIS_FAILED.to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;

    fn completion_with(content: &str) -> String {
        json!({"choices": [{"message": {"role": "assistant", "content": content}}]}).to_string()
    }

    fn prompts() -> Vec<String> {
        vec!["What is ADDIE?".to_string(), "Give an example".to_string()]
    }

    #[test]
    fn missing_keys_fail_before_any_request() {
        let transport = ScriptedTransport::new();
        let settings = JournalSettings {
            gemini_api_key: "AIza".to_string(),
            ..JournalSettings::default()
        };
        let result = analyze(&prompts(), &settings, &transport);
        assert!(matches!(result, Err(JournalError::Configuration(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn empty_prompts_return_no_data_without_network() {
        let transport = ScriptedTransport::new();
        let settings = JournalSettings {
            compatible_api_key: "sk-or".to_string(),
            ..JournalSettings::default()
        };
        let analytics = analyze(&[], &settings, &transport).expect("analytics");
        assert_eq!(analytics, LearningAnalytics::no_data());
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn official_endpoint_is_preferred_and_json_mode_requested() {
        let transport = ScriptedTransport::new().reply(
            200,
            &completion_with(
                r#"{"mainTopics":"ADDIE, examples, design","learningTheory":"Constructivism","idModel":"ADDIE"}"#,
            ),
        );
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            compatible_api_key: "sk-or".to_string(),
            ..JournalSettings::default()
        };

        let analytics = analyze(&prompts(), &settings, &transport).expect("analytics");
        assert_eq!(analytics.main_topics, "ADDIE, examples, design");
        assert_eq!(analytics.learning_theory, "Constructivism");
        assert_eq!(analytics.id_model, "ADDIE");

        let sent = transport.single_request();
        assert_eq!(sent.url, "https://api.openai.com/v1/chat/completions");
        assert_eq!(sent.header("Authorization"), Some("Bearer sk"));
        assert_eq!(sent.body["model"], "gpt-4o");
        assert_eq!(sent.body["response_format"]["type"], "json_object");
        assert_eq!(sent.body["messages"][0]["role"], "system");
        assert_eq!(
            sent.body["messages"][1]["content"],
            "User Prompts:\n1. What is ADDIE?\n2. Give an example"
        );
    }

    #[test]
    fn compatible_endpoint_uses_its_model() {
        let transport = ScriptedTransport::new().reply(
            200,
            &completion_with(r#"{"mainTopics":"x","learningTheory":"y","idModel":"z"}"#),
        );
        let settings = JournalSettings {
            compatible_api_key: "sk-or".to_string(),
            ..JournalSettings::default()
        };
        analyze(&prompts(), &settings, &transport).expect("analytics");
        let sent = transport.single_request();
        assert_eq!(sent.url, "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(sent.body["model"], "openai/gpt-4o");
    }

    #[test]
    fn missing_fields_become_sentinels() {
        let transport = ScriptedTransport::new().reply(
            200,
            &completion_with(r#"{"mainTopics":["ADDIE","rubrics"],"learningTheory":""}"#),
        );
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            ..JournalSettings::default()
        };
        let analytics = analyze(&prompts(), &settings, &transport).expect("analytics");
        assert_eq!(analytics.main_topics, "ADDIE, rubrics");
        assert_eq!(analytics.learning_theory, ANALYSIS_FAILED);
        assert_eq!(analytics.id_model, ANALYSIS_FAILED);
    }

    #[test]
    fn malformed_content_is_invalid_analytics() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            ..JournalSettings::default()
        };
        for body in [
            completion_with("not json at all"),
            r#"{"choices":[]}"#.to_string(),
            "<html>gateway</html>".to_string(),
        ] {
            let transport = ScriptedTransport::new().reply(200, &body);
            let result = analyze(&prompts(), &settings, &transport);
            assert!(
                matches!(result, Err(JournalError::InvalidAnalytics(_))),
                "body {body} should be rejected"
            );
        }
    }

    #[test]
    fn http_failure_is_a_transport_error() {
        let transport = ScriptedTransport::new().reply(503, "overloaded");
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            ..JournalSettings::default()
        };
        let result = analyze(&prompts(), &settings, &transport);
        assert!(matches!(result, Err(JournalError::Transport { status: 503, .. })));
    }
}
