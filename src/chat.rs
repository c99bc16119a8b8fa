use crate::error::{JournalError, JournalResult};
use crate::providers::{provider_for, Transport};
use crate::types::{
    ChatOutcome, Conversation, JournalEntry, JournalSettings, ModelDefinition, ModelFamily, Turn,
};
use crate::util::estimate_tokens;
use serde::Serialize;
use tracing::{debug, info, warn};

const OFFICIAL_MODELS: [(&str, &str, &str); 3] = [
    ("official-gpt-5-main-mini", "gpt-5-main-mini", "OpenAI: gpt-5-main-mini"),
    ("official-gpt-4o", "gpt-4o", "OpenAI: gpt-4o"),
    ("official-o4-mini-high", "o4-mini-high", "OpenAI: o4-mini-high"),
];
const GEMINI_MODELS: [(&str, &str, &str); 2] = [
    ("gem-2.5-pro", "gemini-2.5-pro", "Gemini: 2.5 Pro"),
    ("gem-2.0-flash", "gemini-2.0-flash", "Gemini: 2.0 Flash"),
];
const COMPATIBLE_MODELS: [(&str, &str, &str); 2] = [
    ("comp-gpt-4o", "openai/gpt-4o", "Compatible: gpt-4o"),
    ("comp-o4-mini-high", "openai/o4-mini-high", "Compatible: o4-mini-high"),
];
pub(crate) const LOCAL_MODEL_ID: &str = "local-llm";

/// Model catalog for the current settings snapshot.
///
/// Local mode yields at most the configured local model. Otherwise each
/// family with a key contributes its fixed models, in the order official,
/// Gemini, compatible, with a separator only after a family that produced
/// entries.
pub fn list_available_models(settings: &JournalSettings) -> Vec<ModelDefinition> {
    let mut models = Vec::new();

    if settings.use_local_llm {
        let name = settings.local_llm_model_name.trim();
        if !name.is_empty() {
            models.push(ModelDefinition::model(
                LOCAL_MODEL_ID,
                name,
                &format!("Local LLM: {name}"),
                ModelFamily::Local,
            ));
        }
        return models;
    }

    let families = [
        (settings.has_openai_key(), ModelFamily::OpenAi, None, &OFFICIAL_MODELS[..]),
        (settings.has_gemini_key(), ModelFamily::Gemini, Some("sep1"), &GEMINI_MODELS[..]),
        (
            settings.has_compatible_key(),
            ModelFamily::Compatible,
            Some("sep2"),
            &COMPATIBLE_MODELS[..],
        ),
    ];
    for (enabled, family, separator, catalog) in families {
        if !enabled {
            continue;
        }
        if let Some(separator) = separator.filter(|_| !models.is_empty()) {
            models.push(ModelDefinition::separator(separator, family));
        }
        for (id, api_id, display_name) in catalog {
            models.push(ModelDefinition::model(id, api_id, display_name, family));
        }
    }
    models
}

/// First selectable entry. Separators are never the default.
pub fn default_model(models: &[ModelDefinition]) -> Option<&ModelDefinition> {
    models.iter().find(|model| model.is_selectable())
}

/// Resolve the user's choice, or the default when none was given.
pub fn resolve_model(models: &[ModelDefinition], model_id: Option<&str>) -> JournalResult<ModelDefinition> {
    if models.is_empty() {
        return Err(JournalError::Configuration(
            "No AI models are configured. Please check your settings.".to_string(),
        ));
    }
    let chosen = match model_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(id) => models
            .iter()
            .find(|model| model.id == id)
            .ok_or_else(|| JournalError::Validation(format!("Unknown model: {id}")))?,
        None => default_model(models).ok_or_else(|| {
            JournalError::Configuration("No selectable AI model is configured.".to_string())
        })?,
    };
    if !chosen.is_selectable() {
        return Err(JournalError::Validation(format!(
            "'{}' is a separator, not a model.",
            chosen.id
        )));
    }
    Ok(chosen.clone())
}

/// Selected prior entries (ascending id, each as a user turn then an
/// assistant turn) followed by the new prompt.
pub fn build_conversation(prior: &[JournalEntry], selected_ids: &[u32], prompt: &str) -> Conversation {
    let mut selected: Vec<&JournalEntry> = prior
        .iter()
        .filter(|entry| selected_ids.contains(&entry.id))
        .collect();
    selected.sort_by_key(|entry| entry.id);

    for id in selected_ids {
        if !prior.iter().any(|entry| entry.id == *id) {
            warn!(id, "selected context entry not found in note");
        }
    }

    let history = selected
        .into_iter()
        .flat_map(|entry| [Turn::user(&entry.prompt), Turn::assistant(&entry.response)])
        .collect();
    Conversation::new(history, prompt)
}

/// Estimate over the serialized history turns. Zero when no context is selected.
pub fn estimate_context(conversation: &Conversation) -> u64 {
    let history = conversation.history();
    if history.is_empty() {
        return 0;
    }
    let serialized = serde_json::to_string(history).unwrap_or_default();
    estimate_tokens(&serialized)
}

/// Composer preview shown before submitting.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPreview {
    pub(crate) context: u64,
    pub(crate) new: u64,
    pub(crate) total: u64,
}

impl std::fmt::Display for TokenPreview {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Estimated Tokens: ~{} (Context: {}, New: {})",
            self.total, self.context, self.new
        )
    }
}

pub fn preview_tokens(prior: &[JournalEntry], selected_ids: &[u32], prompt: &str) -> TokenPreview {
    let context = prior
        .iter()
        .filter(|entry| selected_ids.contains(&entry.id))
        .map(|entry| estimate_tokens(&entry.prompt) + estimate_tokens(&entry.response))
        .sum();
    let new = estimate_tokens(prompt);
    TokenPreview {
        context,
        new,
        total: context + new,
    }
}

/// One chat round trip. Nothing is written here; the caller appends the
/// outcome only after this returns `Ok`.
pub fn submit(
    prompt: &str,
    selected_ids: &[u32],
    model: &ModelDefinition,
    prior: &[JournalEntry],
    settings: &JournalSettings,
    transport: &dyn Transport,
) -> JournalResult<ChatOutcome> {
    if prompt.trim().is_empty() {
        return Err(JournalError::Validation("Prompt cannot be empty.".to_string()));
    }
    if !model.is_selectable() {
        return Err(JournalError::Validation(
            "Select a model, not a separator.".to_string(),
        ));
    }

    let conversation = build_conversation(prior, selected_ids, prompt);
    let tokens_context = estimate_context(&conversation);
    let provider = provider_for(model.family, settings, transport)?;

    debug!(
        provider = provider.name(),
        model = %model.api_id,
        turns = conversation.turns().len(),
        "dispatching chat request"
    );
    let completion = provider.complete(&conversation, &model.api_id)?;
    info!(model = %model.id, tokens = completion.token_count, "chat response received");

    Ok(ChatOutcome {
        model_label: provider.metadata_label(model),
        response: completion.text,
        tokens_total: completion.token_count,
        tokens_context,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedTransport;
    use crate::types::{LocalApiFormat, ModelKind, Role};

    fn entry(id: u32, prompt: &str, response: &str) -> JournalEntry {
        JournalEntry {
            id,
            prompt: prompt.to_string(),
            response: response.to_string(),
            metadata_text: String::new(),
        }
    }

    fn ids(models: &[ModelDefinition]) -> Vec<&str> {
        models.iter().map(|model| model.id.as_str()).collect()
    }

    #[test]
    fn gemini_only_catalog_has_no_separators() {
        let settings = JournalSettings {
            gemini_api_key: "AIza".to_string(),
            ..JournalSettings::default()
        };
        let models = list_available_models(&settings);
        assert_eq!(ids(&models), vec!["gem-2.5-pro", "gem-2.0-flash"]);
        assert_eq!(default_model(&models).map(|m| m.id.as_str()), Some("gem-2.5-pro"));
    }

    #[test]
    fn full_catalog_orders_families_with_separators() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            gemini_api_key: "AIza".to_string(),
            compatible_api_key: "sk-or".to_string(),
            ..JournalSettings::default()
        };
        let models = list_available_models(&settings);
        assert_eq!(
            ids(&models),
            vec![
                "official-gpt-5-main-mini",
                "official-gpt-4o",
                "official-o4-mini-high",
                "sep1",
                "gem-2.5-pro",
                "gem-2.0-flash",
                "sep2",
                "comp-gpt-4o",
                "comp-o4-mini-high",
            ]
        );
        assert_eq!(models[3].kind, ModelKind::Separator);
        assert_eq!(default_model(&models).map(|m| m.id.as_str()), Some("official-gpt-5-main-mini"));
    }

    #[test]
    fn openai_and_compatible_get_one_separator() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            compatible_api_key: "sk-or".to_string(),
            ..JournalSettings::default()
        };
        let models = list_available_models(&settings);
        let separators: Vec<&str> = models
            .iter()
            .filter(|model| !model.is_selectable())
            .map(|model| model.id.as_str())
            .collect();
        assert_eq!(separators, vec!["sep2"]);
    }

    #[test]
    fn local_mode_hides_remote_families() {
        let mut settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            use_local_llm: true,
            local_llm_model_name: "llama3:latest".to_string(),
            ..JournalSettings::default()
        };
        let models = list_available_models(&settings);
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].api_id, "llama3:latest");
        assert_eq!(models[0].display_name, "Local LLM: llama3:latest");

        settings.local_llm_model_name.clear();
        assert!(list_available_models(&settings).is_empty());
    }

    #[test]
    fn resolve_model_rejects_separators_and_unknown_ids() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            gemini_api_key: "AIza".to_string(),
            ..JournalSettings::default()
        };
        let models = list_available_models(&settings);
        assert!(matches!(
            resolve_model(&models, Some("sep1")),
            Err(JournalError::Validation(_))
        ));
        assert!(matches!(
            resolve_model(&models, Some("claude")),
            Err(JournalError::Validation(_))
        ));
        assert_eq!(
            resolve_model(&models, Some("gem-2.0-flash")).expect("model").api_id,
            "gemini-2.0-flash"
        );
        assert_eq!(resolve_model(&models, None).expect("default").id, "official-gpt-5-main-mini");
        assert!(matches!(resolve_model(&[], None), Err(JournalError::Configuration(_))));
    }

    #[test]
    fn conversation_includes_only_selected_entries_in_id_order() {
        let prior = vec![entry(1, "p1", "r1"), entry(2, "p2", "r2"), entry(3, "p3", "r3")];
        let conversation = build_conversation(&prior, &[3, 1], "P");
        let turns: Vec<(Role, &str)> = conversation
            .turns()
            .iter()
            .map(|turn| (turn.role, turn.content.as_str()))
            .collect();
        assert_eq!(
            turns,
            vec![
                (Role::User, "p1"),
                (Role::Assistant, "r1"),
                (Role::User, "p3"),
                (Role::Assistant, "r3"),
                (Role::User, "P"),
            ]
        );
    }

    #[test]
    fn context_estimate_covers_history_only() {
        let prior = vec![entry(1, "What is ADDIE?", "It is a model...")];
        let without = build_conversation(&prior, &[], "Give an example");
        assert_eq!(estimate_context(&without), 0);

        let with = build_conversation(&prior, &[1], "Give an example");
        let serialized =
            serde_json::to_string(&[Turn::user("What is ADDIE?"), Turn::assistant("It is a model...")])
                .expect("json");
        assert_eq!(
            serialized,
            r#"[{"role":"user","content":"What is ADDIE?"},{"role":"model","content":"It is a model..."}]"#
        );
        assert_eq!(estimate_context(&with), estimate_tokens(&serialized));
    }

    #[test]
    fn preview_splits_context_and_new_tokens() {
        let prior = vec![entry(1, "abcd", "abcdefgh"), entry(2, "zz", "zz")];
        let preview = preview_tokens(&prior, &[1], "abcde");
        assert_eq!(preview, TokenPreview { context: 3, new: 2, total: 5 });
        assert_eq!(preview.to_string(), "Estimated Tokens: ~5 (Context: 3, New: 2)");
    }

    #[test]
    fn blank_prompt_is_rejected_before_any_request() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            ..JournalSettings::default()
        };
        let model = resolve_model(&list_available_models(&settings), None).expect("model");
        let transport = ScriptedTransport::new();
        let result = submit("   \n", &[], &model, &[], &settings, &transport);
        assert!(matches!(result, Err(JournalError::Validation(_))));
        assert_eq!(transport.request_count(), 0);
    }

    #[test]
    fn submit_returns_provider_total_and_local_context_estimate() {
        let settings = JournalSettings {
            openai_api_key: "sk".to_string(),
            ..JournalSettings::default()
        };
        let model = resolve_model(&list_available_models(&settings), Some("official-gpt-4o")).expect("model");
        let prior = vec![entry(1, "What is ADDIE?", "It is a model...")];
        let transport = ScriptedTransport::new().reply(
            200,
            r#"{"choices":[{"message":{"content":"Example: ..."}}],"usage":{"total_tokens":210}}"#,
        );

        let outcome = submit("Give an example", &[1], &model, &prior, &settings, &transport).expect("outcome");
        assert_eq!(outcome.model_label, "OpenAI: gpt-4o");
        assert_eq!(outcome.response, "Example: ...");
        assert_eq!(outcome.tokens_total, 210);
        let conversation = build_conversation(&prior, &[1], "Give an example");
        assert_eq!(outcome.tokens_context, estimate_context(&conversation));
        assert_eq!(transport.single_request().body["messages"].as_array().map(Vec::len), Some(3));
    }

    #[test]
    fn local_outcome_label_carries_format_suffix() {
        let settings = JournalSettings {
            use_local_llm: true,
            local_llm_model_name: "mistral".to_string(),
            local_llm_api_format: LocalApiFormat::Native,
            ..JournalSettings::default()
        };
        let model = resolve_model(&list_available_models(&settings), None).expect("model");
        let transport = ScriptedTransport::new()
            .reply(200, r#"{"message":{"content":"hi"},"prompt_eval_count":5,"eval_count":6}"#);
        let outcome = submit("hello", &[], &model, &[], &settings, &transport).expect("outcome");
        assert_eq!(outcome.model_label, "Local LLM: mistral (Native)");
        assert_eq!(outcome.tokens_total, 11);
    }

    #[test]
    fn provider_failure_propagates_unchanged() {
        let settings = JournalSettings {
            gemini_api_key: "AIza".to_string(),
            ..JournalSettings::default()
        };
        let model = resolve_model(&list_available_models(&settings), None).expect("model");
        let transport = ScriptedTransport::new().fail_network();
        let result = submit("q", &[], &model, &[], &settings, &transport);
        assert!(matches!(result, Err(JournalError::Network { .. })));
    }
}
