use crate::chat::{default_model, list_available_models};
use crate::error::JournalResult;
use crate::storage::settings_io::FileSettingsStore;
use crate::types::ModelDefinition;
use clap::Args;

#[derive(Args)]
pub struct ModelsArgs {
    #[arg(long, help = "Output as JSON")]
    pub json: bool,
}

pub fn run(args: ModelsArgs, store: &FileSettingsStore) -> JournalResult<()> {
    let settings = super::settings_snapshot(store);
    let models = list_available_models(&settings);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&models)?);
        return Ok(());
    }
    if models.is_empty() {
        println!("No AI models are configured. Please check your settings.");
        return Ok(());
    }
    for line in model_lines(&models) {
        println!("{line}");
    }
    Ok(())
}

fn model_lines(models: &[ModelDefinition]) -> Vec<String> {
    let default_id = default_model(models).map(|model| model.id.as_str());
    models
        .iter()
        .map(|model| {
            if !model.is_selectable() {
                return format!("  {}", model.display_name);
            }
            let marker = if Some(model.id.as_str()) == default_id { "*" } else { " " };
            format!("{marker} {:<26} {}", model.id, model.display_name)
        })
        .collect()
}
