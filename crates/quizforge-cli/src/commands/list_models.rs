//! The `quizforge list-models` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_providers::{canonical_provider_name, create_provider, load_config_from};

const PROVIDERS: [&str; 3] = ["gemini", "openai", "anthropic"];

pub fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let filter = provider_filter
        .as_deref()
        .map(canonical_provider_name)
        .transpose()?;

    let mut table = Table::new();
    table.set_header(vec!["Provider", "Model", "Name", "Context", "Vision", "Key"]);

    for name in PROVIDERS {
        if filter.is_some_and(|f| f != name) {
            continue;
        }
        let (_, provider_config) = config.provider(name)?;
        let key = if provider_config.has_api_key() {
            "configured"
        } else {
            "missing"
        };
        let provider = create_provider(&provider_config);
        for model in provider.available_models() {
            let id = if model.id == provider_config.model() {
                format!("{} (default)", model.id)
            } else {
                model.id.clone()
            };
            table.add_row(vec![
                Cell::new(name),
                Cell::new(id),
                Cell::new(&model.name),
                Cell::new(format!("{}K", model.max_context / 1000)),
                Cell::new(if model.vision { "yes" } else { "no" }),
                Cell::new(key),
            ]);
        }
    }

    println!("{table}");
    println!("Default provider: {}", config.default_provider);
    Ok(())
}
