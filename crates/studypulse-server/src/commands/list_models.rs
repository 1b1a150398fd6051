//! The `studypulse list-models` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use studypulse_core::traits::ModelInfo;
use studypulse_providers::ollama::OllamaProvider;
use studypulse_providers::{create_provider, ProviderConfig};
use studypulse_server::load_app_config;

/// Models a provider offers. Ollama is asked for its installed models.
async fn models_for(name: &str, config: &ProviderConfig) -> Result<Vec<ModelInfo>> {
    match config {
        ProviderConfig::Ollama { base_url } => {
            OllamaProvider::new(base_url)?.list_models_async().await
        }
        other => Ok(create_provider(name, other)?.available_models()),
    }
}

pub async fn execute(provider_filter: Option<String>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_app_config(config_path.as_deref())?;

    let mut names: Vec<&String> = config
        .llm
        .providers
        .keys()
        .filter(|name| provider_filter.as_ref().map_or(true, |f| *name == f))
        .collect();
    names.sort();

    let mut table = Table::new();
    table.set_header(vec!["Provider", "Model", "Name", "Context", "$/1K in", "$/1K out"]);
    let mut found_any = false;

    for name in names {
        let models = match models_for(name, &config.llm.providers[name]).await {
            Ok(models) => models,
            Err(e) => {
                eprintln!("Skipping {name}: {e:#}");
                continue;
            }
        };
        for model in models {
            found_any = true;
            table.add_row(vec![
                Cell::new(name),
                Cell::new(&model.id),
                Cell::new(&model.name),
                Cell::new(format!("{}K", model.max_context / 1000)),
                Cell::new(format!("{:.4}", model.cost_per_1k_input)),
                Cell::new(format!("{:.4}", model.cost_per_1k_output)),
            ]);
        }
    }

    if found_any {
        println!("{table}");
    } else {
        println!("No providers configured. Run `studypulse init` to create a config file.");
    }

    Ok(())
}
