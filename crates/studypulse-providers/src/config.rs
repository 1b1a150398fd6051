//! Provider configuration and factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use studypulse_core::chunker::DEFAULT_CHUNK_SIZE;
use studypulse_core::generation::GenerationConfig;
use studypulse_core::traits::LlmProvider;

use crate::ollama::{OllamaProvider, DEFAULT_BASE_URL as DEFAULT_OLLAMA_URL};
use crate::openai::OpenAiProvider;

/// Configuration for a single LLM provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .finish(),
            ProviderConfig::Ollama { base_url } => f
                .debug_struct("Ollama")
                .field("base_url", base_url)
                .finish(),
        }
    }
}

fn default_ollama_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}

/// LLM and question-generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyPulseConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Provider used for question generation.
    #[serde(default = "default_provider")]
    pub default_provider: String,
    /// Model used for question generation.
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Max retries on provider errors.
    #[serde(default = "default_retries")]
    pub max_retries: u32,
    /// Base retry delay in milliseconds; grows linearly per attempt.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
    /// Minimum spacing between provider requests in milliseconds.
    #[serde(default = "default_request_interval")]
    pub min_request_interval_ms: u64,
    /// Maximum characters of document text per request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Chunks sent to the provider concurrently.
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,
    /// Replaces the built-in question-generation system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,
}

fn default_provider() -> String {
    "openai".to_string()
}
fn default_model() -> String {
    "gpt-4".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_retries() -> u32 {
    3
}
fn default_retry_delay() -> u64 {
    1000
}
fn default_request_interval() -> u64 {
    1000
}
fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_parallelism() -> usize {
    1
}

impl Default for StudyPulseConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_retries: default_retries(),
            retry_delay_ms: default_retry_delay(),
            min_request_interval_ms: default_request_interval(),
            chunk_size: default_chunk_size(),
            parallelism: default_parallelism(),
            system_prompt: None,
        }
    }
}

impl StudyPulseConfig {
    /// Settings for the question-generation engine.
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            max_retries: self.max_retries,
            retry_delay: Duration::from_millis(self.retry_delay_ms),
            min_request_interval: Duration::from_millis(self.min_request_interval_ms),
            chunk_size: self.chunk_size,
            parallelism: self.parallelism.max(1),
            system_prompt_override: self.system_prompt.clone(),
        }
    }

    /// Apply `OPENAI_API_KEY` / `OLLAMA_BASE_URL` and resolve `${VAR}`
    /// references in every provider entry.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            let entry = self
                .providers
                .entry("openai".into())
                .or_insert(ProviderConfig::OpenAI {
                    api_key: String::new(),
                    base_url: None,
                    org_id: None,
                });
            if let ProviderConfig::OpenAI { api_key, .. } = entry {
                *api_key = key;
            }
        }

        if let Ok(url) = std::env::var("OLLAMA_BASE_URL") {
            let entry = self
                .providers
                .entry("ollama".into())
                .or_insert_with(|| ProviderConfig::Ollama {
                    base_url: default_ollama_url(),
                });
            if let ProviderConfig::Ollama { base_url } = entry {
                *base_url = url;
            }
        }

        for provider in self.providers.values_mut() {
            *provider = resolve_provider_config(provider);
        }
    }

    /// Build the configured default provider.
    pub fn default_llm_provider(&self) -> Result<Box<dyn LlmProvider>> {
        let config = self.providers.get(&self.default_provider).with_context(|| {
            format!(
                "provider '{}' is not configured (set OPENAI_API_KEY or add [providers.{}])",
                self.default_provider, self.default_provider
            )
        })?;
        create_provider(&self.default_provider, config)
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            org_id: org_id.as_ref().map(|o| resolve_env_vars(o)),
        },
        ProviderConfig::Ollama { base_url } => ProviderConfig::Ollama {
            base_url: resolve_env_vars(base_url),
        },
    }
}

/// Locate the config file to use.
///
/// An explicit path must exist. Otherwise the search order is:
/// 1. `studypulse.toml` in the current directory
/// 2. `~/.config/studypulse/config.toml`
pub fn find_config_file(path: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(p) = path {
        if p.exists() {
            return Ok(Some(p.to_path_buf()));
        }
        anyhow::bail!("config file not found: {}", p.display());
    }

    let local = PathBuf::from("studypulse.toml");
    if local.exists() {
        return Ok(Some(local));
    }
    Ok(dirs_path()
        .map(|home| home.join("config.toml"))
        .filter(|global| global.exists()))
}

/// Load configuration from well-known paths.
pub fn load_config() -> Result<StudyPulseConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<StudyPulseConfig> {
    let mut config = match find_config_file(path)? {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<StudyPulseConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => StudyPulseConfig::default(),
    };
    config.apply_env_overrides();
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("studypulse"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
        } => {
            if api_key.is_empty() {
                anyhow::bail!("provider '{name}' has an empty api_key");
            }
            Ok(Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
            )?))
        }
        ProviderConfig::Ollama { base_url } => Ok(Box::new(OllamaProvider::new(base_url)?)),
    }
}
