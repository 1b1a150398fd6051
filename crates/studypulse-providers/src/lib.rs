//! studypulse-providers — LLM provider integrations.
//!
//! Implements the `LlmProvider` trait for OpenAI-compatible APIs and Ollama,
//! plus a scripted mock, and loads the provider/generation configuration.

pub mod config;
pub mod mock;
pub mod ollama;
pub mod openai;

pub use config::{create_provider, load_config, load_config_from, ProviderConfig, StudyPulseConfig};
pub use studypulse_core::error::ProviderError;
