pub mod create_user;
pub mod ingest;
pub mod init;
pub mod list_models;
pub mod serve;

use std::sync::Arc;

use anyhow::{Context, Result};

use studypulse_core::generation::QuestionGenerator;
use studypulse_core::pdf::PdfExtractor;
use studypulse_core::store::Storage;
use studypulse_core::traits::LlmProvider;
use studypulse_core::StudyService;
use studypulse_server::AppConfig;

/// Open the configured database and bring its schema up to date.
pub async fn open_storage(config: &AppConfig) -> Result<Storage> {
    studypulse_store::connect(&config.database_url)
        .await
        .with_context(|| format!("failed to open database: {}", config.database_url))
}

/// Wire storage, the PDF extractor and the default LLM provider together.
pub fn build_service(config: &AppConfig, storage: Storage) -> Result<StudyService> {
    let provider: Arc<dyn LlmProvider> = Arc::from(config.llm.default_llm_provider()?);
    let generator = QuestionGenerator::new(provider, config.llm.generation_config());
    Ok(StudyService::new(
        storage,
        Arc::new(PdfExtractor),
        generator,
        config.quiz,
    ))
}
