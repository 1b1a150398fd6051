//! Question generation engine.
//!
//! Splits document text into chunks, sends each chunk to an LLM provider
//! behind a shared rate limiter, retries transient provider failures with
//! linear backoff, and parses the responses into question drafts.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::chunker::{chunk_text, DEFAULT_CHUNK_SIZE};
use crate::error::ProviderError;
use crate::model::QuestionDraft;
use crate::parser::parse_generated_questions;
use crate::traits::{GenerateRequest, GenerateResponse, LlmProvider, TokenUsage};

/// Configuration for the generation engine.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// Model identifier passed to the provider.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Max tokens per request.
    pub max_tokens: u32,
    /// Retries on provider errors.
    pub max_retries: u32,
    /// Base delay; retry `n` waits `n * retry_delay`.
    pub retry_delay: Duration,
    /// Minimum spacing between request starts.
    pub min_request_interval: Duration,
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Chunks in flight at once.
    pub parallelism: usize,
    /// Optional system prompt override.
    pub system_prompt_override: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4".to_string(),
            temperature: 0.7,
            max_tokens: 1000,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            min_request_interval: Duration::from_secs(1),
            chunk_size: DEFAULT_CHUNK_SIZE,
            parallelism: 1,
            system_prompt_override: None,
        }
    }
}

/// Outcome of generating questions for one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Validated drafts in chunk order.
    pub questions: Vec<QuestionDraft>,
    pub chunks_total: usize,
    /// Chunks whose response was empty or not parseable.
    pub chunks_skipped: usize,
    /// Candidates dropped by validation.
    pub rejected: usize,
    pub token_usage: TokenUsage,
}

#[derive(Debug, Default)]
struct ChunkOutcome {
    questions: Vec<QuestionDraft>,
    rejected: usize,
    skipped: bool,
    usage: TokenUsage,
}

/// Enforces a minimum interval between consecutive request starts.
#[derive(Debug)]
struct RateLimiter {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    async fn acquire(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Turns document text into question drafts via an LLM provider.
///
/// Clones share the provider and the rate limiter.
#[derive(Clone)]
pub struct QuestionGenerator {
    provider: Arc<dyn LlmProvider>,
    config: GenerationConfig,
    limiter: Arc<RateLimiter>,
}

impl QuestionGenerator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.min_request_interval));
        Self {
            provider,
            config,
            limiter,
        }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate questions for a whole document.
    ///
    /// A chunk whose provider call still fails after all retries fails the
    /// whole document; unusable responses only skip their chunk.
    #[instrument(skip(self, content), fields(provider = %self.provider.name(), model = %self.config.model))]
    pub async fn generate(&self, content: &str) -> Result<GenerationReport> {
        let chunks = chunk_text(content, self.config.chunk_size);
        let chunks_total = chunks.len();
        info!(chunks = chunks_total, chars = content.len(), "generating questions");

        let outcomes: Vec<ChunkOutcome> = stream::iter(chunks.into_iter().enumerate())
            .map(|(index, chunk)| async move { self.process_chunk(index, &chunk).await })
            .buffered(self.config.parallelism.max(1))
            .try_collect()
            .await?;

        let mut report = GenerationReport {
            chunks_total,
            ..Default::default()
        };
        for outcome in outcomes {
            if outcome.skipped {
                report.chunks_skipped += 1;
            }
            report.rejected += outcome.rejected;
            report.token_usage.accumulate(&outcome.usage);
            report.questions.extend(outcome.questions);
        }

        info!(
            questions = report.questions.len(),
            skipped = report.chunks_skipped,
            rejected = report.rejected,
            tokens = report.token_usage.total_tokens,
            "question generation finished"
        );
        Ok(report)
    }

    async fn process_chunk(&self, index: usize, chunk: &str) -> Result<ChunkOutcome> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: chunk.to_string(),
            system_prompt: self.config.system_prompt_override.clone(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            json_mode: true,
        };

        let response = self
            .generate_with_retry(&request)
            .await
            .with_context(|| format!("chunk {index} failed"))?;
        let usage = response.token_usage;

        if response.content.trim().is_empty() {
            warn!(chunk = index, "provider returned empty content");
            return Ok(ChunkOutcome {
                skipped: true,
                usage,
                ..Default::default()
            });
        }

        match parse_generated_questions(&response.content) {
            Ok(parsed) => {
                for r in &parsed.rejected {
                    debug!(chunk = index, candidate = r.index, reason = %r.reason, "dropped generated question");
                }
                Ok(ChunkOutcome {
                    rejected: parsed.rejected.len(),
                    questions: parsed.questions,
                    skipped: false,
                    usage,
                })
            }
            Err(e) => {
                warn!(chunk = index, error = %format!("{e:#}"), "unparseable provider response");
                Ok(ChunkOutcome {
                    skipped: true,
                    usage,
                    ..Default::default()
                })
            }
        }
    }

    async fn generate_with_retry(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let mut last_error: Option<anyhow::Error> = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = last_error
                    .as_ref()
                    .and_then(|e| e.downcast_ref::<ProviderError>())
                    .and_then(ProviderError::retry_after_ms)
                    .map(Duration::from_millis)
                    .unwrap_or(self.config.retry_delay * attempt);
                warn!(
                    attempts_left = self.config.max_retries - attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "provider request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }

            self.limiter.acquire().await;
            match self.provider.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let permanent = e
                        .downcast_ref::<ProviderError>()
                        .is_some_and(ProviderError::is_permanent);
                    if permanent {
                        return Err(e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("provider request failed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::traits::ModelInfo;

    const ONE_QUESTION: &str =
        r#"{"questions": [{"type": "theory", "question": "Define triage.", "answer": "Sorting patients by urgency."}]}"#;

    /// Replays queued results, then falls back to a fixed response.
    struct ScriptedProvider {
        script: std::sync::Mutex<VecDeque<Result<String, ProviderError>>>,
        fallback: String,
        calls: AtomicU32,
    }

    impl ScriptedProvider {
        fn new(script: Vec<Result<String, ProviderError>>, fallback: &str) -> Self {
            Self {
                script: std::sync::Mutex::new(script.into()),
                fallback: fallback.to_string(),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::Relaxed)
        }
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            assert!(request.json_mode);
            self.calls.fetch_add(1, Ordering::Relaxed);
            let next = self.script.lock().unwrap().pop_front();
            let content = match next {
                Some(Ok(content)) => content,
                Some(Err(e)) => return Err(e.into()),
                None => self.fallback.clone(),
            };
            Ok(GenerateResponse {
                content,
                model: request.model.clone(),
                token_usage: TokenUsage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                    estimated_cost_usd: 0.0,
                },
                latency_ms: 1,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    fn generator(provider: Arc<ScriptedProvider>, chunk_size: usize) -> QuestionGenerator {
        QuestionGenerator::new(
            provider,
            GenerationConfig {
                chunk_size,
                ..Default::default()
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn generates_questions_per_chunk() {
        let provider = Arc::new(ScriptedProvider::new(vec![], ONE_QUESTION));
        let gen = generator(provider.clone(), 30);

        let report = gen
            .generate("Triage sorts patients. Vital signs matter. Hygiene prevents infection.")
            .await
            .unwrap();

        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.questions.len(), 3);
        assert_eq!(report.chunks_skipped, 0);
        assert_eq!(report.token_usage.total_tokens, 45);
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![
                Err(ProviderError::NetworkError("reset".into())),
                Err(ProviderError::Timeout(120)),
            ],
            ONE_QUESTION,
        ));
        let gen = generator(provider.clone(), 4000);

        let start = Instant::now();
        let report = gen.generate("Short document.").await.unwrap();

        assert_eq!(report.questions.len(), 1);
        assert_eq!(provider.calls(), 3);
        // linear backoff: 1s then 2s
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_error_is_not_retried() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(ProviderError::AuthenticationFailed("bad key".into()))],
            ONE_QUESTION,
        ));
        let gen = generator(provider.clone(), 4000);

        let err = gen.generate("Short document.").await.unwrap_err();
        assert!(format!("{err:#}").contains("authentication failed"));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_fail_the_document() {
        let provider = Arc::new(ScriptedProvider::new(
            (0..4)
                .map(|_| {
                    Err(ProviderError::ApiError {
                        status: 500,
                        message: "boom".into(),
                    })
                })
                .collect(),
            ONE_QUESTION,
        ));
        let gen = generator(provider.clone(), 4000);

        let err = gen.generate("Short document.").await.unwrap_err();
        assert!(format!("{err:#}").contains("chunk 0 failed"));
        assert_eq!(provider.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_hint_overrides_backoff() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![Err(ProviderError::RateLimited {
                retry_after_ms: 5000,
            })],
            ONE_QUESTION,
        ));
        let gen = generator(provider.clone(), 4000);

        let start = Instant::now();
        gen.generate("Short document.").await.unwrap();
        assert!(start.elapsed() >= Duration::from_secs(5));
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_responses_skip_their_chunk() {
        let provider = Arc::new(ScriptedProvider::new(
            vec![
                Ok("   ".into()),
                Ok("I cannot produce JSON today.".into()),
                Ok(r#"[{"question": "Q?", "answer": "A"}, {"answer": "orphan"}]"#.into()),
            ],
            ONE_QUESTION,
        ));
        let gen = generator(provider.clone(), 12);

        let report = gen
            .generate("First part. Second part. Third part.")
            .await
            .unwrap();
        assert_eq!(report.chunks_total, 3);
        assert_eq!(report.chunks_skipped, 2);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.rejected, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn requests_are_spaced_by_the_rate_limiter() {
        let provider = Arc::new(ScriptedProvider::new(vec![], ONE_QUESTION));
        let gen = generator(provider.clone(), 12);

        let start = Instant::now();
        gen.generate("First part. Second part. Third part.")
            .await
            .unwrap();
        assert_eq!(provider.calls(), 3);
        assert!(start.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_document_makes_no_requests() {
        let provider = Arc::new(ScriptedProvider::new(vec![], ONE_QUESTION));
        let gen = generator(provider.clone(), 4000);

        let report = gen.generate("   ").await.unwrap();
        assert_eq!(report.chunks_total, 0);
        assert!(report.questions.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    /// Echoes each chunk back as a question; earlier calls take longer.
    struct SlowEchoProvider {
        calls: AtomicU32,
        in_flight: AtomicU32,
        peak: AtomicU32,
    }

    #[async_trait]
    impl LlmProvider for SlowEchoProvider {
        fn name(&self) -> &str {
            "slow-echo"
        }

        async fn generate(&self, request: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(u64::from(400 - call * 100))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let content = serde_json::json!([
                { "question": request.prompt, "answer": "echo" },
                { "answer": "orphan" }
            ])
            .to_string();
            Ok(GenerateResponse {
                content,
                model: request.model.clone(),
                token_usage: TokenUsage {
                    total_tokens: 7,
                    ..Default::default()
                },
                latency_ms: 1,
            })
        }

        fn available_models(&self) -> Vec<ModelInfo> {
            vec![]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_chunks_keep_document_order() {
        let provider = Arc::new(SlowEchoProvider {
            calls: AtomicU32::new(0),
            in_flight: AtomicU32::new(0),
            peak: AtomicU32::new(0),
        });
        let gen = QuestionGenerator::new(
            provider.clone(),
            GenerationConfig {
                chunk_size: 14,
                parallelism: 2,
                min_request_interval: Duration::ZERO,
                ..Default::default()
            },
        );

        let report = gen
            .generate("First part. Second part. Third part. Fourth part.")
            .await
            .unwrap();

        let asked: Vec<&str> = report.questions.iter().map(|q| q.question.as_str()).collect();
        assert_eq!(asked, ["First part.", "Second part.", "Third part.", "Fourth part."]);
        assert_eq!(report.chunks_total, 4);
        assert_eq!(report.chunks_skipped, 0);
        assert_eq!(report.rejected, 4);
        assert_eq!(report.token_usage.total_tokens, 28);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 4);
        assert_eq!(provider.peak.load(Ordering::SeqCst), 2);
    }
}
