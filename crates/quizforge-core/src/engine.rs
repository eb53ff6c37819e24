//! Batching orchestrator.
//!
//! Splits a request into sequential sub-batches, runs each through
//! prompt → provider → parser → deduplicator, and pads any shortfall with
//! deterministic fallback questions. Every request returns exactly the
//! requested number of questions.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::dedup::{Deduplicator, DEFAULT_SIMILARITY_THRESHOLD};
use crate::error::ProviderError;
use crate::fallback::{synthesize_from, DISTINCT_PER_TYPE};
use crate::model::{Difficulty, GenerationOutput, GenerationRequest, Question, QuestionType};
use crate::parser::{parse_response, ValidationPolicy};
use crate::prompt::build_prompt;
use crate::traits::{GenerateRequest, TextProvider, DEFAULT_SYSTEM_PROMPT};

/// Configuration for the question generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Model identifier passed to the provider. Resolved from the provider
    /// settings rather than read from a `[generation]` table.
    #[serde(skip)]
    pub model: String,
    /// Counts above this are split into sub-batches.
    pub batch_threshold: usize,
    /// Maximum questions requested per sub-batch.
    pub batch_size: usize,
    /// Trigram similarity at which questions count as duplicates.
    pub similarity_threshold: f64,
    /// Extra sub-batches allowed when the planned ones come up short.
    pub extra_batches: usize,
    /// Upper bound on the pause a rate-limit hint can impose before the next
    /// sub-batch.
    pub max_rate_limit_wait_ms: u64,
    pub max_tokens: u32,
    pub temperature: f64,
    pub validation_policy: ValidationPolicy,
    /// Overrides [`DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".to_string(),
            batch_threshold: 20,
            batch_size: 20,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            extra_batches: 2,
            max_rate_limit_wait_ms: 10_000,
            max_tokens: 4096,
            temperature: 0.7,
            validation_policy: ValidationPolicy::Repair,
            system_prompt: None,
        }
    }
}

/// Counters describing how one request was satisfied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationReport {
    /// Outbound provider calls made.
    pub provider_calls: usize,
    /// Calls that failed or produced unparseable output.
    pub failed_batches: usize,
    /// Questions taken from provider output.
    pub ai_questions: usize,
    /// Questions synthesized offline.
    pub fallback_questions: usize,
    /// Total time spent, in milliseconds.
    pub duration_ms: u64,
}

/// Generates quiz questions through a text provider.
pub struct QuestionGenerator {
    provider: Arc<dyn TextProvider>,
    config: GeneratorConfig,
}

impl QuestionGenerator {
    pub fn new(provider: Arc<dyn TextProvider>, config: GeneratorConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate exactly `request.question_count` questions.
    pub async fn generate(&self, request: &GenerationRequest) -> Vec<Question> {
        self.generate_with_report(request).await.0
    }

    /// Generate questions and report how they were obtained.
    #[tracing::instrument(
        skip(self, request),
        fields(
            provider = %self.provider.name(),
            topic = %request.topic,
            count = request.question_count,
        )
    )]
    pub async fn generate_with_report(
        &self,
        request: &GenerationRequest,
    ) -> (Vec<Question>, GenerationReport) {
        let start = Instant::now();
        let target = request.question_count;
        let batch_size = self.config.batch_size.max(1);
        let mut report = GenerationReport::default();
        let mut dedup = Deduplicator::new(self.config.similarity_threshold);
        let mut accepted: Vec<Question> = Vec::with_capacity(target);

        let planned = if target <= self.config.batch_threshold {
            1
        } else {
            target.div_ceil(batch_size) + self.config.extra_batches
        };

        for batch in 0..planned {
            if accepted.len() >= target {
                break;
            }
            let remaining = target - accepted.len();
            let wanted = if planned == 1 {
                remaining
            } else {
                remaining.min(batch_size)
            };

            tracing::debug!(batch, wanted, "requesting sub-batch");
            report.provider_calls += 1;

            match self.run_batch(request, wanted).await {
                Ok(candidates) => {
                    let unique = dedup.accumulate_unique(candidates);
                    tracing::debug!(batch, accepted = unique.len(), "sub-batch complete");
                    accepted.extend(unique);
                }
                Err(e) => {
                    report.failed_batches += 1;
                    let provider_err = e.downcast_ref::<ProviderError>();
                    if provider_err.is_some_and(ProviderError::is_permanent) {
                        tracing::warn!("provider unusable, falling back: {e:#}");
                        break;
                    }
                    tracing::error!(batch, "sub-batch failed: {e:#}");

                    let retry_after = provider_err.and_then(ProviderError::retry_after_ms);
                    if let Some(hint) = retry_after.filter(|_| batch + 1 < planned) {
                        let wait_ms = hint.min(self.config.max_rate_limit_wait_ms);
                        tracing::info!(wait_ms, "rate limited, pausing before next sub-batch");
                        tokio::time::sleep(Duration::from_millis(wait_ms)).await;
                    }
                }
            }
        }

        accepted.truncate(target);
        report.ai_questions = accepted.len();

        if accepted.len() < target {
            let padding = self.pad_with_fallback(request, &mut dedup, target - accepted.len());
            report.fallback_questions = padding.len();
            tracing::info!(
                shortfall = padding.len(),
                "filled shortfall with fallback questions"
            );
            accepted.extend(padding);
        }

        report.duration_ms = start.elapsed().as_millis() as u64;
        (accepted, report)
    }

    async fn run_batch(&self, request: &GenerationRequest, wanted: usize) -> Result<Vec<Question>> {
        let prompt = build_prompt(
            &request.topic,
            wanted,
            &request.allowed_types,
            request.difficulty,
        );
        let response = self
            .provider
            .generate(&GenerateRequest {
                model: self.config.model.clone(),
                prompt,
                system_prompt: Some(
                    self.config
                        .system_prompt
                        .clone()
                        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
                ),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .await?;

        let questions = parse_response(
            &response.content,
            &request.allowed_types,
            &request.topic,
            self.config.validation_policy,
        )?;
        Ok(questions)
    }

    /// Synthesize `needed` questions. Walks the whole fallback cycle through
    /// the deduplicator first; only once every distinct text has been offered
    /// does it fill the remainder without deduplication.
    fn pad_with_fallback(
        &self,
        request: &GenerationRequest,
        dedup: &mut Deduplicator,
        needed: usize,
    ) -> Vec<Question> {
        let types = &request.allowed_types;
        let cycle = DISTINCT_PER_TYPE * types.len();
        let mut padding = Vec::with_capacity(needed);
        let mut offset = 0;

        while padding.len() < needed && offset < cycle {
            let short = (needed - padding.len()).min(cycle - offset);
            let batch = synthesize_from(&request.topic, offset, short, types);
            offset += short;
            padding.extend(dedup.accumulate_unique(batch));
        }

        let short = needed - padding.len();
        if short > 0 {
            tracing::debug!(short, "fallback exhausted unique texts, filling raw");
            padding.extend(synthesize_from(&request.topic, offset, short, types));
        }
        padding
    }
}

/// Inbound entry point: normalize the raw parameters and generate.
///
/// A non-positive count means the default, an empty type list means all
/// kinds, and no difficulty means medium. Fails only on an empty topic.
pub async fn generate_educational_content(
    generator: &QuestionGenerator,
    topic: &str,
    question_count: i64,
    types: &[QuestionType],
    difficulty: Option<Difficulty>,
) -> Result<GenerationOutput> {
    let request = GenerationRequest::new(topic, question_count, types, difficulty)?;
    let questions = generator.generate(&request).await;
    Ok(GenerationOutput { questions })
}
