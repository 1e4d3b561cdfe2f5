//! Segment-aligned batch translation.
//!
//! Segments are translated in fixed-size batches. Each batch goes to the
//! backend as a JSON array of strings and must come back as an array of the
//! same length; anything else makes the batch keep its original text. The
//! output always has exactly one segment per input segment with the input's
//! timing, so subtitles stay in sync no matter how the backend behaves.

use std::time::Duration;

use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::{
    backend::{GenerationBackend, GenerationError},
    types::Segment,
};

pub const DEFAULT_BATCH_SIZE: usize = 20;

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Segments per backend request. Values below 1 are treated as 1.
    pub batch_size: usize,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
    /// Extra attempts after a failed or timed-out call.
    pub max_retries: u32,
    /// Delay before retry `n` is `retry_backoff * n`.
    pub retry_backoff: Duration,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(120),
            max_retries: 2,
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Why a batch kept its original text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FallbackReason {
    #[error("backend unavailable after {attempts} attempt(s): {error}")]
    Backend { attempts: u32, error: String },

    #[error("no JSON array in response")]
    NoArray,

    #[error("malformed JSON array: {0}")]
    Malformed(String),

    #[error("size mismatch, expected {expected} strings, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchFallback {
    pub batch_index: usize,
    /// Position of the batch's first segment in the input.
    pub first_segment: usize,
    pub len: usize,
    pub reason: FallbackReason,
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub segments: Vec<Segment>,
    pub batches: usize,
    pub fallbacks: Vec<BatchFallback>,
}

impl Translation {
    pub fn is_complete(&self) -> bool {
        self.fallbacks.is_empty()
    }

    /// Number of segments left in the source language.
    pub fn untranslated_segments(&self) -> usize {
        self.fallbacks.iter().map(|f| f.len).sum()
    }
}

#[derive(Debug, thiserror::Error)]
enum AttemptError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("no response within {0:?}")]
    Timeout(Duration),
}

pub struct Translator<B> {
    backend: B,
    config: TranslatorConfig,
}

impl<B: GenerationBackend> Translator<B> {
    pub fn new(backend: B, config: TranslatorConfig) -> Self {
        Self { backend, config }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Translate `segments` into `target_language`, one backend request per
    /// batch, in order.
    pub async fn translate(&self, segments: &[Segment], target_language: &str) -> Translation {
        let batch_size = self.config.batch_size.max(1);
        let mut translated = Vec::with_capacity(segments.len());
        let mut fallbacks = Vec::new();
        let mut batches = 0;

        for (batch_index, batch) in segments.chunks(batch_size).enumerate() {
            batches += 1;
            let originals: Vec<String> = batch.iter().map(|s| s.text.trim().to_string()).collect();

            debug!(batch = batch_index, size = batch.len(), "translating batch");

            let texts = match self.translate_batch(&originals, target_language).await {
                Ok(texts) => texts,
                Err(reason) => {
                    warn!(
                        batch = batch_index,
                        reason = %reason,
                        "batch falls back to original text"
                    );
                    fallbacks.push(BatchFallback {
                        batch_index,
                        first_segment: batch_index * batch_size,
                        len: batch.len(),
                        reason,
                    });
                    originals.clone()
                }
            };

            for (j, segment) in batch.iter().enumerate() {
                let text = texts.get(j).unwrap_or(&originals[j]);
                translated.push(segment.with_text(text.as_str()));
            }
        }

        if !fallbacks.is_empty() {
            info!(
                batches,
                fallbacks = fallbacks.len(),
                "translation finished with untranslated batches"
            );
        }

        Translation {
            segments: translated,
            batches,
            fallbacks,
        }
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_language: &str,
    ) -> Result<Vec<String>, FallbackReason> {
        let prompt = batch_prompt(target_language, texts)
            .map_err(|e| FallbackReason::Malformed(e.to_string()))?;
        let system_prompt = system_prompt(target_language);

        let response = self.generate_with_retry(&prompt, &system_prompt).await?;
        let parsed = parse_translations(&response, texts.len());
        if parsed.is_err() {
            debug!(raw = %response, "unusable translation response");
        }
        parsed
    }

    async fn generate_with_retry(
        &self,
        prompt: &str,
        system_prompt: &str,
    ) -> Result<String, FallbackReason> {
        let attempts = self.config.max_retries.saturating_add(1);
        let mut attempt = 1;

        loop {
            let result = match timeout(
                self.config.timeout,
                self.backend.generate(prompt, system_prompt),
            )
            .await
            {
                Ok(Ok(text)) => Ok(text),
                Ok(Err(e)) => Err(AttemptError::from(e)),
                Err(_) => Err(AttemptError::Timeout(self.config.timeout)),
            };

            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "generation failed, retrying");
                    sleep(self.config.retry_backoff.saturating_mul(attempt)).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(FallbackReason::Backend {
                        attempts,
                        error: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Translate with default timeout and retry settings.
pub async fn translate_segments<B: GenerationBackend>(
    backend: B,
    segments: &[Segment],
    target_language: &str,
    batch_size: usize,
) -> Vec<Segment> {
    let config = TranslatorConfig {
        batch_size,
        ..TranslatorConfig::default()
    };
    Translator::new(backend, config)
        .translate(segments, target_language)
        .await
        .segments
}

pub fn system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate to {} preserving the exact structure.",
        target_language
    )
}

pub fn batch_prompt(target_language: &str, texts: &[String]) -> serde_json::Result<String> {
    let input = serde_json::to_string_pretty(texts)?;

    Ok(format!(
        r#"You are a precise translator. Translate the following JSON list of strings to {lang}.
Rules:
1. Return a valid JSON list of strings.
2. The output list MUST have exactly the same number of elements as the input list.
3. Translate each string independently. DO NOT merge content from multiple strings into one.
4. DO NOT split one string into multiple strings.
5. Maintain the tone and context of the original text.

Input JSON:
{input}

Output JSON:"#,
        lang = target_language,
        input = input
    ))
}

/// The text between the first `[` and the last `]`, inclusive.
pub fn extract_json_array(response: &str) -> Option<&str> {
    let start = response.find('[')?;
    let end = response.rfind(']')?;
    (end > start).then(|| &response[start..=end])
}

/// Recover exactly `expected` strings from a raw backend response.
pub fn parse_translations(response: &str, expected: usize) -> Result<Vec<String>, FallbackReason> {
    let candidate = extract_json_array(response).ok_or(FallbackReason::NoArray)?;
    let texts: Vec<String> =
        serde_json::from_str(candidate).map_err(|e| FallbackReason::Malformed(e.to_string()))?;

    if texts.len() != expected {
        return Err(FallbackReason::LengthMismatch {
            expected,
            got: texts.len(),
        });
    }

    Ok(texts)
}
