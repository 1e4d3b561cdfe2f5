use std::path::Path;

use tokio::fs;
use tracing::debug;

use crate::{
    backend::GenerationBackend,
    error::{Result, VidlingoError},
    format::format_transcript_with_timestamps,
    types::Transcript,
};

static SUMMARY_SYSTEM_PROMPT: &str = "You are a helpful assistant that summarizes videos.";

pub fn summary_prompt(transcript: &Transcript, summary_lang: Option<&str>) -> String {
    let language_rule = match summary_lang {
        Some(lang) => format!("Write the summary and key points in {} language.\n", lang),
        None => String::new(),
    };

    format!(
        "Please provide a concise summary of the following video transcript \
         (duration: {:.1} minutes, language: {}).\n\
         Also provide a list of key points.\n\
         {}\n\
         Transcript:\n{}",
        transcript.duration_seconds() / 60.0,
        transcript.language,
        language_rule,
        format_transcript_with_timestamps(transcript)
    )
}

/// Summarize a transcript. Unlike translation there is nothing to fall back
/// to, so a backend failure fails the job.
pub async fn summarize<B: GenerationBackend>(
    backend: &B,
    transcript: &Transcript,
    summary_lang: Option<&str>,
) -> Result<String> {
    let prompt = summary_prompt(transcript, summary_lang);
    debug!(chars = prompt.len(), "requesting summary");

    let summary = backend
        .generate(&prompt, SUMMARY_SYSTEM_PROMPT)
        .await
        .map_err(VidlingoError::SummaryFailed)?;

    Ok(summary.trim().to_string())
}

pub fn text_translation_prompt(text: &str, target_language: &str) -> String {
    format!(
        "Translate the following text to {}:\n\n{}",
        target_language,
        text.trim()
    )
}

pub fn text_translation_system_prompt(target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate the text to {}.",
        target_language
    )
}

/// Translate the full transcript text as one reading document, alongside the
/// segment-aligned subtitles.
pub async fn translate_text<B: GenerationBackend>(
    backend: &B,
    transcript: &Transcript,
    target_language: &str,
) -> Result<String> {
    let prompt = text_translation_prompt(&transcript.text, target_language);
    debug!(chars = prompt.len(), target_language, "requesting transcript translation");

    let translated = backend
        .generate(&prompt, &text_translation_system_prompt(target_language))
        .await
        .map_err(VidlingoError::TextTranslationFailed)?;

    Ok(translated.trim().to_string())
}

pub async fn load_summary(path: &Path) -> Result<String> {
    Ok(fs::read_to_string(path).await?)
}

pub async fn save_summary(summary: &str, path: &Path) -> Result<()> {
    fs::write(path, summary).await?;
    Ok(())
}
