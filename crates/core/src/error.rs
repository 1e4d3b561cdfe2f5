use std::path::PathBuf;
use thiserror::Error;

use crate::{backend::GenerationError, provider::ProviderError};

#[derive(Error, Debug)]
pub enum VidlingoError {
    #[error("Download failed for {url}: {reason}")]
    DownloadFailed { url: String, reason: String },

    #[error("Audio extraction failed for {video_path}: {reason}")]
    AudioExtractionFailed { video_path: PathBuf, reason: String },

    #[error("Transcription failed for {audio_path}: {reason}")]
    TranscriptFailed { audio_path: PathBuf, reason: String },

    #[error("Model download failed from {url}: {reason}")]
    ModelDownloadFailed { url: String, reason: String },

    #[error("Embedding subtitles {subtitle_path} into {video_path} failed: {reason}")]
    SubtitleEmbedFailed {
        video_path: PathBuf,
        subtitle_path: PathBuf,
        reason: String,
    },

    #[error("Summary generation failed: {0}")]
    SummaryFailed(#[source] GenerationError),

    #[error("Transcript translation failed: {0}")]
    TextTranslationFailed(#[source] GenerationError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

pub type Result<T> = std::result::Result<T, VidlingoError>;
