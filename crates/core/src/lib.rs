//! Vidlingo Core Library
//!
//! Downloading videos, transcribing with Whisper, translating subtitle
//! segments through a language model without breaking their timing, and
//! summarizing transcripts.

pub mod backend;
pub mod cache;
pub mod error;
pub mod format;
pub mod pipeline;
pub mod provider;
pub mod srt;
pub mod summarize;
pub mod translate;
pub mod types;

pub use backend::{Backend, GenerationBackend, GenerationError, HostedBackend, OllamaBackend};
pub use cache::{
    find_video_in_cache, get_audio_path, get_cache_dir, get_fallback_report_path,
    get_root_cache_dir, get_subtitles_path, get_summary_path, get_text_translation_path,
    get_transcript_path, get_translated_subtitles_path, has_complete_translation,
};
pub use error::{Result, VidlingoError};
pub use format::{format_fallback_report, format_timestamp, format_transcript_with_timestamps};
pub use pipeline::{
    TranscribeTask, download_video, embed_subtitles, extract_audio, load_transcript,
    save_transcript, transcribe_audio,
};
pub use provider::{Provider, ProviderConfig, ProviderError, normalize_ollama_host};
pub use srt::{format_srt_timestamp, render_srt, write_srt};
pub use summarize::{load_summary, save_summary, summarize, translate_text};
pub use translate::{
    BatchFallback, DEFAULT_BATCH_SIZE, FallbackReason, Translation, Translator, TranslatorConfig,
    translate_segments,
};
pub use types::{Segment, Transcript};
