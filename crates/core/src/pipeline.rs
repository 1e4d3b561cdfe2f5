//! External tools the pipeline drives: yt-dlp, ffmpeg and Whisper.

use std::path::{Path, PathBuf};

use tokio::{fs, process::Command};
use tracing::{debug, warn};

use crate::{
    error::{Result, VidlingoError},
    types::Transcript,
};

/// What Whisper should produce from the audio.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TranscribeTask {
    /// Text in the spoken language.
    #[default]
    Transcribe,
    /// English text regardless of the spoken language.
    Translate,
}

impl TranscribeTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscribeTask::Transcribe => "transcribe",
            TranscribeTask::Translate => "translate",
        }
    }
}

/// Download a video from URL using yt-dlp
pub async fn download_video(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let output_template = cache_dir.join("video.%(ext)s");
    let output = Command::new("yt-dlp")
        .arg(url)
        .arg("--no-playlist")
        .arg("--print")
        .arg("after_move:filepath")
        .arg("-f")
        .arg("bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best")
        .arg("-o")
        .arg(&output_template)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VidlingoError::DownloadFailed {
            url: url.to_string(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout_str = String::from_utf8_lossy(output.stdout.as_slice());
    let filepath = stdout_str.trim();
    Ok(PathBuf::from(filepath))
}

/// Extract 16 kHz mono PCM audio from video using ffmpeg
pub async fn extract_audio(video_path: &Path, audio_path: &Path) -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vn")
        .arg("-acodec")
        .arg("pcm_s16le")
        .arg("-ar")
        .arg("16000")
        .arg("-ac")
        .arg("1")
        .arg(audio_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VidlingoError::AudioExtractionFailed {
            video_path: video_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(())
}

/// Transcribe audio with the `whisper` CLI and store the JSON transcript at
/// `output_path`.
pub async fn transcribe_audio(
    audio_path: &Path,
    output_path: &Path,
    model: &str,
    task: TranscribeTask,
) -> Result<Transcript> {
    let output_dir = output_path.parent().unwrap_or(Path::new("."));

    let output = Command::new("whisper")
        .arg(audio_path)
        .arg("--model")
        .arg(model)
        .arg("--task")
        .arg(task.as_str())
        .arg("--output_format")
        .arg("json")
        .arg("--output_dir")
        .arg(output_dir)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VidlingoError::TranscriptFailed {
            audio_path: audio_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    // Whisper names output after the input file
    let stem = audio_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "audio".to_string());
    let whisper_output = output_dir.join(format!("{}.json", stem));

    accept_whisper_output(&whisper_output, output_path, audio_path).await
}

/// Validate Whisper's JSON and only then move it to `output_path`. A
/// transcript with invalid timing is deleted so it never becomes a cache hit.
async fn accept_whisper_output(
    whisper_output: &Path,
    output_path: &Path,
    audio_path: &Path,
) -> Result<Transcript> {
    let transcript = load_transcript(whisper_output).await?;

    if let Err(e) = check_timing(&transcript, audio_path) {
        if let Err(remove_err) = fs::remove_file(whisper_output).await {
            warn!(
                path = %whisper_output.display(),
                error = %remove_err,
                "could not remove rejected transcript"
            );
        }
        return Err(e);
    }

    if whisper_output != output_path {
        fs::rename(whisper_output, output_path).await?;
    }
    Ok(transcript)
}

fn check_timing(transcript: &Transcript, audio_path: &Path) -> Result<()> {
    if let Some(index) = transcript.first_timing_violation() {
        return Err(VidlingoError::TranscriptFailed {
            audio_path: audio_path.to_path_buf(),
            reason: format!("segment {} has invalid timing", index),
        });
    }
    Ok(())
}

/// Load a transcript from a cached file
pub async fn load_transcript(path: &Path) -> Result<Transcript> {
    let json_content = fs::read_to_string(path).await?;
    let transcript: Transcript = serde_json::from_str(&json_content)?;
    Ok(transcript)
}

pub async fn save_transcript(transcript: &Transcript, path: &Path) -> Result<()> {
    let pretty_json = serde_json::to_string_pretty(transcript)?;
    fs::write(path, &pretty_json).await?;
    Ok(())
}

/// `<stem>_subbed.<ext>` next to the input video.
pub fn subbed_video_path(video_path: &Path) -> PathBuf {
    let stem = video_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "video".to_string());
    let file_name = match video_path.extension() {
        Some(ext) => format!("{}_subbed.{}", stem, ext.to_string_lossy()),
        None => format!("{}_subbed", stem),
    };
    video_path.with_file_name(file_name)
}

/// Argument for ffmpeg's `subtitles` filter. Single quotes in the path are
/// closed, escaped and reopened.
fn subtitles_filter(subtitle_path: &Path) -> String {
    let path = subtitle_path.to_string_lossy().replace('\'', r"'\''");
    format!("subtitles='{}'", path)
}

/// Burn subtitles into the video with ffmpeg. Returns the new video's path.
pub async fn embed_subtitles(video_path: &Path, subtitle_path: &Path) -> Result<PathBuf> {
    let output_path = subbed_video_path(video_path);
    let filter = subtitles_filter(subtitle_path);
    debug!(filter = %filter, output = %output_path.display(), "embedding subtitles");

    let output = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i")
        .arg(video_path)
        .arg("-vf")
        .arg(&filter)
        .arg(&output_path)
        .output()
        .await?;

    if !output.status.success() {
        return Err(VidlingoError::SubtitleEmbedFailed {
            video_path: video_path.to_path_buf(),
            subtitle_path: subtitle_path.to_path_buf(),
            reason: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    Ok(output_path)
}

#[cfg(feature = "local-whisper")]
pub use local::{MODEL_NAME, ensure_model, transcribe_audio_local};

#[cfg(feature = "local-whisper")]
mod local {
    use std::path::{Path, PathBuf};

    use tokio::{fs, process::Command};
    use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

    use super::{TranscribeTask, check_timing, save_transcript};
    use crate::{
        cache::get_model_dir,
        error::{Result, VidlingoError},
        types::{Segment, Transcript},
    };

    pub const MODEL_NAME: &str = "ggml-medium-q5_0.bin";

    /// Download the ggml model into the cache on first use.
    pub async fn ensure_model(root_cache_dir: &Path) -> Result<PathBuf> {
        let download_url = format!(
            "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/{}",
            MODEL_NAME
        );
        let model_dir = get_model_dir(root_cache_dir);
        fs::create_dir_all(&model_dir).await?;

        let model_path = model_dir.join(MODEL_NAME);
        if !model_path.exists() {
            let output = Command::new("curl")
                .arg("-fL")
                .arg(&download_url)
                .arg("-o")
                .arg(&model_path)
                .output()
                .await?;

            if !output.status.success() {
                return Err(VidlingoError::ModelDownloadFailed {
                    url: download_url,
                    reason: String::from_utf8_lossy(&output.stderr).to_string(),
                });
            }
        }

        Ok(model_path)
    }

    /// Transcribe in process with whisper-rs.
    pub async fn transcribe_audio_local(
        audio_path: &Path,
        output_path: &Path,
        model_path: &Path,
        task: TranscribeTask,
    ) -> Result<Transcript> {
        let audio = audio_path.to_path_buf();
        let model = model_path.to_path_buf();

        let transcript = tokio::task::spawn_blocking(move || run_whisper(&audio, &model, task))
            .await
            .map_err(|e| VidlingoError::TranscriptFailed {
                audio_path: audio_path.to_path_buf(),
                reason: e.to_string(),
            })??;

        check_timing(&transcript, audio_path)?;
        save_transcript(&transcript, output_path).await?;
        Ok(transcript)
    }

    fn run_whisper(audio_path: &Path, model_path: &Path, task: TranscribeTask) -> Result<Transcript> {
        let failed = |reason: String| VidlingoError::TranscriptFailed {
            audio_path: audio_path.to_path_buf(),
            reason,
        };

        let mut reader = hound::WavReader::open(audio_path).map_err(|e| failed(e.to_string()))?;
        let samples: Vec<f32> = reader
            .samples::<i16>()
            .map(|s| s.map(|s| s as f32 / i16::MAX as f32))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| failed(e.to_string()))?;

        let ctx_params = WhisperContextParameters {
            use_gpu: true,
            flash_attn: true,
            ..Default::default()
        };
        let model_path_str = model_path.to_string_lossy();
        let ctx = WhisperContext::new_with_params(&model_path_str, ctx_params)
            .map_err(|e| failed(format!("failed to load model: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 5 });
        params.set_translate(task == TranscribeTask::Translate);

        let mut state = ctx
            .create_state()
            .map_err(|e| failed(format!("failed to create state: {}", e)))?;
        state
            .full(params, &samples)
            .map_err(|e| failed(format!("failed to run model: {}", e)))?;

        let mut text = String::new();
        let mut segments: Vec<Segment> = Vec::new();

        for segment in state.as_iter() {
            let seg_text = match segment.to_str() {
                Ok(s) => s,
                Err(_) => continue,
            };
            segments.push(Segment {
                start: segment.start_timestamp() as f64 / 100.0,
                end: segment.end_timestamp() as f64 / 100.0,
                text: seg_text.to_string(),
            });
            text.push_str(seg_text);
        }

        let language_index = state.full_lang_id_from_state();
        let language = whisper_rs::get_lang_str(language_index);

        Ok(Transcript {
            language: language.unwrap_or("unknown").to_string(),
            segments,
            text,
        })
    }
}
