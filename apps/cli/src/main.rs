use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

use anyhow::Result;
use clap::{Parser, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::fs;
use tracing_subscriber::EnvFilter;

use vidlingo_core::{
    Backend, DEFAULT_BATCH_SIZE, Provider, TranscribeTask, Transcript, Translator,
    TranslatorConfig, download_video, embed_subtitles, extract_audio, find_video_in_cache,
    format_fallback_report, get_audio_path, get_cache_dir, get_fallback_report_path,
    get_subtitles_path, get_summary_path, get_text_translation_path, get_transcript_path,
    get_translated_subtitles_path, has_complete_translation, load_summary, load_transcript,
    save_summary, summarize, translate_text, write_srt,
};

const MAX_RETRIES: i64 = 10;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, Default, ValueEnum)]
enum CliProvider {
    #[default]
    Ollama,
    Openai,
    Grok,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Ollama => Provider::Ollama,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Grok => Provider::Grok,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Clone, Default, ValueEnum)]
enum CliTask {
    #[default]
    Transcribe,
    /// Whisper's built-in translation to English
    Translate,
}

impl From<CliTask> for TranscribeTask {
    fn from(cli: CliTask) -> Self {
        match cli {
            CliTask::Transcribe => TranscribeTask::Transcribe,
            CliTask::Translate => TranscribeTask::Translate,
        }
    }
}

#[derive(Parser)]
#[command(name = "vidlingo")]
#[command(
    about = "Download videos, transcribe with Whisper, translate subtitles and summarize with an LLM"
)]
struct Cli {
    /// Video URL
    url: String,

    /// Translate subtitles into this language (e.g. "Spanish", "French")
    #[arg(short, long, value_name = "LANG")]
    translate: Option<String>,

    /// Summary language. Defaults to the video's detected language.
    #[arg(short, long)]
    lang: Option<String>,

    /// LLM provider for translation and summary
    #[arg(short, long, default_value = "ollama")]
    provider: CliProvider,

    /// Model name, overriding the provider's default
    #[arg(short, long)]
    model: Option<String>,

    /// Whisper model size
    #[arg(long, default_value = "base")]
    whisper_model: String,

    /// Whisper task
    #[arg(long, default_value = "transcribe")]
    task: CliTask,

    /// Subtitle segments per translation request
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE, value_parser = parse_batch_size)]
    batch_size: usize,

    /// Seconds to wait for one LLM response
    #[arg(long, default_value_t = 120, value_parser = parse_timeout)]
    timeout: u64,

    /// Retries per translation batch after a failed request
    #[arg(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(..=MAX_RETRIES))]
    retries: u32,

    /// Skip the summary
    #[arg(long)]
    no_summary: bool,

    /// Burn subtitles into a copy of the video
    #[arg(long)]
    embed_subs: bool,

    /// Force re-processing even if cached files exist
    #[arg(short, long)]
    force: bool,

    /// Log translation details to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn parse_batch_size(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("batch size must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn parse_timeout(s: &str) -> Result<u64, String> {
    match s.parse::<u64>() {
        Ok(0) => Err("timeout must be at least 1 second".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn done(msg: impl std::fmt::Display, step_start: Instant) -> String {
    format!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style(format!("[{}]", format_duration(step_start.elapsed()))).dim()
    )
}

fn cached(msg: impl std::fmt::Display) {
    println!(
        "{} {} {}",
        style("✓").green().bold(),
        msg,
        style("(cached)").dim()
    );
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "warn,vidlingo_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[cfg(not(feature = "local-whisper"))]
async fn run_transcription(cli: &Cli, audio_file: &Path, transcript_path: &Path) -> Result<Transcript> {
    let task: TranscribeTask = cli.task.clone().into();
    Ok(vidlingo_core::transcribe_audio(audio_file, transcript_path, &cli.whisper_model, task).await?)
}

#[cfg(feature = "local-whisper")]
async fn run_transcription(cli: &Cli, audio_file: &Path, transcript_path: &Path) -> Result<Transcript> {
    use vidlingo_core::{
        get_root_cache_dir,
        pipeline::{ensure_model, transcribe_audio_local},
    };

    let task: TranscribeTask = cli.task.clone().into();
    let model_path = ensure_model(&get_root_cache_dir()).await?;
    Ok(transcribe_audio_local(audio_file, transcript_path, &model_path, task).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let provider: Provider = cli.provider.clone().into();
    let needs_llm = cli.translate.is_some() || !cli.no_summary;
    let request_timeout = Duration::from_secs(cli.timeout);

    // Validate API key early
    let backend = if needs_llm {
        match Backend::from_provider(provider, cli.model.clone(), request_timeout) {
            Ok(backend) => Some(backend),
            Err(e) => {
                eprintln!("{} {}", style("Error:").red().bold(), e);
                std::process::exit(1);
            }
        }
    } else {
        None
    };

    let cache_dir = get_cache_dir(&cli.url);
    fs::create_dir_all(&cache_dir).await?;
    tracing::debug!(cache_dir = %cache_dir.display(), "using cache directory");

    println!(
        "\n{}  {}\n",
        style("vidlingo").cyan().bold(),
        style("Video Transcriber & Translator").dim()
    );
    println!("{}", style("─".repeat(60)).dim());

    let total_start = Instant::now();

    // Step 1: Download (check cache)
    let step_start = Instant::now();
    let cached_video = if cli.force {
        None
    } else {
        find_video_in_cache(&cache_dir)
    };
    let video_file = match cached_video {
        Some(video) => {
            cached("Downloaded");
            video
        }
        None => {
            let spinner = create_spinner("Downloading video...");
            let video = download_video(&cli.url, &cache_dir).await?;
            let name = video
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            spinner.finish_with_message(done(
                format!("Downloaded: {}", style(name).dim()),
                step_start,
            ));
            video
        }
    };

    // Step 2: Extract audio (check cache)
    let step_start = Instant::now();
    let audio_file = get_audio_path(&cache_dir);
    if !cli.force && audio_file.exists() {
        cached("Audio extracted");
    } else {
        let spinner = create_spinner("Extracting audio...");
        extract_audio(&video_file, &audio_file).await?;
        spinner.finish_with_message(done("Audio extracted", step_start));
    }

    // Step 3: Transcribe (check cache)
    let step_start = Instant::now();
    let transcript_path = get_transcript_path(&cache_dir);
    let transcript = if !cli.force && transcript_path.exists() {
        let transcript = load_transcript(&transcript_path).await?;
        cached(format!(
            "Transcribed: {:.1} min, {}",
            transcript.duration_seconds() / 60.0,
            style(&transcript.language).yellow()
        ));
        transcript
    } else {
        let spinner = create_spinner("Transcribing with Whisper...");
        let transcript = run_transcription(&cli, &audio_file, &transcript_path).await?;
        spinner.finish_with_message(done(
            format!(
                "Transcribed: {:.1} min, {} detected",
                transcript.duration_seconds() / 60.0,
                style(&transcript.language).yellow()
            ),
            step_start,
        ));
        transcript
    };

    let subtitles_path = get_subtitles_path(&cache_dir);
    write_srt(&subtitles_path, &transcript.segments).await?;
    let mut subtitles_to_embed = subtitles_path.clone();

    // Step 4: Translate transcript text and subtitles (check cache with provider+lang)
    let mut text_translation: Option<PathBuf> = None;
    if let (Some(target_lang), Some(backend)) = (&cli.translate, &backend) {
        let step_start = Instant::now();
        let text_path = get_text_translation_path(&cache_dir, &provider, target_lang);

        if !cli.force && text_path.exists() {
            cached(format!("Text translated to {}", style(target_lang).yellow()));
            text_translation = Some(text_path);
        } else {
            let spinner = create_spinner(&format!(
                "Translating transcript text to {} with {}...",
                target_lang,
                provider.name()
            ));
            match translate_text(backend, &transcript, target_lang).await {
                Ok(text) => {
                    fs::write(&text_path, &text).await?;
                    spinner.finish_with_message(done(
                        format!("Text translated to {}", style(target_lang).yellow()),
                        step_start,
                    ));
                    text_translation = Some(text_path);
                }
                Err(e) => {
                    spinner.finish_and_clear();
                    println!("{} {}", style("!").yellow().bold(), style(e).yellow());
                }
            }
        }

        let step_start = Instant::now();
        let translated_path = get_translated_subtitles_path(&cache_dir, &provider, target_lang);
        let report_path = get_fallback_report_path(&cache_dir, &provider, target_lang);

        if !cli.force && has_complete_translation(&cache_dir, &provider, target_lang) {
            cached(format!("Translated to {}", style(target_lang).yellow()));
        } else {
            let config = TranslatorConfig {
                batch_size: cli.batch_size,
                timeout: request_timeout,
                max_retries: cli.retries,
                ..TranslatorConfig::default()
            };
            let spinner = create_spinner(&format!(
                "Translating {} segments to {} with {}...",
                transcript.segments.len(),
                target_lang,
                provider.name()
            ));
            let translation = Translator::new(backend, config)
                .translate(&transcript.segments, target_lang)
                .await;
            write_srt(&translated_path, &translation.segments).await?;
            spinner.finish_with_message(done(
                format!(
                    "Translated to {} ({} batches)",
                    style(target_lang).yellow(),
                    translation.batches
                ),
                step_start,
            ));

            if translation.is_complete() {
                if report_path.exists() {
                    fs::remove_file(&report_path).await?;
                }
            } else {
                let report = format_fallback_report(&translation);
                fs::write(&report_path, &report).await?;
                println!(
                    "{} {}",
                    style("!").yellow().bold(),
                    style(report.trim_end()).yellow()
                );
            }
        }
        subtitles_to_embed = translated_path;
    }

    // Step 5: Summarize (check cache with provider+lang)
    let mut summary: Option<(String, PathBuf)> = None;
    if let (false, Some(backend)) = (cli.no_summary, &backend) {
        let step_start = Instant::now();
        let summary_lang = cli.lang.clone().unwrap_or_else(|| transcript.language.clone());
        let summary_path = get_summary_path(&cache_dir, &provider, &summary_lang);

        let text = if !cli.force && summary_path.exists() {
            cached(format!("Summary ({})", provider.name()));
            load_summary(&summary_path).await?
        } else {
            let spinner = create_spinner(&format!(
                "Summarizing in {} with {}...",
                summary_lang,
                provider.name()
            ));
            let text = summarize(backend, &transcript, cli.lang.as_deref()).await?;
            save_summary(&text, &summary_path).await?;
            spinner.finish_with_message(done(format!("Summary ({})", provider.name()), step_start));
            text
        };
        summary = Some((text, summary_path));
    }

    // Step 6: Embed subtitles
    let mut subbed_video = None;
    if cli.embed_subs {
        let step_start = Instant::now();
        let spinner = create_spinner("Embedding subtitles...");
        let output = embed_subtitles(&video_file, &subtitles_to_embed).await?;
        spinner.finish_with_message(done("Subtitles embedded", step_start));
        subbed_video = Some(output);
    }

    println!(
        "\n{} {}\n",
        style("Total time:").dim(),
        style(format_duration(total_start.elapsed())).cyan().bold()
    );

    println!("{} {}", style("Subtitles:").dim(), style(subtitles_to_embed.display()).cyan());
    if let Some(path) = &text_translation {
        println!("{} {}", style("Translation:").dim(), style(path.display()).cyan());
    }
    if let Some(path) = &subbed_video {
        println!("{} {}", style("Video:").dim(), style(path.display()).cyan());
    }

    if let Some((text, path)) = summary {
        println!("{} {}\n", style("Summary:").dim(), style(path.display()).cyan());
        println!("{}", style("─".repeat(60)).dim());
        println!("{}", text);
    }

    Ok(())
}
