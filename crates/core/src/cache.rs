use std::{
    hash::{DefaultHasher, Hash, Hasher},
    path::{Path, PathBuf},
};

use crate::provider::Provider;

/// Get the cache directory for a given URL
pub fn get_cache_dir(url: &str) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let url_hash = hasher.finish();

    get_root_cache_dir().join(url_hash.to_string())
}

pub fn get_root_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join("vidlingo")
}

pub fn get_model_dir(root_cache_dir: &Path) -> PathBuf {
    root_cache_dir.join("models")
}

/// Find a downloaded video in the cache directory, ignoring subtitled copies
pub fn find_video_in_cache(cache_dir: &Path) -> Option<PathBuf> {
    let Ok(entries) = std::fs::read_dir(cache_dir) else {
        return None;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        let is_subbed = path
            .file_stem()
            .is_some_and(|stem| stem.to_string_lossy().ends_with("_subbed"));
        if is_subbed {
            continue;
        }
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if matches!(ext.as_str(), "mp4" | "webm" | "mkv" | "mov" | "avi") {
                return Some(path);
            }
        }
    }
    None
}

pub fn get_audio_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("audio.wav")
}

pub fn get_transcript_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("transcript.json")
}

/// Subtitles in the spoken language
pub fn get_subtitles_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join("subtitles.srt")
}

/// Translated subtitles, one file per provider and target language
pub fn get_translated_subtitles_path(cache_dir: &Path, provider: &Provider, lang: &str) -> PathBuf {
    cache_dir.join(format!("subtitles.{}.{}.srt", provider.slug(), file_safe(lang)))
}

/// Fallback report written next to translated subtitles that kept some
/// original text
pub fn get_fallback_report_path(cache_dir: &Path, provider: &Provider, lang: &str) -> PathBuf {
    cache_dir.join(format!(
        "subtitles.{}.{}.fallbacks.txt",
        provider.slug(),
        file_safe(lang)
    ))
}

/// Translated subtitles exist and the run that wrote them had no fallbacks.
/// Incomplete translations are redone instead of reused.
pub fn has_complete_translation(cache_dir: &Path, provider: &Provider, lang: &str) -> bool {
    get_translated_subtitles_path(cache_dir, provider, lang).exists()
        && !get_fallback_report_path(cache_dir, provider, lang).exists()
}

/// Whole-transcript translation (provider and language aware)
pub fn get_text_translation_path(cache_dir: &Path, provider: &Provider, lang: &str) -> PathBuf {
    cache_dir.join(format!(
        "translation_{}_{}.txt",
        provider.slug(),
        file_safe(lang)
    ))
}

/// Summary file (provider and language aware)
pub fn get_summary_path(cache_dir: &Path, provider: &Provider, lang: &str) -> PathBuf {
    cache_dir.join(format!("summary_{}_{}.txt", provider.slug(), file_safe(lang)))
}

fn file_safe(lang: &str) -> String {
    lang.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_url_same_dir() {
        let a = get_cache_dir("https://youtu.be/abc");
        let b = get_cache_dir("https://youtu.be/abc");
        let c = get_cache_dir("https://youtu.be/xyz");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn language_names_become_file_safe() {
        let dir = Path::new("/cache");
        assert_eq!(
            get_translated_subtitles_path(dir, &Provider::Ollama, "Brazilian Portuguese"),
            PathBuf::from("/cache/subtitles.ollama.brazilian_portuguese.srt")
        );
        assert_eq!(
            get_text_translation_path(dir, &Provider::Gemini, "French"),
            PathBuf::from("/cache/translation_gemini_french.txt")
        );
        assert_eq!(
            get_summary_path(dir, &Provider::Openai, "en"),
            PathBuf::from("/cache/summary_openai_en.txt")
        );
    }

    #[test]
    fn translations_are_cached_per_provider() {
        let dir = Path::new("/cache");
        assert_ne!(
            get_translated_subtitles_path(dir, &Provider::Ollama, "fr"),
            get_translated_subtitles_path(dir, &Provider::Openai, "fr")
        );
    }

    #[test]
    fn incomplete_translation_is_not_a_cache_hit() {
        let dir = tempfile::tempdir().unwrap();
        let provider = Provider::Ollama;
        assert!(!has_complete_translation(dir.path(), &provider, "fr"));

        std::fs::write(get_translated_subtitles_path(dir.path(), &provider, "fr"), b"1\n").unwrap();
        let report = get_fallback_report_path(dir.path(), &provider, "fr");
        std::fs::write(&report, b"batch 0 kept original text\n").unwrap();
        assert!(!has_complete_translation(dir.path(), &provider, "fr"));

        std::fs::remove_file(&report).unwrap();
        assert!(has_complete_translation(dir.path(), &provider, "fr"));
    }

    #[test]
    fn cache_lookup_skips_subbed_output() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("video_subbed.mp4"), b"").unwrap();
        assert_eq!(find_video_in_cache(dir.path()), None);

        std::fs::write(dir.path().join("video.webm"), b"").unwrap();
        assert_eq!(
            find_video_in_cache(dir.path()),
            Some(dir.path().join("video.webm"))
        );
    }
}
