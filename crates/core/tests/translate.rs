use std::{collections::VecDeque, sync::Mutex, time::Duration};

use vidlingo_core::{
    FallbackReason, GenerationBackend, GenerationError, Segment, Translator, TranslatorConfig,
    render_srt, translate::extract_json_array, translate_segments, write_srt,
};

/// Reads the batch out of the prompt and answers with `f` applied to every
/// element, wrapped in chatty prose.
struct MapBackend {
    f: fn(&str) -> String,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MapBackend {
    fn echo() -> Self {
        Self {
            f: |s| s.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn upper() -> Self {
        Self {
            f: |s| s.to_uppercase(),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn batch_sizes(&self) -> Vec<usize> {
        self.calls.lock().unwrap().iter().map(Vec::len).collect()
    }
}

impl GenerationBackend for MapBackend {
    async fn generate(&self, prompt: &str, _system_prompt: &str) -> Result<String, GenerationError> {
        let input = extract_json_array(prompt).expect("prompt carries a JSON array");
        let texts: Vec<String> = serde_json::from_str(input).expect("prompt array is valid JSON");
        let output: Vec<String> = texts.iter().map(|t| (self.f)(t)).collect();
        self.calls.lock().unwrap().push(texts);

        Ok(format!(
            "Sure! Here is the translation:\n{}\nLet me know if you need anything else.",
            serde_json::to_string(&output).unwrap()
        ))
    }
}

/// Replays canned responses in order.
struct ScriptedBackend {
    responses: Mutex<VecDeque<Result<String, GenerationError>>>,
    calls: Mutex<usize>,
}

impl ScriptedBackend {
    fn new(responses: Vec<Result<String, GenerationError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str, _system_prompt: &str) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable()))
    }
}

struct StalledBackend {
    calls: Mutex<usize>,
}

impl GenerationBackend for StalledBackend {
    async fn generate(&self, _prompt: &str, _system_prompt: &str) -> Result<String, GenerationError> {
        *self.calls.lock().unwrap() += 1;
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok("[]".to_string())
    }
}

fn unavailable() -> GenerationError {
    GenerationError::InvalidResponse("connection refused".to_string())
}

fn config(batch_size: usize) -> TranslatorConfig {
    TranslatorConfig {
        batch_size,
        timeout: Duration::from_secs(5),
        max_retries: 2,
        retry_backoff: Duration::ZERO,
    }
}

fn segments(n: usize) -> Vec<Segment> {
    (0..n)
        .map(|i| {
            let start = i as f64 * 2.5;
            Segment::new(start, start + 2.0, format!("  line {}  ", i))
        })
        .collect()
}

#[tokio::test]
async fn empty_input_makes_no_calls() {
    let backend = MapBackend::echo();
    let translator = Translator::new(&backend, config(20));

    let translation = translator.translate(&[], "French").await;

    assert!(translation.segments.is_empty());
    assert_eq!(translation.batches, 0);
    assert!(backend.batch_sizes().is_empty());
}

#[tokio::test]
async fn forty_five_segments_go_out_in_three_batches() {
    let backend = MapBackend::upper();
    let input = segments(45);
    let translator = Translator::new(&backend, config(20));

    let translation = translator.translate(&input, "Shouting").await;

    assert_eq!(backend.batch_sizes(), vec![20, 20, 5]);
    assert_eq!(translation.batches, 3);
    assert!(translation.is_complete());
    for (i, seg) in translation.segments.iter().enumerate() {
        assert_eq!(seg.text, format!("LINE {}", i));
    }
}

#[tokio::test]
async fn length_and_timing_hold_for_any_batch_size() {
    let input = segments(23);

    for batch_size in [1, 2, 7, 20, 23, 100] {
        let backend = MapBackend::upper();
        let translation = Translator::new(&backend, config(batch_size))
            .translate(&input, "Shouting")
            .await;

        assert_eq!(translation.segments.len(), input.len(), "batch_size={}", batch_size);
        assert_eq!(translation.batches, input.len().div_ceil(batch_size));
        for (out, src) in translation.segments.iter().zip(&input) {
            assert_eq!(out.start.to_bits(), src.start.to_bits());
            assert_eq!(out.end.to_bits(), src.end.to_bits());
        }
    }
}

#[tokio::test]
async fn zero_batch_size_behaves_like_one() {
    let backend = MapBackend::echo();
    let translation = Translator::new(&backend, config(0))
        .translate(&segments(3), "French")
        .await;

    assert_eq!(backend.batch_sizes(), vec![1, 1, 1]);
    assert_eq!(translation.segments.len(), 3);
}

#[tokio::test]
async fn echo_backend_returns_trimmed_input() {
    let backend = MapBackend::echo();
    let input = vec![
        Segment::new(0.0, 1.0, "  Hola, ¿qué tal?  "),
        Segment::new(1.0, 2.0, "\tСлава\n"),
        Segment::new(2.0, 3.0, "plain"),
    ];

    let translation = Translator::new(&backend, config(20))
        .translate(&input, "Spanish")
        .await;

    let texts: Vec<&str> = translation.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["Hola, ¿qué tal?", "Слава", "plain"]);
    assert!(translation.is_complete());
}

#[tokio::test]
async fn whitespace_only_text_is_sent_as_empty_string() {
    let backend = MapBackend::echo();
    let input = vec![Segment::new(0.0, 1.0, "   "), Segment::new(1.0, 2.0, "word")];

    let translation = Translator::new(&backend, config(20))
        .translate(&input, "German")
        .await;

    assert_eq!(
        backend.calls.lock().unwrap()[0],
        vec!["".to_string(), "word".to_string()]
    );
    assert_eq!(translation.segments[0].text, "");
}

#[tokio::test]
async fn response_without_array_keeps_original_text() {
    let backend = ScriptedBackend::new(vec![Ok("I'm sorry, I can't help with that.".into())]);
    let input = segments(3);

    let translation = Translator::new(&backend, config(20))
        .translate(&input, "French")
        .await;

    assert_eq!(backend.calls(), 1);
    assert_eq!(translation.fallbacks.len(), 1);
    assert_eq!(translation.fallbacks[0].reason, FallbackReason::NoArray);
    for (i, seg) in translation.segments.iter().enumerate() {
        assert_eq!(seg.text, format!("line {}", i));
    }
}

#[tokio::test]
async fn wrong_length_drops_only_that_batch() {
    let backend = ScriptedBackend::new(vec![
        Ok(r#"["un", "deux"]"#.into()),
        Ok(r#"["trois", "quatre", "cinq"]"#.into()),
        Ok(r#"["cinq"]"#.into()),
    ]);
    let input = segments(5);

    let translation = Translator::new(&backend, config(2))
        .translate(&input, "French")
        .await;

    let texts: Vec<&str> = translation.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["un", "deux", "line 2", "line 3", "cinq"]);
    assert_eq!(translation.fallbacks.len(), 1);

    let fallback = &translation.fallbacks[0];
    assert_eq!(fallback.batch_index, 1);
    assert_eq!(fallback.first_segment, 2);
    assert_eq!(fallback.len, 2);
    assert_eq!(
        fallback.reason,
        FallbackReason::LengthMismatch {
            expected: 2,
            got: 3
        }
    );
    assert_eq!(translation.untranslated_segments(), 2);
}

#[tokio::test]
async fn malformed_json_falls_back() {
    let backend = ScriptedBackend::new(vec![Ok(r#"["un", "deux",]"#.into())]);

    let translation = Translator::new(&backend, config(20))
        .translate(&segments(2), "French")
        .await;

    assert!(matches!(
        translation.fallbacks[0].reason,
        FallbackReason::Malformed(_)
    ));
    assert_eq!(translation.segments[1].text, "line 1");
}

#[tokio::test]
async fn transient_failures_are_retried() {
    let backend = ScriptedBackend::new(vec![
        Err(unavailable()),
        Err(unavailable()),
        Ok(r#"["bonjour"]"#.into()),
    ]);

    let translation = Translator::new(&backend, config(20))
        .translate(&segments(1), "French")
        .await;

    assert_eq!(backend.calls(), 3);
    assert!(translation.is_complete());
    assert_eq!(translation.segments[0].text, "bonjour");
}

#[tokio::test]
async fn exhausted_retries_fall_back_and_continue() {
    let backend = ScriptedBackend::new(vec![
        Err(unavailable()),
        Err(unavailable()),
        Err(unavailable()),
        Ok(r#"["trois"]"#.into()),
    ]);

    let translation = Translator::new(&backend, config(2))
        .translate(&segments(3), "French")
        .await;

    assert_eq!(backend.calls(), 4);
    let texts: Vec<&str> = translation.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["line 0", "line 1", "trois"]);
    match &translation.fallbacks[0].reason {
        FallbackReason::Backend { attempts, error } => {
            assert_eq!(*attempts, 3);
            assert!(error.contains("connection refused"));
        }
        other => panic!("unexpected reason: {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn unbounded_retry_setting_still_translates() {
    let backend = ScriptedBackend::new(vec![
        Err(unavailable()),
        Err(unavailable()),
        Ok(r#"["bonjour"]"#.into()),
    ]);
    let config = TranslatorConfig {
        batch_size: 20,
        timeout: Duration::from_secs(5),
        max_retries: u32::MAX,
        retry_backoff: Duration::from_secs(60),
    };

    let translation = Translator::new(&backend, config)
        .translate(&segments(1), "French")
        .await;

    assert_eq!(backend.calls(), 3);
    assert!(translation.is_complete());
    assert_eq!(translation.segments[0].text, "bonjour");
}

#[tokio::test(start_paused = true)]
async fn stalled_backend_times_out() {
    let backend = StalledBackend {
        calls: Mutex::new(0),
    };
    let config = TranslatorConfig {
        batch_size: 20,
        timeout: Duration::from_secs(1),
        max_retries: 1,
        retry_backoff: Duration::from_millis(10),
    };

    let translation = Translator::new(&backend, config)
        .translate(&segments(2), "French")
        .await;

    assert_eq!(*backend.calls.lock().unwrap(), 2);
    assert_eq!(translation.segments[0].text, "line 0");
    assert!(matches!(
        translation.fallbacks[0].reason,
        FallbackReason::Backend { attempts: 2, .. }
    ));
}

#[tokio::test]
async fn translate_segments_returns_aligned_cues() {
    let backend = MapBackend::upper();
    let input = segments(4);

    let output = translate_segments(&backend, &input, "Shouting", 3).await;

    assert_eq!(backend.batch_sizes(), vec![3, 1]);
    assert_eq!(output.len(), 4);
    assert_eq!(output[3], Segment::new(7.5, 9.5, "LINE 3"));
}

#[tokio::test]
async fn translated_subtitles_are_written_as_srt() {
    let backend = ScriptedBackend::new(vec![Ok(r#"Result: ["Bonjour", "Monde"]"#.into())]);
    let input = vec![
        Segment::new(3661.234, 3662.5, " Hello "),
        Segment::new(3662.5, 3664.0, "World"),
    ];
    let translation = Translator::new(&backend, config(20))
        .translate(&input, "French")
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("subtitles.fr.srt");
    write_srt(&path, &translation.segments).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, render_srt(&translation.segments));
    assert_eq!(
        written,
        "1\n01:01:01,234 --> 01:01:02,500\nBonjour\n\n2\n01:01:02,500 --> 01:01:04,000\nMonde\n\n"
    );
}
