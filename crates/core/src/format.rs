use crate::{
    translate::Translation,
    types::{Segment, Transcript},
};

/// Format seconds as MM:SS timestamp
pub fn format_timestamp(seconds: f64) -> String {
    let mins = (seconds / 60.0) as u32;
    let secs = (seconds % 60.0) as u32;
    format!("{:02}:{:02}", mins, secs)
}

/// Format segments as `[MM:SS] text` lines
pub fn format_segments_with_timestamps(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|seg| format!("[{}] {}", format_timestamp(seg.start), seg.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_transcript_with_timestamps(transcript: &Transcript) -> String {
    format_segments_with_timestamps(&transcript.segments)
}

/// One line per batch that kept its original text.
pub fn format_fallback_report(translation: &Translation) -> String {
    let mut output = format!(
        "{} of {} batches untranslated ({} segments)\n",
        translation.fallbacks.len(),
        translation.batches,
        translation.untranslated_segments()
    );

    for fallback in &translation.fallbacks {
        output.push_str(&format!(
            "  batch {} (segments {}-{}): {}\n",
            fallback.batch_index,
            fallback.first_segment + 1,
            fallback.first_segment + fallback.len,
            fallback.reason
        ));
    }

    output
}
