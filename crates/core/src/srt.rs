//! SubRip (`.srt`) subtitle rendering.

use std::{fmt::Write as _, path::Path};

use tokio::fs;

use crate::{error::Result, types::Segment};

// Absorbs binary representation error, e.g. 3661.234 - 3661 = 0.23399...
const MS_EPSILON: f64 = 1e-6;

/// Format seconds as an SRT timestamp, `HH:MM:SS,mmm`, truncating to whole
/// milliseconds.
pub fn format_srt_timestamp(seconds: f64) -> String {
    let ms = (seconds.max(0.0) * 1000.0 + MS_EPSILON).floor() as u64;
    let hours = ms / 3_600_000;
    let mins = (ms % 3_600_000) / 60_000;
    let secs = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, mins, secs, millis)
}

/// Render cues with 1-based indices, each followed by a blank line.
pub fn render_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_srt_timestamp(seg.start),
            format_srt_timestamp(seg.end),
            seg.text.trim()
        );
    }
    out
}

pub async fn write_srt(path: &Path, segments: &[Segment]) -> Result<()> {
    fs::write(path, render_srt(segments)).await?;
    Ok(())
}
