use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    pub segments: Vec<Segment>,
    #[serde(default = "unknown_language")]
    pub language: String,
}

fn unknown_language() -> String {
    "unknown".to_string()
}

/// One timed subtitle cue. Times are seconds from the start of the media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Copy of this cue with the same timing and different text.
    pub fn with_text(&self, text: impl Into<String>) -> Self {
        Self {
            start: self.start,
            end: self.end,
            text: text.into(),
        }
    }

    /// `start >= 0` and `end >= start`.
    pub fn has_valid_timing(&self) -> bool {
        self.start >= 0.0 && self.end >= self.start
    }
}

impl Transcript {
    pub fn duration_seconds(&self) -> f64 {
        self.segments.last().map(|s| s.end).unwrap_or(0.0)
    }

    /// Index of the first segment that breaks cue timing, either on its own or
    /// by starting before its predecessor.
    pub fn first_timing_violation(&self) -> Option<usize> {
        self.segments.iter().enumerate().position(|(i, seg)| {
            !seg.has_valid_timing() || (i > 0 && seg.start < self.segments[i - 1].start)
        })
    }
}
