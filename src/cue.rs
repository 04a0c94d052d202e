/*!
 * Cue and time window value types.
 *
 * A cue is one timed text unit of a subtitle track. Parsed cues own a single
 * window; cues produced by merging or stitching own one window per segment
 * they were built from, in chronological order.
 */

use std::fmt;

use serde::{Deserialize, Serialize};

// @struct: Display interval of a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    // @field: Start time in ms
    pub start: i64,

    // @field: End time in ms
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Start of `self` lies within `tolerance_ms` of the start of `other`
    pub fn start_within(&self, other: &TimeWindow, tolerance_ms: i64) -> bool {
        (self.start - other.start).abs() <= tolerance_ms
    }

    /// End of `self` lies within `tolerance_ms` of the end of `other`
    pub fn end_within(&self, other: &TimeWindow, tolerance_ms: i64) -> bool {
        (self.end - other.end).abs() <= tolerance_ms
    }

    /// Both bounds lie within tolerance
    pub fn matches_within(&self, other: &TimeWindow, tolerance_ms: i64) -> bool {
        self.start_within(other, tolerance_ms) && self.end_within(other, tolerance_ms)
    }

    /// At least one bound lies within tolerance
    pub fn touches_within(&self, other: &TimeWindow, tolerance_ms: i64) -> bool {
        self.start_within(other, tolerance_ms) || self.end_within(other, tolerance_ms)
    }

    pub fn duration_ms(&self) -> i64 {
        self.end - self.start
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} --> {}", format_timestamp(self.start), format_timestamp(self.end))
    }
}

/// Format milliseconds as an SRT timestamp (HH:MM:SS,mmm)
pub fn format_timestamp(ms: i64) -> String {
    let ms = ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1_000;
    let millis = ms % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, seconds, millis)
}

/// Which side of the language pair a subtitle file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Track {
    /// Track that reference lines are text-matched against; continuation cues get merged
    Source,
    /// Track that source cues are time-matched against; ellipses get dropped
    Target,
}

impl fmt::Display for Track {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source => write!(f, "source"),
            Self::Target => write!(f, "target"),
        }
    }
}

/// One timed text unit of a subtitle track
///
/// `windows` and `segments` are parallel: `segments[i]` is the text that was
/// displayed during `windows[i]`. `text` is the combined text of the cue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cue {
    id: usize,
    windows: Vec<TimeWindow>,
    segments: Vec<String>,
    text: String,
}

impl Cue {
    /// Single-window cue as read from a subtitle file
    pub fn new(id: usize, window: TimeWindow, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            id,
            windows: vec![window],
            segments: vec![text.clone()],
            text,
        }
    }

    /// Multi-window cue whose text is its segments joined by single spaces
    pub fn with_segments(id: usize, segments: Vec<(TimeWindow, String)>) -> Self {
        let text = segments.iter()
            .map(|(_, segment)| segment.as_str())
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let (windows, segments) = segments.into_iter().unzip();

        Self { id, windows, segments, text }
    }

    /// Virtual cue spanning consecutive cues; takes the id of the last one
    pub(crate) fn stitch(cues: &[Cue], text: String) -> Self {
        Self {
            id: cues.last().map_or(0, |cue| cue.id),
            windows: cues.iter().flat_map(|cue| cue.windows.iter().copied()).collect(),
            segments: cues.iter().flat_map(|cue| cue.segments.iter().cloned()).collect(),
            text,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn windows(&self) -> &[TimeWindow] {
        &self.windows
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Segment texts paired with the window each was displayed in
    pub fn segments(&self) -> impl Iterator<Item = (TimeWindow, &str)> {
        self.windows.iter().copied().zip(self.segments.iter().map(String::as_str))
    }

    pub fn is_multi_window(&self) -> bool {
        self.windows.len() > 1
    }

    /// From the first window's start to the last window's end
    pub fn span(&self) -> Option<TimeWindow> {
        match (self.windows.first(), self.windows.last()) {
            (Some(first), Some(last)) => Some(TimeWindow::new(first.start, last.end)),
            _ => None,
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        for window in &self.windows {
            writeln!(f, "{}", window)?;
        }
        writeln!(f, "{}", self.text)
    }
}
