use once_cell::sync::Lazy;
use regex::Regex;
use log::debug;

use crate::cue::{Cue, TimeWindow, Track};
use crate::errors::ParseError;

// @module: Subtitle cue parsing and text cleaning

// @const: SRT timecode regex (hours may exceed two digits)
static TIMECODE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})$").unwrap()
});

static ITALIC_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</?i>").unwrap()
});

// @const: Leading "<name>: " speaker label
static SPEAKER_LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s:\[\]][^:\[\]]{0,31}:\s+").unwrap()
});

static STAGE_DIRECTION_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[[^\]]*\]").unwrap()
});

const ELLIPSIS: &str = "...";
const DIALOGUE_DASH: &str = "- ";
const TIME_SEPARATOR: &str = "-->";

/// Parser for the two SRT layouts found in the dataset (CRLF and LF)
pub struct CueParser;

impl CueParser {
    /// Parse subtitle file content into cues, in file order
    ///
    /// Blocks whose text is empty after cleaning are dropped without
    /// renumbering the remaining cues. Continuation cues of the source
    /// track are merged afterwards.
    pub fn parse(content: &str, track: Track) -> Result<Vec<Cue>, ParseError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let mut cues = Vec::new();
        for (index, block) in Self::split_blocks(content).into_iter().enumerate() {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            match Self::parse_block(block, index + 1, track)? {
                Some(cue) => cues.push(cue),
                None => debug!("Dropping block #{} with no text left after cleaning", index + 1),
            }
        }

        if track == Track::Source {
            cues = Self::merge_continuations(cues);
        }

        Ok(cues)
    }

    /// Parse an SRT timecode (HH:MM:SS,mmm) to milliseconds
    pub fn parse_timecode(timecode: &str) -> Result<i64, ParseError> {
        let timecode = timecode.trim();
        let invalid = |reason: &str| ParseError::InvalidTimecode {
            value: timecode.to_string(),
            reason: reason.to_string(),
        };

        let caps = TIMECODE_REGEX.captures(timecode)
            .ok_or_else(|| invalid("expected H:MM:SS,mmm"))?;

        let field = |idx: usize| -> Result<i64, ParseError> {
            caps[idx].parse::<i64>().map_err(|_| invalid("numeric field out of range"))
        };
        let hours = field(1)?;
        let minutes = field(2)?;
        let seconds = field(3)?;
        let millis = field(4)?;

        if minutes >= 60 || seconds >= 60 {
            return Err(invalid("minutes and seconds must be below 60"));
        }

        hours.checked_mul(3_600_000)
            .and_then(|ms| ms.checked_add(minutes * 60_000 + seconds * 1000 + millis))
            .ok_or_else(|| invalid("timecode out of range"))
    }

    /// Strip markup and annotations from one display line
    pub fn clean_line(line: &str, track: Track) -> String {
        let line = ITALIC_TAG_REGEX.replace_all(line.trim(), "");
        let line = line.trim_start();
        let line = line.strip_prefix(DIALOGUE_DASH).unwrap_or(line);
        let line = SPEAKER_LABEL_REGEX.replace(line, "");
        let mut line = STAGE_DIRECTION_REGEX.replace_all(&line, "").into_owned();

        if track == Track::Target {
            line = line.replace(ELLIPSIS, "");
        }

        line.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Split on blank lines, preferring CRLF when it yields several blocks
    fn split_blocks(content: &str) -> Vec<&str> {
        let blocks: Vec<&str> = content.split("\r\n\r\n").collect();
        if blocks.len() > 1 {
            blocks
        } else {
            content.split("\n\n").collect()
        }
    }

    fn parse_block(block: &str, position: usize, track: Track) -> Result<Option<Cue>, ParseError> {
        let malformed = |reason: String| ParseError::MalformedBlock { block: position, reason };
        let mut lines = block.lines();

        let id_line = lines.next().map(str::trim).unwrap_or_default();
        let id = id_line.parse::<usize>()
            .map_err(|_| malformed(format!("expected a sequence number, found '{}'", id_line)))?;

        let time_line = lines.next()
            .ok_or_else(|| malformed(format!("cue {} has no time range", id)))?;
        let window = Self::parse_time_range(time_line)
            .map_err(|e| match e {
                ParseError::MalformedBlock { reason, .. } => malformed(reason),
                other => other,
            })?;

        let text = lines
            .map(|line| Self::clean_line(line, track))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(Cue::new(id, window, text)))
    }

    fn parse_time_range(line: &str) -> Result<TimeWindow, ParseError> {
        let (start, rest) = line.split_once(TIME_SEPARATOR)
            .ok_or_else(|| ParseError::MalformedBlock {
                block: 0,
                reason: format!("expected '<start> --> <end>', found '{}'", line.trim()),
            })?;
        // Anything after the end timecode (position hints) is ignored
        let end = rest.split_whitespace().next().unwrap_or_default();

        Ok(TimeWindow::new(Self::parse_timecode(start)?, Self::parse_timecode(end)?))
    }

    /// Merge pairs where one cue trails off with an ellipsis and the next picks it up
    fn merge_continuations(cues: Vec<Cue>) -> Vec<Cue> {
        let mut merged = Vec::with_capacity(cues.len());
        let mut iter = cues.into_iter().peekable();

        while let Some(cue) = iter.next() {
            let trails_off = cue.text().ends_with(ELLIPSIS);
            match iter.next_if(|next| trails_off && next.text().starts_with(ELLIPSIS)) {
                Some(next) => {
                    debug!("Merging continuation cues {} and {}", cue.id(), next.id());
                    merged.push(Self::join_continuation(&cue, &next));
                }
                None => merged.push(cue),
            }
        }

        merged
    }

    fn join_continuation(head: &Cue, tail: &Cue) -> Cue {
        let head_text = head.text().trim_end_matches(ELLIPSIS).trim_end().to_string();
        let tail_text = tail.text().trim_start_matches(ELLIPSIS).trim_start().to_string();

        let mut segments: Vec<(TimeWindow, String)> = Vec::with_capacity(2);
        segments.extend(head.windows().iter().map(|window| (*window, head_text.clone())));
        segments.extend(tail.windows().iter().map(|window| (*window, tail_text.clone())));

        Cue::with_segments(head.id(), segments)
    }
}
